/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

//! mailprobe delivery system
//!
//! A [`DeliveryMode`] is turned into an immutable [`TransportConfig`] by
//! [`build_config`], the client certificate of the mutual TLS mode being
//! resolved by a [`certificate::CertificateLocator`]. The configuration and a
//! message are then handed to [`send`], which reports a single
//! [`DeliveryOutcome`] whatever the transport.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::module_name_repetitions)]

/// Lookup of client certificates by thumbprint.
pub mod certificate;

mod message;
mod secrets;
mod selector;
mod send;
mod transport;

pub use message::compose;
pub use secrets::{Environment, SecretSource};
pub use selector::build_config;
pub use send::{send, send_blocking, spawn_send, PendingDelivery};
pub use transport::{
    Authentication, Credentials, DeliveryMethod, TransportConfig, TransportConfigBuilder,
};

use mailprobe_common::{DeliveryMode, DeliveryOutcome};
use mailprobe_config::Config;

/// Build the transport of `mode`, compose the test message and send it.
#[tracing::instrument(name = "check", skip(config, secrets))]
pub async fn check(
    mode: DeliveryMode,
    config: &Config,
    secrets: &dyn SecretSource,
) -> DeliveryOutcome {
    let store = certificate::store_for(&config.mutual_tls_network);
    let transport = build_config(mode, config, secrets, store.as_ref());

    match compose(config, secrets) {
        Ok(message) => send(&transport, message).await,
        Err(failure) => {
            tracing::error!(error = %failure, "Cannot build the message.");
            DeliveryOutcome::Failed(failure)
        }
    }
}
