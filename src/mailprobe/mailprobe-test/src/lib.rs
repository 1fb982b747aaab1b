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

//! Fixtures shared by the tests of the mailprobe crates.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
//
#![allow(clippy::missing_panics_doc)]

/// Certificates and certificate stores.
pub mod certs;
/// A scripted SMTP server listening on localhost.
pub mod smtp_server;

use mailprobe_config::Config;

/// Sender and recipient of the test messages.
pub const TEST_ADDRESS: &str = "probe@testserver.com";

/// Get a config for local test: messages are picked up in `pickup`, the
/// mutual TLS certificate is searched in the fixture store.
#[must_use]
pub fn local_test(pickup: impl Into<std::path::PathBuf>) -> Config {
    let mut config = Config::default();

    config.local_pickup.directory = pickup.into();
    config.mutual_tls_network.store_path = Some(certs::store_path());
    config.message.from = Some(TEST_ADDRESS.to_owned());
    config.message.to = Some(TEST_ADDRESS.to_owned());

    config
}

/// Secrets holding the credentials accepted by [`smtp_server::MockSmtpServer`].
#[must_use]
pub fn test_secrets(config: &Config) -> std::collections::BTreeMap<String, String> {
    std::collections::BTreeMap::from([
        (config.secrets.username.clone(), TEST_ADDRESS.to_owned()),
        (config.secrets.password.clone(), "hunter2".to_owned()),
    ])
}
