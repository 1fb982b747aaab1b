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

use crate::SecretSource;
use mailprobe_common::DeliveryFailure;
use mailprobe_config::Config;

fn mailbox(
    address: Option<&String>,
    account: Option<&String>,
    field: &str,
) -> Result<lettre::message::Mailbox, DeliveryFailure> {
    let address = address.or(account).ok_or_else(|| DeliveryFailure::Configuration {
        reason: format!("no `message.{field}` address and no username secret"),
    })?;

    address
        .parse::<lettre::message::Mailbox>()
        .map_err(|error| DeliveryFailure::Configuration {
            reason: format!("`message.{field}` is not a mailbox '{address}': {error}"),
        })
}

/// Build the test message described by the configuration.
///
/// The sender and the recipient default to the username secret.
///
/// # Errors
///
/// * [`DeliveryFailure::Configuration`] if an address is missing or malformed
pub fn compose(
    config: &Config,
    secrets: &dyn SecretSource,
) -> Result<lettre::Message, DeliveryFailure> {
    let account = secrets.secret(&config.secrets.username);

    let from = mailbox(config.message.from.as_ref(), account.as_ref(), "from")?;
    let to = mailbox(config.message.to.as_ref(), account.as_ref(), "to")?;

    lettre::Message::builder()
        .from(from)
        .to(to)
        .subject(config.message.subject.clone())
        .body(config.message.body.clone())
        .map_err(DeliveryFailure::from)
}
