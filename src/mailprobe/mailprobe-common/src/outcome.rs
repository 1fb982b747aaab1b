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

use crate::Thumbprint;

/// Why a delivery attempt failed. Nothing is retried, each variant is terminal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFailure {
    /// The transport configuration or the message is missing a required field.
    #[error("configuration: {reason}")]
    Configuration {
        /// What is missing or malformed
        reason: String,
    },

    /// The credentials are missing, or were rejected by the server.
    #[error("credentials: {}",
        with_source
            .as_ref()
            .map_or("null", String::as_str)
    )]
    Credential {
        /// The source of the error
        with_source: Option<String>,
    },

    /// Mutual TLS was requested but no usable client certificate was located.
    #[error("no usable client certificate for thumbprint {thumbprint}: {}",
        with_source
            .as_ref()
            .map_or("not found", String::as_str)
    )]
    CertificateNotFound {
        /// The thumbprint that was looked up
        thumbprint: Thumbprint,
        /// The source of the error
        with_source: Option<String>,
    },

    /// Error caused by the TLS
    #[error("tls: {}",
        with_source
            .as_ref()
            .map_or("null", String::as_str)
    )]
    Tls {
        /// The source of the error
        with_source: Option<String>,
    },

    /// The host could not be resolved or reached, or the connection timed out.
    #[error("unreachable: {}",
        with_source
            .as_ref()
            .map_or("null", String::as_str)
    )]
    Unreachable {
        /// The source of the error
        with_source: Option<String>,
    },

    /// The server refused a mailbox, either the sender or a recipient.
    ///
    /// The reply does not tell which of the two was refused.
    #[error("mailbox rejected: {reply}: {}",
        with_source
            .as_ref()
            .map_or("null", String::as_str)
    )]
    InvalidRecipient {
        /// The reply code
        reply: u16,
        /// The source of the error
        with_source: Option<String>,
    },

    /// The pickup directory could not be written.
    #[error("filesystem: {}",
        with_source
            .as_ref()
            .map_or("null", String::as_str)
    )]
    Filesystem {
        /// The source of the error
        with_source: Option<String>,
    },

    /// The attempt was cancelled before the transport reported completion.
    #[error("delivery cancelled")]
    Cancelled,

    /// Any other failure reported by the transport.
    #[error("delivery: {}{}",
        reply.map(|r| format!("{r}: ")).unwrap_or_default(),
        with_source
            .as_ref()
            .map_or("null", String::as_str)
    )]
    Delivery {
        /// The reply code, if the server produced one
        reply: Option<u16>,
        /// The source of the error
        with_source: Option<String>,
    },
}

/// Did `error` happen while negotiating TLS?
///
/// A failed handshake surfaces as a connection error caused by an
/// [`std::io::ErrorKind::InvalidData`], and a server without STARTTLS as a
/// client error.
fn is_tls_negotiation(error: &lettre::transport::smtp::Error) -> bool {
    if error.is_tls() {
        return true;
    }
    if error.is_client() && error.to_string().contains("STARTTLS") {
        return true;
    }

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::InvalidData)
        {
            return true;
        }
        source = cause.source();
    }
    false
}

impl From<lettre::transport::smtp::Error> for DeliveryFailure {
    fn from(value: lettre::transport::smtp::Error) -> Self {
        let with_source = Some(value.to_string());
        let reply = value
            .status()
            .and_then(|code| code.to_string().parse::<u16>().ok());

        if is_tls_negotiation(&value) {
            Self::Tls { with_source }
        } else if value.is_permanent() || value.is_transient() {
            match reply {
                Some(530 | 534 | 535 | 538) => Self::Credential { with_source },
                Some(reply @ 550..=553) => Self::InvalidRecipient { reply, with_source },
                _ => Self::Delivery { reply, with_source },
            }
        } else if value.is_client() || value.is_response() {
            Self::Delivery { reply, with_source }
        } else {
            // connection or network
            Self::Unreachable { with_source }
        }
    }
}

impl From<lettre::transport::file::Error> for DeliveryFailure {
    fn from(value: lettre::transport::file::Error) -> Self {
        Self::Filesystem {
            with_source: Some(value.to_string()),
        }
    }
}

impl From<lettre::error::Error> for DeliveryFailure {
    fn from(value: lettre::error::Error) -> Self {
        Self::Configuration {
            reason: format!("message cannot be built: {value}"),
        }
    }
}

/// The result of one delivery attempt.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The message was handed to the transport without error.
    Sent,
    /// The transport reported an error, see its cause.
    Failed(DeliveryFailure),
}

impl DeliveryOutcome {
    /// Did the transport accept the message ?
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    /// The failure if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&DeliveryFailure> {
        match self {
            Self::Sent => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    /// A human readable cause of the failure, `None` on success.
    #[must_use]
    pub fn cause(&self) -> Option<String> {
        self.failure().map(ToString::to_string)
    }
}

impl From<Result<(), DeliveryFailure>> for DeliveryOutcome {
    fn from(value: Result<(), DeliveryFailure>) -> Self {
        value.map_or_else(Self::Failed, |()| Self::Sent)
    }
}

impl std::fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sent => f.write_str("sent"),
            Self::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}
