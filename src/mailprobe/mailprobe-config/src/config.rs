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

/// This structure contains all the field to configure the delivery checks.
///
/// This structure will be loaded from a configuration file `-c, --config`
/// argument of the program. See [`crate::Config::from_toml`].
///
/// All field are optional and defaulted if missing, except the version requirement.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// mailprobe's version requirement to parse this configuration file.
    pub version_requirement: semver::VersionReq,
    /// see [`field::FieldLogs`]
    #[serde(default)]
    pub logs: field::FieldLogs,
    /// see [`field::FieldSecrets`]
    #[serde(default)]
    pub secrets: field::FieldSecrets,
    /// see [`field::FieldMessage`]
    #[serde(default)]
    pub message: field::FieldMessage,
    /// see [`field::FieldDirectNetwork`]
    #[serde(default)]
    pub direct_network: field::FieldDirectNetwork,
    /// see [`field::FieldLocalPickup`]
    #[serde(default)]
    pub local_pickup: field::FieldLocalPickup,
    /// see [`field::FieldMutualTlsNetwork`]
    #[serde(default)]
    pub mutual_tls_network: field::FieldMutualTlsNetwork,
}

/// The inner field of the mailprobe's configuration.
#[allow(clippy::module_name_repetitions)]
pub mod field {
    use mailprobe_common::{StoreScope, Thumbprint};

    /// The field related to the logs.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldLogs {
        /// Customize the log level of the different part of the program.
        ///
        /// See <https://docs.rs/tracing-subscriber/0.3.15/tracing_subscriber/filter/struct.EnvFilter.html>
        #[serde(
            default = "FieldLogs::default_level",
            serialize_with = "crate::parser::tracing_directive::serialize",
            deserialize_with = "crate::parser::tracing_directive::deserialize"
        )]
        pub level: Vec<tracing_subscriber::filter::Directive>,
        /// Write the logs to this file too, logs only go to stderr if missing.
        #[serde(default)]
        pub filepath: Option<std::path::PathBuf>,
    }

    /// Names of the environment variables holding the secrets.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldSecrets {
        /// Variable holding the account name, also the default sender and recipient.
        #[serde(default = "FieldSecrets::default_username")]
        pub username: String,
        /// Variable holding the account password.
        #[serde(default = "FieldSecrets::default_password")]
        pub password: String,
    }

    /// The test message sent through every transport.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldMessage {
        /// Sender mailbox, the value of [`FieldSecrets::username`] if missing.
        #[serde(default)]
        pub from: Option<String>,
        /// Recipient mailbox, the value of [`FieldSecrets::username`] if missing.
        #[serde(default)]
        pub to: Option<String>,
        /// Subject header.
        #[serde(default = "FieldMessage::default_subject")]
        pub subject: String,
        /// Plain text body.
        #[serde(default = "FieldMessage::default_body")]
        pub body: String,
    }

    /// Submission to a public provider, see [`mailprobe_common::DeliveryMode::DirectNetwork`].
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldDirectNetwork {
        /// Public SMTP endpoint.
        #[serde(default = "FieldDirectNetwork::default_host")]
        pub host: String,
        /// Submission port, STARTTLS is required on it.
        #[serde(default = "FieldDirectNetwork::default_port")]
        pub port: u16,
    }

    /// Delivery into a directory, see [`mailprobe_common::DeliveryMode::LocalPickup`].
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldLocalPickup {
        /// Directory receiving one file per message.
        ///
        /// It is never created, make sure it exists.
        #[serde(default = "FieldLocalPickup::default_directory")]
        pub directory: std::path::PathBuf,
    }

    /// Private server with mutual TLS, see [`mailprobe_common::DeliveryMode::MutualTlsNetwork`].
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldMutualTlsNetwork {
        /// Private SMTP endpoint, must match the name in the server certificate.
        #[serde(default = "FieldMutualTlsNetwork::default_host")]
        pub host: String,
        /// SMTP port, STARTTLS is required on it.
        #[serde(default = "FieldMutualTlsNetwork::default_port")]
        pub port: u16,
        /// Thumbprint of the client certificate presented to the server.
        #[serde(default = "FieldMutualTlsNetwork::default_thumbprint")]
        pub thumbprint: Thumbprint,
        /// Store searched for the client certificate.
        #[serde(default)]
        pub store: StoreScope,
        /// Root of a directory store (`<store_path>/<location>/<name>/*.pem`).
        ///
        /// The certificate store of the operating system is used if missing.
        #[serde(default)]
        pub store_path: Option<std::path::PathBuf>,
    }
}
