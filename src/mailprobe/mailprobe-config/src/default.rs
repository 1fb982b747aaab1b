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

use crate::{
    config::field::{
        FieldDirectNetwork, FieldLocalPickup, FieldLogs, FieldMessage, FieldMutualTlsNetwork,
        FieldSecrets,
    },
    Config,
};
use mailprobe_common::{StoreScope, Thumbprint, SMTP_PORT, SUBMISSION_PORT};

impl Default for Config {
    fn default() -> Self {
        Self {
            version_requirement: semver::VersionReq::parse(">=0.1.0, <1.0.0")
                .expect("valid version requirement"),
            logs: FieldLogs::default(),
            secrets: FieldSecrets::default(),
            message: FieldMessage::default(),
            direct_network: FieldDirectNetwork::default(),
            local_pickup: FieldLocalPickup::default(),
            mutual_tls_network: FieldMutualTlsNetwork::default(),
        }
    }
}

impl Default for FieldLogs {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            filepath: None,
        }
    }
}

impl FieldLogs {
    pub(crate) fn default_level() -> Vec<tracing_subscriber::filter::Directive> {
        vec!["warn".parse().expect("valid directive")]
    }
}

impl Default for FieldSecrets {
    fn default() -> Self {
        Self {
            username: Self::default_username(),
            password: Self::default_password(),
        }
    }
}

impl FieldSecrets {
    pub(crate) fn default_username() -> String {
        "email_username".to_owned()
    }

    pub(crate) fn default_password() -> String {
        "email_password".to_owned()
    }
}

impl Default for FieldMessage {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            subject: Self::default_subject(),
            body: Self::default_body(),
        }
    }
}

impl FieldMessage {
    pub(crate) fn default_subject() -> String {
        "test".to_owned()
    }

    pub(crate) fn default_body() -> String {
        "Hi!".to_owned()
    }
}

impl Default for FieldDirectNetwork {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

impl FieldDirectNetwork {
    pub(crate) fn default_host() -> String {
        "smtp.gmail.com".to_owned()
    }

    pub(crate) const fn default_port() -> u16 {
        SUBMISSION_PORT
    }
}

impl Default for FieldLocalPickup {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
        }
    }
}

impl FieldLocalPickup {
    #[cfg(windows)]
    pub(crate) fn default_directory() -> std::path::PathBuf {
        std::path::PathBuf::from(r"C:\emails")
    }

    #[cfg(not(windows))]
    pub(crate) fn default_directory() -> std::path::PathBuf {
        std::path::PathBuf::from("/tmp/emails")
    }
}

impl Default for FieldMutualTlsNetwork {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            thumbprint: Self::default_thumbprint(),
            store: StoreScope::default(),
            store_path: None,
        }
    }
}

impl FieldMutualTlsNetwork {
    // resolved through the hosts file, connecting by ip address fails the
    // server certificate verification.
    pub(crate) fn default_host() -> String {
        "Windows-Server".to_owned()
    }

    pub(crate) const fn default_port() -> u16 {
        SMTP_PORT
    }

    pub(crate) fn default_thumbprint() -> Thumbprint {
        "4197D86EF230F5E475C8458C60523ADD344BB78D"
            .parse()
            .expect("valid thumbprint")
    }
}
