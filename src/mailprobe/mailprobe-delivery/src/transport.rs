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

use crate::certificate::ClientCertificate;
use mailprobe_common::{DeliveryFailure, Thumbprint};

/// How the message leaves the process.
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum DeliveryMethod {
    /// A SMTP session with a remote server.
    Network,
    /// A file written in a local directory, picked up by another process.
    PickupDirectory,
}

/// An explicit username and password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    ///
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    ///
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn to_lettre(&self) -> lettre::transport::smtp::authentication::Credentials {
        lettre::transport::smtp::authentication::Credentials::new(
            self.username.clone(),
            self.password.clone(),
        )
    }
}

/// The single authentication source of a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// Username and password, `None` if they were not provided.
    Credentials(Option<Credentials>),
    /// A client certificate presented during the TLS handshake, with the
    /// identity of the current process. `certificate` is `None` when the
    /// certificate was not found.
    ClientCertificate {
        /// The thumbprint searched
        thumbprint: Thumbprint,
        /// The certificate located, if any
        certificate: Option<ClientCertificate>,
    },
    /// The identity of the current process, no explicit credentials.
    Ambient,
}

impl Authentication {
    /// Does the transport rely on the identity of the current process.
    #[must_use]
    pub const fn uses_ambient_credentials(&self) -> bool {
        matches!(self, Self::ClientCertificate { .. } | Self::Ambient)
    }
}

/// The transport parameters of one delivery mode, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    host: String,
    port: Option<u16>,
    delivery_method: DeliveryMethod,
    use_tls: bool,
    authentication: Authentication,
    pickup_directory: Option<std::path::PathBuf>,
}

impl TransportConfig {
    /// Start the configuration of a network transport to `host`, without TLS
    /// and with ambient credentials.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> TransportConfigBuilder {
        TransportConfigBuilder {
            inner: Self {
                host: host.into(),
                port: None,
                delivery_method: DeliveryMethod::Network,
                use_tls: false,
                authentication: Authentication::Ambient,
                pickup_directory: None,
            },
        }
    }

    ///
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port of the server, the transport default (25) if `None`.
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }

    ///
    #[must_use]
    pub const fn delivery_method(&self) -> DeliveryMethod {
        self.delivery_method
    }

    /// Is STARTTLS required, ignored for pickup delivery.
    #[must_use]
    pub const fn use_tls(&self) -> bool {
        self.use_tls
    }

    ///
    #[must_use]
    pub const fn authentication(&self) -> &Authentication {
        &self.authentication
    }

    ///
    #[must_use]
    pub fn pickup_directory(&self) -> Option<&std::path::Path> {
        self.pickup_directory.as_deref()
    }

    /// Check the fields required by the delivery method are set.
    ///
    /// # Errors
    ///
    /// * [`DeliveryFailure::Configuration`] if the host of a network delivery
    ///   or the pickup directory is empty
    pub fn validate(&self) -> Result<(), DeliveryFailure> {
        match self.delivery_method {
            DeliveryMethod::Network if self.host.trim().is_empty() => {
                Err(DeliveryFailure::Configuration {
                    reason: "the host of a network delivery is empty".to_owned(),
                })
            }
            DeliveryMethod::PickupDirectory
                if self
                    .pickup_directory
                    .as_ref()
                    .map_or(true, |path| path.as_os_str().is_empty()) =>
            {
                Err(DeliveryFailure::Configuration {
                    reason: "the pickup directory is empty".to_owned(),
                })
            }
            DeliveryMethod::Network | DeliveryMethod::PickupDirectory => Ok(()),
        }
    }
}

/// Builder of a [`TransportConfig`].
#[derive(Debug, Clone)]
pub struct TransportConfigBuilder {
    inner: TransportConfig,
}

impl TransportConfigBuilder {
    ///
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.inner.port = Some(port);
        self
    }

    /// Require STARTTLS on the connection.
    #[must_use]
    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.inner.use_tls = use_tls;
        self
    }

    /// Deliver by writing the message in `directory` instead.
    #[must_use]
    pub fn pickup_directory(mut self, directory: impl Into<std::path::PathBuf>) -> Self {
        self.inner.delivery_method = DeliveryMethod::PickupDirectory;
        self.inner.pickup_directory = Some(directory.into());
        self
    }

    /// Authenticate with a username and password. `None` records that they
    /// are required but missing.
    #[must_use]
    pub fn credentials(mut self, credentials: impl Into<Option<Credentials>>) -> Self {
        self.inner.authentication = Authentication::Credentials(credentials.into());
        self
    }

    /// Present a client certificate during the handshake.
    #[must_use]
    pub fn client_certificate(
        mut self,
        thumbprint: Thumbprint,
        certificate: Option<ClientCertificate>,
    ) -> Self {
        self.inner.authentication = Authentication::ClientCertificate {
            thumbprint,
            certificate,
        };
        self
    }

    /// Toggle the use of the identity of the current process.
    ///
    /// * `true` discards explicit credentials set before, a client
    ///   certificate is kept
    /// * `false` keeps explicit credentials, whether they were set before or
    ///   after, and otherwise requires some
    ///
    /// A client certificate is an ambient identity too: `false` drops it
    /// along with its thumbprint, and the delivery fails with
    /// [`DeliveryFailure::Credential`] unless credentials are set afterwards.
    ///
    /// [`DeliveryFailure::Credential`]: mailprobe_common::DeliveryFailure::Credential
    #[must_use]
    pub fn use_ambient_credentials(mut self, ambient: bool) -> Self {
        self.inner.authentication = match (ambient, self.inner.authentication) {
            (true, Authentication::Credentials(_)) => Authentication::Ambient,
            (false, Authentication::Ambient | Authentication::ClientCertificate { .. }) => {
                Authentication::Credentials(None)
            }
            (_, authentication) => authentication,
        };
        self
    }

    /// Finish the configuration.
    #[must_use]
    pub fn build(self) -> TransportConfig {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::{Authentication, Credentials, DeliveryMethod, TransportConfig};
    use mailprobe_common::{DeliveryFailure, Thumbprint};

    fn credentials() -> Credentials {
        Credentials::new("probe@testserver.com", "hunter2")
    }

    fn thumbprint() -> Thumbprint {
        mailprobe_test::certs::CLIENT_THUMBPRINT.parse().unwrap()
    }

    #[test]
    fn defaults() {
        let config = TransportConfig::builder("mx.testserver.com").build();

        pretty_assertions::assert_eq!(config.host(), "mx.testserver.com");
        pretty_assertions::assert_eq!(config.port(), None);
        pretty_assertions::assert_eq!(config.delivery_method(), DeliveryMethod::Network);
        assert!(!config.use_tls());
        assert!(config.authentication().uses_ambient_credentials());
        assert!(config.pickup_directory().is_none());
    }

    #[test]
    fn ambient_cleared_then_credentials() {
        let config = TransportConfig::builder("smtp.testserver.com")
            .use_ambient_credentials(false)
            .credentials(credentials())
            .build();

        pretty_assertions::assert_eq!(
            config.authentication(),
            &Authentication::Credentials(Some(credentials()))
        );
    }

    #[test]
    fn credentials_then_ambient_cleared() {
        let config = TransportConfig::builder("smtp.testserver.com")
            .credentials(credentials())
            .use_ambient_credentials(false)
            .build();

        pretty_assertions::assert_eq!(
            config.authentication(),
            &Authentication::Credentials(Some(credentials()))
        );
    }

    #[test]
    fn ambient_overrides_credentials() {
        let config = TransportConfig::builder("smtp.testserver.com")
            .credentials(credentials())
            .use_ambient_credentials(true)
            .build();

        pretty_assertions::assert_eq!(config.authentication(), &Authentication::Ambient);
    }

    #[test]
    fn ambient_keeps_client_certificate() {
        let config = TransportConfig::builder("mx.testserver.com")
            .client_certificate(thumbprint(), None)
            .use_ambient_credentials(true)
            .build();

        pretty_assertions::assert_eq!(
            config.authentication(),
            &Authentication::ClientCertificate {
                thumbprint: thumbprint(),
                certificate: None
            }
        );
        assert!(config.authentication().uses_ambient_credentials());
    }

    #[test]
    fn ambient_cleared_drops_client_certificate() {
        let config = TransportConfig::builder("mx.testserver.com")
            .use_tls(true)
            .client_certificate(thumbprint(), None)
            .use_ambient_credentials(false)
            .build();

        pretty_assertions::assert_eq!(config.authentication(), &Authentication::Credentials(None));

        let config = TransportConfig::builder("mx.testserver.com")
            .use_tls(true)
            .client_certificate(thumbprint(), None)
            .use_ambient_credentials(false)
            .credentials(credentials())
            .build();

        pretty_assertions::assert_eq!(
            config.authentication(),
            &Authentication::Credentials(Some(credentials()))
        );
    }

    #[test]
    fn ambient_cleared_without_credentials() {
        let config = TransportConfig::builder("smtp.testserver.com")
            .use_ambient_credentials(false)
            .build();

        pretty_assertions::assert_eq!(config.authentication(), &Authentication::Credentials(None));
        assert!(!config.authentication().uses_ambient_credentials());
    }

    #[test]
    fn credentials_are_not_printed() {
        assert!(!format!("{:?}", credentials()).contains("hunter2"));
    }

    #[rstest::rstest]
    #[case::empty_host(TransportConfig::builder("").build(), false)]
    #[case::blank_host(TransportConfig::builder("  ").port(25).build(), false)]
    #[case::network(TransportConfig::builder("mx.testserver.com").build(), true)]
    #[case::empty_pickup(TransportConfig::builder("localhost").pickup_directory("").build(), false)]
    #[case::pickup(TransportConfig::builder("").pickup_directory("/tmp/emails").build(), true)]
    fn validate(#[case] config: TransportConfig, #[case] valid: bool) {
        match config.validate() {
            Ok(()) => assert!(valid),
            Err(DeliveryFailure::Configuration { .. }) => assert!(!valid),
            Err(otherwise) => panic!("unexpected failure: {otherwise}"),
        }
    }
}
