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
    certificate::{CertificateLocator, TrustStore},
    Credentials, SecretSource, TransportConfig,
};
use mailprobe_common::DeliveryMode;
use mailprobe_config::Config;

/// Host name of the pickup transport, the SMTP layer is never reached.
const PICKUP_HOST: &str = "localhost";

fn credentials_of(config: &Config, secrets: &dyn SecretSource) -> Option<Credentials> {
    let username = secrets.secret(&config.secrets.username);
    let password = secrets.secret(&config.secrets.password);

    match (username, password) {
        (Some(username), Some(password)) => Some(Credentials::new(username, password)),
        (username, _) => {
            let missing = if username.is_none() {
                &config.secrets.username
            } else {
                &config.secrets.password
            };
            tracing::warn!(%missing, "Secret not set, the delivery will be refused.");
            None
        }
    }
}

/// Produce the transport configuration of `mode`.
///
/// Nothing is checked here: a missing secret or certificate is carried in the
/// configuration and reported when the message is sent.
#[tracing::instrument(name = "select-transport", skip(config, secrets, store))]
pub fn build_config(
    mode: DeliveryMode,
    config: &Config,
    secrets: &dyn SecretSource,
    store: &dyn TrustStore,
) -> TransportConfig {
    let transport = match mode {
        DeliveryMode::DirectNetwork => TransportConfig::builder(&config.direct_network.host)
            .port(config.direct_network.port)
            .use_tls(true)
            .use_ambient_credentials(false)
            .credentials(credentials_of(config, secrets))
            .build(),

        DeliveryMode::LocalPickup => TransportConfig::builder(PICKUP_HOST)
            .pickup_directory(&config.local_pickup.directory)
            .build(),

        DeliveryMode::MutualTlsNetwork => {
            let field = &config.mutual_tls_network;

            let certificate = CertificateLocator::new(store, field.store)
                .find(&field.thumbprint)
                .unwrap_or_else(|error| {
                    tracing::warn!(%error, "Certificate store unavailable.");
                    None
                });
            if certificate.is_none() {
                tracing::warn!(
                    thumbprint = %field.thumbprint,
                    "No client certificate, the delivery will fail."
                );
            }

            TransportConfig::builder(&field.host)
                .port(field.port)
                .use_tls(true)
                .client_certificate(field.thumbprint, certificate)
                .use_ambient_credentials(true)
                .build()
        }
    };

    tracing::debug!(?transport, "Transport selected.");
    transport
}

#[cfg(test)]
mod tests {
    use super::build_config;
    use crate::{
        certificate::{DirectoryStore, NativeStore},
        Authentication, Credentials, DeliveryMethod,
    };
    use mailprobe_common::{
        DeliveryMode, StoreLocation, StoreName, StoreScope, Thumbprint, SMTP_PORT, SUBMISSION_PORT,
    };
    use mailprobe_config::Config;
    use mailprobe_test::{certs, local_test, test_secrets, TEST_ADDRESS};
    use std::collections::BTreeMap;

    fn fixture_store() -> DirectoryStore {
        DirectoryStore::new(certs::store_path())
    }

    #[test_log::test]
    fn direct_network() {
        let config = Config::default();
        let transport = build_config(
            DeliveryMode::DirectNetwork,
            &config,
            &test_secrets(&config),
            &NativeStore,
        );

        pretty_assertions::assert_eq!(transport.host(), "smtp.gmail.com");
        pretty_assertions::assert_eq!(transport.port(), Some(587));
        pretty_assertions::assert_eq!(transport.delivery_method(), DeliveryMethod::Network);
        assert!(transport.use_tls());
        pretty_assertions::assert_eq!(
            transport.authentication(),
            &Authentication::Credentials(Some(Credentials::new(TEST_ADDRESS, "hunter2")))
        );
        assert!(!transport.authentication().uses_ambient_credentials());
    }

    #[rstest::rstest]
    #[case::none(&[])]
    #[case::username_only(&[("email_username", TEST_ADDRESS)])]
    #[case::password_only(&[("email_password", "hunter2")])]
    fn direct_network_missing_secret(#[case] secrets: &[(&str, &str)]) {
        let secrets = secrets
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<BTreeMap<_, _>>();

        let transport = build_config(
            DeliveryMode::DirectNetwork,
            &Config::default(),
            &secrets,
            &NativeStore,
        );

        pretty_assertions::assert_eq!(transport.authentication(), &Authentication::Credentials(None));
    }

    #[test_log::test]
    fn local_pickup() {
        let config = local_test("/tmp/mailprobe-pickup");
        let transport = build_config(
            DeliveryMode::LocalPickup,
            &config,
            &BTreeMap::new(),
            &NativeStore,
        );

        pretty_assertions::assert_eq!(
            transport.delivery_method(),
            DeliveryMethod::PickupDirectory
        );
        pretty_assertions::assert_eq!(
            transport.pickup_directory(),
            Some(std::path::Path::new("/tmp/mailprobe-pickup"))
        );
        assert!(transport.validate().is_ok());
    }

    #[test_log::test]
    fn local_pickup_does_not_check_the_directory() {
        let config = local_test("/this/directory/does/not/exist");
        let transport = build_config(
            DeliveryMode::LocalPickup,
            &config,
            &BTreeMap::new(),
            &NativeStore,
        );

        assert!(transport.validate().is_ok());
    }

    #[test_log::test]
    fn mutual_tls_found() {
        let mut config = local_test("/tmp");
        config.mutual_tls_network.thumbprint = certs::CLIENT_THUMBPRINT.parse().unwrap();

        let transport = build_config(
            DeliveryMode::MutualTlsNetwork,
            &config,
            &BTreeMap::new(),
            &fixture_store(),
        );

        pretty_assertions::assert_eq!(transport.host(), "Windows-Server");
        pretty_assertions::assert_eq!(transport.port(), Some(25));
        assert!(transport.use_tls());
        assert!(transport.authentication().uses_ambient_credentials());
        match transport.authentication() {
            Authentication::ClientCertificate {
                thumbprint,
                certificate: Some(certificate),
            } => {
                pretty_assertions::assert_eq!(certificate.thumbprint(), thumbprint);
                assert!(certificate.private_key().is_some());
            }
            otherwise => panic!("unexpected authentication: {otherwise:?}"),
        }
    }

    #[test_log::test]
    fn mutual_tls_not_found_is_carried_forward() {
        let config = local_test("/tmp");
        let transport = build_config(
            DeliveryMode::MutualTlsNetwork,
            &config,
            &BTreeMap::new(),
            &fixture_store(),
        );

        pretty_assertions::assert_eq!(
            transport.authentication(),
            &Authentication::ClientCertificate {
                thumbprint: "4197D86EF230F5E475C8458C60523ADD344BB78D"
                    .parse::<Thumbprint>()
                    .unwrap(),
                certificate: None,
            }
        );
    }

    #[test_log::test]
    fn mutual_tls_store_unavailable() {
        let mut config = local_test("/tmp");
        config.mutual_tls_network.thumbprint = certs::CLIENT_THUMBPRINT.parse().unwrap();
        config.mutual_tls_network.store = StoreScope {
            name: StoreName::Personal,
            location: StoreLocation::LocalMachine,
        };

        let transport = build_config(
            DeliveryMode::MutualTlsNetwork,
            &config,
            &BTreeMap::new(),
            &fixture_store(),
        );

        assert!(matches!(
            transport.authentication(),
            Authentication::ClientCertificate {
                certificate: None,
                ..
            }
        ));
    }

    #[rstest::rstest]
    #[case(DeliveryMode::DirectNetwork)]
    #[case(DeliveryMode::LocalPickup)]
    #[case(DeliveryMode::MutualTlsNetwork)]
    fn idempotent(#[case] mode: DeliveryMode) {
        let config = local_test("/tmp");
        let secrets = test_secrets(&config);

        pretty_assertions::assert_eq!(
            build_config(mode, &config, &secrets, &fixture_store()),
            build_config(mode, &config, &secrets, &fixture_store())
        );
    }

    #[rstest::rstest]
    #[case(DeliveryMode::DirectNetwork, Some(SUBMISSION_PORT))]
    #[case(DeliveryMode::LocalPickup, None)]
    #[case(DeliveryMode::MutualTlsNetwork, Some(SMTP_PORT))]
    fn default_ports(#[case] mode: DeliveryMode, #[case] port: Option<u16>) {
        let config = Config::default();
        let transport = build_config(mode, &config, &test_secrets(&config), &fixture_store());

        pretty_assertions::assert_eq!(transport.port(), port);
    }
}
