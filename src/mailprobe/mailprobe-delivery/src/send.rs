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
    certificate::{ClientCertificate, KeyFormat},
    Authentication, DeliveryMethod, TransportConfig,
};
use lettre::transport::smtp::client::{Identity, Tls, TlsParameters};
use mailprobe_common::{DeliveryFailure, DeliveryOutcome, Thumbprint};

type SmtpTransport = lettre::AsyncSmtpTransport<lettre::Tokio1Executor>;
type SmtpTransportBuilder = lettre::transport::smtp::AsyncSmtpTransportBuilder;
type FileTransport = lettre::AsyncFileTransport<lettre::Tokio1Executor>;

/// A [`TransportConfig`] applied to a `lettre` transport.
enum Transport {
    Smtp(SmtpTransport),
    File(FileTransport),
}

/// TLS settings of a network transport, the client identity included.
struct TlsSettings {
    domain: String,
    identity: Option<(Thumbprint, Identity)>,
}

impl TlsSettings {
    fn parameters(self) -> Result<TlsParameters, DeliveryFailure> {
        let mut parameters = TlsParameters::builder(self.domain);
        if let Some((_, identity)) = self.identity {
            parameters = parameters.identify_with(identity);
        }
        parameters.build().map_err(|error| DeliveryFailure::Tls {
            with_source: Some(error.to_string()),
        })
    }
}

fn identity_of(
    thumbprint: &Thumbprint,
    certificate: &ClientCertificate,
) -> Result<Identity, DeliveryFailure> {
    let private_key = certificate
        .private_key()
        .ok_or_else(|| DeliveryFailure::CertificateNotFound {
            thumbprint: *thumbprint,
            with_source: Some("the certificate has no private key".to_owned()),
        })?;

    // NOTE: lettre only reads identities from PEM, with a PKCS#8 key.
    if private_key.format() != KeyFormat::Pkcs8 {
        return Err(DeliveryFailure::Tls {
            with_source: Some("client identities need a PKCS#8 private key".to_owned()),
        });
    }

    Identity::from_pem(
        certificate.to_pem().as_bytes(),
        private_key.to_pem().as_bytes(),
    )
    .map_err(|error| DeliveryFailure::Tls {
        with_source: Some(error.to_string()),
    })
}

/// Resolve the authentication of `config`, returning the TLS settings when
/// the transport negotiates TLS.
fn authenticate(
    config: &TransportConfig,
    mut builder: SmtpTransportBuilder,
) -> Result<(SmtpTransportBuilder, Option<TlsSettings>), DeliveryFailure> {
    let mut identity = None;
    match config.authentication() {
        Authentication::Credentials(Some(credentials)) => {
            builder = builder.credentials(credentials.to_lettre());
        }
        Authentication::Credentials(None) => {
            return Err(DeliveryFailure::Credential {
                with_source: Some("no username and password provided".to_owned()),
            });
        }
        Authentication::ClientCertificate {
            thumbprint,
            certificate: None,
        } => {
            return Err(DeliveryFailure::CertificateNotFound {
                thumbprint: *thumbprint,
                with_source: None,
            });
        }
        Authentication::ClientCertificate {
            thumbprint,
            certificate: Some(certificate),
        } => {
            if !config.use_tls() {
                return Err(DeliveryFailure::Configuration {
                    reason: "a client certificate requires TLS".to_owned(),
                });
            }
            identity = Some((*thumbprint, identity_of(thumbprint, certificate)?));
        }
        Authentication::Ambient => {}
    }

    let tls = config.use_tls().then(|| TlsSettings {
        domain: config.host().to_owned(),
        identity,
    });
    Ok((builder, tls))
}

fn apply(config: &TransportConfig) -> Result<Transport, DeliveryFailure> {
    config.validate()?;

    if config.delivery_method() == DeliveryMethod::PickupDirectory {
        // validated above
        let directory = config.pickup_directory().unwrap_or(std::path::Path::new(""));
        return Ok(Transport::File(FileTransport::new(directory)));
    }

    let mut builder = SmtpTransport::builder_dangerous(config.host());
    if let Some(port) = config.port() {
        builder = builder.port(port);
    }

    let (mut builder, tls) = authenticate(config, builder)?;
    if let Some(tls) = tls {
        builder = builder.tls(Tls::Required(tls.parameters()?));
    }

    Ok(Transport::Smtp(builder.build()))
}

async fn try_send(config: &TransportConfig, message: lettre::Message) -> Result<(), DeliveryFailure> {
    match apply(config)? {
        Transport::Smtp(transport) => {
            let response = lettre::AsyncTransport::send(&transport, message).await?;
            tracing::debug!(code = %response.code(), "Message accepted by the server.");
        }
        Transport::File(transport) => {
            let id = lettre::AsyncTransport::send(&transport, message).await?;
            tracing::debug!(%id, "Message written in the pickup directory.");
        }
    }
    Ok(())
}

/// Send `message` once with the transport described by `config`.
///
/// Every failure, including an unusable configuration, is reported in the
/// outcome.
#[tracing::instrument(name = "send", skip_all, fields(
    method = %config.delivery_method(),
    host = %config.host(),
))]
pub async fn send(config: &TransportConfig, message: lettre::Message) -> DeliveryOutcome {
    let outcome = DeliveryOutcome::from(try_send(config, message).await);

    match &outcome {
        DeliveryOutcome::Sent => tracing::info!("Send operation successful."),
        DeliveryOutcome::Failed(error) => tracing::warn!(%error, "Send operation failed."),
    }
    outcome
}

/// Same as [`send`], for callers outside of an asynchronous runtime.
///
/// # Panics
///
/// * if called from an asynchronous context
pub fn send_blocking(config: &TransportConfig, message: lettre::Message) -> DeliveryOutcome {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(send(config, message)),
        Err(error) => DeliveryOutcome::Failed(DeliveryFailure::Delivery {
            reply: None,
            with_source: Some(format!("runtime cannot be started: {error}")),
        }),
    }
}

/// A delivery running in the background.
///
/// The completion signal carries an optional failure, `None` meaning sent.
pub struct PendingDelivery {
    completion: tokio::sync::oneshot::Receiver<Option<DeliveryFailure>>,
    task: tokio::task::JoinHandle<()>,
}

impl PendingDelivery {
    /// Abort the delivery. Waiting on it then yields [`DeliveryFailure::Cancelled`],
    /// unless it already completed.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Wait for the completion signal.
    pub async fn wait(self) -> DeliveryOutcome {
        Self::outcome_of(self.completion.await)
    }

    /// Block the current thread until the completion signal fires.
    ///
    /// # Panics
    ///
    /// * if called from an asynchronous context
    #[must_use]
    pub fn blocking_wait(self) -> DeliveryOutcome {
        Self::outcome_of(self.completion.blocking_recv())
    }

    fn outcome_of(
        completion: Result<Option<DeliveryFailure>, tokio::sync::oneshot::error::RecvError>,
    ) -> DeliveryOutcome {
        match completion {
            Ok(None) => DeliveryOutcome::Sent,
            Ok(Some(failure)) => DeliveryOutcome::Failed(failure),
            // the sender was dropped with the task
            Err(_) => DeliveryOutcome::Failed(DeliveryFailure::Cancelled),
        }
    }
}

/// Start sending `message` on `runtime` and return immediately.
pub fn spawn_send(
    runtime: &tokio::runtime::Handle,
    config: TransportConfig,
    message: lettre::Message,
) -> PendingDelivery {
    let (signal, completion) = tokio::sync::oneshot::channel();

    let task = runtime.spawn(async move {
        let failure = match send(&config, message).await {
            DeliveryOutcome::Sent => None,
            DeliveryOutcome::Failed(failure) => Some(failure),
        };
        if signal.send(failure).is_err() {
            tracing::trace!("Nobody is waiting for the delivery.");
        }
    });

    PendingDelivery { completion, task }
}

#[cfg(test)]
mod tests {
    use super::{apply, authenticate, send, send_blocking, spawn_send, SmtpTransport, Transport};
    use crate::{certificate::DirectoryStore, compose, Credentials, SecretSource, TransportConfig};
    use mailprobe_common::{DeliveryFailure, DeliveryMode, DeliveryOutcome, Thumbprint};
    use mailprobe_test::{
        certs, local_test,
        smtp_server::{unreachable_address, MockSmtpServer},
        test_secrets, TEST_ADDRESS,
    };
    use std::collections::BTreeMap;

    fn message() -> lettre::Message {
        compose(&local_test("/tmp"), &BTreeMap::new()).unwrap()
    }

    fn plain(server: &MockSmtpServer) -> crate::TransportConfigBuilder {
        TransportConfig::builder(server.addr().ip().to_string()).port(server.addr().port())
    }

    fn files_in(directory: &std::path::Path) -> usize {
        std::fs::read_dir(directory).unwrap().count()
    }

    #[test_log::test(tokio::test)]
    async fn sent_to_server() {
        let server = MockSmtpServer::builder().build().await.unwrap();
        let config = plain(&server)
            .use_ambient_credentials(false)
            .credentials(Credentials::new(TEST_ADDRESS, "hunter2"))
            .build();

        pretty_assertions::assert_eq!(send(&config, message()).await, DeliveryOutcome::Sent);

        let verbs = server.verbs();
        for expected in ["EHLO", "AUTH", "MAIL", "RCPT", "DATA"] {
            assert!(verbs.iter().any(|verb| verb == expected), "{expected} not in {verbs:?}");
        }
    }

    #[test_log::test(tokio::test)]
    async fn ambient_does_not_authenticate() {
        let server = MockSmtpServer::builder().build().await.unwrap();

        pretty_assertions::assert_eq!(
            send(&plain(&server).build(), message()).await,
            DeliveryOutcome::Sent
        );
        assert!(!server.verbs().iter().any(|verb| verb == "AUTH"));
    }

    #[test_log::test(tokio::test)]
    async fn credentials_rejected() {
        let server = MockSmtpServer::builder()
            .with_auth_response(535, "5.7.8 Authentication credentials invalid")
            .build()
            .await
            .unwrap();
        let config = plain(&server)
            .credentials(Credentials::new(TEST_ADDRESS, "wrong"))
            .build();

        let outcome = send(&config, message()).await;
        assert!(
            matches!(outcome, DeliveryOutcome::Failed(DeliveryFailure::Credential { .. })),
            "{outcome}"
        );
    }

    #[test_log::test(tokio::test)]
    async fn missing_credentials_fail_before_connecting() {
        let server = MockSmtpServer::builder().build().await.unwrap();
        let config = plain(&server).use_ambient_credentials(false).build();

        assert!(matches!(
            send(&config, message()).await,
            DeliveryOutcome::Failed(DeliveryFailure::Credential { .. })
        ));
        assert!(server.commands().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn recipient_rejected() {
        let server = MockSmtpServer::builder()
            .with_rcpt_to_response(550, "5.1.1 No such user")
            .build()
            .await
            .unwrap();

        let outcome = send(&plain(&server).build(), message()).await;
        assert!(
            matches!(
                outcome,
                DeliveryOutcome::Failed(DeliveryFailure::InvalidRecipient { reply: 550, .. })
            ),
            "{outcome}"
        );
    }

    #[test_log::test(tokio::test)]
    async fn sender_mailbox_rejected() {
        let server = MockSmtpServer::builder()
            .with_mail_from_response(553, "5.1.8 Sender address rejected")
            .build()
            .await
            .unwrap();

        let outcome = send(&plain(&server).build(), message()).await;
        match &outcome {
            DeliveryOutcome::Failed(
                failure @ DeliveryFailure::InvalidRecipient { reply: 553, .. },
            ) => {
                assert!(failure.to_string().starts_with("mailbox rejected: 553"), "{failure}");
            }
            otherwise => panic!("unexpected outcome: {otherwise}"),
        }
        assert!(!server.verbs().iter().any(|verb| verb == "RCPT"));
    }

    #[test_log::test(tokio::test)]
    async fn sender_rejected_is_a_delivery_error() {
        let server = MockSmtpServer::builder()
            .with_mail_from_response(451, "4.3.0 Try again later")
            .build()
            .await
            .unwrap();

        assert!(matches!(
            send(&plain(&server).build(), message()).await,
            DeliveryOutcome::Failed(DeliveryFailure::Delivery {
                reply: Some(451),
                ..
            })
        ));
    }

    #[test_log::test(tokio::test)]
    async fn tls_handshake_fails() {
        let server = MockSmtpServer::builder().with_starttls().build().await.unwrap();

        let outcome = send(&plain(&server).use_tls(true).build(), message()).await;
        assert!(
            matches!(
                outcome,
                DeliveryOutcome::Failed(DeliveryFailure::Tls { with_source: Some(_) })
            ),
            "{outcome}"
        );
        assert!(server.verbs().iter().any(|verb| verb == "STARTTLS"));
        assert!(!server.verbs().iter().any(|verb| verb == "MAIL"));
    }

    #[test_log::test(tokio::test)]
    async fn tls_not_offered() {
        let server = MockSmtpServer::builder().build().await.unwrap();

        let outcome = send(&plain(&server).use_tls(true).build(), message()).await;
        match outcome {
            DeliveryOutcome::Failed(DeliveryFailure::Tls {
                with_source: Some(cause),
            }) => assert!(cause.contains("STARTTLS"), "{cause}"),
            otherwise => panic!("unexpected outcome: {otherwise}"),
        }
        assert!(!server.verbs().iter().any(|verb| verb == "MAIL"));
    }

    #[test_log::test(tokio::test)]
    async fn unreachable() {
        let addr = unreachable_address();
        let config = TransportConfig::builder(addr.ip().to_string())
            .port(addr.port())
            .build();

        let outcome = send(&config, message()).await;
        assert!(
            matches!(outcome, DeliveryOutcome::Failed(DeliveryFailure::Unreachable { .. })),
            "{outcome}"
        );
    }

    #[test_log::test(tokio::test)]
    async fn empty_host() {
        assert!(matches!(
            send(&TransportConfig::builder("").build(), message()).await,
            DeliveryOutcome::Failed(DeliveryFailure::Configuration { .. })
        ));
    }

    #[test_log::test(tokio::test)]
    async fn pickup_writes_a_file() {
        let directory = tempfile::tempdir().unwrap();
        let config = TransportConfig::builder("localhost")
            .pickup_directory(directory.path())
            .build();

        pretty_assertions::assert_eq!(send(&config, message()).await, DeliveryOutcome::Sent);
        pretty_assertions::assert_eq!(files_in(directory.path()), 1);
    }

    #[test_log::test(tokio::test)]
    async fn pickup_ignores_network_fields() {
        let directory = tempfile::tempdir().unwrap();
        let config = TransportConfig::builder("")
            .port(1)
            .use_tls(true)
            .use_ambient_credentials(false)
            .pickup_directory(directory.path())
            .build();

        pretty_assertions::assert_eq!(send(&config, message()).await, DeliveryOutcome::Sent);
    }

    #[test_log::test(tokio::test)]
    async fn pickup_directory_missing() {
        let directory = tempfile::tempdir().unwrap();
        let config = TransportConfig::builder("localhost")
            .pickup_directory(directory.path().join("missing"))
            .build();

        assert!(matches!(
            send(&config, message()).await,
            DeliveryOutcome::Failed(DeliveryFailure::Filesystem { .. })
        ));
    }

    #[test_log::test]
    fn blocking_pickup() {
        let directory = tempfile::tempdir().unwrap();
        let config = TransportConfig::builder("localhost")
            .pickup_directory(directory.path())
            .build();

        pretty_assertions::assert_eq!(send_blocking(&config, message()), DeliveryOutcome::Sent);
        pretty_assertions::assert_eq!(files_in(directory.path()), 1);
    }

    #[test_log::test]
    fn blocking_wait_on_a_background_delivery() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let directory = tempfile::tempdir().unwrap();
        let config = TransportConfig::builder("localhost")
            .pickup_directory(directory.path())
            .build();

        let pending = spawn_send(runtime.handle(), config, message());

        pretty_assertions::assert_eq!(pending.blocking_wait(), DeliveryOutcome::Sent);
        pretty_assertions::assert_eq!(files_in(directory.path()), 1);
    }

    #[test_log::test(tokio::test)]
    async fn background_failure_is_signaled() {
        let addr = unreachable_address();
        let config = TransportConfig::builder(addr.ip().to_string())
            .port(addr.port())
            .build();

        let pending = spawn_send(&tokio::runtime::Handle::current(), config, message());
        assert!(matches!(
            pending.wait().await,
            DeliveryOutcome::Failed(DeliveryFailure::Unreachable { .. })
        ));
    }

    #[test_log::test(tokio::test)]
    async fn cancelled() {
        let server = MockSmtpServer::builder().silent().build().await.unwrap();

        let pending = spawn_send(
            &tokio::runtime::Handle::current(),
            plain(&server).build(),
            message(),
        );
        pending.cancel();

        pretty_assertions::assert_eq!(
            pending.wait().await,
            DeliveryOutcome::Failed(DeliveryFailure::Cancelled)
        );
    }

    #[test_log::test(tokio::test)]
    async fn mutual_tls_without_certificate() {
        let config = local_test("/tmp");
        let store = DirectoryStore::new(certs::store_path());
        let transport =
            crate::build_config(DeliveryMode::MutualTlsNetwork, &config, &BTreeMap::new(), &store);

        pretty_assertions::assert_eq!(
            send(&transport, message()).await,
            DeliveryOutcome::Failed(DeliveryFailure::CertificateNotFound {
                thumbprint: config.mutual_tls_network.thumbprint,
                with_source: None,
            })
        );
    }

    #[test_log::test(tokio::test)]
    async fn mutual_tls_certificate_without_private_key() {
        let mut config = local_test("/tmp");
        config.mutual_tls_network.thumbprint = certs::OTHER_THUMBPRINT.parse().unwrap();
        let store = DirectoryStore::new(certs::store_path());
        let transport =
            crate::build_config(DeliveryMode::MutualTlsNetwork, &config, &BTreeMap::new(), &store);

        let outcome = send(&transport, message()).await;
        match outcome {
            DeliveryOutcome::Failed(DeliveryFailure::CertificateNotFound {
                thumbprint,
                with_source: Some(_),
            }) => {
                pretty_assertions::assert_eq!(
                    thumbprint,
                    certs::OTHER_THUMBPRINT.parse::<Thumbprint>().unwrap()
                );
            }
            otherwise => panic!("unexpected outcome: {otherwise}"),
        }
    }

    fn mutual_tls(store: mailprobe_common::StoreScope) -> TransportConfig {
        let mut config = local_test("/tmp");
        config.mutual_tls_network.thumbprint = certs::CLIENT_THUMBPRINT.parse().unwrap();
        config.mutual_tls_network.store = store;
        let store = DirectoryStore::new(certs::store_path());
        crate::build_config(DeliveryMode::MutualTlsNetwork, &config, &BTreeMap::new(), &store)
    }

    #[test_log::test]
    fn mutual_tls_identity_is_applied() {
        let transport = mutual_tls(mailprobe_common::StoreScope::default());

        let (_, tls) =
            authenticate(&transport, SmtpTransport::builder_dangerous(transport.host())).unwrap();
        let tls = tls.unwrap();
        pretty_assertions::assert_eq!(tls.domain, transport.host());
        pretty_assertions::assert_eq!(
            tls.identity.as_ref().map(|(thumbprint, _)| thumbprint.to_string()),
            Some(certs::CLIENT_THUMBPRINT.to_owned())
        );
        assert!(tls.parameters().is_ok());

        assert!(matches!(apply(&transport), Ok(Transport::Smtp(_))));
    }

    #[test_log::test]
    fn mutual_tls_rsa_key_is_refused() {
        let transport = mutual_tls(mailprobe_common::StoreScope {
            name: mailprobe_common::StoreName::Personal,
            location: mailprobe_common::StoreLocation::CurrentUser,
        });

        assert!(matches!(
            apply(&transport),
            Err(DeliveryFailure::Tls { with_source: Some(reason) }) if reason.contains("PKCS#8")
        ));
    }

    #[test_log::test]
    fn plain_network_has_no_tls_settings() {
        let config = TransportConfig::builder("localhost").build();

        let (_, tls) =
            authenticate(&config, SmtpTransport::builder_dangerous("localhost")).unwrap();
        assert!(tls.is_none());
    }

    #[test_log::test]
    fn direct_network_is_applied() {
        let config = local_test("/tmp");
        let secrets = test_secrets(&config);
        assert!(secrets.secret(&config.secrets.password).is_some());

        let transport = crate::build_config(
            DeliveryMode::DirectNetwork,
            &config,
            &secrets,
            &crate::certificate::NativeStore,
        );
        assert!(matches!(apply(&transport), Ok(Transport::Smtp(_))));
    }
}
