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

mod directory;
mod native;

pub use directory::DirectoryStore;
pub use native::NativeStore;

use mailprobe_common::{StoreScope, Thumbprint};
use mailprobe_config::field::FieldMutualTlsNetwork;

/// Errors produced while opening or enumerating a [`TrustStore`].
///
/// A thumbprint absent from the store is not an error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store does not exist or cannot be read.
    #[error("store '{scope}' cannot be opened: {source}")]
    Open {
        /// The store queried
        scope: StoreScope,
        /// The source of the error
        #[source]
        source: std::io::Error,
    },
    /// The backend does not serve this store.
    #[error("store '{scope}' is not available: {reason}")]
    Unsupported {
        /// The store queried
        scope: StoreScope,
        /// Why the backend cannot serve it
        reason: String,
    },
    /// The store was opened but its listing failed.
    #[error("failed to enumerate store '{scope}': {source}")]
    Enumerate {
        /// The store queried
        scope: StoreScope,
        /// The source of the error
        #[source]
        source: std::io::Error,
    },
}

/// The encoding of a private key, as found in the PEM label.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyFormat {
    /// `PRIVATE KEY`
    Pkcs8,
    /// `RSA PRIVATE KEY`
    Rsa,
    /// `EC PRIVATE KEY`
    Ec,
}

impl KeyFormat {
    const fn pem_tag(self) -> &'static str {
        match self {
            Self::Pkcs8 => "PRIVATE KEY",
            Self::Rsa => "RSA PRIVATE KEY",
            Self::Ec => "EC PRIVATE KEY",
        }
    }
}

/// A DER encoded private key.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    format: KeyFormat,
    der: Vec<u8>,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl PrivateKey {
    /// Wrap the DER encoding of a key.
    #[must_use]
    pub const fn new(format: KeyFormat, der: Vec<u8>) -> Self {
        Self { format, der }
    }

    /// Encoding of the key.
    #[must_use]
    pub const fn format(&self) -> KeyFormat {
        self.format
    }

    /// The key as a PEM document.
    #[must_use]
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem {
            tag: self.format.pem_tag().to_owned(),
            contents: self.der.clone(),
        })
    }
}

/// A certificate read from a [`TrustStore`], with its private key if the
/// store holds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    thumbprint: Thumbprint,
    der: Vec<u8>,
    private_key: Option<PrivateKey>,
}

impl ClientCertificate {
    /// Wrap the DER encoding of a certificate, computing its thumbprint.
    #[must_use]
    pub fn new(der: Vec<u8>, private_key: Option<PrivateKey>) -> Self {
        Self {
            thumbprint: Thumbprint::of_der(&der),
            der,
            private_key,
        }
    }

    ///
    #[must_use]
    pub const fn thumbprint(&self) -> &Thumbprint {
        &self.thumbprint
    }

    /// DER encoding of the certificate.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    ///
    #[must_use]
    pub const fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    /// The certificate as a PEM document.
    #[must_use]
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem {
            tag: "CERTIFICATE".to_owned(),
            contents: self.der.clone(),
        })
    }
}

type Entries<'store> = Box<dyn Iterator<Item = Result<ClientCertificate, StoreError>> + 'store>;

/// An opened store, yielding its entries in the backend order.
///
/// The store is released when the handle is dropped, whatever the way the
/// query ended.
pub struct StoreHandle<'store> {
    scope: StoreScope,
    entries: Entries<'store>,
    on_release: Option<Box<dyn FnOnce() + 'store>>,
}

impl<'store> StoreHandle<'store> {
    /// Hold the entries of the store `scope`.
    pub fn new(
        scope: StoreScope,
        entries: impl Iterator<Item = Result<ClientCertificate, StoreError>> + 'store,
    ) -> Self {
        tracing::trace!(%scope, "Store opened.");
        Self {
            scope,
            entries: Box::new(entries),
            on_release: None,
        }
    }

    /// Run `release` when the handle is dropped.
    #[must_use]
    pub fn on_release(mut self, release: impl FnOnce() + 'store) -> Self {
        self.on_release = Some(Box::new(release));
        self
    }
}

impl Iterator for StoreHandle<'_> {
    type Item = Result<ClientCertificate, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}

impl Drop for StoreHandle<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.on_release.take() {
            release();
        }
        tracing::trace!(scope = %self.scope, "Store released.");
    }
}

/// A source of certificates, opened read-only for each query.
pub trait TrustStore: Send + Sync {
    /// Open the store `scope`.
    ///
    /// # Errors
    ///
    /// * the store does not exist or cannot be read
    /// * the backend does not serve `scope`
    fn open(&self, scope: &StoreScope) -> Result<StoreHandle<'_>, StoreError>;
}

/// The store described by the configuration: a [`DirectoryStore`] if
/// `store_path` is set, the [`NativeStore`] otherwise.
#[must_use]
pub fn store_for(config: &FieldMutualTlsNetwork) -> Box<dyn TrustStore> {
    match &config.store_path {
        Some(path) => Box::new(DirectoryStore::new(path)),
        None => Box::new(NativeStore),
    }
}

/// Find certificates by thumbprint in one store.
pub struct CertificateLocator<'store> {
    store: &'store dyn TrustStore,
    scope: StoreScope,
}

impl<'store> CertificateLocator<'store> {
    ///
    #[must_use]
    pub fn new(store: &'store dyn TrustStore, scope: StoreScope) -> Self {
        Self { store, scope }
    }

    /// Return the first certificate of the store matching `thumbprint`.
    ///
    /// When the store holds duplicates, which one is returned depends on the
    /// enumeration order of the backend.
    ///
    /// # Errors
    ///
    /// * the store cannot be opened or enumerated
    #[tracing::instrument(name = "find-certificate", skip_all, fields(thumbprint = %thumbprint, scope = %self.scope))]
    pub fn find(&self, thumbprint: &Thumbprint) -> Result<Option<ClientCertificate>, StoreError> {
        let mut handle = self.store.open(&self.scope)?;

        for entry in &mut handle {
            let certificate = entry?;
            if certificate.thumbprint() == thumbprint {
                tracing::debug!(
                    with_key = certificate.private_key().is_some(),
                    "Certificate found."
                );
                return Ok(Some(certificate));
            }
        }

        tracing::debug!("Certificate not found.");
        Ok(None)
    }
}
