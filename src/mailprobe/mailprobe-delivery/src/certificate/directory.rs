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

use super::{ClientCertificate, KeyFormat, PrivateKey, StoreError, StoreHandle, TrustStore};
use mailprobe_common::StoreScope;

/// A certificate store laid out on disk as `<base>/<location>/<name>/`.
///
/// Every regular file of the store directory is read as PEM. A file holds one
/// certificate, optionally followed by its private key. Files without a
/// certificate are ignored, unreadable ones are logged and skipped.
/// Entries are yielded in the order of the directory listing.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    base: std::path::PathBuf,
}

impl DirectoryStore {
    ///
    #[must_use]
    pub fn new(base: impl Into<std::path::PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The directory of the store `scope`.
    #[must_use]
    pub fn path_of(&self, scope: &StoreScope) -> std::path::PathBuf {
        self.base
            .join(scope.location.to_string())
            .join(scope.name.to_string())
    }
}

fn read_entry(path: &std::path::Path) -> std::io::Result<Option<ClientCertificate>> {
    let mut reader = std::io::BufReader::new(std::fs::File::open(path)?);

    let mut certificate = None;
    let mut private_key = None;

    for item in rustls_pemfile::read_all(&mut reader)? {
        let key = match item {
            rustls_pemfile::Item::X509Certificate(der) => {
                if certificate.is_none() {
                    certificate = Some(der);
                }
                continue;
            }
            rustls_pemfile::Item::PKCS8Key(der) => PrivateKey::new(KeyFormat::Pkcs8, der),
            rustls_pemfile::Item::RSAKey(der) => PrivateKey::new(KeyFormat::Rsa, der),
            rustls_pemfile::Item::ECKey(der) => PrivateKey::new(KeyFormat::Ec, der),
            _ => continue,
        };
        if private_key.is_none() {
            private_key = Some(key);
        }
    }

    Ok(certificate.map(|der| ClientCertificate::new(der, private_key)))
}

impl TrustStore for DirectoryStore {
    fn open(&self, scope: &StoreScope) -> Result<StoreHandle<'_>, StoreError> {
        let scope = *scope;
        let directory = self.path_of(&scope);

        let listing = std::fs::read_dir(&directory)
            .map_err(|source| StoreError::Open { scope, source })?;
        tracing::debug!(directory = %directory.display(), "Store directory opened.");

        Ok(StoreHandle::new(
            scope,
            listing.filter_map(move |entry| {
                let path = match entry {
                    Ok(entry) => entry.path(),
                    Err(source) => return Some(Err(StoreError::Enumerate { scope, source })),
                };
                if !path.is_file() {
                    return None;
                }

                match read_entry(&path) {
                    Ok(certificate) => certificate.map(Ok),
                    Err(error) => {
                        tracing::warn!(path = %path.display(), %error, "Skipping unreadable store entry.");
                        None
                    }
                }
            }),
        ))
    }
}
