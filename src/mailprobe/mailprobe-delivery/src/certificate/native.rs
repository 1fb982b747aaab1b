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

use super::{ClientCertificate, StoreError, StoreHandle, TrustStore};
use mailprobe_common::{StoreName, StoreScope};

/// The root certificates trusted by the operating system.
///
/// The platform stores are opened through `rustls-native-certs`, which merges
/// the machine and user roots: both locations of the `root` store serve the
/// same entries. No private key is ever returned.
#[derive(Debug, Default, Copy, Clone)]
pub struct NativeStore;

impl TrustStore for NativeStore {
    fn open(&self, scope: &StoreScope) -> Result<StoreHandle<'_>, StoreError> {
        if scope.name != StoreName::Root {
            return Err(StoreError::Unsupported {
                scope: *scope,
                reason: "the native store only serves root certificates".to_owned(),
            });
        }

        let certificates =
            rustls_native_certs::load_native_certs().map_err(|source| StoreError::Open {
                scope: *scope,
                source,
            })?;
        tracing::debug!(count = certificates.len(), "Native certificates loaded.");

        Ok(StoreHandle::new(
            *scope,
            certificates
                .into_iter()
                .map(|certificate| Ok(ClientCertificate::new(certificate.0, None))),
        ))
    }
}
