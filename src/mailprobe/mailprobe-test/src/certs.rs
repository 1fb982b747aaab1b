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

/// Thumbprint of `template/certs/client.crt`, stored with its key.
pub const CLIENT_THUMBPRINT: &str = "5B00EC7A6BAA4020C8D5B9B83792D6B54C88B8A3";

/// Thumbprint of `template/certs/other.crt`, stored without key.
pub const OTHER_THUMBPRINT: &str = "9F8DF245D18738A05FFB4AEC1D4A3ACE97BFD908";

/// PEM of the client certificate.
pub const CLIENT_CERTIFICATE: &str = include_str!("template/certs/client.crt");

/// PEM of the client private key, PKCS#8.
pub const CLIENT_KEY: &str = include_str!("template/certs/client.key");

/// PEM of the other certificate.
pub const OTHER_CERTIFICATE: &str = include_str!("template/certs/other.crt");

/// Base of the fixture directory store.
///
/// * `local-machine/root` holds the client certificate and its key, the other
///   certificate, a text file and a corrupted PEM file
/// * `current-user/personal` holds the client certificate twice, with an RSA key
/// * `local-machine/personal` does not exist
#[must_use]
pub fn store_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("src/template/store")
}

fn der_of(certificate: &str) -> Vec<u8> {
    pem::parse(certificate).unwrap().contents
}

/// DER encoding of the client certificate.
#[must_use]
pub fn client_certificate_der() -> Vec<u8> {
    der_of(CLIENT_CERTIFICATE)
}

/// DER encoding of the other certificate.
#[must_use]
pub fn other_certificate_der() -> Vec<u8> {
    der_of(OTHER_CERTIFICATE)
}
