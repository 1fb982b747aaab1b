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

const THUMBPRINT_LEN: usize = 20;

/// SHA-1 fingerprint of the DER encoding of a certificate.
///
/// Parsed from 40 hexadecimal digits, in any case. The `:` and whitespace
/// separators printed by most tools are ignored, so
/// `5b:00:ec:7a:...` and `5B00EC7A...` are the same thumbprint.
/// Always displayed in upper case without separator.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, serde_with::DeserializeFromStr, serde_with::SerializeDisplay,
)]
pub struct Thumbprint([u8; THUMBPRINT_LEN]);

/// Errors produced when parsing a [`Thumbprint`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThumbprintError {
    /// Wrong number of digits.
    #[error("a thumbprint has 40 hexadecimal digits, got {0}")]
    Length(usize),
    /// Something else than a digit or a separator.
    #[error("invalid character '{0}' in thumbprint")]
    NotHex(char),
}

impl Thumbprint {
    /// Compute the thumbprint of a DER encoded certificate.
    #[must_use]
    pub fn of_der(der: &[u8]) -> Self {
        let digest = <sha1::Sha1 as sha1::Digest>::digest(der);

        let mut out = [0; THUMBPRINT_LEN];
        out.copy_from_slice(&digest);
        Self(out)
    }
}

impl std::str::FromStr for Thumbprint {
    type Err = ThumbprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .chars()
            .filter(|c| *c != ':' && !c.is_whitespace())
            .map(|c| {
                c.to_digit(16)
                    .and_then(|d| u8::try_from(d).ok())
                    .ok_or(ThumbprintError::NotHex(c))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if digits.len() != THUMBPRINT_LEN * 2 {
            return Err(ThumbprintError::Length(digits.len()));
        }

        let mut out = [0; THUMBPRINT_LEN];
        for (byte, pair) in out.iter_mut().zip(digits.chunks_exact(2)) {
            *byte = (pair[0] << 4) | pair[1];
        }
        Ok(Self(out))
    }
}

impl std::fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02X}"))
    }
}

impl std::fmt::Debug for Thumbprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Thumbprint").field(&self.to_string()).finish()
    }
}
