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

/// The named delivery configurations a transport can be built for.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    /// Submission to a public SMTP provider, STARTTLS and username/password.
    DirectNetwork,
    /// No network: the message is written into a local pickup directory.
    LocalPickup,
    /// A private SMTP server authenticating the client with its certificate.
    MutualTlsNetwork,
}

impl DeliveryMode {
    /// Every mode, in the order they are verified when none is selected.
    pub const ALL: [Self; 3] = [Self::DirectNetwork, Self::LocalPickup, Self::MutualTlsNetwork];
}

#[cfg(test)]
mod tests {
    use super::DeliveryMode;

    #[rstest::rstest]
    #[case("direct-network", DeliveryMode::DirectNetwork)]
    #[case("local-pickup", DeliveryMode::LocalPickup)]
    #[case("mutual-tls-network", DeliveryMode::MutualTlsNetwork)]
    fn parse_and_display(#[case] input: &str, #[case] expected: DeliveryMode) {
        let mode = input.parse::<DeliveryMode>().unwrap();
        assert_eq!(mode, expected);
        assert_eq!(mode.to_string(), input);
    }

    #[test]
    fn unknown_mode() {
        "gmail".parse::<DeliveryMode>().unwrap_err();
    }

    #[test]
    fn serde_uses_kebab_case() {
        assert_eq!(
            serde_json::to_string(&DeliveryMode::MutualTlsNetwork).unwrap(),
            r#""mutual-tls-network""#
        );
    }
}
