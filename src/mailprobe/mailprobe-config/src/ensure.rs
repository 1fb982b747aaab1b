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

use crate::Config;

impl Config {
    pub(crate) fn ensure(config: Self) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !config.direct_network.host.trim().is_empty(),
            "`direct_network.host` cannot be empty"
        );
        anyhow::ensure!(
            !config.mutual_tls_network.host.trim().is_empty(),
            "`mutual_tls_network.host` cannot be empty"
        );
        anyhow::ensure!(
            config.direct_network.port != 0 && config.mutual_tls_network.port != 0,
            "ports cannot be set to 0"
        );
        anyhow::ensure!(
            !config.local_pickup.directory.as_os_str().is_empty(),
            "`local_pickup.directory` cannot be empty"
        );
        anyhow::ensure!(
            !config.secrets.username.is_empty() && !config.secrets.password.is_empty(),
            "secret variable names cannot be empty"
        );

        Ok(config)
    }
}
