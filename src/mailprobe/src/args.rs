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

use mailprobe_common::DeliveryMode;

/// Verify that the outbound transports deliver a test message.
#[derive(Debug, clap::Parser, PartialEq, Eq)]
#[command(about, version, author)]
pub struct Args {
    /// Path of the mailprobe configuration file (toml format)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Delivery mode to verify, all of them if missing
    #[arg(short, long)]
    pub mode: Option<DeliveryMode>,

    ///
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommand run instead of the verification
#[derive(Debug, clap::Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Show the loaded config (as serialized json format)
    ConfigShow,
    /// Show the difference between the loaded config and the default one
    ConfigDiff,
}

impl Args {
    /// The modes to verify, in order.
    #[must_use]
    pub fn modes(&self) -> Vec<DeliveryMode> {
        self.mode
            .map_or_else(|| DeliveryMode::ALL.to_vec(), |mode| vec![mode])
    }
}
