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

use anyhow::Context;
use mailprobe_config::Config;

#[cfg(debug_assertions)]
macro_rules! get_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(true)
            .with_ansi(false)
    };
}

#[cfg(not(debug_assertions))]
macro_rules! get_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_thread_ids(false)
            .with_target(false)
            .with_ansi(false)
    };
}

fn env_filter(config: &Config) -> tracing_subscriber::EnvFilter {
    let mut e = tracing_subscriber::EnvFilter::default();
    for i in &config.logs.level {
        e = e.add_directive(i.clone());
    }
    e
}

/// Initialize the tracing subsystem.
///
/// Events are written to stderr, and appended to `logs.filepath` if set.
///
/// # Errors
///
/// * The logs path in the configuration file is invalid.
/// * Failed to initialize the tracing subsystem.
pub fn initialize(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

    let file = match &config.logs.filepath {
        Some(filepath) => {
            let directory = filepath
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let filename = filepath
                .file_name()
                .with_context(|| format!("`logs.filepath` '{}' is not a file", filepath.display()))?;

            std::fs::create_dir_all(directory).with_context(|| {
                format!("Cannot create `logs` directory '{}'", directory.display())
            })?;

            Some(
                get_fmt!()
                    .with_writer(tracing_appender::rolling::never(directory, filename))
                    .with_filter(env_filter(config)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            get_fmt!()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_filter(env_filter(config)),
        )
        .with(file)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))
}
