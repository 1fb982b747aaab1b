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

//! mailprobe shared types

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]

mod mode;
mod scope;
mod thumbprint;

/// Result of a delivery attempt and its failure taxonomy.
pub mod outcome;

pub use mode::DeliveryMode;
pub use outcome::{DeliveryFailure, DeliveryOutcome};
pub use scope::{StoreLocation, StoreName, StoreScope};
pub use thumbprint::{Thumbprint, ThumbprintError};

/// The default port of the SMTP protocol, used when a transport has no port.
pub const SMTP_PORT: u16 = 25;

/// The port of the message submission protocol.
pub const SUBMISSION_PORT: u16 = 587;
