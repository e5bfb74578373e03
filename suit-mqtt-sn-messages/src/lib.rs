#![cfg_attr(not(test), no_std)]
// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

//! Wire contract for SUIT firmware updates over MQTT-SN.
//!
//! A payload too large for one MQTT-SN message is published below a parent topic:
//!
//! - `<parent>/` carries the ASCII decimal number of blocks
//! - `<parent>/<index>` carries block `index`, `SUIT_MQTT_SN_BLOCKSIZE` bytes except the last
//!
//! The trigger topic carries the parent topic of the manifest, optionally as a `mqtt://` URL.

pub mod config;
pub mod payload;
pub mod publication;
pub mod status;
pub mod topic;

pub use payload::PayloadError;
pub use topic::{Topic, TopicError, TopicKind};
