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

//! Device side of SUIT firmware updates over MQTT-SN.
//!
//! A device subscribes to a trigger topic. A trigger names the parent topic of a manifest,
//! which is fetched blockwise and handed to the manifest parser. The firmware named by the
//! manifest is then fetched the same way and streamed into the inactive boot slot. If the
//! slot header validates, the device reboots into the new image.
//!
//! The transport, manifest parser, image storage and boot slots are provided by the platform
//! through the traits in [`transport`] and [`backend`].

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod fetch;
pub mod firmware;
pub mod gateway;
pub mod manifest;
pub mod session;
pub mod shell;
pub mod status;
pub mod transfer;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::UpdaterConfig;
pub use coordinator::{CoordinatorState, TriggerCoordinator, UpdateOutcome};
pub use error::{ConnectError, SubscribeError, TransportError, UpdateError};
pub use gateway::GatewaySession;
pub use session::UpdateSession;
pub use transport::{GatewayEndpoint, PublishHandler, Transport};
