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

use suit_mqtt_sn_messages::{PayloadError, TopicError};

/// Errors reported by a `Transport` implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The gateway dropped the session, reconnecting may help
    GatewayDisconnected,
    /// The gateway refused the request
    Rejected,
    /// No answer from the gateway
    Timeout,
    /// Topic id table or another transport resource is exhausted
    NoResources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectError {
    Transport(TransportError),
}

impl From<TransportError> for ConnectError {
    fn from(err: TransportError) -> Self {
        ConnectError::Transport(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubscribeError {
    /// The gateway is gone and the single reconnect attempt did not bring it back
    GatewayDisconnected,
    SubscribeFailed(TransportError),
}

impl From<TransportError> for SubscribeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::GatewayDisconnected => SubscribeError::GatewayDisconnected,
            other => SubscribeError::SubscribeFailed(other),
        }
    }
}

/// Everything that can end an update attempt.
///
/// None of these are fatal to the device, the coordinator logs them and waits for the next
/// trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateError {
    TopicTooLong,
    MalformedTopic,
    SubscribeFailed,
    GatewayDisconnected,
    /// Size or trigger payload could not be interpreted
    MalformedPayload,
    /// The manifest does not declare a usable image size
    SizeUnavailable,
    OutOfOrderBlock,
    /// Block larger than the block size, or a short block that is not the last one
    InvalidBlockLength,
    ManifestTooLarge,
    ImageOverrun,
    SizeMismatch,
    StorageWriteFailed,
    ManifestParseFailed,
    /// The manifest has no current component or the component has no URL
    ComponentUnavailable,
    HeaderInvalid,
}

impl From<TopicError> for UpdateError {
    fn from(err: TopicError) -> Self {
        match err {
            TopicError::TopicTooLong => UpdateError::TopicTooLong,
            TopicError::MalformedTopic => UpdateError::MalformedTopic,
        }
    }
}

impl From<PayloadError> for UpdateError {
    fn from(_err: PayloadError) -> Self {
        UpdateError::MalformedPayload
    }
}

impl From<SubscribeError> for UpdateError {
    fn from(err: SubscribeError) -> Self {
        match err {
            SubscribeError::GatewayDisconnected => UpdateError::GatewayDisconnected,
            SubscribeError::SubscribeFailed(_) => UpdateError::SubscribeFailed,
        }
    }
}
