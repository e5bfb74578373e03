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

//! State shared between the transport's receive context and the update coordinator.
//!
//! The receive side only ever runs the short `on_publish` path: it validates the publish,
//! updates the transfer book keeping under a blocking mutex and posts an event. Everything
//! that can block (subscribing, storage writes, parsing) happens on the coordinator side.

use crate::error::UpdateError;
use crate::events::{UpdateEvent, UpdateEvents};
use crate::firmware::FirmwareBlockReceiver;
use crate::manifest::ManifestAssembler;
use crate::transfer::TransferState;
use crate::transport::PublishHandler;
use core::cell::RefCell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use log::{debug, info, trace, warn};
use suit_mqtt_sn_messages::config::{SUIT_MANIFEST_BUFSIZE, SUIT_MQTT_SN_BLOCKSIZE};
use suit_mqtt_sn_messages::payload::{parse_block_count, parse_topic_url};
use suit_mqtt_sn_messages::topic::classify_subtopic;
use suit_mqtt_sn_messages::{Topic, TopicKind};

/// What the active transfer will accept next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Awaiting {
    Size,
    Block(u32),
}

struct ActiveTransfer {
    handler: PublishHandler,
    parent: Topic,
    awaiting: Awaiting,
}

struct SessionState {
    pending_trigger: Option<Topic>,
    active: Option<ActiveTransfer>,
    manifest: ManifestAssembler,
    firmware: FirmwareBlockReceiver,
    error: Option<UpdateError>,
}

impl SessionState {
    const fn new() -> Self {
        Self {
            pending_trigger: None,
            active: None,
            manifest: ManifestAssembler::new(),
            firmware: FirmwareBlockReceiver::new(),
            error: None,
        }
    }

    fn transfer(&self, handler: PublishHandler) -> TransferState {
        match handler {
            PublishHandler::Manifest => *self.manifest.transfer(),
            PublishHandler::Firmware => *self.firmware.transfer(),
            PublishHandler::Trigger => TransferState::new(),
        }
    }

    fn discard(&mut self) {
        self.active = None;
        self.manifest.discard();
        self.firmware.discard();
    }

    fn on_trigger(&mut self, payload: &[u8]) -> Option<UpdateEvent> {
        match parse_topic_url(payload) {
            Ok(topic) => {
                info!("Trigger received, manifest at '{}'", topic);
                self.pending_trigger = Some(topic);
                Some(UpdateEvent::Trigger)
            }
            Err(e) => {
                warn!("Ignoring trigger: {:?}", e);
                None
            }
        }
    }

    fn on_transfer_publish(
        &mut self,
        handler: PublishHandler,
        topic: &str,
        payload: &[u8],
    ) -> Option<UpdateEvent> {
        let SessionState {
            active,
            manifest,
            firmware,
            error,
            ..
        } = self;

        let Some(active) = active.as_mut().filter(|a| a.handler == handler) else {
            debug!("No {:?} transfer active, dropping publish on '{}'", handler, topic);
            return None;
        };

        let kind = match classify_subtopic(&active.parent, topic) {
            None => {
                debug!("Dropping publish on unrelated topic '{}'", topic);
                return None;
            }
            Some(Err(e)) => {
                *error = Some(e.into());
                return Some(UpdateEvent::BlockError);
            }
            Some(Ok(kind)) => kind,
        };

        let result = match kind {
            TopicKind::Size => {
                if active.awaiting != Awaiting::Size {
                    debug!("Ignoring repeated size publish on '{}'", topic);
                    return None;
                }
                parse_block_count(payload)
                    .map_err(UpdateError::from)
                    .and_then(|num_blocks| {
                        trace!("'{}' has {} blocks", active.parent, num_blocks);
                        match handler {
                            PublishHandler::Manifest => manifest.on_size(num_blocks),
                            _ => {
                                firmware.on_size(num_blocks);
                                Ok(())
                            }
                        }
                    })
            }
            TopicKind::Block(index) => {
                trace!("Block {} on '{}', {} bytes", index, topic, payload.len());
                match handler {
                    PublishHandler::Manifest => manifest.on_block(index, payload),
                    _ => firmware.on_block(index, payload),
                }
            }
        };

        match result {
            Ok(()) => Some(UpdateEvent::BlockReceived),
            Err(e) => {
                warn!("Publish on '{}' rejected: {:?}", topic, e);
                *error = Some(e);
                Some(UpdateEvent::BlockError)
            }
        }
    }
}

/// Receive context of the updater.
///
/// Intended to live in a `static`, the transport calls `on_publish` and the coordinator
/// drives the rest.
pub struct UpdateSession<M: RawMutex> {
    events: UpdateEvents<M>,
    state: Mutex<M, RefCell<SessionState>>,
}

impl<M: RawMutex> UpdateSession<M> {
    pub const fn new() -> Self {
        Self {
            events: UpdateEvents::new(),
            state: Mutex::new(RefCell::new(SessionState::new())),
        }
    }

    pub fn events(&self) -> &UpdateEvents<M> {
        &self.events
    }

    /// Entry point for every PUBLISH the transport receives.
    pub fn on_publish(&self, handler: PublishHandler, topic: &str, payload: &[u8]) {
        let event = self.state.lock(|state| {
            let mut state = state.borrow_mut();
            match handler {
                PublishHandler::Trigger => state.on_trigger(payload),
                PublishHandler::Manifest | PublishHandler::Firmware => {
                    state.on_transfer_publish(handler, topic, payload)
                }
            }
        });

        if let Some(event) = event {
            self.events.post(event);
        }
    }

    /// Starts an update from a locally supplied manifest URL, as if it arrived on the
    /// trigger topic.
    pub fn trigger(&self, url: &[u8]) {
        self.on_publish(PublishHandler::Trigger, "", url);
    }

    pub fn has_pending_trigger(&self) -> bool {
        self.state.lock(|state| state.borrow().pending_trigger.is_some())
    }

    /// Takes the manifest topic of the latest trigger.
    ///
    /// The trigger event is cleared before the slot is read, so a trigger landing in between
    /// leaves both the event and the slot set.
    pub fn take_trigger(&self) -> Option<Topic> {
        self.events.clear(UpdateEvent::Trigger);
        self.state
            .lock(|state| state.borrow_mut().pending_trigger.take())
    }

    /// Opens a transfer below `parent`, publishes for other parents or handlers are dropped.
    pub fn begin_transfer(&self, handler: PublishHandler, parent: &Topic) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.discard();
            state.error = None;
            state.active = Some(ActiveTransfer {
                handler,
                parent: parent.clone(),
                awaiting: Awaiting::Size,
            });
        });
        self.events.clear(UpdateEvent::BlockReceived);
        self.events.clear(UpdateEvent::BlockError);
    }

    pub fn await_block(&self, index: u32) {
        self.state.lock(|state| {
            if let Some(active) = state.borrow_mut().active.as_mut() {
                active.awaiting = Awaiting::Block(index);
            }
        });
    }

    /// Stops accepting publishes, keeping whatever was received.
    pub fn close_transfer(&self) {
        self.state.lock(|state| state.borrow_mut().active = None);
    }

    /// Stops accepting publishes and drops whatever was received.
    pub fn discard_transfer(&self) {
        self.state.lock(|state| state.borrow_mut().discard());
    }

    pub fn transfer_state(&self, handler: PublishHandler) -> TransferState {
        self.state.lock(|state| state.borrow().transfer(handler))
    }

    pub fn take_error(&self) -> Option<UpdateError> {
        self.state.lock(|state| state.borrow_mut().error.take())
    }

    /// Copies the most recently accepted block of `handler`'s transfer into `block`.
    ///
    /// Returns the block index and length.
    pub fn copy_last_block(
        &self,
        handler: PublishHandler,
        block: &mut [u8; SUIT_MQTT_SN_BLOCKSIZE],
    ) -> Option<(u32, usize)> {
        self.state.lock(|state| {
            let state = state.borrow();
            let (index, data) = match handler {
                PublishHandler::Manifest => state.manifest.last_block(),
                PublishHandler::Firmware => state.firmware.last_block(),
                PublishHandler::Trigger => None,
            }?;
            block.get_mut(..data.len())?.copy_from_slice(data);
            Some((index, data.len()))
        })
    }

    /// Copies the complete manifest into `out`.
    pub fn copy_manifest(
        &self,
        out: &mut heapless::Vec<u8, SUIT_MANIFEST_BUFSIZE>,
    ) -> Result<(), UpdateError> {
        self.state.lock(|state| {
            let state = state.borrow();
            let manifest = state
                .manifest
                .assembled()
                .ok_or(UpdateError::ManifestParseFailed)?;
            out.clear();
            out.extend_from_slice(manifest)
                .map_err(|_| UpdateError::ManifestTooLarge)
        })
    }
}

impl<M: RawMutex> Default for UpdateSession<M> {
    fn default() -> Self {
        Self::new()
    }
}
