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

//! The update control loop.
//!
//! ```text
//! WaitTrigger -> FetchingManifest -> FetchingFirmware -> Validating -> Rebooting
//! ```
//!
//! Any failure or abort goes back to `WaitTrigger`. Blocks already written to storage stay
//! where they are, the next update overwrites them.

use crate::backend::{BootSlots, FirmwareStorage, Manifest, ManifestComponent, ManifestParser};
use crate::error::UpdateError;
use crate::fetch::{BlockwiseFetch, Interrupted};
use crate::firmware::FirmwareStreamWriter;
use crate::gateway::GatewaySession;
use crate::manifest::ManifestSink;
use crate::session::UpdateSession;
use crate::transport::{PublishHandler, Transport};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use log::{debug, error, info, warn};
use suit_mqtt_sn_messages::Topic;
use suit_mqtt_sn_messages::config::SUIT_MANIFEST_BUFSIZE;
use suit_mqtt_sn_messages::payload::parse_topic_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoordinatorState {
    WaitTrigger,
    FetchingManifest,
    FetchingFirmware,
    Validating,
    Rebooting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateOutcome {
    /// The new image validated and the device was restarted into it
    Rebooted,
    /// A newer trigger replaced this update
    Aborted,
    Failed(UpdateError),
}

pub struct TriggerCoordinator<'a, M, T, P, S, B>
where
    M: RawMutex,
    T: Transport,
    P: ManifestParser,
    S: FirmwareStorage<P::Manifest>,
    B: BootSlots,
{
    session: &'a UpdateSession<M>,
    fetch: BlockwiseFetch<'a, M, T>,
    parser: P,
    storage: S,
    boot: B,
    /// Manifest copied out of the session. The parser runs outside the session lock so
    /// publishes can still be received while it works.
    manifest: heapless::Vec<u8, SUIT_MANIFEST_BUFSIZE>,
    state: CoordinatorState,
}

impl<'a, M, T, P, S, B> TriggerCoordinator<'a, M, T, P, S, B>
where
    M: RawMutex,
    T: Transport,
    P: ManifestParser,
    S: FirmwareStorage<P::Manifest>,
    B: BootSlots,
{
    pub fn new(
        session: &'a UpdateSession<M>,
        gateway: &'a Mutex<M, GatewaySession<T>>,
        parser: P,
        storage: S,
        boot: B,
    ) -> Self {
        Self {
            session,
            fetch: BlockwiseFetch::new(session, gateway),
            parser,
            storage,
            boot,
            manifest: heapless::Vec::new(),
            state: CoordinatorState::WaitTrigger,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn boot(&self) -> &B {
        &self.boot
    }

    fn set_state(&mut self, state: CoordinatorState) {
        if self.state != state {
            debug!("Coordinator {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Waits for the next trigger. A trigger that is already pending is returned at once.
    pub async fn wait_for_trigger(&mut self) -> Topic {
        self.set_state(CoordinatorState::WaitTrigger);
        loop {
            if let Some(topic) = self.session.take_trigger() {
                return topic;
            }
            // Block events left over from an aborted transfer land here and are dropped
            let _ = self.session.events().wait().await;
        }
    }

    /// Runs one update for the manifest below `manifest_topic`.
    pub async fn process_trigger(&mut self, manifest_topic: &Topic) -> UpdateOutcome {
        info!("Starting update from {}", manifest_topic);
        let outcome = match self.update(manifest_topic).await {
            Ok(()) => UpdateOutcome::Rebooted,
            Err(Interrupted::Aborted) => {
                warn!("Update from {} aborted by a new trigger", manifest_topic);
                UpdateOutcome::Aborted
            }
            Err(Interrupted::Failed(e)) => {
                error!("Update from {} failed: {:?}", manifest_topic, e);
                UpdateOutcome::Failed(e)
            }
        };

        if outcome != UpdateOutcome::Rebooted {
            self.set_state(CoordinatorState::WaitTrigger);
        }
        outcome
    }

    /// Waits for a trigger and runs one update.
    pub async fn step(&mut self) -> UpdateOutcome {
        let manifest_topic = self.wait_for_trigger().await;
        self.process_trigger(&manifest_topic).await
    }

    pub async fn run(&mut self) -> ! {
        info!("Waiting for update triggers");
        loop {
            self.step().await;
        }
    }

    async fn update(&mut self, manifest_topic: &Topic) -> Result<(), Interrupted> {
        self.set_state(CoordinatorState::FetchingManifest);
        self.fetch
            .start(manifest_topic, PublishHandler::Manifest, &mut ManifestSink)
            .await
            .into_result()?;

        self.session.copy_manifest(&mut self.manifest)?;
        info!("Manifest fetched, {} bytes", self.manifest.len());
        let manifest = self
            .parser
            .parse(&self.manifest, manifest_topic.as_str())
            .map_err(|e| {
                error!("Manifest parsing failed: {:?}", e);
                UpdateError::ManifestParseFailed
            })?;

        let firmware_url = manifest
            .current_component()
            .and_then(|component| component.uri())
            .ok_or(UpdateError::ComponentUnavailable)?;
        let firmware_topic = parse_topic_url(firmware_url.as_bytes()).map_err(UpdateError::from)?;

        self.set_state(CoordinatorState::FetchingFirmware);
        let mut writer = FirmwareStreamWriter::new(&manifest, &mut self.storage);
        self.fetch
            .start(&firmware_topic, PublishHandler::Firmware, &mut writer)
            .await
            .into_result()?;
        if !writer.is_finished() {
            error!("Firmware fetch ended without finalising the image");
            return Err(UpdateError::SizeMismatch.into());
        }

        self.set_state(CoordinatorState::Validating);
        self.validate_other_slot()?;

        self.set_state(CoordinatorState::Rebooting);
        info!("Update complete, rebooting");
        self.boot.reboot();
        Ok(())
    }

    fn validate_other_slot(&self) -> Result<(), UpdateError> {
        let slot = self.boot.other_slot();
        let Some(header) = self.boot.header(slot) else {
            error!("Slot {} has no header", slot);
            return Err(UpdateError::HeaderInvalid);
        };

        info!("Slot {} header: {:?}", slot, header);
        if !self.boot.validate_header(&header) {
            error!("Slot {} header is invalid, staying on the current image", slot);
            return Err(UpdateError::HeaderInvalid);
        }
        Ok(())
    }
}
