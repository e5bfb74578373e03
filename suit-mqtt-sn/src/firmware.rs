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

use crate::backend::{FirmwareStorage, Manifest, ManifestComponent};
use crate::error::UpdateError;
use crate::fetch::BlockSink;
use crate::transfer::TransferState;
use log::{debug, error, info};
use suit_mqtt_sn_messages::config::SUIT_MQTT_SN_BLOCKSIZE;
use suit_mqtt_sn_messages::payload::decode_image_size;

/// Receive side of a firmware transfer. Holds only the latest block, the image goes straight
/// to storage.
pub struct FirmwareBlockReceiver {
    transfer: TransferState,
    block: [u8; SUIT_MQTT_SN_BLOCKSIZE],
}

impl FirmwareBlockReceiver {
    pub const fn new() -> Self {
        Self {
            transfer: TransferState::new(),
            block: [0u8; SUIT_MQTT_SN_BLOCKSIZE],
        }
    }

    pub fn transfer(&self) -> &TransferState {
        &self.transfer
    }

    pub fn discard(&mut self) {
        self.transfer = TransferState::new();
    }

    pub fn on_size(&mut self, num_blocks_total: u32) {
        self.transfer.reset(num_blocks_total);
    }

    pub fn on_block(&mut self, index: u32, payload: &[u8]) -> Result<(), UpdateError> {
        self.transfer.accept(index, payload.len())?;
        self.block
            .get_mut(..payload.len())
            .ok_or(UpdateError::InvalidBlockLength)?
            .copy_from_slice(payload);
        Ok(())
    }

    /// The most recently accepted block and its index.
    pub fn last_block(&self) -> Option<(u32, &[u8])> {
        let index = self.transfer.num_blocks_rcvd.checked_sub(1)?;
        Some((index, self.block.get(..self.transfer.current_block_len)?))
    }
}

impl Default for FirmwareBlockReceiver {
    fn default() -> Self {
        Self::new()
    }
}

/// Streams firmware blocks into storage at `index * SUIT_MQTT_SN_BLOCKSIZE`, checking them
/// against the image size the manifest declares.
pub struct FirmwareStreamWriter<'a, Mf: Manifest, S: FirmwareStorage<Mf>> {
    manifest: &'a Mf,
    storage: &'a mut S,
    finished: bool,
}

impl<'a, Mf: Manifest, S: FirmwareStorage<Mf>> FirmwareStreamWriter<'a, Mf, S> {
    pub fn new(manifest: &'a Mf, storage: &'a mut S) -> Self {
        Self {
            manifest,
            storage,
            finished: false,
        }
    }

    /// Whether the storage has been finalised for this image.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<Mf: Manifest, S: FirmwareStorage<Mf>> BlockSink for FirmwareStreamWriter<'_, Mf, S> {
    async fn accept_block(
        &mut self,
        index: u32,
        data: &[u8],
        transfer: &TransferState,
    ) -> Result<(), UpdateError> {
        let component = self
            .manifest
            .current_component()
            .ok_or(UpdateError::ComponentUnavailable)?;
        let image_size = component
            .image_size_param()
            .and_then(decode_image_size)
            .ok_or(UpdateError::SizeUnavailable)? as usize;

        let offset = index as usize * SUIT_MQTT_SN_BLOCKSIZE;
        let end = offset + data.len();
        if end > image_size {
            error!(
                "Block {} ends at {} bytes, image is only {} bytes",
                index, end, image_size
            );
            return Err(UpdateError::ImageOverrun);
        }

        let last = transfer.is_complete();
        if last && end != image_size {
            error!("Image ends at {} bytes, manifest says {} bytes", end, image_size);
            return Err(UpdateError::SizeMismatch);
        }

        debug!("Fetching firmware {:3}%", end * 100 / image_size);

        self.storage
            .write(component, self.manifest, data, offset)
            .await
            .map_err(|e| {
                error!("Storage write at offset {} failed: {:?}", offset, e);
                UpdateError::StorageWriteFailed
            })?;

        if last {
            info!("Finalizing payload store");
            self.storage
                .finish(component, self.manifest)
                .await
                .map_err(|e| {
                    error!("Finalizing payload store failed: {:?}", e);
                    UpdateError::StorageWriteFailed
                })?;
            self.finished = true;
        }
        Ok(())
    }
}
