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

use crate::error::UpdateError;
use crate::fetch::BlockSink;
use crate::transfer::TransferState;
use suit_mqtt_sn_messages::config::{SUIT_MANIFEST_BUFSIZE, SUIT_MQTT_SN_BLOCKSIZE};

/// Collects manifest blocks into a fixed buffer, block `n` lands at `n * SUIT_MQTT_SN_BLOCKSIZE`.
pub struct ManifestAssembler {
    transfer: TransferState,
    buffer: [u8; SUIT_MANIFEST_BUFSIZE],
}

impl ManifestAssembler {
    pub const fn new() -> Self {
        Self {
            transfer: TransferState::new(),
            buffer: [0u8; SUIT_MANIFEST_BUFSIZE],
        }
    }

    pub fn transfer(&self) -> &TransferState {
        &self.transfer
    }

    pub fn discard(&mut self) {
        self.transfer = TransferState::new();
    }

    pub fn on_size(&mut self, num_blocks_total: u32) -> Result<(), UpdateError> {
        let min_len = (num_blocks_total as usize)
            .checked_sub(1)
            .ok_or(UpdateError::MalformedPayload)?
            * SUIT_MQTT_SN_BLOCKSIZE
            + 1;
        if min_len > SUIT_MANIFEST_BUFSIZE {
            self.discard();
            return Err(UpdateError::ManifestTooLarge);
        }

        self.transfer.reset(num_blocks_total);
        Ok(())
    }

    pub fn on_block(&mut self, index: u32, payload: &[u8]) -> Result<(), UpdateError> {
        self.transfer.accept(index, payload.len())?;

        let offset = index as usize * SUIT_MQTT_SN_BLOCKSIZE;
        self.buffer
            .get_mut(offset..offset + payload.len())
            .ok_or(UpdateError::ManifestTooLarge)?
            .copy_from_slice(payload);
        Ok(())
    }

    /// The most recently accepted block and its index.
    pub fn last_block(&self) -> Option<(u32, &[u8])> {
        let index = self.transfer.num_blocks_rcvd.checked_sub(1)?;
        let offset = index as usize * SUIT_MQTT_SN_BLOCKSIZE;
        let len = if self.transfer.is_last(index) {
            self.transfer.current_block_len
        } else {
            SUIT_MQTT_SN_BLOCKSIZE
        };
        Some((index, self.buffer.get(offset..offset + len)?))
    }

    /// The whole manifest, once every block has arrived.
    pub fn assembled(&self) -> Option<&[u8]> {
        if !self.transfer.is_complete() {
            return None;
        }
        let len = (self.transfer.num_blocks_total as usize - 1) * SUIT_MQTT_SN_BLOCKSIZE
            + self.transfer.current_block_len;
        self.buffer.get(..len)
    }
}

impl Default for ManifestAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Manifest blocks are already in place when they are reported, nothing left to do per block.
pub struct ManifestSink;

impl BlockSink for ManifestSink {
    async fn accept_block(
        &mut self,
        index: u32,
        data: &[u8],
        transfer: &TransferState,
    ) -> Result<(), UpdateError> {
        log::debug!(
            "Manifest block {} of {} ({} bytes)",
            index + 1,
            transfer.num_blocks_total,
            data.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BS: usize = SUIT_MQTT_SN_BLOCKSIZE;

    fn block(index: u32, len: usize) -> std::vec::Vec<u8> {
        (0..len).map(|i| (index as usize * 31 + i) as u8).collect()
    }

    #[test]
    fn in_order_blocks_reassemble_to_the_concatenation() {
        for num_blocks in 1..=(SUIT_MANIFEST_BUFSIZE / BS) as u32 {
            for last_len in [1, BS / 2, BS] {
                let mut assembler = ManifestAssembler::new();
                assembler.on_size(num_blocks).unwrap();

                let mut expected = std::vec::Vec::new();
                for index in 0..num_blocks {
                    let len = if index + 1 == num_blocks { last_len } else { BS };
                    let payload = block(index, len);
                    assert!(assembler.assembled().is_none());
                    assembler.on_block(index, &payload).unwrap();
                    assert_eq!(assembler.last_block(), Some((index, payload.as_slice())));
                    expected.extend_from_slice(&payload);
                }

                assert_eq!(assembler.assembled(), Some(expected.as_slice()));
            }
        }
    }

    #[test]
    fn three_blocks_make_a_160_byte_manifest() {
        let mut assembler = ManifestAssembler::new();
        assembler.on_size(3).unwrap();
        assembler.on_block(0, &block(0, 64)).unwrap();
        assembler.on_block(1, &block(1, 64)).unwrap();
        assembler.on_block(2, &block(2, 32)).unwrap();

        assert_eq!(assembler.assembled().map(|m| m.len()), Some(160));
    }

    #[test]
    fn early_block_is_rejected_and_not_counted() {
        let mut assembler = ManifestAssembler::new();
        assembler.on_size(3).unwrap();
        assembler.on_block(0, &block(0, BS)).unwrap();

        assert_eq!(
            assembler.on_block(2, &block(2, 10)),
            Err(UpdateError::OutOfOrderBlock)
        );
        assert_eq!(assembler.transfer().num_blocks_rcvd, 1);
        assert_eq!(assembler.last_block().map(|(index, _)| index), Some(0));
    }

    #[test]
    fn manifests_beyond_the_buffer_are_refused_up_front() {
        let mut assembler = ManifestAssembler::new();
        let too_many = (SUIT_MANIFEST_BUFSIZE / BS) as u32 + 1;
        assert_eq!(assembler.on_size(too_many), Err(UpdateError::ManifestTooLarge));
        assert_eq!(assembler.on_size(0), Err(UpdateError::MalformedPayload));
        assert_eq!(
            assembler.on_block(0, &block(0, BS)),
            Err(UpdateError::OutOfOrderBlock)
        );
    }
}
