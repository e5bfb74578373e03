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
use suit_mqtt_sn_messages::config::SUIT_MQTT_SN_BLOCKSIZE;

/// Book keeping for one blockwise transfer.
///
/// Blocks are only accepted strictly in order: block `n` is accepted when exactly `n` blocks
/// have been received before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferState {
    pub num_blocks_total: u32,
    pub num_blocks_rcvd: u32,
    pub current_block_num: u32,
    pub current_block_len: usize,
}

impl TransferState {
    pub const fn new() -> Self {
        Self {
            num_blocks_total: 0,
            num_blocks_rcvd: 0,
            current_block_num: 0,
            current_block_len: 0,
        }
    }

    pub fn reset(&mut self, num_blocks_total: u32) {
        *self = Self {
            num_blocks_total,
            ..Self::new()
        };
    }

    pub fn size_known(&self) -> bool {
        self.num_blocks_total > 0
    }

    pub fn is_complete(&self) -> bool {
        self.size_known() && self.num_blocks_rcvd == self.num_blocks_total
    }

    /// Whether `index` is the final block of the transfer.
    pub fn is_last(&self, index: u32) -> bool {
        self.num_blocks_total.checked_sub(1) == Some(index)
    }

    /// Accounts for block `index` of `len` bytes.
    ///
    /// On error nothing is counted, although `current_block_num` keeps the rejected index for
    /// diagnostics.
    pub fn accept(&mut self, index: u32, len: usize) -> Result<(), UpdateError> {
        if !self.size_known() || self.num_blocks_rcvd >= self.num_blocks_total {
            self.current_block_num = index;
            return Err(UpdateError::OutOfOrderBlock);
        }

        self.current_block_num = index;
        self.num_blocks_rcvd += 1;
        if self.current_block_num != self.num_blocks_rcvd - 1 {
            self.num_blocks_rcvd -= 1;
            return Err(UpdateError::OutOfOrderBlock);
        }

        let length_ok = if self.is_last(index) {
            len > 0 && len <= SUIT_MQTT_SN_BLOCKSIZE
        } else {
            len == SUIT_MQTT_SN_BLOCKSIZE
        };
        if !length_ok {
            self.num_blocks_rcvd -= 1;
            return Err(UpdateError::InvalidBlockLength);
        }

        self.current_block_len = len;
        Ok(())
    }
}
