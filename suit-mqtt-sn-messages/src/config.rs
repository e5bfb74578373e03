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

/// Capacity of every topic buffer, in bytes.
pub const SUIT_TOPIC_MAX: usize = 128;

/// Maximum number of decimal digits in a block index.
pub const SUIT_BLOCK_DEC_PLACES_MAX: usize = 5;

/// Longest parent topic that still leaves room for `/` plus a block index.
pub const SUIT_PARENT_TOPIC_MAX: usize = SUIT_TOPIC_MAX - SUIT_BLOCK_DEC_PLACES_MAX - 1;

/// Size of one blockwise transfer block.
pub const SUIT_MQTT_SN_BLOCKSIZE: usize = 64;

/// Capacity of the buffer the manifest is assembled into.
pub const SUIT_MANIFEST_BUFSIZE: usize = 640;

/// Largest block count a size topic may announce, so every index fits the digit budget.
pub const SUIT_MAX_BLOCKS: u32 = 100_000;

pub const MQTT_SCHEME: &str = "mqtt://";

pub const GATEWAY_PORT: u16 = 10000;
