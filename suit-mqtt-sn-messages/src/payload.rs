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

use crate::config::{MQTT_SCHEME, SUIT_MAX_BLOCKS};
use crate::topic::{Topic, TopicError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// Nothing left after trimming padding
    Empty,
    /// The payload is not ASCII decimal
    NotANumber,
    /// The block count is zero or above `SUIT_MAX_BLOCKS`
    OutOfRange,
}

/// Senders written in C frequently include the terminating NUL in the payload.
fn trim_padding(payload: &[u8]) -> &[u8] {
    let end = payload.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    payload[..end].trim_ascii()
}

/// Parses the payload of a size topic, the ASCII decimal number of blocks.
pub fn parse_block_count(payload: &[u8]) -> Result<u32, PayloadError> {
    let digits = trim_padding(payload);
    if digits.is_empty() {
        return Err(PayloadError::Empty);
    }
    if !digits.iter().all(|b| b.is_ascii_digit()) {
        return Err(PayloadError::NotANumber);
    }

    // checked per digit so oversized counts report as out of range rather than overflow
    let count = digits.iter().try_fold(0u32, |acc, b| {
        acc.checked_mul(10)
            .and_then(|acc| acc.checked_add(u32::from(b - b'0')))
    });

    match count {
        Some(count) if (1..=SUIT_MAX_BLOCKS).contains(&count) => Ok(count),
        _ => Err(PayloadError::OutOfRange),
    }
}

/// Turns a trigger payload or a component URL into a parent topic.
///
/// An optional `mqtt://` scheme is stripped, as are trailing NUL bytes and a trailing `/`.
/// Any other scheme is rejected.
pub fn parse_topic_url(payload: &[u8]) -> Result<Topic, TopicError> {
    let url = core::str::from_utf8(trim_padding(payload)).map_err(|_| TopicError::MalformedTopic)?;

    let name = match url.strip_prefix(MQTT_SCHEME) {
        Some(name) => name,
        None if url.contains("://") => return Err(TopicError::MalformedTopic),
        None => url,
    };

    Topic::parent(name.strip_suffix('/').unwrap_or(name))
}

/// Decodes the CBOR encoded image size parameter of a manifest component.
pub fn decode_image_size(param: &[u8]) -> Option<u32> {
    minicbor::Decoder::new(param).u32().ok()
}
