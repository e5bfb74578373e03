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

use heapless::String;

/// Room for the decimal form of any `u32`.
pub const VERSION_PAYLOAD_MAX: usize = 10;

/// Slot numbers are published as a single ASCII digit.
pub fn slot_payload(slot: u8) -> Option<[u8; 1]> {
    (slot < 10).then(|| [b'0' + slot])
}

pub fn version_payload(version: u32) -> String<VERSION_PAYLOAD_MAX> {
    String::try_from(version).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_single_digits() {
        assert_eq!(slot_payload(0), Some(*b"0"));
        assert_eq!(slot_payload(1), Some(*b"1"));
        assert_eq!(slot_payload(10), None);
    }

    #[test]
    fn versions_are_plain_decimal() {
        assert_eq!(version_payload(0).as_str(), "0");
        assert_eq!(version_payload(1_700_000_000).as_str(), "1700000000");
        assert_eq!(version_payload(u32::MAX).as_str(), "4294967295");
    }
}
