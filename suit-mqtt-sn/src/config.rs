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

pub const DEFAULT_TRIGGER_TOPIC: &str = "suit/trigger";
pub const DEFAULT_SLOT_ACTIVE_TOPIC: &str = "suit/slot/active";
pub const DEFAULT_SLOT_INACTIVE_TOPIC: &str = "suit/slot/inactive";
pub const DEFAULT_VERSION_TOPIC: &str = "suit/version";

/// Per device topic names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdaterConfig {
    pub trigger_topic: &'static str,
    pub slot_active_topic: &'static str,
    pub slot_inactive_topic: &'static str,
    pub version_topic: &'static str,
}

impl UpdaterConfig {
    pub const fn new() -> Self {
        Self {
            trigger_topic: DEFAULT_TRIGGER_TOPIC,
            slot_active_topic: DEFAULT_SLOT_ACTIVE_TOPIC,
            slot_inactive_topic: DEFAULT_SLOT_INACTIVE_TOPIC,
            version_topic: DEFAULT_VERSION_TOPIC,
        }
    }

    pub const fn with_trigger_topic(mut self, topic: &'static str) -> Self {
        self.trigger_topic = topic;
        self
    }

    pub const fn with_slot_active_topic(mut self, topic: &'static str) -> Self {
        self.slot_active_topic = topic;
        self
    }

    pub const fn with_slot_inactive_topic(mut self, topic: &'static str) -> Self {
        self.slot_inactive_topic = topic;
        self
    }

    pub const fn with_version_topic(mut self, topic: &'static str) -> Self {
        self.version_topic = topic;
        self
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self::new()
    }
}
