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

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicU8, Ordering};

/// Events the receive context raises towards the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateEvent {
    Trigger,
    /// A size or block publish was accepted into the active transfer
    BlockReceived,
    BlockError,
}

impl UpdateEvent {
    const fn bit(self) -> u8 {
        match self {
            UpdateEvent::Trigger => 1 << 0,
            UpdateEvent::BlockReceived => 1 << 1,
            UpdateEvent::BlockError => 1 << 2,
        }
    }
}

/// Set of events that were posted since the coordinator last looked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingEvents(u8);

impl PendingEvents {
    pub fn contains(self, event: UpdateEvent) -> bool {
        self.0 & event.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Single consumer event flags.
///
/// Posting merges the event bit atomically, so repeated events of one kind coalesce while
/// events of different kinds are never lost to each other.
pub struct UpdateEvents<M: RawMutex> {
    pending: AtomicU8,
    wake: Signal<M, ()>,
}

impl<M: RawMutex> UpdateEvents<M> {
    pub const fn new() -> Self {
        Self {
            pending: AtomicU8::new(0),
            wake: Signal::new(),
        }
    }

    pub fn post(&self, event: UpdateEvent) {
        self.pending.fetch_or(event.bit(), Ordering::AcqRel);
        self.wake.signal(());
    }

    pub fn clear(&self, event: UpdateEvent) {
        self.pending.fetch_and(!event.bit(), Ordering::AcqRel);
    }

    /// Takes every pending event without waiting.
    pub fn take(&self) -> PendingEvents {
        PendingEvents(self.pending.swap(0, Ordering::AcqRel))
    }

    /// Waits until at least one event is pending and takes all of them.
    pub async fn wait(&self) -> PendingEvents {
        loop {
            let pending = self.take();
            if !pending.is_empty() {
                return pending;
            }
            self.wake.wait().await;
        }
    }
}

impl<M: RawMutex> Default for UpdateEvents<M> {
    fn default() -> Self {
        Self::new()
    }
}
