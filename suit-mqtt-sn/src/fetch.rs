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

//! Blockwise fetch of one payload below a parent topic.
//!
//! The engine subscribes `<parent>/` first and learns the block count from the retained size
//! message. It then subscribes one block topic at a time and hands every block to a
//! `BlockSink` before asking for the next one. At most one topic of the transfer is
//! subscribed at any time.

use crate::error::UpdateError;
use crate::events::{PendingEvents, UpdateEvent};
use crate::gateway::GatewaySession;
use crate::session::UpdateSession;
use crate::transfer::TransferState;
use crate::transport::{PublishHandler, Transport};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use log::{info, trace, warn};
use suit_mqtt_sn_messages::Topic;
use suit_mqtt_sn_messages::config::SUIT_MQTT_SN_BLOCKSIZE;
use suit_mqtt_sn_messages::topic::{build_block_topic, build_size_topic};

/// Consumer of the blocks of a transfer, in order.
pub trait BlockSink {
    /// Called once per block. `transfer` already accounts for this block.
    async fn accept_block(
        &mut self,
        index: u32,
        data: &[u8],
        transfer: &TransferState,
    ) -> Result<(), UpdateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FetchState {
    Idle,
    AwaitingSize,
    AwaitingBlock(u32),
    Complete,
    Aborted,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FetchOutcome {
    Complete,
    /// A new trigger arrived, the partial transfer was dropped
    Aborted,
    Error(UpdateError),
}

/// Reasons a fetch or an update stops early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupted {
    Aborted,
    Failed(UpdateError),
}

impl From<UpdateError> for Interrupted {
    fn from(err: UpdateError) -> Self {
        Interrupted::Failed(err)
    }
}

impl FetchOutcome {
    pub(crate) fn into_result(self) -> Result<(), Interrupted> {
        match self {
            FetchOutcome::Complete => Ok(()),
            FetchOutcome::Aborted => Err(Interrupted::Aborted),
            FetchOutcome::Error(e) => Err(Interrupted::Failed(e)),
        }
    }
}

pub struct BlockwiseFetch<'a, M: RawMutex, T: Transport> {
    session: &'a UpdateSession<M>,
    gateway: &'a Mutex<M, GatewaySession<T>>,
    state: FetchState,
    /// Size or block topic currently subscribed
    outstanding: Option<Topic>,
}

impl<'a, M: RawMutex, T: Transport> BlockwiseFetch<'a, M, T> {
    pub fn new(session: &'a UpdateSession<M>, gateway: &'a Mutex<M, GatewaySession<T>>) -> Self {
        Self {
            session,
            gateway,
            state: FetchState::Idle,
            outstanding: None,
        }
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Fetches every block below `parent` into `sink`.
    ///
    /// Stops with `Aborted` as soon as a new trigger is pending, and with `Error` on the first
    /// rejected publish or sink failure. Either way the partial transfer is discarded.
    pub async fn start<S: BlockSink>(
        &mut self,
        parent: &Topic,
        handler: PublishHandler,
        sink: &mut S,
    ) -> FetchOutcome {
        self.session.begin_transfer(handler, parent);

        let result = self.run(parent, handler, sink).await;
        self.release().await;

        let outcome = match result {
            Ok(()) => {
                self.session.close_transfer();
                FetchOutcome::Complete
            }
            Err(Interrupted::Aborted) => {
                self.session.discard_transfer();
                FetchOutcome::Aborted
            }
            Err(Interrupted::Failed(e)) => {
                warn!("Fetching {} failed: {:?}", parent, e);
                self.session.discard_transfer();
                FetchOutcome::Error(e)
            }
        };

        self.state = match outcome {
            FetchOutcome::Complete => FetchState::Complete,
            FetchOutcome::Aborted => FetchState::Aborted,
            FetchOutcome::Error(_) => FetchState::Error,
        };
        outcome
    }

    async fn run<S: BlockSink>(
        &mut self,
        parent: &Topic,
        handler: PublishHandler,
        sink: &mut S,
    ) -> Result<(), Interrupted> {
        self.state = FetchState::AwaitingSize;
        let size_topic = build_size_topic(parent).map_err(UpdateError::from)?;
        self.subscribe(&size_topic, handler).await?;
        let num_blocks = self.wait_until(handler, |t| t.size_known()).await?.num_blocks_total;
        info!("Fetching {} blocks from {}", num_blocks, parent);

        let mut block = [0u8; SUIT_MQTT_SN_BLOCKSIZE];
        for index in 0..num_blocks {
            self.state = FetchState::AwaitingBlock(index);
            self.session.await_block(index);

            let block_topic = build_block_topic(parent, index).map_err(UpdateError::from)?;
            self.subscribe(&block_topic, handler).await?;
            let transfer = self
                .wait_until(handler, |t| t.num_blocks_rcvd > index)
                .await?;

            let (received, len) = self
                .session
                .copy_last_block(handler, &mut block)
                .ok_or(UpdateError::OutOfOrderBlock)?;
            if received != index {
                return Err(UpdateError::OutOfOrderBlock.into());
            }
            sink.accept_block(index, &block[..len], &transfer).await?;
        }

        info!("Fetched {}", parent);
        Ok(())
    }

    /// Replaces the outstanding subscription with `topic`.
    async fn subscribe(&mut self, topic: &Topic, handler: PublishHandler) -> Result<(), Interrupted> {
        self.release().await;
        self.gateway
            .lock()
            .await
            .subscribe_with_recovery(topic, handler)
            .await
            .map_err(|e| Interrupted::Failed(e.into()))?;
        self.outstanding = Some(topic.clone());
        Ok(())
    }

    async fn release(&mut self) {
        if let Some(topic) = self.outstanding.take() {
            self.gateway.lock().await.unsubscribe(&topic).await;
        }
    }

    async fn wait_until(
        &self,
        handler: PublishHandler,
        done: impl Fn(&TransferState) -> bool,
    ) -> Result<TransferState, Interrupted> {
        let events = self.session.events();
        let mut pending = events.take();
        loop {
            self.check_interruptions(pending)?;

            let transfer = self.session.transfer_state(handler);
            if done(&transfer) {
                return Ok(transfer);
            }
            trace!("Waiting for {:?} publish", handler);
            pending = events.wait().await;
        }
    }

    fn check_interruptions(&self, pending: PendingEvents) -> Result<(), Interrupted> {
        if pending.contains(UpdateEvent::Trigger) && self.session.has_pending_trigger() {
            info!("New trigger received, aborting the running transfer");
            return Err(Interrupted::Aborted);
        }
        if pending.contains(UpdateEvent::BlockError) {
            let err = self.session.take_error().unwrap_or(UpdateError::OutOfOrderBlock);
            return Err(Interrupted::Failed(err));
        }
        Ok(())
    }
}
