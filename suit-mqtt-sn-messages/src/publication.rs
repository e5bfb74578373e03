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

//! Publisher side of the blockwise transfer: how an image is laid out over topics.

use crate::config::{SUIT_MAX_BLOCKS, SUIT_MQTT_SN_BLOCKSIZE};
use crate::payload::PayloadError;
use crate::topic::{Topic, TopicError, build_block_topic, build_size_topic};
use core::fmt::Write;
use heapless::String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublicationError {
    Topic(TopicError),
    Payload(PayloadError),
}

impl From<TopicError> for PublicationError {
    fn from(err: TopicError) -> Self {
        PublicationError::Topic(err)
    }
}

impl From<PayloadError> for PublicationError {
    fn from(err: PayloadError) -> Self {
        PublicationError::Payload(err)
    }
}

/// One message the publisher has to put on the broker.
#[derive(Debug, Clone, PartialEq)]
pub enum Publication<'a> {
    Size {
        topic: Topic,
        count: String<10>,
    },
    Block {
        topic: Topic,
        index: u32,
        data: &'a [u8],
    },
}

impl Publication<'_> {
    pub fn topic(&self) -> &Topic {
        match self {
            Publication::Size { topic, .. } => topic,
            Publication::Block { topic, .. } => topic,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Publication::Size { count, .. } => count.as_bytes(),
            Publication::Block { data, .. } => data,
        }
    }
}

pub fn block_count(image_len: usize) -> usize {
    image_len.div_ceil(SUIT_MQTT_SN_BLOCKSIZE)
}

/// Iterates the size message followed by every block message of an image.
pub struct BlockwisePublication<'a> {
    parent: Topic,
    image: &'a [u8],
    num_blocks: u32,
    size_sent: bool,
    next_block: u32,
}

impl<'a> BlockwisePublication<'a> {
    pub fn new(parent: &str, image: &'a [u8]) -> Result<Self, PublicationError> {
        let parent = Topic::parent(parent)?;
        if image.is_empty() {
            return Err(PayloadError::Empty.into());
        }
        let num_blocks = u32::try_from(block_count(image.len()))
            .ok()
            .filter(|n| *n <= SUIT_MAX_BLOCKS)
            .ok_or(PayloadError::OutOfRange)?;

        Ok(Self {
            parent,
            image,
            num_blocks,
            size_sent: false,
            next_block: 0,
        })
    }

    pub fn num_blocks(&self) -> u32 {
        self.num_blocks
    }
}

impl<'a> Iterator for BlockwisePublication<'a> {
    type Item = Publication<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.size_sent {
            self.size_sent = true;
            let mut count = String::new();
            write!(count, "{}", self.num_blocks).ok()?;
            return Some(Publication::Size {
                topic: build_size_topic(&self.parent).ok()?,
                count,
            });
        }

        if self.next_block >= self.num_blocks {
            return None;
        }

        let index = self.next_block;
        self.next_block += 1;
        let start = index as usize * SUIT_MQTT_SN_BLOCKSIZE;
        let end = usize::min(start + SUIT_MQTT_SN_BLOCKSIZE, self.image.len());

        Some(Publication::Block {
            topic: build_block_topic(&self.parent, index).ok()?,
            index,
            data: &self.image[start..end],
        })
    }
}
