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

use crate::config::{SUIT_PARENT_TOPIC_MAX, SUIT_TOPIC_MAX};
use core::fmt::{self, Write};
use core::ops::Deref;
use heapless::String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TopicError {
    /// The topic does not fit in the topic buffer
    TopicTooLong,
    /// The topic is empty, contains wildcards, or has no parsable block index
    MalformedTopic,
}

/// Shape of a topic published below a parent topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TopicKind {
    /// `<parent>/`, carries the block count
    Size,
    /// `<parent>/<index>`, carries one block
    Block(u32),
}

/// A topic name held in a fixed `SUIT_TOPIC_MAX` byte buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topic {
    name: String<SUIT_TOPIC_MAX>,
}

impl Topic {
    pub const fn new() -> Self {
        Self {
            name: String::new(),
        }
    }

    /// Copies `name` into a topic, rejecting names that exceed the buffer.
    pub fn try_from_str(name: &str) -> Result<Self, TopicError> {
        let mut topic = Self::new();
        topic
            .name
            .push_str(name)
            .map_err(|_| TopicError::TopicTooLong)?;
        Ok(topic)
    }

    /// Validates `name` for use as the parent of size and block topics.
    ///
    /// A parent must leave room for a `/` and `SUIT_BLOCK_DEC_PLACES_MAX` digits, must not
    /// contain MQTT wildcards and must not end in the separator.
    pub fn parent(name: &str) -> Result<Self, TopicError> {
        if name.is_empty() || name.ends_with('/') || name.contains(['#', '+']) {
            return Err(TopicError::MalformedTopic);
        }
        if name.len() > SUIT_PARENT_TOPIC_MAX {
            return Err(TopicError::TopicTooLong);
        }
        Self::try_from_str(name)
    }

    pub fn as_str(&self) -> &str {
        self.name.as_str()
    }
}

impl Deref for Topic {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the size discovery topic `<parent>/`.
pub fn build_size_topic(parent: &Topic) -> Result<Topic, TopicError> {
    let mut topic = parent.clone();
    topic.name.push('/').map_err(|_| TopicError::TopicTooLong)?;
    Ok(topic)
}

/// Builds the topic of block `index`, `<parent>/<index>`.
pub fn build_block_topic(parent: &Topic, index: u32) -> Result<Topic, TopicError> {
    let mut topic = parent.clone();
    write!(topic.name, "/{}", index).map_err(|_| TopicError::TopicTooLong)?;
    Ok(topic)
}

/// Parses the decimal segment after the last `/` of a block topic.
pub fn parse_block_index(topic: &str) -> Result<u32, TopicError> {
    let (_, index) = topic.rsplit_once('/').ok_or(TopicError::MalformedTopic)?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TopicError::MalformedTopic);
    }
    index.parse().map_err(|_| TopicError::MalformedTopic)
}

pub fn is_size_topic(topic: &str) -> bool {
    topic.ends_with('/')
}

/// Works out what `topic` carries relative to `parent`.
///
/// Returns `None` when `topic` does not live directly below `parent`.
pub fn classify_subtopic(parent: &str, topic: &str) -> Option<Result<TopicKind, TopicError>> {
    let rest = topic.strip_prefix(parent)?;
    let segment = rest.strip_prefix('/')?;

    if segment.is_empty() && is_size_topic(topic) {
        return Some(Ok(TopicKind::Size));
    }
    if segment.contains('/') {
        return Some(Err(TopicError::MalformedTopic));
    }
    Some(parse_block_index(topic).map(TopicKind::Block))
}
