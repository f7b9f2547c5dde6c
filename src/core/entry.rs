//! Directional byte chunks.
//!
//! An [`Entry`] is a maximal contiguous run of bytes travelling in one
//! [`Direction`], tagged with its position in that direction's cumulative
//! stream.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Direction of a chunk relative to the capturing endpoint.
///
/// The derived ordering puts [`Direction::Sent`] before
/// [`Direction::Received`], which is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Bytes sent by the capturing endpoint.
    Sent,
    /// Bytes received by the capturing endpoint.
    Received,
}

impl Direction {
    /// Both directions, in display order.
    pub const ALL: [Self; 2] = [Self::Sent, Self::Received];

    /// Dense index, usable for fixed-size per-direction tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Sent => 0,
            Self::Received => 1,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Received => "received",
        }
    }

    /// Single-character tag used by fragmentation rules.
    #[must_use]
    pub const fn tag(self) -> char {
        match self {
            Self::Sent => 's',
            Self::Received => 'r',
        }
    }

    /// Resolves a fragmentation rule tag.
    #[must_use]
    pub const fn from_tag(tag: char) -> Option<Self> {
        match tag {
            's' => Some(Self::Sent),
            'r' => Some(Self::Received),
            _ => None,
        }
    }

    /// The other direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Sent => Self::Received,
            Self::Received => Self::Sent,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous chunk of bytes travelling in one direction.
///
/// `offset` is the position of `data[0]` within the cumulative byte stream
/// of `direction`.
///
/// # Examples
///
/// ```
/// use flowdiff::core::{Direction, Entry};
///
/// let entry = Entry::new(Direction::Sent, 16, vec![1, 2, 3]);
/// assert_eq!(entry.end(), 19);
/// assert!(entry.contains(18));
/// assert!(!entry.contains(19));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Direction of travel.
    pub direction: Direction,

    /// Stream offset of the first byte.
    pub offset: usize,

    /// Payload bytes.
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
}

impl Entry {
    /// Creates a new entry.
    #[must_use]
    pub const fn new(direction: Direction, offset: usize, data: Vec<u8>) -> Self {
        Self {
            direction,
            offset,
            data,
        }
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks if the payload is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stream offset one past the last byte.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.data.len()
    }

    /// Stream range covered by this entry.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// Checks whether an absolute stream position falls inside this entry.
    #[must_use]
    pub const fn contains(&self, position: usize) -> bool {
        self.offset <= position && position < self.end()
    }

    /// Splits the entry at an absolute stream position.
    ///
    /// The left part keeps the original offset; the right part starts at
    /// `position`. Returns the entry unchanged as `Err` when `position` is
    /// not strictly inside it, since a split there would leave one side
    /// empty.
    pub fn split_at(mut self, position: usize) -> std::result::Result<(Self, Self), Self> {
        if position <= self.offset || position >= self.end() {
            return Err(self);
        }
        let tail = self.data.split_off(position - self.offset);
        let right = Self::new(self.direction, position, tail);
        Ok((self, right))
    }
}
