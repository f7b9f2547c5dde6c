//! Per-column diff reports.
//!
//! An [`EntryReport`] describes one aligned column: the entries found at the
//! same ordinal position in every compared flow, plus the patterns detected
//! across them. Reports are plain data; rendering lives in the CLI layer.

use crate::core::{Direction, Entry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Analysis of one aligned column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryReport {
    /// Ordinal position of the column (0-based).
    pub index: usize,

    /// Distinct entry lengths.
    pub lengths: BTreeSet<usize>,

    /// Distinct entry stream offsets.
    pub offsets: BTreeSet<usize>,

    /// Distinct directions (more than one means the flows are misaligned).
    pub directions: BTreeSet<Direction>,

    /// Positions below the shortest length where every entry agrees.
    pub common_bytes: Vec<usize>,

    /// Probable length fields. Empty unless lengths differ.
    pub length_hints: Vec<LengthByteHint>,

    /// Longest shared tail. Only computed when lengths differ.
    pub common_suffix: Option<CommonSuffix>,

    /// Every entry carries identical bytes; `entries` then holds one
    /// representative.
    pub collapsed: bool,

    /// Byte pairs in constant relation. `None` when collapsed or when the
    /// scan is disabled.
    pub fixed_differences: Option<FixedDifferences>,

    /// Entries of the column in flow order, or the single representative
    /// when collapsed.
    pub entries: Vec<Entry>,
}

impl EntryReport {
    /// Checks whether a position is common to every entry.
    #[must_use]
    pub fn is_common(&self, position: usize) -> bool {
        self.common_bytes.binary_search(&position).is_ok()
    }
}

/// A byte whose value tracks the entry length by a constant offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthByteHint {
    /// Byte position within the entries.
    pub position: usize,

    /// Absolute value of `byte - entry_length`, identical for all entries.
    pub magnitude: usize,
}

/// Tail shared by every entry of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonSuffix {
    /// The shared bytes.
    #[serde(with = "hex::serde")]
    pub bytes: Vec<u8>,
}

impl CommonSuffix {
    /// Length of the shared tail.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Checks if the tail is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Relation between the two bytes of a [`FixedDifference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Relation {
    /// The bytes are always equal.
    Equal,
    /// The bytes always differ by this amount.
    Offset(u8),
}

/// Two byte positions whose difference is the same in every entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedDifference {
    /// Lower position.
    pub first: usize,

    /// Higher position.
    pub second: usize,

    /// `byte[first] - byte[second]`, identical for all entries.
    pub difference: i16,

    /// Byte at `first`, per entry.
    pub first_values: Vec<u8>,

    /// Byte at `second`, per entry.
    pub second_values: Vec<u8>,
}

impl FixedDifference {
    /// Classifies the difference.
    #[must_use]
    pub fn relation(&self) -> Relation {
        match u8::try_from(self.difference.unsigned_abs()) {
            Ok(0) => Relation::Equal,
            Ok(d) => Relation::Offset(d),
            Err(_) => Relation::Offset(u8::MAX),
        }
    }
}

/// Result of the fixed-difference scan for one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedDifferences {
    /// Findings in scan order, at most the configured threshold.
    pub findings: Vec<FixedDifference>,

    /// More qualifying pairs exist beyond the threshold.
    pub truncated: bool,
}
