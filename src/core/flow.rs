//! Reconstructed bidirectional sessions.
//!
//! A [`Flow`] is the ordered list of entries observed in one capture, in
//! capture order with directions interleaved.

use crate::core::entry::{Direction, Entry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Deref;

/// One reconstructed captured session.
///
/// Entries of the same direction are contiguous: each starts where the
/// previous one of that direction ended. Built once at load time and only
/// changed afterwards by [`Flow::split_entry`] (through fragmentation
/// rules).
///
/// # Examples
///
/// ```
/// use flowdiff::core::{Direction, Entry, Flow};
///
/// let flow = Flow::from_entries(vec![
///     Entry::new(Direction::Sent, 0, b"ping".to_vec()),
///     Entry::new(Direction::Received, 0, b"pong".to_vec()),
/// ]);
/// assert_eq!(flow.len(), 2);
/// assert_eq!(flow.stream(Direction::Received), b"pong");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flow {
    entries: Vec<Entry>,
}

impl Flow {
    /// Creates an empty flow.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Wraps an existing entry list.
    #[must_use]
    pub const fn from_entries(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Returns the entries in capture order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Concatenates the payloads of one direction, in order.
    #[must_use]
    pub fn stream(&self, direction: Direction) -> Vec<u8> {
        self.entries
            .iter()
            .filter(|e| e.direction == direction)
            .flat_map(|e| e.data.iter().copied())
            .collect()
    }

    /// Applies a payload transform to every entry.
    #[must_use]
    pub fn map_data<F>(self, mut f: F) -> Self
    where
        F: FnMut(Vec<u8>) -> Vec<u8>,
    {
        Self {
            entries: self
                .entries
                .into_iter()
                .map(|e| Entry::new(e.direction, e.offset, f(e.data)))
                .collect(),
        }
    }

    /// Splits the entry at `index` at an absolute stream position.
    ///
    /// Returns `false` (leaving the flow untouched) when `index` is out of
    /// range or `position` is not strictly inside that entry.
    pub fn split_entry(&mut self, index: usize, position: usize) -> bool {
        let Some(entry) = self.entries.get(index) else {
            return false;
        };
        if position <= entry.offset || position >= entry.end() {
            return false;
        }
        let entry = self.entries.remove(index);
        match entry.split_at(position) {
            Ok((left, right)) => {
                self.entries.insert(index, right);
                self.entries.insert(index, left);
                true
            }
            Err(entry) => {
                self.entries.insert(index, entry);
                false
            }
        }
    }

    /// Returns the first index of a `direction` entry containing `position`.
    #[must_use]
    pub fn find_entry(&self, direction: Direction, position: usize) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.direction == direction && e.contains(position))
    }

    /// Returns the suffix of the flow past the per-direction thresholds.
    ///
    /// Entries are scanned in order; a direction named in `skip` has passed
    /// once one of its entries starts at or after its threshold. The result
    /// begins at the entry where every named direction has passed.
    /// Directions absent from `skip` never block. With an empty `skip` the
    /// whole flow is returned; if the thresholds are never all reached the
    /// result is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use flowdiff::core::{Direction, Entry, Flow, SkipOffset};
    ///
    /// let flow = Flow::from_entries(vec![
    ///     Entry::new(Direction::Sent, 0, vec![0; 4]),
    ///     Entry::new(Direction::Received, 0, vec![0; 2]),
    ///     Entry::new(Direction::Sent, 4, vec![0; 4]),
    /// ]);
    /// let skip = SkipOffset::new().with(Direction::Sent, 4);
    /// assert_eq!(flow.filter_by_offset(&skip).len(), 1);
    /// ```
    #[must_use]
    pub fn filter_by_offset(&self, skip: &SkipOffset) -> &[Entry] {
        if skip.is_empty() {
            return &self.entries;
        }

        let mut passed = [false; 2];
        for (n, entry) in self.entries.iter().enumerate() {
            let d = entry.direction;
            if !passed[d.index()]
                && let Some(threshold) = skip.get(d)
                && entry.offset >= threshold
            {
                passed[d.index()] = true;
            }
            if skip.directions().all(|d| passed[d.index()]) {
                return &self.entries[n..];
            }
        }

        &[]
    }
}

impl Deref for Flow {
    type Target = [Entry];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl FromIterator<Entry> for Flow {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Flow {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Flow {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Per-direction minimum stream offsets for [`Flow::filter_by_offset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipOffset {
    thresholds: BTreeMap<Direction, usize>,
}

impl SkipOffset {
    /// Creates an empty mapping (filters nothing).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            thresholds: BTreeMap::new(),
        }
    }

    /// Sets the threshold for a direction.
    #[must_use]
    pub fn with(mut self, direction: Direction, offset: usize) -> Self {
        self.set(direction, offset);
        self
    }

    /// Sets the threshold for a direction in place.
    pub fn set(&mut self, direction: Direction, offset: usize) {
        self.thresholds.insert(direction, offset);
    }

    /// Threshold for a direction, if one is set.
    #[must_use]
    pub fn get(&self, direction: Direction) -> Option<usize> {
        self.thresholds.get(&direction).copied()
    }

    /// Directions that carry a threshold.
    pub fn directions(&self) -> impl Iterator<Item = Direction> + '_ {
        self.thresholds.keys().copied()
    }

    /// Checks if no direction is filtered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_flow() -> Flow {
        Flow::from_entries(vec![
            Entry::new(Direction::Sent, 0, vec![1; 4]),
            Entry::new(Direction::Received, 0, vec![2; 8]),
            Entry::new(Direction::Sent, 4, vec![3; 4]),
            Entry::new(Direction::Received, 8, vec![4; 2]),
            Entry::new(Direction::Sent, 8, vec![5; 1]),
        ])
    }

    #[test]
    fn test_stream_concatenation() {
        let flow = sample_flow();
        assert_eq!(
            flow.stream(Direction::Sent),
            vec![1, 1, 1, 1, 3, 3, 3, 3, 5]
        );
        assert_eq!(flow.stream(Direction::Received).len(), 10);
    }

    #[test]
    fn test_filter_empty_skip_returns_all() {
        let flow = sample_flow();
        assert_eq!(flow.filter_by_offset(&SkipOffset::new()).len(), 5);
    }

    #[test]
    fn test_filter_single_direction() {
        let flow = sample_flow();
        let skip = SkipOffset::new().with(Direction::Received, 8);
        let rest = flow.filter_by_offset(&skip);
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0], Entry::new(Direction::Received, 8, vec![4; 2]));
    }

    #[test]
    fn test_filter_both_directions() {
        let flow = sample_flow();
        let skip = SkipOffset::new()
            .with(Direction::Sent, 4)
            .with(Direction::Received, 8);
        let rest = flow.filter_by_offset(&skip);
        assert_eq!(rest[0].direction, Direction::Received);
        assert_eq!(rest[0].offset, 8);
    }

    #[test]
    fn test_filter_zero_threshold_stops_at_first_entry_of_direction() {
        let flow = sample_flow();
        let skip = SkipOffset::new().with(Direction::Received, 0);
        let rest = flow.filter_by_offset(&skip);
        assert_eq!(rest.len(), 4);
        assert_eq!(rest[0].direction, Direction::Received);
    }

    #[test]
    fn test_filter_unreachable_threshold_is_empty() {
        let flow = sample_flow();
        let skip = SkipOffset::new().with(Direction::Sent, 1000);
        assert!(flow.filter_by_offset(&skip).is_empty());
        assert!(Flow::new().filter_by_offset(&skip).is_empty());
    }

    #[test]
    fn test_split_entry() {
        let mut flow = sample_flow();
        assert!(flow.split_entry(1, 3));
        assert_eq!(flow.len(), 6);
        assert_eq!(flow[1], Entry::new(Direction::Received, 0, vec![2; 3]));
        assert_eq!(flow[2], Entry::new(Direction::Received, 3, vec![2; 5]));
        assert_eq!(flow.stream(Direction::Received).len(), 10);
    }

    #[test]
    fn test_split_entry_rejects_boundaries() {
        let mut flow = sample_flow();
        assert!(!flow.split_entry(1, 0));
        assert!(!flow.split_entry(1, 8));
        assert!(!flow.split_entry(42, 1));
        assert_eq!(flow, sample_flow());
    }

    #[test]
    fn test_find_entry() {
        let flow = sample_flow();
        assert_eq!(flow.find_entry(Direction::Sent, 5), Some(2));
        assert_eq!(flow.find_entry(Direction::Received, 9), Some(3));
        assert_eq!(flow.find_entry(Direction::Sent, 9), None);
    }

    #[test]
    fn test_map_data() {
        let flow = sample_flow().map_data(|mut data| {
            data.iter_mut().for_each(|b| *b = 0);
            data
        });
        assert!(flow.iter().all(|e| e.data.iter().all(|&b| b == 0)));
        assert_eq!(flow[2].offset, 4);
    }
}
