//! Flow reconstruction with fragment reassembly.
//!
//! The dump format prints at most 16 bytes per row, so a row of exactly 16
//! bytes may be the head of a longer transmission. Such rows are held as a
//! pending chunk and merged with the following rows of the same direction
//! until a shorter row, a direction change, or the end of input closes it.
//! When no row is exactly 16 bytes long this degrades to one entry per row.

use crate::core::{Direction, Entry, Flow};
use crate::error::{Result, StreamError};
use crate::reconstruct::line::{HexRow, parse_line};
use std::collections::VecDeque;

/// Width of a full dump row in bytes.
pub const ROW_WIDTH: usize = 16;

/// Chunk accumulated from full-width rows, not yet emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending {
    direction: Direction,
    offset: usize,
    data: Vec<u8>,
}

impl Pending {
    fn into_entry(self) -> Entry {
        Entry::new(self.direction, self.offset, self.data)
    }
}

/// Reassembly state for a single reconstruction pass.
///
/// Tracks the next expected offset per direction and at most one pending
/// chunk. Feed rows with [`Reassembler::push`] and drain the final chunk
/// with [`Reassembler::finish`].
#[derive(Debug, Clone, Default)]
pub struct Reassembler {
    expected: [usize; 2],
    pending: Option<Pending>,
}

impl Reassembler {
    /// Creates a reassembler with both streams at offset 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next expected stream offset for a direction.
    #[must_use]
    pub const fn expected_offset(&self, direction: Direction) -> usize {
        self.expected[direction.index()]
    }

    /// Feeds one row, returning the entries it completes (zero, one or two).
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Contiguity`] when the row's offset is not the
    /// next expected offset for its direction.
    pub fn push(&mut self, line_no: usize, row: HexRow) -> Result<[Option<Entry>; 2]> {
        let mut completed = [None, None];

        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.direction != row.direction)
        {
            completed[0] = self.pending.take().map(Pending::into_entry);
        }

        let expected = &mut self.expected[row.direction.index()];
        if *expected != row.offset {
            return Err(StreamError::Contiguity {
                line: line_no,
                direction: row.direction,
                expected: *expected,
                actual: row.offset,
            }
            .into());
        }
        *expected += row.data.len();

        if row.data.len() == ROW_WIDTH {
            match &mut self.pending {
                Some(pending) => pending.data.extend_from_slice(&row.data),
                None => {
                    self.pending = Some(Pending {
                        direction: row.direction,
                        offset: row.offset,
                        data: row.data,
                    });
                }
            }
        } else {
            let entry = match self.pending.take() {
                Some(mut pending) => {
                    pending.data.extend_from_slice(&row.data);
                    pending.into_entry()
                }
                None => Entry::new(row.direction, row.offset, row.data),
            };
            completed[1] = Some(entry);
        }

        Ok(completed)
    }

    /// Flushes the pending chunk, if any, using only its own bytes.
    #[must_use]
    pub fn finish(self) -> Option<Entry> {
        self.pending.map(Pending::into_entry)
    }
}

/// Lazy reconstruction over dump lines.
///
/// Yields entries as soon as they are complete. After the first error the
/// stream is exhausted.
///
/// # Examples
///
/// ```
/// use flowdiff::reconstruct::EntryStream;
///
/// let dump = "00000000  01 02\n    00000000  03\n";
/// let entries: Vec<_> = EntryStream::new(dump.lines())
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(entries.len(), 2);
/// ```
#[derive(Debug)]
pub struct EntryStream<I> {
    lines: std::iter::Enumerate<I>,
    state: Option<Reassembler>,
    ready: VecDeque<Entry>,
}

impl<I: Iterator> EntryStream<I> {
    /// Wraps an iterator of dump lines.
    pub fn new<T>(lines: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            lines: lines.into_iter().enumerate(),
            state: Some(Reassembler::new()),
            ready: VecDeque::new(),
        }
    }
}

impl<I, S> Iterator for EntryStream<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.ready.pop_front() {
                return Some(Ok(entry));
            }

            let state = self.state.as_mut()?;
            let Some((index, line)) = self.lines.next() else {
                return self.state.take().and_then(Reassembler::finish).map(Ok);
            };

            let line_no = index + 1;
            let step = parse_line(line_no, line.as_ref())
                .and_then(|row| row.map_or(Ok([None, None]), |row| state.push(line_no, row)));

            match step {
                Ok(completed) => self.ready.extend(completed.into_iter().flatten()),
                Err(e) => {
                    self.state = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Reconstructs a flow from dump lines.
///
/// Lines that do not match the row grammar are ignored.
///
/// # Errors
///
/// Returns a parse error for malformed hex and a stream error when rows
/// are not contiguous per direction.
///
/// # Examples
///
/// ```
/// use flowdiff::core::Direction;
/// use flowdiff::reconstruct::reconstruct;
///
/// let dump = "\
/// 00000000  00 01 02 03 04 05 06 07  08 09 0a 0b 0c 0d 0e 0f
/// 00000010  10 11
///     00000000  ff
/// ";
/// let flow = reconstruct(dump.lines()).unwrap();
/// assert_eq!(flow.len(), 2);
/// assert_eq!(flow[0].len(), 18);
/// assert_eq!(flow[1].direction, Direction::Received);
/// ```
pub fn reconstruct<T, S>(lines: T) -> Result<Flow>
where
    T: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    EntryStream::new(lines).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn row(direction: Direction, offset: usize, len: usize, fill: u8) -> HexRow {
        HexRow {
            direction,
            offset,
            data: vec![fill; len],
        }
    }

    fn dump_row(indent: &str, offset: usize, data: &[u8]) -> String {
        let hex: Vec<String> = data.iter().map(|b| format!("{b:02x}")).collect();
        format!("{indent}{offset:08x}  {}", hex.join(" "))
    }

    #[test]
    fn test_short_rows_are_standalone_entries() {
        let mut r = Reassembler::new();
        let out = r.push(1, row(Direction::Sent, 0, 4, 1)).unwrap();
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(Entry::new(Direction::Sent, 0, vec![1; 4])));
        assert_eq!(r.expected_offset(Direction::Sent), 4);
        assert_eq!(r.finish(), None);
    }

    #[test]
    fn test_full_rows_merge_until_short_row() {
        let mut r = Reassembler::new();
        for i in 0..3 {
            let out = r.push(i + 1, row(Direction::Sent, i * 16, 16, 7)).unwrap();
            assert_eq!(out, [None, None]);
        }
        let out = r.push(4, row(Direction::Sent, 48, 8, 7)).unwrap();
        let entry = out[1].clone().unwrap();
        assert_eq!(entry.offset, 0);
        assert_eq!(entry.len(), 56);
        assert_eq!(r.finish(), None);
    }

    #[test]
    fn test_direction_change_flushes_pending() {
        let mut r = Reassembler::new();
        r.push(1, row(Direction::Sent, 0, 16, 1)).unwrap();
        let out = r.push(2, row(Direction::Received, 0, 3, 2)).unwrap();
        assert_eq!(out[0], Some(Entry::new(Direction::Sent, 0, vec![1; 16])));
        assert_eq!(out[1], Some(Entry::new(Direction::Received, 0, vec![2; 3])));
    }

    #[test]
    fn test_direction_change_to_full_row_starts_new_pending() {
        let mut r = Reassembler::new();
        r.push(1, row(Direction::Sent, 0, 16, 1)).unwrap();
        let out = r.push(2, row(Direction::Received, 0, 16, 2)).unwrap();
        assert_eq!(out[0], Some(Entry::new(Direction::Sent, 0, vec![1; 16])));
        assert_eq!(out[1], None);
        assert_eq!(
            r.finish(),
            Some(Entry::new(Direction::Received, 0, vec![2; 16]))
        );
    }

    #[test]
    fn test_finish_uses_only_pending_bytes() {
        let mut r = Reassembler::new();
        r.push(1, row(Direction::Sent, 0, 5, 1)).unwrap();
        r.push(2, row(Direction::Sent, 5, 16, 2)).unwrap();
        r.push(3, row(Direction::Sent, 21, 16, 3)).unwrap();
        let last = r.finish().unwrap();
        assert_eq!(last.offset, 5);
        assert_eq!(last.len(), 32);
        assert_eq!(&last.data[..16], &[2; 16]);
    }

    #[test]
    fn test_gap_is_contiguity_error() {
        let mut r = Reassembler::new();
        r.push(1, row(Direction::Sent, 0, 4, 1)).unwrap();
        let err = r.push(2, row(Direction::Sent, 8, 4, 1)).unwrap_err();
        assert!(matches!(
            err,
            Error::Stream(StreamError::Contiguity {
                line: 2,
                direction: Direction::Sent,
                expected: 4,
                actual: 8,
            })
        ));
    }

    #[test]
    fn test_directions_track_offsets_independently() {
        let mut r = Reassembler::new();
        r.push(1, row(Direction::Sent, 0, 4, 1)).unwrap();
        r.push(2, row(Direction::Received, 0, 9, 1)).unwrap();
        r.push(3, row(Direction::Sent, 4, 2, 1)).unwrap();
        assert_eq!(r.expected_offset(Direction::Sent), 6);
        assert_eq!(r.expected_offset(Direction::Received), 9);
    }

    #[test]
    fn test_reconstruct_ignores_noise() {
        let dump = [
            "Follow TCP stream".to_string(),
            dump_row("", 0, &[1, 2, 3]),
            String::new(),
            dump_row("    ", 0, &[4, 5]),
            "=====".to_string(),
        ];
        let flow = reconstruct(&dump).unwrap();
        assert_eq!(flow.len(), 2);
        assert_eq!(flow[0], Entry::new(Direction::Sent, 0, vec![1, 2, 3]));
        assert_eq!(flow[1], Entry::new(Direction::Received, 0, vec![4, 5]));
    }

    #[test]
    fn test_reconstruct_trailing_full_rows() {
        let dump = [
            dump_row("    ", 0, &[9; 16]),
            dump_row("    ", 16, &[8; 16]),
        ];
        let flow = reconstruct(&dump).unwrap();
        assert_eq!(flow.len(), 1);
        assert_eq!(flow[0].len(), 32);
    }

    #[test]
    fn test_blank_payload_row_does_not_split_full_rows() {
        let dump = [
            dump_row("", 0, &[1; 16]),
            "00000010      ".to_string(),
            dump_row("", 16, &[2; 16]),
            dump_row("", 32, &[3]),
        ];
        let flow = reconstruct(&dump).unwrap();
        assert_eq!(flow.len(), 1);
        assert_eq!(flow[0].len(), 33);
    }

    #[test]
    fn test_entry_stream_stops_after_error() {
        let dump = [
            dump_row("", 0, &[1]),
            dump_row("", 5, &[1]),
            dump_row("", 6, &[1]),
        ];
        let mut stream = EntryStream::new(dump.iter());
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_entry_stream_over_owned_lines() {
        let dump = vec![dump_row("", 0, &[1, 2]), dump_row("    ", 0, &[3])];
        let entries: Vec<Entry> = EntryStream::new(dump).collect::<Result<_>>().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], Entry::new(Direction::Received, 0, vec![3]));
    }

    #[test]
    fn test_reconstruct_empty_input() {
        let flow = reconstruct(std::iter::empty::<&str>()).unwrap();
        assert!(flow.is_empty());
    }
}
