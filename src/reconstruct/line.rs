//! Hex-dump row parsing.
//!
//! A row looks like `<indent><hex-offset><ws><hex bytes>`, optionally
//! followed by an ASCII column. No indentation means the row was sent by
//! the capturing endpoint; any leading whitespace means it was received.
//!
//! ```text
//! 00000000  16 03 01 00 a5 01 00 00  a1 03 03 5b 90 9d 9b 72  ...........[...r
//!     00000000  16 03 03 00 5d 02 00 00  59 03 03 5b 90 9d 9b 3f  ....]...Y..[...?
//! ```

use crate::core::Direction;
use crate::error::{ParseError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Returns the compiled row grammar.
///
/// The payload group is capped at 49 characters: 16 bytes with separators
/// plus the extra gap between the two 8-byte halves.
#[allow(clippy::expect_used)]
fn row_regex() -> &'static Regex {
    static ROW_RE: OnceLock<Regex> = OnceLock::new();
    ROW_RE.get_or_init(|| {
        Regex::new(r"(?i)^(\s*)([0-9a-f]+)\s+([0-9a-f\s]{1,49})").expect("valid regex")
    })
}

/// One decoded dump row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexRow {
    /// Direction derived from the row's indentation.
    pub direction: Direction,
    /// Stream offset printed at the start of the row.
    pub offset: usize,
    /// Decoded payload bytes.
    pub data: Vec<u8>,
}

/// Parses one dump line.
///
/// Returns `Ok(None)` for lines that do not match the row grammar (headers,
/// separators, blank lines) and for rows whose payload is blank. A blank
/// payload row is dropped before reassembly, so it does not close a pending
/// 16-byte run.
///
/// # Arguments
///
/// * `line_no` - 1-based line number, used in error messages.
/// * `line` - The raw line text.
///
/// # Errors
///
/// Returns [`ParseError::InvalidHex`] when the payload holds an odd number of
/// hex digits, and [`ParseError::InvalidOffset`] when the offset overflows.
///
/// # Examples
///
/// ```
/// use flowdiff::core::Direction;
/// use flowdiff::reconstruct::parse_line;
///
/// let row = parse_line(1, "    00000010  de ad be ef").unwrap().unwrap();
/// assert_eq!(row.direction, Direction::Received);
/// assert_eq!(row.offset, 0x10);
/// assert_eq!(row.data, vec![0xde, 0xad, 0xbe, 0xef]);
///
/// assert!(parse_line(2, "=== end of stream ===").unwrap().is_none());
/// ```
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<HexRow>> {
    let Some(caps) = row_regex().captures(line) else {
        return Ok(None);
    };

    let direction = if caps[1].is_empty() {
        Direction::Sent
    } else {
        Direction::Received
    };

    let offset = usize::from_str_radix(&caps[2], 16).map_err(|_| ParseError::InvalidOffset {
        line: line_no,
        value: caps[2].to_string(),
    })?;

    let digits: String = caps[3].chars().filter(char::is_ascii_hexdigit).collect();
    if digits.is_empty() {
        return Ok(None);
    }

    let data = hex::decode(&digits).map_err(|e| ParseError::InvalidHex {
        line: line_no,
        reason: e.to_string(),
    })?;

    Ok(Some(HexRow {
        direction,
        offset,
        data,
    }))
}
