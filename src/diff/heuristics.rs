//! Pattern detection over one aligned column.
//!
//! Every function here is pure: it reads the entries of a single column and
//! never looks at neighbouring columns. All positional scans stop at the
//! shortest entry.

use crate::core::Entry;
use crate::diff::report::{
    CommonSuffix, EntryReport, FixedDifference, FixedDifferences, LengthByteHint,
};

/// Builds the full report for one column.
///
/// `column` must hold at least one entry.
#[must_use]
pub fn analyze_column(index: usize, column: &[&Entry], fix_diff_threshold: usize) -> EntryReport {
    let lengths = column.iter().map(|e| e.len()).collect();
    let offsets = column.iter().map(|e| e.offset).collect();
    let directions = column.iter().map(|e| e.direction).collect();
    let min_len = min_length(column);

    let common_bytes = common_bytes(column, min_len);
    let varying = column.iter().any(|e| e.len() != min_len);
    let (length_hints, common_suffix) = if varying {
        (length_hints(column, min_len), common_suffix(column, min_len))
    } else {
        (Vec::new(), None)
    };

    let collapsed = all_same(column);
    let fixed_differences = (!collapsed && fix_diff_threshold > 0)
        .then(|| fixed_differences(column, &common_bytes, min_len, fix_diff_threshold));

    let entries = if collapsed {
        column.iter().take(1).map(|&e| e.clone()).collect()
    } else {
        column.iter().map(|&e| e.clone()).collect()
    };

    EntryReport {
        index,
        lengths,
        offsets,
        directions,
        common_bytes,
        length_hints,
        common_suffix,
        collapsed,
        fixed_differences,
        entries,
    }
}

/// Length of the shortest entry.
#[must_use]
pub fn min_length(column: &[&Entry]) -> usize {
    column.iter().map(|e| e.len()).min().unwrap_or(0)
}

/// Positions below `min_len` where every entry matches the first.
#[must_use]
pub fn common_bytes(column: &[&Entry], min_len: usize) -> Vec<usize> {
    let Some((first, rest)) = column.split_first() else {
        return Vec::new();
    };
    (0..min_len)
        .filter(|&n| rest.iter().all(|e| e.data[n] == first.data[n]))
        .collect()
}

/// Positions whose byte minus the entry length is the same signed value in
/// every entry.
#[must_use]
pub fn length_hints(column: &[&Entry], min_len: usize) -> Vec<LengthByteHint> {
    let Some((first, rest)) = column.split_first() else {
        return Vec::new();
    };
    (0..min_len)
        .filter_map(|i| {
            let delta = length_delta(first.data[i], first.len());
            rest.iter()
                .all(|e| length_delta(e.data[i], e.len()) == delta)
                .then(|| LengthByteHint {
                    position: i,
                    magnitude: usize::try_from(delta.unsigned_abs()).unwrap_or(usize::MAX),
                })
        })
        .collect()
}

fn length_delta(byte: u8, len: usize) -> i128 {
    i128::from(byte) - i128::try_from(len).unwrap_or(i128::MAX)
}

/// Longest tail, shorter than `min_len`, shared by every entry.
#[must_use]
pub fn common_suffix(column: &[&Entry], min_len: usize) -> Option<CommonSuffix> {
    let (first, rest) = column.split_first()?;
    (1..min_len).rev().find_map(|n| {
        let tail = &first.data[first.len() - n..];
        rest.iter()
            .all(|e| &e.data[e.len() - n..] == tail)
            .then(|| CommonSuffix {
                bytes: tail.to_vec(),
            })
    })
}

/// Checks whether every entry carries identical bytes.
#[must_use]
pub fn all_same(column: &[&Entry]) -> bool {
    column
        .split_first()
        .is_none_or(|(first, rest)| rest.iter().all(|e| e.data == first.data))
}

/// Scans for byte pairs whose difference is constant across the column.
///
/// The outer loop walks positions `b` upward, skipping positions listed in
/// `common`; the inner loop walks `a < b` upward. Each qualifying pair is
/// reported as `(a, b)`. Once `threshold` findings are collected the next
/// qualifying pair only sets the `truncated` flag and the scan stops.
#[must_use]
pub fn fixed_differences(
    column: &[&Entry],
    common: &[usize],
    min_len: usize,
    threshold: usize,
) -> FixedDifferences {
    let mut result = FixedDifferences::default();
    let Some((first, rest)) = column.split_first() else {
        return result;
    };

    for b in (0..min_len).filter(|b| common.binary_search(b).is_err()) {
        for a in 0..b {
            let difference = byte_difference(first.data[a], first.data[b]);
            if !rest
                .iter()
                .all(|e| byte_difference(e.data[a], e.data[b]) == difference)
            {
                continue;
            }
            if result.findings.len() >= threshold {
                result.truncated = true;
                return result;
            }
            result.findings.push(FixedDifference {
                first: a,
                second: b,
                difference,
                first_values: column.iter().map(|e| e.data[a]).collect(),
                second_values: column.iter().map(|e| e.data[b]).collect(),
            });
        }
    }

    result
}

fn byte_difference(a: u8, b: u8) -> i16 {
    i16::from(a) - i16::from(b)
}
