//! Multi-flow alignment and heuristic diffing.
//!
//! Flows are aligned positionally: the n-th entries of every flow form a
//! column, and each column is analyzed independently into an
//! [`EntryReport`]. Iteration stops at the shortest flow or at the
//! configured entry limit, and reports are computed lazily so callers can
//! stop early without paying for later columns.

pub mod heuristics;
pub mod report;

pub use heuristics::analyze_column;
pub use report::{
    CommonSuffix, EntryReport, FixedDifference, FixedDifferences, LengthByteHint, Relation,
};

use crate::core::{Entry, Flow, SkipOffset};
use std::iter::FusedIterator;

/// Default cap on fixed-difference findings per column.
pub const DEFAULT_FIX_DIFF_THRESHOLD: usize = 10;

/// Diff configuration.
///
/// # Examples
///
/// ```
/// use flowdiff::core::{Direction, SkipOffset};
/// use flowdiff::diff::DiffOptions;
///
/// let options = DiffOptions::new()
///     .max_entries(5)
///     .skip_offset(SkipOffset::new().with(Direction::Sent, 0x20))
///     .fix_diff_threshold(3);
/// assert_eq!(options.max_entries, Some(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    /// Per-direction thresholds applied to every flow before alignment.
    pub skip_offset: Option<SkipOffset>,

    /// Maximum number of columns to report.
    pub max_entries: Option<usize>,

    /// Maximum fixed-difference findings per column (0 disables the scan).
    pub fix_diff_threshold: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffOptions {
    /// Creates options with no filtering, no limit and the default
    /// threshold.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            skip_offset: None,
            max_entries: None,
            fix_diff_threshold: DEFAULT_FIX_DIFF_THRESHOLD,
        }
    }

    /// Sets the skip thresholds.
    #[must_use]
    pub fn skip_offset(mut self, skip: SkipOffset) -> Self {
        self.skip_offset = Some(skip);
        self
    }

    /// Sets the column limit.
    #[must_use]
    pub const fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Sets the fixed-difference threshold.
    #[must_use]
    pub const fn fix_diff_threshold(mut self, threshold: usize) -> Self {
        self.fix_diff_threshold = threshold;
        self
    }
}

/// Lazy column-by-column diff over several flows.
///
/// Created by [`diff_flows`]. Input flows are only read.
#[derive(Debug, Clone)]
pub struct FlowDiff<'a> {
    flows: Vec<&'a [Entry]>,
    next: usize,
    end: usize,
    fix_diff_threshold: usize,
}

impl Iterator for FlowDiff<'_> {
    type Item = EntryReport;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let column: Vec<&Entry> = self.flows.iter().map(|f| &f[index]).collect();
        Some(analyze_column(index, &column, self.fix_diff_threshold))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FlowDiff<'_> {}

impl FusedIterator for FlowDiff<'_> {}

/// Aligns flows entry by entry and analyzes each column.
///
/// With a skip threshold every flow is first reduced to its suffix past the
/// thresholds. Flows of differing lengths are compared up to the shortest;
/// an empty flow list produces no columns.
///
/// # Examples
///
/// ```
/// use flowdiff::core::{Direction, Entry, Flow};
/// use flowdiff::diff::{DiffOptions, diff_flows};
///
/// let flows: Vec<Flow> = [[0x10u8, 0x20], [0x11, 0x21]]
///     .iter()
///     .map(|p| Flow::from_entries(vec![Entry::new(Direction::Sent, 0, p.to_vec())]))
///     .collect();
///
/// let reports: Vec<_> = diff_flows(&flows, &DiffOptions::new()).collect();
/// assert_eq!(reports.len(), 1);
/// assert!(reports[0].common_bytes.is_empty());
/// ```
#[must_use]
pub fn diff_flows<'a>(flows: &'a [Flow], options: &DiffOptions) -> FlowDiff<'a> {
    let views: Vec<&'a [Entry]> = flows
        .iter()
        .map(|flow| {
            options
                .skip_offset
                .as_ref()
                .map_or(flow.entries(), |skip| flow.filter_by_offset(skip))
        })
        .collect();

    let shortest = views.iter().map(|v| v.len()).min().unwrap_or(0);
    let longest = views.iter().map(|v| v.len()).max().unwrap_or(0);
    if shortest != longest {
        tracing::debug!(
            shortest,
            longest,
            "flows differ in entry count, aligning up to the shortest"
        );
    }

    let end = options
        .max_entries
        .map_or(shortest, |max| shortest.min(max));

    FlowDiff {
        flows: views,
        next: 0,
        end,
        fix_diff_threshold: options.fix_diff_threshold,
    }
}
