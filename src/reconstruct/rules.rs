//! Manual re-fragmentation rules.
//!
//! A rule forces an entry boundary at an absolute stream offset of one
//! direction. Rules are written as comma-separated `<dir><offset>` tokens
//! where `dir` is `s` (sent) or `r` (received) and the offset is decimal or
//! `0x`-prefixed hex: `s12,r0x20,s40`.

use crate::core::{Direction, Flow};
use crate::error::{ParseError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Parsed fragmentation rules, grouped by direction in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragRules {
    rules: BTreeMap<Direction, BTreeSet<usize>>,
}

impl FragRules {
    /// Creates an empty rule set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Parses an optional rule spec; `None` yields an empty rule set.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidRule`] for unknown direction characters
    /// or malformed offsets.
    pub fn parse(spec: Option<&str>) -> Result<Self> {
        spec.map_or_else(|| Ok(Self::new()), str::parse)
    }

    /// Adds a boundary at `offset` for `direction`.
    #[must_use]
    pub fn with(mut self, direction: Direction, offset: usize) -> Self {
        self.insert(direction, offset);
        self
    }

    /// Adds a boundary in place.
    pub fn insert(&mut self, direction: Direction, offset: usize) {
        self.rules.entry(direction).or_default().insert(offset);
    }

    /// Offsets for a direction, ascending.
    pub fn offsets(&self, direction: Direction) -> impl Iterator<Item = usize> + '_ {
        self.rules.get(&direction).into_iter().flatten().copied()
    }

    /// Checks if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.values().all(BTreeSet::is_empty)
    }

    /// Total number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.values().map(BTreeSet::len).sum()
    }

    /// Splits the flow's entries at every rule offset.
    ///
    /// Rules are applied one at a time in ascending order per direction,
    /// each against the entry list as left by the previous split. A rule
    /// whose offset lies outside every entry of its direction, or exactly on
    /// an existing boundary, changes nothing. Returns the number of splits
    /// performed.
    pub fn apply(&self, flow: &mut Flow) -> usize {
        let mut splits = 0;
        for direction in Direction::ALL {
            for offset in self.offsets(direction) {
                let hit = flow
                    .find_entry(direction, offset)
                    .is_some_and(|index| flow.split_entry(index, offset));
                if hit {
                    splits += 1;
                } else {
                    tracing::debug!(%direction, offset, "fragmentation rule matched no entry");
                }
            }
        }
        splits
    }
}

impl FromStr for FragRules {
    type Err = crate::error::Error;

    fn from_str(spec: &str) -> Result<Self> {
        let mut rules = Self::new();
        for token in spec.split(',').map(str::trim) {
            let (direction, offset) = parse_rule(token)?;
            rules.insert(direction, offset);
        }
        Ok(rules)
    }
}

fn parse_rule(token: &str) -> Result<(Direction, usize)> {
    let invalid = |reason: &str| ParseError::InvalidRule {
        rule: token.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = token.chars();
    let tag = chars.next().ok_or_else(|| invalid("empty rule"))?;
    let direction =
        Direction::from_tag(tag).ok_or_else(|| invalid("direction must be 's' or 'r'"))?;
    let offset = parse_offset(chars.as_str()).ok_or_else(|| invalid("bad offset"))?;

    Ok((direction, offset))
}

/// Parses a decimal or `0x`-prefixed hexadecimal offset.
///
/// # Examples
///
/// ```
/// use flowdiff::reconstruct::parse_offset;
///
/// assert_eq!(parse_offset("42"), Some(42));
/// assert_eq!(parse_offset("0x2a"), Some(42));
/// assert_eq!(parse_offset("0X2A"), Some(42));
/// assert_eq!(parse_offset("x"), None);
/// ```
#[must_use]
pub fn parse_offset(text: &str) -> Option<usize> {
    match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Entry;

    fn flow() -> Flow {
        Flow::from_entries(vec![
            Entry::new(Direction::Sent, 0, (0..10).collect()),
            Entry::new(Direction::Received, 0, (100..120).collect()),
            Entry::new(Direction::Sent, 10, (10..14).collect()),
        ])
    }

    #[test]
    fn test_parse_rules() {
        let rules: FragRules = "s12,r0x20,s4".parse().unwrap();
        assert_eq!(rules.offsets(Direction::Sent).collect::<Vec<_>>(), vec![4, 12]);
        assert_eq!(rules.offsets(Direction::Received).collect::<Vec<_>>(), vec![32]);
        assert_eq!(rules.len(), 3);
    }

    #[test]
    fn test_parse_none_is_empty() {
        let rules = FragRules::parse(None).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        assert!("x10".parse::<FragRules>().is_err());
        assert!("s".parse::<FragRules>().is_err());
        assert!("s1,,r2".parse::<FragRules>().is_err());
        assert!("r0xzz".parse::<FragRules>().is_err());
    }

    #[test]
    fn test_apply_splits_matching_entry() {
        let mut flow = flow();
        let splits = FragRules::new().with(Direction::Sent, 6).apply(&mut flow);
        assert_eq!(splits, 1);
        assert_eq!(flow.len(), 4);
        assert_eq!(flow[0], Entry::new(Direction::Sent, 0, (0..6).collect()));
        assert_eq!(flow[1], Entry::new(Direction::Sent, 6, (6..10).collect()));
        assert_eq!(flow[2].direction, Direction::Received);
    }

    #[test]
    fn test_apply_successive_rules_on_same_entry() {
        let mut flow = flow();
        let rules = FragRules::new()
            .with(Direction::Received, 15)
            .with(Direction::Received, 5);
        assert_eq!(rules.apply(&mut flow), 2);
        let received: Vec<_> = flow
            .iter()
            .filter(|e| e.direction == Direction::Received)
            .map(|e| (e.offset, e.len()))
            .collect();
        assert_eq!(received, vec![(0, 5), (5, 10), (15, 5)]);
    }

    #[test]
    fn test_apply_miss_is_silent() {
        let mut flow = flow();
        let rules = FragRules::new()
            .with(Direction::Sent, 10)
            .with(Direction::Sent, 500)
            .with(Direction::Received, 0);
        assert_eq!(rules.apply(&mut flow), 0);
        assert_eq!(flow, self::flow());
    }
}
