//! Core domain models for flowdiff.
//!
//! Directions, entries and flows. These are pure data types with no I/O
//! dependencies.

pub mod entry;
pub mod flow;

pub use entry::{Direction, Entry};
pub use flow::{Flow, SkipOffset};
