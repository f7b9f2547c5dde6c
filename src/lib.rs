//! # flowdiff
//!
//! Reconstruction and heuristic diffing of captured network flows.
//!
//! flowdiff turns indented hex dumps (sent rows flush left, received rows
//! indented) into ordered, per-direction contiguous entries, then aligns
//! several such flows entry by entry to point out protocol structure.
//!
//! ## Features
//!
//! - **Reconstruction**: reassembly of 16-byte dump rows into whole entries
//! - **Fragmentation rules**: manual entry splitting at stream offsets
//! - **Heuristic diff**: common bytes, length fields, shared suffixes and
//!   byte pairs in constant relation
//! - **Replay**: playing either side of a flow over TCP

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2)
#![warn(unsafe_code)]

pub mod cli;
pub mod core;
pub mod decode;
pub mod diff;
pub mod error;
pub mod io;
pub mod reconstruct;
pub mod replay;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use crate::core::{Direction, Entry, Flow, SkipOffset};

// Re-export reconstruction types
pub use reconstruct::{FragRules, reconstruct};

// Re-export decoder types
pub use decode::{Decoder, available_decoders, create_decoder};

// Re-export diff types
pub use diff::{DEFAULT_FIX_DIFF_THRESHOLD, DiffOptions, EntryReport, FlowDiff, diff_flows};

// Re-export loading types
pub use io::{LoadOptions, load_flow, load_flows, load_raw_flow};

// Re-export replay types
pub use replay::{ReplaySummary, Replayer, Role};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
