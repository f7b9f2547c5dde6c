//! Hex-dump to flow reconstruction.
//!
//! - **Line parsing**: one dump row into direction, offset and bytes
//! - **Reassembly**: rows into contiguous directional entries
//! - **Rules**: optional manual re-fragmentation of the result

pub mod line;
pub mod reassembly;
pub mod rules;

pub use line::{HexRow, parse_line};
pub use reassembly::{EntryStream, ROW_WIDTH, Reassembler, reconstruct};
pub use rules::{FragRules, parse_offset};
