//! File I/O for flowdiff.
//!
//! Provides file reading with memory mapping support for large captures,
//! and the loading pipeline that turns files into flows.

pub mod loader;
pub mod reader;

pub use loader::{LoadOptions, load_flow, load_flows, load_raw_flow, load_raw_flows};
pub use reader::{CaptureFile, read_bytes, read_text};
