//! CLI layer for flowdiff.
//!
//! Provides the command-line interface using clap, with commands for
//! diffing dumps and raw files, inspecting a single flow and replaying a
//! flow over TCP.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::{execute, execute_with_palette};
pub use output::{OutputFormat, Palette};
pub use parser::{Cli, Commands, ReplayCommands};
