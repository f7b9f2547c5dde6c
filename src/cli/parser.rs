//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use crate::diff::DEFAULT_FIX_DIFF_THRESHOLD;
use crate::reconstruct::parse_offset;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// flowdiff: compare captured network sessions.
///
/// Reconstructs flows from indented hex dumps and highlights what stays
/// constant, what tracks lengths and which bytes move together across
/// several captures of the same protocol exchange.
#[derive(Parser, Debug)]
#[command(name = "flowdiff")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true, env = "FLOWDIFF_FORMAT")]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Diff hex-dump flows entry by entry.
    Diff {
        /// Hex dump files, one flow each.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Maximum number of entries to compare.
        #[arg(short = 'm', long)]
        max_entries: Option<usize>,

        /// Skip entries until the sent stream reaches this offset.
        #[arg(short = 's', long, value_parser = parse_offset_arg)]
        skip_sent: Option<usize>,

        /// Skip entries until the received stream reaches this offset.
        #[arg(short = 'r', long, value_parser = parse_offset_arg)]
        skip_received: Option<usize>,

        /// Decoder applied to every entry (identity, not, xor:<hex>).
        #[arg(short = 'd', long)]
        decoder: Option<String>,

        /// Fragmentation rules, e.g. "s0x10,r4".
        #[arg(short = 'f', long)]
        frag_rules: Option<String>,

        /// Maximum fixed-difference findings per entry (0 disables).
        #[arg(
            short = 't',
            long,
            default_value_t = DEFAULT_FIX_DIFF_THRESHOLD,
            env = "FLOWDIFF_FIX_DIFF_THRESHOLD"
        )]
        threshold: usize,
    },

    /// Diff raw binary files, each treated as a single entry.
    Bindiff {
        /// Binary files.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Maximum fixed-difference findings (0 disables).
        #[arg(
            short = 't',
            long,
            default_value_t = DEFAULT_FIX_DIFF_THRESHOLD,
            env = "FLOWDIFF_FIX_DIFF_THRESHOLD"
        )]
        threshold: usize,
    },

    /// Show the reconstructed entries of one flow.
    Show {
        /// Hex dump file.
        file: PathBuf,

        /// Decoder applied to every entry (identity, not, xor:<hex>).
        #[arg(short = 'd', long)]
        decoder: Option<String>,

        /// Fragmentation rules, e.g. "s0x10,r4".
        #[arg(short = 'f', long)]
        frag_rules: Option<String>,
    },

    /// Replay one side of a flow over TCP.
    #[command(subcommand)]
    Replay(ReplayCommands),
}

/// Replay modes.
#[derive(Subcommand, Debug)]
pub enum ReplayCommands {
    /// Connect to a server and play the sent side.
    Client {
        /// Server host.
        host: String,

        /// Server port.
        port: u16,

        /// Hex dump file.
        file: PathBuf,
    },

    /// Listen for clients and play the received side.
    Server {
        /// Port to listen on.
        port: u16,

        /// Hex dump file.
        file: PathBuf,

        /// Exit after the first session.
        #[arg(long)]
        once: bool,
    },
}

/// Accepts decimal or `0x`-prefixed hexadecimal offsets.
fn parse_offset_arg(value: &str) -> Result<usize, String> {
    parse_offset(value).ok_or_else(|| format!("invalid offset: {value}"))
}
