//! Error types for flowdiff operations.
//!
//! This module provides the error hierarchy using `thiserror` for flow
//! reconstruction, rule parsing, file I/O, replay and CLI commands.
//!
//! Two conditions are deliberately absent: a fragmentation rule that
//! matches no entry, and flows of differing entry counts. Both are expected
//! during exploratory analysis and are only logged.

use crate::core::Direction;
use thiserror::Error;

/// Result type alias for flowdiff operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input text (hex rows, rules, decoder specs).
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Reconstructed stream violates per-direction contiguity.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Socket replay errors.
    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Errors raised while parsing textual input.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Hex payload of a dump row could not be decoded.
    #[error("line {line}: invalid hex data: {reason}")]
    InvalidHex {
        /// 1-based line number in the dump.
        line: usize,
        /// Decoder failure description.
        reason: String,
    },

    /// Row offset does not fit in the address space.
    #[error("line {line}: invalid offset {value}")]
    InvalidOffset {
        /// 1-based line number in the dump.
        line: usize,
        /// The offending offset text.
        value: String,
    },

    /// Fragmentation rule token is malformed.
    #[error("invalid fragmentation rule '{rule}': {reason}")]
    InvalidRule {
        /// The offending rule token.
        rule: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Decoder name is not registered.
    #[error("unknown decoder: {name}")]
    UnknownDecoder {
        /// Requested decoder name.
        name: String,
    },

    /// Decoder argument is malformed.
    #[error("invalid argument for decoder {name}: {reason}")]
    InvalidDecoderArgument {
        /// Decoder name.
        name: String,
        /// Why the argument was rejected.
        reason: String,
    },
}

/// Errors raised when reconstructed rows break stream invariants.
#[derive(Error, Debug)]
pub enum StreamError {
    /// A row's offset is not the next expected offset for its direction.
    #[error("line {line}: {direction} stream expected offset {expected:#x}, got {actual:#x}")]
    Contiguity {
        /// 1-based line number in the dump.
        line: usize,
        /// Direction of the offending row.
        direction: Direction,
        /// Offset the stream was expecting.
        expected: usize,
        /// Offset found in the row.
        actual: usize,
    },
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Memory mapping error.
    #[error("memory mapping failed: {path}: {reason}")]
    MmapFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// Errors raised while replaying a flow over a socket.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Could not connect to the peer.
    #[error("failed to connect to {address}: {reason}")]
    Connect {
        /// Peer address.
        address: String,
        /// Reason for failure.
        reason: String,
    },

    /// Could not bind or accept on the listening socket.
    #[error("failed to listen on {address}: {reason}")]
    Listen {
        /// Local address.
        address: String,
        /// Reason for failure.
        reason: String,
    },

    /// Writing an entry failed.
    #[error("entry {entry}: send failed: {reason}")]
    Send {
        /// Index of the entry in the flow.
        entry: usize,
        /// Reason for failure.
        reason: String,
    },

    /// Reading an entry failed.
    #[error("entry {entry}: receive failed: {reason}")]
    Receive {
        /// Index of the entry in the flow.
        entry: usize,
        /// Reason for failure.
        reason: String,
    },

    /// Peer closed the connection before an expected entry arrived.
    #[error("entry {entry}: connection closed after {received} of {expected} bytes")]
    ConnectionClosed {
        /// Index of the entry in the flow.
        entry: usize,
        /// Bytes the entry carries.
        expected: usize,
        /// Bytes received before the peer closed.
        received: usize,
    },
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config {
            message: "unknown output format: yaml".to_string(),
        };
        assert_eq!(err.to_string(), "configuration error: unknown output format: yaml");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::InvalidHex {
            line: 3,
            reason: "Odd number of digits".to_string(),
        };
        assert_eq!(err.to_string(), "line 3: invalid hex data: Odd number of digits");

        let err = ParseError::InvalidRule {
            rule: "x10".to_string(),
            reason: "unknown direction".to_string(),
        };
        assert!(err.to_string().contains("x10"));

        let err = ParseError::UnknownDecoder {
            name: "rot13".to_string(),
        };
        assert_eq!(err.to_string(), "unknown decoder: rot13");
    }

    #[test]
    fn test_stream_error_display() {
        let err = StreamError::Contiguity {
            line: 7,
            direction: Direction::Received,
            expected: 0x20,
            actual: 0x30,
        };
        assert_eq!(
            err.to_string(),
            "line 7: received stream expected offset 0x20, got 0x30"
        );
    }

    #[test]
    fn test_replay_error_display() {
        let err = ReplayError::ConnectionClosed {
            entry: 2,
            expected: 10,
            received: 4,
        };
        assert_eq!(
            err.to_string(),
            "entry 2: connection closed after 4 of 10 bytes"
        );
    }

    #[test]
    fn test_io_error_variants() {
        let err = IoError::FileNotFound {
            path: "/tmp/flow.txt".to_string(),
        };
        assert_eq!(err.to_string(), "file not found: /tmp/flow.txt");

        let err = IoError::MmapFailed {
            path: "/tmp/big".to_string(),
            reason: "out of memory".to_string(),
        };
        assert!(err.to_string().contains("memory mapping"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_domain_errors() {
        let err: Error = ParseError::UnknownDecoder {
            name: "x".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Parse(_)));

        let err: Error = CommandError::InvalidArgument("port 0".to_string()).into();
        assert!(matches!(err, Error::Command(_)));

        let err: Error = ReplayError::Send {
            entry: 0,
            reason: "broken pipe".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Replay(_)));
    }
}
