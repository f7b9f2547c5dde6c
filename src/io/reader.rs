//! Capture file reading with memory mapping support.
//!
//! Hex dumps are usually small, but raw binary samples given to `bindiff`
//! can be large, so files past a size threshold are memory mapped instead
//! of read through a buffer.

// Memory mapping requires unsafe but is sound for read-only access
#![allow(unsafe_code)]

use crate::error::{IoError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Threshold for using memory mapping (1MB).
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Maximum file size to load (1GB).
const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Reader for capture files.
///
/// - Small files (< 1MB): read directly into memory
/// - Large files (>= 1MB): memory mapped, then copied out
///
/// # Examples
///
/// ```no_run
/// use flowdiff::io::CaptureFile;
///
/// let file = CaptureFile::open("session1.txt").unwrap();
/// let dump = file.read_text().unwrap();
/// ```
pub struct CaptureFile {
    /// File handle.
    file: File,
    /// File size in bytes.
    size: u64,
    /// File path for error messages.
    path: String,
}

impl CaptureFile {
    /// Opens a capture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist, can't be opened, or
    /// exceeds the size limit.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy().to_string();

        if !path_ref.exists() {
            return Err(IoError::FileNotFound { path: path_str }.into());
        }

        let read_failed = |e: std::io::Error| IoError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        };
        let file = File::open(path_ref).map_err(read_failed)?;
        let size = file.metadata().map_err(read_failed)?.len();

        if size > MAX_FILE_SIZE {
            return Err(IoError::ReadFailed {
                path: path_str,
                reason: format!("file too large: {size} bytes (max: {MAX_FILE_SIZE} bytes)"),
            }
            .into());
        }

        Ok(Self {
            file,
            size,
            path: path_str,
        })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reads the whole file as bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or mapping fails.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        if self.size >= MMAP_THRESHOLD {
            Ok(self.mmap()?.to_vec())
        } else {
            self.read_direct()
        }
    }

    /// Reads the file as text.
    ///
    /// Invalid UTF-8 (e.g. raw bytes in a dump's ASCII column) is replaced
    /// rather than rejected; it never lands in a hex payload column.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub fn read_text(&self) -> Result<String> {
        let bytes = self.read_bytes()?;
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }

    /// Creates a memory-mapped view of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if memory mapping fails.
    pub fn mmap(&self) -> Result<Mmap> {
        // Safety: the mapping is only read
        unsafe {
            Mmap::map(&self.file).map_err(|e| {
                IoError::MmapFailed {
                    path: self.path.clone(),
                    reason: e.to_string(),
                }
                .into()
            })
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_direct(&self) -> Result<Vec<u8>> {
        let mut file = &self.file;
        let mut buffer = Vec::with_capacity(self.size as usize);
        file.read_to_end(&mut buffer)
            .map_err(|e| IoError::ReadFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(buffer)
    }
}

/// Reads a text file (typically a hex dump).
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_text<P: AsRef<Path>>(path: P) -> Result<String> {
    CaptureFile::open(path)?.read_text()
}

/// Reads a binary file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    CaptureFile::open(path)?.read_bytes()
}
