//! File to [`Flow`] pipeline.
//!
//! Loading a dump runs reconstruction, then the optional decoder over every
//! entry, then the fragmentation rules. Several files are loaded in
//! parallel with rayon; results keep argument order.

use crate::core::{Direction, Entry, Flow};
use crate::decode::Decoder;
use crate::error::Result;
use crate::io::reader::{read_bytes, read_text};
use crate::reconstruct::{FragRules, reconstruct};
use rayon::prelude::*;
use std::fmt;
use std::path::Path;

/// Per-file processing applied after reconstruction.
#[derive(Default)]
pub struct LoadOptions {
    /// Transform applied to every entry's payload.
    pub decoder: Option<Box<dyn Decoder>>,

    /// Re-fragmentation applied after decoding.
    pub rules: Option<FragRules>,
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("decoder", &self.decoder.as_ref().map(|d| d.name()))
            .field("rules", &self.rules)
            .finish()
    }
}

impl LoadOptions {
    /// Creates options that load dumps as-is.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the decoder.
    #[must_use]
    pub fn decoder(mut self, decoder: Box<dyn Decoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Sets the fragmentation rules.
    #[must_use]
    pub fn rules(mut self, rules: FragRules) -> Self {
        self.rules = Some(rules);
        self
    }
}

/// Loads one hex dump into a flow.
///
/// # Arguments
///
/// * `path` - Dump file in the indented hex format.
/// * `options` - Decoder and fragmentation rules to apply.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a row is malformed, or a
/// direction stream is not contiguous.
///
/// # Examples
///
/// ```no_run
/// use flowdiff::io::{LoadOptions, load_flow};
///
/// let flow = load_flow("session1.txt", &LoadOptions::new()).unwrap();
/// println!("{} entries", flow.len());
/// ```
pub fn load_flow<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Flow> {
    let path = path.as_ref();
    let text = read_text(path)?;
    let mut flow = reconstruct(text.lines())?;

    if let Some(decoder) = &options.decoder {
        flow = flow.map_data(|data| decoder.decode(data));
    }

    let splits = options.rules.as_ref().map_or(0, |rules| rules.apply(&mut flow));

    tracing::debug!(
        path = %path.display(),
        entries = flow.len(),
        splits,
        "flow loaded"
    );
    Ok(flow)
}

/// Loads several dumps in parallel.
///
/// Flows are returned in the order of `paths`. The first failure (in path
/// order) is returned.
///
/// # Errors
///
/// Returns an error if any file fails to load.
pub fn load_flows<P>(paths: &[P], options: &LoadOptions) -> Result<Vec<Flow>>
where
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(|path| load_flow(path, options))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

/// Wraps a whole binary file as a single received entry at offset 0.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn load_raw_flow<P: AsRef<Path>>(path: P) -> Result<Flow> {
    let path = path.as_ref();
    let data = read_bytes(path)?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "raw file loaded");
    Ok(Flow::from_entries(vec![Entry::new(
        Direction::Received,
        0,
        data,
    )]))
}

/// Loads several binary files in parallel, one single-entry flow each.
///
/// # Errors
///
/// Returns an error if any file cannot be read.
pub fn load_raw_flows<P>(paths: &[P]) -> Result<Vec<Flow>>
where
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(load_raw_flow)
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}
