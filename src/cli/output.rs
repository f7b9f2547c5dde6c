//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats. Text output colors bytes by
//! provenance: each byte takes the color of the lowest-indexed entry in its
//! column carrying the same value at that position, so matching regions of
//! different flows line up visually.

use crate::core::{Direction, Entry, Flow};
use crate::diff::{EntryReport, Relation};
use crate::replay::ReplaySummary;
use console::Style;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Terminal width used when neither the terminal nor `COLUMNS` tells.
const DEFAULT_WIDTH: usize = 80;

/// Colors and layout for text output.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: [Style; 6],
    separator: Style,
    width: usize,
}

impl Palette {
    /// Palette for standard output.
    ///
    /// Colors are emitted only when stdout is a terminal (and `NO_COLOR` /
    /// `CLICOLOR` allow it). The width comes from the terminal, then the
    /// `COLUMNS` variable.
    #[must_use]
    pub fn for_stdout() -> Self {
        let width = console::Term::stdout()
            .size_checked()
            .map(|(_, cols)| usize::from(cols))
            .or_else(|| std::env::var("COLUMNS").ok()?.parse().ok())
            .unwrap_or(DEFAULT_WIDTH);
        Self::styled(None, width)
    }

    /// Palette that never emits escape codes.
    #[must_use]
    pub fn plain(width: usize) -> Self {
        Self::styled(Some(false), width)
    }

    fn styled(force: Option<bool>, width: usize) -> Self {
        let apply = |style: Style| match force {
            Some(value) => style.force_styling(value),
            None => style,
        };
        Self {
            colors: [
                apply(Style::new().cyan()),
                apply(Style::new().green()),
                apply(Style::new().yellow()),
                apply(Style::new().red()),
                apply(Style::new().magenta()),
                apply(Style::new().blue()),
            ],
            separator: apply(Style::new().black().bold()),
            width,
        }
    }

    /// Style for the n-th input; wraps around past the last color.
    #[must_use]
    pub fn color(&self, index: usize) -> &Style {
        &self.colors[index % self.colors.len()]
    }

    fn direction(&self, direction: Direction) -> &Style {
        self.color(direction.index())
    }

    fn separator(&self) -> String {
        self.separator
            .apply_to("-".repeat(self.width.saturating_sub(1)))
            .to_string()
    }
}

/// Index of the first entry whose byte at `position` equals `byte`.
///
/// Entries too short to reach `position` are skipped. Falls back to 0 when
/// no entry matches, which cannot happen for a byte taken from `entries`.
#[must_use]
pub fn byte_source(entries: &[Entry], position: usize, byte: u8) -> usize {
    entries
        .iter()
        .position(|e| e.data.get(position) == Some(&byte))
        .unwrap_or(0)
}

/// Formats diff reports followed by the list of inputs.
#[must_use]
pub fn format_diff<P: AsRef<Path>>(
    reports: &[EntryReport],
    inputs: &[P],
    format: OutputFormat,
    palette: &Palette,
) -> String {
    let inputs: Vec<String> = inputs
        .iter()
        .map(|p| p.as_ref().display().to_string())
        .collect();
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for report in reports {
                format_report_text(&mut output, report, palette);
            }
            format_inputs_text(&mut output, &inputs, palette);
            output
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct DiffOutput<'a> {
                inputs: &'a [String],
                entries: &'a [EntryReport],
            }
            format_json(&DiffOutput {
                inputs: &inputs,
                entries: reports,
            })
        }
    }
}

fn format_report_text(output: &mut String, report: &EntryReport, palette: &Palette) {
    let dirs: Vec<String> = report
        .directions
        .iter()
        .map(|&d| palette.direction(d).apply_to(d).to_string())
        .collect();
    let _ = writeln!(
        output,
        "[i] E{} // {} // Offset: {} // Length: {}",
        report.index,
        dirs.join("/"),
        list(&report.offsets),
        list(&report.lengths)
    );

    for hint in &report.length_hints {
        let _ = writeln!(
            output,
            "[i] Possible length byte at offset {}, diff = {}",
            hint.position, hint.magnitude
        );
    }

    if let Some(suffix) = &report.common_suffix {
        let bytes: Vec<String> = suffix
            .bytes
            .iter()
            .map(|b| palette.color(2).apply_to(format!("{b:02x}")).to_string())
            .collect();
        let _ = writeln!(output, "[i] Common postfix: {}", bytes.join(":"));
    }

    if let Some(fixed) = &report.fixed_differences {
        for finding in &fixed.findings {
            let relation = match finding.relation() {
                Relation::Equal => "are always equal".to_string(),
                Relation::Offset(d) => format!("always differ by {d} (0x{d:02x})"),
            };
            let _ = writeln!(
                output,
                "[i] Bytes at offsets {} and {} {relation}: {} / {}",
                finding.first,
                finding.second,
                hex_list(&finding.first_values),
                hex_list(&finding.second_values)
            );
        }
        if fixed.truncated {
            let _ = writeln!(
                output,
                "[i] More fixed differences found, increase the threshold to list them"
            );
        }
    }

    for (i, entry) in report.entries.iter().enumerate() {
        let row: Vec<String> = entry
            .data
            .iter()
            .enumerate()
            .map(|(n, &byte)| {
                if i > 0 && report.is_common(n) {
                    "..".to_string()
                } else {
                    let source = byte_source(&report.entries, n, byte);
                    palette
                        .color(source)
                        .apply_to(format!("{byte:02x}"))
                        .to_string()
                }
            })
            .collect();
        output.push('\n');
        output.push_str(&row.join(" "));
        output.push('\n');
    }

    if report.collapsed {
        output.push_str("(all entries are the same)\n");
    }

    output.push_str(&palette.separator());
    output.push('\n');
}

fn format_inputs_text(output: &mut String, inputs: &[String], palette: &Palette) {
    output.push_str("Input files:\n");
    for (n, input) in inputs.iter().enumerate() {
        let _ = writeln!(output, " - {}", palette.color(n).apply_to(input));
    }
}

/// Formats the entries of a single flow.
#[must_use]
pub fn format_flow(flow: &Flow, input: &Path, format: OutputFormat, palette: &Palette) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for (n, entry) in flow.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "[{n}] {} // Offset: {} // Length: {}",
                    palette.direction(entry.direction).apply_to(entry.direction),
                    entry.offset,
                    entry.len()
                );
                for (row, chunk) in entry.data.chunks(16).enumerate() {
                    let _ = writeln!(
                        output,
                        "{:08x}  {}",
                        entry.offset + row * 16,
                        hex_row(chunk)
                    );
                }
            }
            output.push_str(&palette.separator());
            output.push('\n');
            let _ = writeln!(
                output,
                "{}: {} entries, {} bytes sent, {} bytes received",
                input.display(),
                flow.len(),
                flow.stream(Direction::Sent).len(),
                flow.stream(Direction::Received).len()
            );
            output
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct FlowOutput<'a> {
                input: String,
                entries: &'a Flow,
            }
            format_json(&FlowOutput {
                input: input.display().to_string(),
                entries: flow,
            })
        }
    }
}

/// Formats the counters of a finished replay session.
#[must_use]
pub fn format_replay_summary(summary: &ReplaySummary, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "Replay finished: sent {} entries ({} bytes), received {} entries ({} bytes)\n",
            summary.sent_entries,
            summary.sent_bytes,
            summary.received_entries,
            summary.received_bytes
        ),
        OutputFormat::Json => format_json(summary),
    }
}

/// Formats an error for display.
///
/// JSON errors are meant for stdout so scripts can parse them.
#[must_use]
pub fn format_error(error: &crate::error::Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }
            format_json(&ErrorOutput {
                error: error.to_string(),
            })
        }
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn list<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a usize>,
{
    let items: Vec<String> = values.into_iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

fn hex_list(values: &[u8]) -> String {
    let items: Vec<String> = values.iter().map(|b| format!("{b:02x}")).collect();
    items.join(",")
}

fn hex_row(bytes: &[u8]) -> String {
    let items: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
    items.join(" ")
}
