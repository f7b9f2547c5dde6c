//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::cli::output::{OutputFormat, Palette, format_diff, format_flow, format_replay_summary};
use crate::cli::parser::{Cli, Commands, ReplayCommands};
use crate::core::{Direction, SkipOffset};
use crate::decode::create_decoder;
use crate::diff::{DiffOptions, diff_flows};
use crate::error::{CommandError, Error, Result};
use crate::io::{LoadOptions, load_flow, load_flows, load_raw_flows};
use crate::reconstruct::FragRules;
use crate::replay::{Replayer, Role, connect, serve};
use std::path::{Path, PathBuf};

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    execute_with_palette(cli, &Palette::for_stdout())
}

/// Executes the CLI command with an explicit palette.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute_with_palette(cli: &Cli, palette: &Palette) -> Result<String> {
    let format = output_format(&cli.format)?;

    match &cli.command {
        Commands::Diff {
            files,
            max_entries,
            skip_sent,
            skip_received,
            decoder,
            frag_rules,
            threshold,
        } => {
            let load = load_options(decoder.as_deref(), frag_rules.as_deref())?;
            let mut options = DiffOptions::new().fix_diff_threshold(*threshold);
            if let Some(max) = max_entries {
                options = options.max_entries(*max);
            }
            if let Some(skip) = skip_offset(*skip_sent, *skip_received) {
                options = options.skip_offset(skip);
            }
            cmd_diff(files, &load, &options, format, palette)
        }
        Commands::Bindiff { files, threshold } => cmd_bindiff(files, *threshold, format, palette),
        Commands::Show {
            file,
            decoder,
            frag_rules,
        } => {
            let load = load_options(decoder.as_deref(), frag_rules.as_deref())?;
            cmd_show(file, &load, format, palette)
        }
        Commands::Replay(ReplayCommands::Client { host, port, file }) => {
            cmd_replay_client(host, *port, file, format)
        }
        Commands::Replay(ReplayCommands::Server { port, file, once }) => {
            cmd_replay_server(*port, file, *once, format)
        }
    }
}

fn output_format(name: &str) -> Result<OutputFormat> {
    match name.to_lowercase().as_str() {
        "text" | "json" => Ok(OutputFormat::parse(name)),
        _ => Err(Error::Config {
            message: format!("unknown output format: {name} (expected text or json)"),
        }),
    }
}

fn load_options(decoder: Option<&str>, frag_rules: Option<&str>) -> Result<LoadOptions> {
    let mut options = LoadOptions::new();
    if let Some(spec) = decoder {
        options = options.decoder(create_decoder(spec)?);
    }
    let rules = FragRules::parse(frag_rules)?;
    if !rules.is_empty() {
        options = options.rules(rules);
    }
    Ok(options)
}

fn skip_offset(sent: Option<usize>, received: Option<usize>) -> Option<SkipOffset> {
    let mut skip = SkipOffset::new();
    if let Some(offset) = sent {
        skip.set(Direction::Sent, offset);
    }
    if let Some(offset) = received {
        skip.set(Direction::Received, offset);
    }
    (!skip.is_empty()).then_some(skip)
}

fn cmd_diff(
    files: &[PathBuf],
    load: &LoadOptions,
    options: &DiffOptions,
    format: OutputFormat,
    palette: &Palette,
) -> Result<String> {
    let flows = load_flows(files, load)?;
    let reports: Vec<_> = diff_flows(&flows, options).collect();
    Ok(format_diff(&reports, files, format, palette))
}

fn cmd_bindiff(
    files: &[PathBuf],
    threshold: usize,
    format: OutputFormat,
    palette: &Palette,
) -> Result<String> {
    let flows = load_raw_flows(files)?;
    let options = DiffOptions::new().fix_diff_threshold(threshold);
    let reports: Vec<_> = diff_flows(&flows, &options).collect();
    Ok(format_diff(&reports, files, format, palette))
}

fn cmd_show(
    file: &Path,
    load: &LoadOptions,
    format: OutputFormat,
    palette: &Palette,
) -> Result<String> {
    let flow = load_flow(file, load)?;
    Ok(format_flow(&flow, file, format, palette))
}

fn cmd_replay_client(host: &str, port: u16, file: &Path, format: OutputFormat) -> Result<String> {
    if port == 0 {
        return Err(CommandError::InvalidArgument("cannot connect to port 0".to_string()).into());
    }
    let flow = load_flow(file, &LoadOptions::new())?;
    let mut stream = connect(format!("{host}:{port}"))?;
    let summary = Replayer::new(&flow, Role::Client).run(&mut stream)?;
    Ok(format_replay_summary(&summary, format))
}

fn cmd_replay_server(port: u16, file: &Path, once: bool, format: OutputFormat) -> Result<String> {
    let flow = load_flow(file, &LoadOptions::new())?;
    let summary = serve(format!("0.0.0.0:{port}"), &flow, once)?;
    Ok(format_replay_summary(&summary, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use tempfile::TempDir;

    fn cli(format: &str, command: Commands) -> Cli {
        Cli {
            verbose: false,
            format: format.to_string(),
            command,
        }
    }

    fn diff_command(files: Vec<PathBuf>) -> Commands {
        Commands::Diff {
            files,
            max_entries: None,
            skip_sent: None,
            skip_received: None,
            decoder: None,
            frag_rules: None,
            threshold: 10,
        }
    }

    #[test]
    fn test_skip_offset_only_named_directions() {
        assert!(skip_offset(None, None).is_none());
        let skip = skip_offset(None, Some(4)).unwrap();
        assert_eq!(skip.get(Direction::Received), Some(4));
        assert_eq!(skip.get(Direction::Sent), None);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = execute(&cli("yaml", diff_command(Vec::new())))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_replay_client_port_zero() {
        let command = Commands::Replay(ReplayCommands::Client {
            host: "localhost".to_string(),
            port: 0,
            file: PathBuf::from("unused.txt"),
        });
        let err = execute(&cli("text", command)).err().unwrap();
        assert!(matches!(
            err,
            Error::Command(CommandError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_load_options_rejects_bad_rules() {
        let err = load_options(None, Some("x10")).err().unwrap();
        assert!(matches!(err, Error::Parse(ParseError::InvalidRule { .. })));
    }

    #[test]
    fn test_diff_command() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "00000000  01 02 03\n").unwrap();
        std::fs::write(&b, "00000000  01 05 03\n").unwrap();

        let output =
            execute_with_palette(&cli("text", diff_command(vec![a, b])), &Palette::plain(80))
                .unwrap();
        assert!(output.starts_with("[i] E0 // sent // Offset: [0] // Length: [3]\n"));
        assert!(output.contains("\n01 02 03\n\n.. 05 ..\n"));
    }

    #[test]
    fn test_bindiff_command_json() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, [0x00, 0x01]).unwrap();
        std::fs::write(&b, [0x00, 0x02, 0x03]).unwrap();

        let command = Commands::Bindiff {
            files: vec![a, b],
            threshold: 10,
        };
        let output = execute_with_palette(&cli("json", command), &Palette::plain(80)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["entries"][0]["directions"][0], "received");
        assert_eq!(value["entries"][0]["common_bytes"][0], 0);
    }
}
