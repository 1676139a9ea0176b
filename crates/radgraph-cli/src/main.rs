//! RadGraph CLI - Command-line interface
//!
//! Usage:
//!   radgraph process <input> [--output <path>] [--jsonl]
//!   radgraph config

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use radgraph_core::{AppConfig, LoggingConfig, LoopFilterMode};
use radgraph_postproc::RadGraphPostprocessor;

#[derive(Parser)]
#[command(name = "radgraph")]
#[command(about = "Observation extraction from RadGraph annotations")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert model output into observation records
    Process {
        /// Input file, or "-" for stdin
        input: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Read one model output per line
        #[arg(long)]
        jsonl: bool,
        /// Override the loop filter mode (passthrough, drop_reciprocal)
        #[arg(long)]
        loop_filter: Option<LoopFilterMode>,
        /// Override the document key inside each model output
        #[arg(long)]
        document_key: Option<String>,
        /// Pretty-print single-document output
        #[arg(long)]
        pretty: bool,
    },
    /// Print the effective configuration
    Config,
}

/// Outcome counts of a processing run
#[derive(Debug, Default, PartialEq, Eq)]
struct RunSummary {
    processed: usize,
    failed: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Process {
            input,
            output,
            jsonl,
            loop_filter,
            document_key,
            pretty,
        } => {
            if let Some(mode) = loop_filter {
                config.postprocess.loop_filter = mode;
            }
            if let Some(key) = document_key {
                config.postprocess.document_key = key;
            }

            let processor = RadGraphPostprocessor::with_config(config.postprocess);
            let content = read_input(&input)?;
            let mut writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(io::BufWriter::new(
                    fs::File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                )),
                None => Box::new(io::stdout().lock()),
            };

            let summary = if jsonl {
                process_lines(&processor, &content, &mut writer)?
            } else {
                process_single(&processor, &content, pretty, &mut writer)?
            };
            writer.flush()?;

            tracing::info!(
                processed = summary.processed,
                failed = summary.failed,
                "processing finished"
            );
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.as_str().into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// A single model output; any error aborts the run
fn process_single(
    processor: &RadGraphPostprocessor,
    content: &str,
    pretty: bool,
    writer: &mut impl Write,
) -> anyhow::Result<RunSummary> {
    let output = processor
        .process_json(content.trim())
        .context("Failed to process annotation document")?;

    if pretty {
        serde_json::to_writer_pretty(&mut *writer, &output)?;
    } else {
        serde_json::to_writer(&mut *writer, &output)?;
    }
    writeln!(writer)?;

    Ok(RunSummary {
        processed: 1,
        failed: 0,
    })
}

/// One model output per line. A failing line is reported in place as
/// `{"line": n, "error": "..."}` and the run continues.
fn process_lines(
    processor: &RadGraphPostprocessor,
    content: &str,
    writer: &mut impl Write,
) -> anyhow::Result<RunSummary> {
    let mut summary = RunSummary::default();

    for (n, line) in content.lines().enumerate() {
        let line_number = n + 1;
        if line.trim().is_empty() {
            continue;
        }

        match processor.process_json(line.trim()) {
            Ok(output) => {
                serde_json::to_writer(&mut *writer, &output)?;
                summary.processed += 1;
            }
            Err(e) => {
                tracing::warn!(line = line_number, error = %e, "skipping annotation line");
                let report = serde_json::json!({"line": line_number, "error": e.to_string()});
                serde_json::to_writer(&mut *writer, &report)?;
                summary.failed += 1;
            }
        }
        writeln!(writer)?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const DOCUMENT: &str = r#"{"0": {"text": "free air abdomen", "entities": {"0": {"tokens": "abdomen", "label": "Anatomy::definitely present", "start_ix": 2, "end_ix": 2, "relations": []}, "1": {"tokens": "free air", "label": "Observation::definitely present", "start_ix": 0, "end_ix": 1, "relations": [["located_at", "0"]]}}}}"#;

    const DANGLING: &str = r#"{"0": {"text": "effusion", "entities": {"1": {"tokens": "effusion", "label": "Observation::uncertain", "start_ix": 0, "end_ix": 0, "relations": [["modify", "5"]]}}}}"#;

    #[test]
    fn test_cli_parses_process() {
        let cli = Cli::try_parse_from([
            "radgraph",
            "process",
            "input.jsonl",
            "--jsonl",
            "--loop-filter",
            "drop_reciprocal",
        ])
        .unwrap();

        match cli.command {
            Commands::Process {
                jsonl, loop_filter, ..
            } => {
                assert!(jsonl);
                assert_eq!(loop_filter, Some(LoopFilterMode::DropReciprocal));
            }
            Commands::Config => panic!("expected process command"),
        }
    }

    #[test]
    fn test_process_single() {
        let processor = RadGraphPostprocessor::new();
        let mut buffer = Vec::new();

        let summary = process_single(&processor, DOCUMENT, false, &mut buffer).unwrap();
        assert_eq!(summary.processed, 1);

        let value: Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["processed_annotations"][0]["observation"], "free air");
        assert_eq!(value["processed_annotations"][0]["located_at"][0], "abdomen");
    }

    #[test]
    fn test_process_single_fails_on_bad_document() {
        let processor = RadGraphPostprocessor::new();
        let mut buffer = Vec::new();
        assert!(process_single(&processor, DANGLING, false, &mut buffer).is_err());
    }

    #[test]
    fn test_process_lines_isolates_failures() {
        let processor = RadGraphPostprocessor::new();
        let content = format!("{DOCUMENT}\n\n{DANGLING}\n{DOCUMENT}\n");
        let mut buffer = Vec::new();

        let summary = process_lines(&processor, &content, &mut buffer).unwrap();
        assert_eq!(
            summary,
            RunSummary {
                processed: 2,
                failed: 1
            }
        );

        let lines: Vec<Value> = String::from_utf8(buffer)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1]["line"], 3);
        assert!(lines[1]["error"].as_str().unwrap().contains("unknown entity 5"));
        assert_eq!(lines[2]["radgraph_text"], "free air abdomen");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[postprocess]\ndocument_key = \"report\"").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.postprocess.document_key, "report");
    }

    #[test]
    fn test_read_input_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{DOCUMENT}").unwrap();

        assert_eq!(read_input(file.path()).unwrap(), DOCUMENT);
        assert!(read_input(Path::new("/nonexistent/input.json")).is_err());
    }
}
