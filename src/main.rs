//! hq command-line interface.
//!
//! Reads a document (HUML, JSON, or YAML — tried in that order), evaluates
//! a query expression against it, and prints every result in the chosen
//! output format.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, ValueEnum};

use hq::query::{self, Value};
use hq::{huml, json, output, yaml};

#[derive(Debug, Parser)]
#[command(name = "hq")]
#[command(about = "A lightweight HUML processor with jq-style expressions")]
#[command(version)]
struct Cli {
    /// Query expression to evaluate (e.g. ".users[] | select(.age > 26)")
    expression: String,

    /// Input files; stdin is read when none are given
    files: Vec<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value = "huml")]
    output: Format,

    /// Print top-level strings without quotes
    #[arg(short = 'r', long)]
    raw_output: bool,

    /// Compact JSON output (no pretty-printing)
    #[arg(short = 'c', long)]
    compact_output: bool,

    /// Evaluate against null instead of reading input
    #[arg(short = 'n', long)]
    null_input: bool,

    /// Exit non-zero when every output value is false or null
    #[arg(short = 'e', long)]
    exit_status: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// HUML (default)
    Huml,
    /// JSON, pretty by default
    Json,
    /// Block-style YAML
    Yaml,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("hq: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let input = read_input(cli)?;

    let results = query::evaluate(&cli.expression, input)?;

    for value in &results {
        print_value(value, cli);
    }

    if cli.exit_status && !results.iter().any(Value::is_truthy) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn read_input(cli: &Cli) -> Result<Value> {
    if cli.null_input {
        return Ok(Value::Null);
    }

    let mut input = Value::Null;
    if cli.files.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        if !text.trim().is_empty() {
            input = parse_document(&text).context("parsing stdin")?;
        }
    } else {
        // With several files the last one wins.
        for file in &cli.files {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            input = parse_document(&text)
                .with_context(|| format!("parsing {}", file.display()))?;
        }
    }

    Ok(input)
}

/// Try the native format first, then the common interchange formats.
fn parse_document(text: &str) -> Result<Value> {
    if let Ok(v) = huml::from_str(text) {
        return Ok(v);
    }
    if let Ok(v) = json::from_str(text) {
        return Ok(v);
    }
    if let Ok(v) = yaml::from_str(text) {
        return Ok(v);
    }
    bail!("could not parse input as HUML, JSON, or YAML")
}

fn print_value(value: &Value, cli: &Cli) {
    if cli.raw_output {
        if let Value::String(s) = value {
            println!("{}", s);
            return;
        }
    }

    match cli.output {
        Format::Json => {
            if cli.compact_output {
                println!("{}", output::to_json(value));
            } else {
                println!("{}", output::to_json_pretty(value));
            }
        }
        Format::Yaml => print!("{}", output::to_yaml(value)),
        Format::Huml => print!("{}", output::to_huml(value)),
    }
}
