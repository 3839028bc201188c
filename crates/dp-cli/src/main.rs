#![forbid(unsafe_code)]

//! dotparse CLI - parse and validate DOT graph descriptions.
//!
//! # Commands
//!
//! - `parse`: Output the parsed graph (or a summary) as JSON
//! - `validate`: Check input and report the first error with its location
//! - `tokens`: Dump the lexer's token stream

use std::io::{self, Read};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dp_core::DotError;
use dp_parser::{parse, parse_summary, tokenize};
use serde::Serialize;
use tracing::{debug, info};

/// dotparse CLI - parse and validate DOT graph descriptions.
#[derive(Debug, Parser)]
#[command(
    name = "dp-cli",
    version,
    about = "dotparse CLI - parse and validate DOT graph descriptions",
    long_about = "Parses graph/digraph documents written in the DOT language into\n\
        nodes, edges and attributes, and reports lexical, grammar and\n\
        edge-operator errors with their source location."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging (can be repeated for more detail: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a DOT document and output it as JSON.
    Parse {
        /// Input file path or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Output the full graph (default is summary)
        #[arg(long)]
        full: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a DOT document and report diagnostics.
    Validate {
        /// Input file path or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Output as JSON (structured diagnostics)
        #[arg(long)]
        json: bool,
    },

    /// Print the token stream produced by the lexer.
    Tokens {
        /// Input file path or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Result of validating a document.
#[derive(Debug, Serialize)]
struct ValidateResult {
    valid: bool,
    directed: Option<bool>,
    strict: Option<bool>,
    node_count: usize,
    edge_count: usize,
    errors: Vec<ValidationError>,
}

#[derive(Debug, Serialize)]
struct ValidationError {
    code: String,
    message: String,
    line: usize,
    column: usize,
}

impl From<&DotError> for ValidationError {
    fn from(err: &DotError) -> Self {
        let span = err.span();
        Self {
            code: err.code().as_str().to_string(),
            message: err.to_string(),
            line: span.start.line,
            column: span.start.col,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Parse {
            input,
            full,
            pretty,
        } => cmd_parse(&input, full, pretty),

        Command::Validate { input, json } => cmd_validate(&input, json),

        Command::Tokens { input, json } => cmd_tokens(&input, json),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

fn load_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else if Path::new(input).exists() {
        std::fs::read_to_string(input).context(format!("Failed to read file: {input}"))
    } else {
        // Treat as inline DOT text
        Ok(input.to_string())
    }
}

fn describe_error(err: &DotError) -> String {
    let span = err.span();
    format!(
        "[{}] {} (line {}, col {})",
        err.code().as_str(),
        err,
        span.start.line,
        span.start.col
    )
}

// =============================================================================
// Command: parse
// =============================================================================

fn cmd_parse(input: &str, full: bool, pretty: bool) -> Result<()> {
    let source = load_input(input)?;

    let parse_start = Instant::now();
    let graph = parse(&source).map_err(|err| anyhow::anyhow!(describe_error(&err)))?;
    debug!(
        "Parsed: nodes={}, edges={}, occurrences={} in {:.2}ms",
        graph.nodes.len(),
        graph.edge_count(),
        graph.edge_occurrence_count(),
        parse_start.elapsed().as_secs_f64() * 1000.0
    );

    let output = if full {
        if pretty {
            serde_json::to_string_pretty(&graph)?
        } else {
            serde_json::to_string(&graph)?
        }
    } else {
        let summary = parse_summary(&graph);
        if pretty {
            serde_json::to_string_pretty(&summary)?
        } else {
            summary.to_string()
        }
    };

    println!("{output}");
    Ok(())
}

// =============================================================================
// Command: validate
// =============================================================================

fn validate_source(source: &str) -> ValidateResult {
    match parse(source) {
        Ok(graph) => ValidateResult {
            valid: true,
            directed: Some(graph.directed),
            strict: Some(graph.strict),
            node_count: graph.nodes.len(),
            edge_count: graph.edge_count(),
            errors: Vec::new(),
        },
        Err(err) => ValidateResult {
            valid: false,
            directed: None,
            strict: None,
            node_count: 0,
            edge_count: 0,
            errors: vec![ValidationError::from(&err)],
        },
    }
}

fn cmd_validate(input: &str, json_output: bool) -> Result<()> {
    let source = load_input(input)?;
    let result = validate_source(&source);

    if json_output {
        let output = serde_json::to_string_pretty(&result)?;
        println!("{output}");
    } else {
        if result.valid {
            let kind = match (result.strict, result.directed) {
                (Some(true), Some(true)) => "strict digraph",
                (Some(true), _) => "strict graph",
                (_, Some(true)) => "digraph",
                _ => "graph",
            };
            println!("✓ Valid {kind}");
        } else {
            println!("✗ Invalid DOT document");
        }

        println!("  Nodes: {}", result.node_count);
        println!("  Edges: {}", result.edge_count);

        if !result.errors.is_empty() {
            println!("\nErrors:");
            for err in &result.errors {
                println!(
                    "  [{}] {} (line {}, col {})",
                    err.code, err.message, err.line, err.column
                );
            }
        }
    }

    if !result.valid {
        std::process::exit(1);
    }

    info!("Validated {} nodes, {} edges", result.node_count, result.edge_count);
    Ok(())
}

// =============================================================================
// Command: tokens
// =============================================================================

fn cmd_tokens(input: &str, json_output: bool) -> Result<()> {
    let source = load_input(input)?;
    let tokens = tokenize(&source).map_err(|err| anyhow::anyhow!(describe_error(&err)))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        for spanned in &tokens {
            println!(
                "{:>4}:{:<4} {}",
                spanned.span.start.line,
                spanned.span.start.col,
                spanned.token.describe()
            );
        }
    }

    debug!("Lexed {} tokens", tokens.len());
    Ok(())
}
