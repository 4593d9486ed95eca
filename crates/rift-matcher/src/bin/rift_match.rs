//! Rift Request Matcher CLI
//!
//! Checks a recorded request against an expectation and explains every
//! field that did not match.
//!
//! Usage:
//!   rift-match --expectation <file> --request <file> [OPTIONS]
//!
//! The expectation file holds an explicit request pattern or an OpenAPI
//! definition (`specUrlOrPayload` / `operationId`); the request file holds
//! a request. Both may be JSON or YAML.
//!
//! Exit codes: 0 matched, 1 not matched, 2 invalid input.

use anyhow::Context;
use clap::Parser;
use rift_matcher::{
    Expectation, HttpRequest, MatchDifference, MatcherConfig, RequestDefinition,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Rift Request Matcher - check a request against an expectation
#[derive(Parser, Debug)]
#[command(name = "rift-match")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Expectation file (request pattern or OpenAPI definition)
    #[arg(short, long)]
    expectation: PathBuf,

    /// Request file
    #[arg(short, long)]
    request: PathBuf,

    /// Compare the request as a pattern instead of a concrete request
    #[arg(long)]
    control_plane: bool,

    /// Matcher configuration file (YAML)
    #[arg(short, long, env = "RIFT_MATCHER_CONFIG")]
    config: Option<PathBuf>,

    /// Only match this operation of an OpenAPI expectation
    #[arg(short, long)]
    operation_id: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                if args.verbose {
                    tracing::Level::DEBUG
                } else {
                    tracing::Level::WARN
                }
                .into(),
            ),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{RED}{BOLD}Error:{RESET} {e:#}");
            std::process::exit(2);
        }
    }
}

fn run(args: &Args) -> anyhow::Result<bool> {
    let config = match &args.config {
        Some(path) => MatcherConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => MatcherConfig::default(),
    };
    config.validate()?;

    let mut definition: RequestDefinition = read_file(&args.expectation)?;
    if let (RequestDefinition::OpenApi(openapi), Some(operation_id)) =
        (&mut definition, &args.operation_id)
    {
        openapi.operation_id = Some(operation_id.clone());
    }
    let request: HttpRequest = read_file(&args.request)?;
    debug!("Matching {:?} against {:?}", request, definition);

    let expectation = if args.control_plane {
        Expectation::control_plane(definition, config)?
    } else {
        Expectation::new(definition, config)?
    };

    let mut difference = MatchDifference::new();
    let matched = expectation.matches(Some(&mut difference), &request.into());

    println!("{BOLD}{CYAN}Rift Request Matcher{RESET}");
    println!("{DIM}Expectation:{RESET} {}", args.expectation.display());
    println!("{DIM}Request:{RESET}     {}\n", args.request.display());

    if matched {
        println!("{GREEN}{BOLD}MATCHED{RESET}");
    } else {
        println!("{RED}{BOLD}NOT MATCHED{RESET}");
    }
    if !matched || args.verbose {
        print_differences(&difference);
    }
    Ok(matched)
}

fn print_differences(difference: &MatchDifference) {
    if difference.is_empty() {
        return;
    }
    println!();
    for (field, differences) in difference.all_differences() {
        println!("{YELLOW}{BOLD}{}{RESET} {DIM}({}){RESET}", field.name(), differences.len());
        for text in differences {
            println!("{text}");
        }
    }
}

fn read_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&contents).with_context(|| format!("invalid JSON in {}", path.display()))
    } else {
        serde_yaml::from_str(&contents).with_context(|| format!("invalid YAML in {}", path.display()))
    }
}
