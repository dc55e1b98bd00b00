use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use imagegen_contracts::catalog::ChainProfile;
use imagegen_contracts::events::EventWriter;
use imagegen_contracts::GenerationRequest;
use imagegen_engine::config::parse_timeout_secs;
use imagegen_engine::{Config, ImageOrchestrator};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "imagegen-rs",
    version,
    about = "Generate one image from a JSON request, falling back to a local placeholder"
)]
struct Cli {
    /// JSON request: {"prompt": "...", "aspectRatio": "16:9", "businessContext": {...}}
    input: Option<String>,
    /// Backend chain to try before the placeholder.
    #[arg(long, default_value_t = ChainProfile::Full)]
    profile: ChainProfile,
    /// Per-request timeout for backend calls, in seconds.
    #[arg(long, value_parser = timeout_arg)]
    timeout_secs: Option<Duration>,
    /// Append JSONL request events to this file.
    #[arg(long)]
    events: Option<PathBuf>,
}

/// Problems with the command-line payload itself. Reported with exit code 1.
#[derive(Debug, Error)]
enum InputError {
    #[error("No input provided")]
    Missing,
    #[error("Invalid JSON input: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("No prompt provided")]
    NoPrompt,
}

fn main() {
    init_tracing();
    match respond(Cli::parse(), Config::from_env()) {
        Ok((output, code)) => {
            println!("{output}");
            std::process::exit(code)
        }
        Err(err) => {
            eprintln!("imagegen-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// JSON document for stdout and the process exit code.
fn respond(cli: Cli, mut config: Config) -> Result<(String, i32)> {
    let request = match parse_request(cli.input.as_deref()) {
        Ok(request) => request,
        Err(err) => {
            debug!(error = %err, "rejecting input");
            return Ok((error_json(&err), 1));
        }
    };

    if let Some(timeout) = cli.timeout_secs {
        config = config.with_request_timeout(timeout);
    }
    let mut orchestrator = ImageOrchestrator::new(&config, cli.profile);
    if let Some(path) = cli.events {
        let events = EventWriter::for_new_request(path);
        info!(request_id = events.request_id(), path = %events.path().display(), "recording events");
        orchestrator = orchestrator.with_events(events);
    }

    let result = orchestrator.generate(&request);
    let rendered = result.to_json().context("failed to serialize result")?;
    Ok((rendered, 0))
}

fn parse_request(input: Option<&str>) -> Result<GenerationRequest, InputError> {
    let raw = input
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or(InputError::Missing)?;
    let request = GenerationRequest::from_json(raw)?;
    if !request.has_prompt() {
        return Err(InputError::NoPrompt);
    }
    Ok(request)
}

fn error_json(err: &InputError) -> String {
    json!({ "error": err.to_string() }).to_string()
}

fn timeout_arg(raw: &str) -> std::result::Result<Duration, String> {
    parse_timeout_secs(raw).ok_or_else(|| format!("expected a positive number of seconds, got '{raw}'"))
}
