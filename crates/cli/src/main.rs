//! p4bridge command-line driver.
//!
//! Runs a single move request against the configured Perforce server and
//! prints the JSON response, classifies raw `fstat` fields, and generates /
//! validates configuration files.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use p4bridge_core::config::BridgeConfig;
use p4bridge_core::errors::MoveError;
use p4bridge_core::models::{MoveRequest, MoveResponse, RequestStatus, VersionedAsset};
use p4bridge_core::p4::{classify, P4Client, RejectionMatcher};
use p4bridge_core::{LocalFileSystem, MoveCommand};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// p4bridge command-line driver.
#[derive(Parser, Debug)]
#[command(
    name = "p4bridge",
    version,
    about = "Move and rename versioned assets on a Perforce server"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "p4bridge.toml")]
    config: PathBuf,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Move assets given as a JSON list of source, destination, ... entries.
    Move {
        /// File holding the request, or `-` for stdin.
        #[arg(short, long, default_value = "-")]
        request: String,

        /// Rename on the server only; leave local files in place.
        #[arg(long)]
        no_local_file_move: bool,
    },

    /// Print the state derived from raw fstat fields.
    Classify {
        #[arg(default_value = "")]
        action: String,
        #[arg(default_value = "")]
        head_action: String,
        #[arg(default_value = "")]
        have_rev: String,
        #[arg(default_value = "")]
        head_rev: String,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./p4bridge.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| {
            BridgeConfig::load_from_file(&cli.config)
                .ok()
                .map(|c| c.logging.level)
        })
        .unwrap_or_else(|| "info".into());

    // stdout carries the JSON response, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Move {
            request,
            no_local_file_move,
        } => cmd_move(&cli.config, &request, no_local_file_move).await,
        Commands::Classify {
            action,
            head_action,
            have_rev,
            head_rev,
        } => {
            println!("{}", classify(&action, &head_action, &have_rev, &head_rev));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { output } => cmd_init(&output).map(|()| ExitCode::SUCCESS),
        Commands::Validate => cmd_validate(&cli.config).map(|()| ExitCode::SUCCESS),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_move(config_path: &Path, source: &str, no_local_file_move: bool) -> Result<ExitCode> {
    let config = BridgeConfig::load_and_resolve(config_path)
        .context("failed to load configuration file")?;

    let assets = read_request(source)?;
    let request = MoveRequest {
        assets,
        no_local_file_move: no_local_file_move || config.moves.no_local_file_move,
    };
    info!(assets = request.assets.len(), "read move request");

    let runner = P4Client::new(config.p4.clone(), RejectionMatcher::new(&config.moves));
    let mut command = MoveCommand::new(runner, LocalFileSystem);

    let (response, rejected) = match command.run(request).await {
        Ok(response) => (response, false),
        Err(e @ MoveError::UnevenAssetCount(_)) => {
            let mut status = RequestStatus::new();
            status.warn(e.to_string());
            let response = MoveResponse {
                status,
                assets: Vec::new(),
            };
            (response, true)
        }
    };
    debug!(strategy = %command.strategy(), "move request finished");

    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("failed to encode response")?
    );

    let failed = rejected || response.status.has_errors();
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn read_request(source: &str) -> Result<Vec<VersionedAsset>> {
    let text = if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read request from stdin")?;
        text
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read request file {source}"))?
    };
    parse_request(&text)
}

fn parse_request(text: &str) -> Result<Vec<VersionedAsset>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(text).context("request must be a JSON list of {path, is_folder} entries")
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, BridgeConfig::default_toml()).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the config file with your Perforce server, user and workspace");
    println!("  2. Set the referenced password variable (P4PASSWD) if the server needs one");
    println!(
        "  3. Validate with: p4bridge validate --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        BridgeConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => println!("  [OK] All required fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  P4PORT        : {}", config.p4.port);
    println!("  P4USER        : {}", config.p4.user);
    println!("  P4CLIENT      : {}", config.p4.client);
    println!(
        "  Password      : {}",
        match (&config.p4.password_env, &config.p4.password) {
            (None, _) => "not configured",
            (Some(_), Some(_)) => "set",
            (Some(_), None) => "NOT SET",
        }
    );
    println!("  Reject codes  : {:?}", config.moves.rejected_codes);
    println!("  Reject text   : {:?}", config.moves.rejected_patterns);

    Ok(())
}
