//! Build Notifier CLI
//!
//! Forward CI build status events to a Discord-style chat webhook

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use build_notifier::cli::{
    handle_check_config, handle_notify, handle_render, handle_stream, EventArgs, SetupOptions,
};
use build_notifier::notification::webhook::DEFAULT_TIMEOUT_SECS;

#[derive(Parser)]
#[command(name = "build-notifier")]
#[command(about = "Build Notifier - forward build status events to a chat webhook")]
#[command(version)]
struct Cli {
    /// Notifier config (default: <config dir>/build-notifier/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Secrets file, JSON object of resource name -> value (default: secrets.json next to the config)
    #[arg(long, global = true)]
    secrets: Option<PathBuf>,
    /// Timeout for outbound HTTP calls (seconds)
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
    /// Render and log only, deliver nothing
    #[arg(long, global = true)]
    dry_run: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send the notification for one build event
    Notify(EventArgs),
    /// Print the payload a build event would produce
    Render(EventArgs),
    /// Process newline-delimited build events from stdin
    Stream,
    /// Validate config, filter and webhook secret
    CheckConfig,
}

fn main() -> ExitCode {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=debug build-notifier stream
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("build_notifier=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "fatal error");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let options = SetupOptions {
        config: cli.config,
        secrets: cli.secrets,
        timeout_secs: cli.timeout_secs,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Notify(args) => handle_notify(&options, args),
        Commands::Render(args) => handle_render(args),
        Commands::Stream => handle_stream(&options).map(|_| ()),
        Commands::CheckConfig => handle_check_config(&options),
    }
}
