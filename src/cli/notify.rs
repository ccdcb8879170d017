//! notify / render / stream / check-config command handling

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::build_event::BuildEvent;
use crate::config::NotifierConfig;
use crate::notification::{render, BuildNotifier, NotifierBuilder, SendResult};
use crate::secrets::LocalSecretStore;

/// Setup flags shared by every command that delivers
#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub config: Option<PathBuf>,
    pub secrets: Option<PathBuf>,
    pub timeout_secs: u64,
    pub dry_run: bool,
}

impl SetupOptions {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(NotifierConfig::default_path)
    }

    /// Secrets file; defaults to `secrets.json` next to the config
    pub fn secrets_path(&self) -> PathBuf {
        match &self.secrets {
            Some(path) => path.clone(),
            None => self
                .config_path()
                .parent()
                .map(|dir| dir.join("secrets.json"))
                .unwrap_or_else(|| PathBuf::from("secrets.json")),
        }
    }
}

/// Event input
#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    /// Build event JSON file (stdin when omitted or "-")
    #[arg(long, short)]
    pub event: Option<PathBuf>,
}

/// Stream counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    pub malformed: usize,
}

/// Load config and secrets, then run notifier setup
pub fn setup_notifier(options: &SetupOptions) -> Result<BuildNotifier> {
    let config_path = options.config_path();
    let config = NotifierConfig::load(&config_path)?;
    let secrets_path = options.secrets_path();
    let secrets = LocalSecretStore::from_file(&secrets_path)?;
    if secrets.is_empty() {
        warn!(secrets = %secrets_path.display(), "Secrets file has no entries");
    }

    let notifier = NotifierBuilder::new(&config, &secrets)
        .timeout_secs(options.timeout_secs)
        .dry_run(options.dry_run)
        .build()
        .with_context(|| format!("notifier setup failed for {}", config_path.display()))?;

    info!(
        config = %config_path.display(),
        name = %config.metadata.name,
        secrets = secrets.len(),
        dry_run = options.dry_run,
        "Notifier ready"
    );
    Ok(notifier)
}

/// Read one event from a file, or stdin for `None` / `-`
pub fn read_event(path: Option<&Path>) -> Result<BuildEvent> {
    let content = match path {
        Some(p) if p != Path::new("-") => fs::read_to_string(p)
            .with_context(|| format!("failed to read event {}", p.display()))?,
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read event from stdin")?;
            buf
        }
    };

    BuildEvent::from_json(&content).context("failed to parse build event")
}

pub fn handle_notify(options: &SetupOptions, args: EventArgs) -> Result<()> {
    let notifier = setup_notifier(options)?;
    let event = read_event(args.event.as_deref())?;

    let result = notifier
        .send_notification(&event)
        .with_context(|| format!("failed to notify for build {}", event.id))?;
    println!("{}", describe_result(&event, &result));
    Ok(())
}

pub fn handle_render(args: EventArgs) -> Result<()> {
    let event = read_event(args.event.as_deref())?;
    let rendered = render(&event);

    match &rendered.message {
        Some(message) => println!("{}", serde_json::to_string_pretty(message)?),
        None => println!("No message for build {} (status {})", event.id, event.status),
    }
    for effect in &rendered.side_effects {
        println!("Side effect: {}", effect.name());
    }
    Ok(())
}

/// Process newline-delimited events from stdin
pub fn handle_stream(options: &SetupOptions) -> Result<StreamSummary> {
    let notifier = setup_notifier(options)?;
    let summary = process_stream(&notifier, io::stdin().lock())?;

    info!(
        sent = summary.sent,
        skipped = summary.skipped,
        failed = summary.failed,
        malformed = summary.malformed,
        "Stream finished"
    );
    println!(
        "sent: {}, skipped: {}, failed: {}, malformed: {}",
        summary.sent, summary.skipped, summary.failed, summary.malformed
    );
    Ok(summary)
}

/// Each line is an independent unit of work; failures are counted, not fatal
pub fn process_stream<R: BufRead>(notifier: &BuildNotifier, reader: R) -> Result<StreamSummary> {
    let mut summary = StreamSummary::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("failed to read event stream")?;
        if line.trim().is_empty() {
            continue;
        }

        let event = match BuildEvent::from_json(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = idx + 1, error = %e, "Skipping malformed build event");
                summary.malformed += 1;
                continue;
            }
        };

        match notifier.send_notification(&event) {
            Ok(SendResult::Sent { .. }) => summary.sent += 1,
            Ok(SendResult::Skipped(_)) => summary.skipped += 1,
            Err(e) => {
                error!(build_id = %event.id, error = %e, "Failed to notify");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

pub fn handle_check_config(options: &SetupOptions) -> Result<()> {
    let notifier = setup_notifier(options)?;
    println!(
        "Config OK: channel={}, filter={}",
        notifier.channel_name(),
        if notifier.has_filter() { "yes" } else { "no" }
    );
    Ok(())
}

fn describe_result(event: &BuildEvent, result: &SendResult) -> String {
    match result {
        SendResult::Sent { status } => format!("Build {}: sent (HTTP {})", event.id, status),
        SendResult::Skipped(reason) => format!("Build {}: skipped ({})", event.id, reason),
    }
}
