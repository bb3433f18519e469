//! qf: quick file transfer through an object store
//!
//! Usage:
//!   producer | qf            - send stdin, print `ID: <id>` on stdout
//!   qf <ID> > out            - receive a transfer to stdout
//!   qf --list                - show transfers still in the bucket
//!   qf --delete-all          - remove every qf object from the bucket
//!
//! Send mode is chosen when stdin is not a terminal.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use qf_core::config::{QfConfig, StorageBackend};
use qf_crypto::AgeCipher;
use qf_storage::{build_operator, OpendalStore};
use qf_transfer::{
    family_prefix, pending_transfers, remove_all, ProgressFn, Receiver, Sender,
    TransferIdentifier,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "qf",
    version,
    about = "Send a stream through an object store and receive it with a short ID",
    long_about = "qf: pipe data in to send it as encrypted chunks; run `qf <ID>` elsewhere to \
                  stream it back out. Chunks are deleted as they are received unless --keep."
)]
struct Cli {
    /// Transfer ID printed by the sender (receive mode)
    id: Option<String>,

    /// Leave received chunks in the bucket
    #[arg(long, short = 'k')]
    keep: bool,

    /// Remove every object under the qf prefix, print the count and exit
    #[arg(long, conflicts_with_all = ["id", "list"])]
    delete_all: bool,

    /// List transfers still present in the bucket and exit
    #[arg(long, conflicts_with = "id")]
    list: bool,

    /// Path to qf config.toml (default: ~/.config/qf/config.toml)
    #[arg(long, short = 'c', env = "QF_CONFIG")]
    config: Option<PathBuf>,

    /// Storage backend (overrides config)
    #[arg(long, env = "QF_BACKEND")]
    backend: Option<Backend>,

    /// Bucket name (overrides config)
    #[arg(long, short = 'b', env = "QF_BUCKET")]
    bucket: Option<String>,

    /// S3-compatible endpoint URL (overrides config)
    #[arg(long, env = "QF_ENDPOINT")]
    endpoint: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,

    /// Base64-encoded GCS service account JSON
    #[arg(long, env = "QF_GOOGLE_CREDENTIALS", hide_env_values = true)]
    google_credentials: Option<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, env = "QF_LOG")]
    log: Option<String>,

    /// Log format (json, text)
    #[arg(long, env = "QF_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Hide the progress spinner
    #[arg(long, short = 'q')]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    S3,
    Gcs,
    Memory,
}

impl From<Backend> for StorageBackend {
    fn from(b: Backend) -> Self {
        match b {
            Backend::S3 => StorageBackend::S3,
            Backend::Gcs => StorageBackend::Gcs,
            Backend::Memory => StorageBackend::Memory,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let format = match cli.log_format {
        Some(f) => f,
        None if config.log.format.eq_ignore_ascii_case("json") => LogFormat::Json,
        None => LogFormat::Text,
    };
    init_logging(cli.log.as_deref().unwrap_or(&config.log.level), format);

    let op = build_operator(&config.storage).context("building storage operator")?;
    let store = OpendalStore::new(op);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.storage.backend,
        bucket = %config.storage.bucket,
        "qf starting"
    );

    if cli.delete_all {
        return cmd_delete_all(&store, &config).await;
    }
    if cli.list {
        return cmd_list(&store, &config).await;
    }

    let cipher = AgeCipher::new(&config.crypto);
    match select_mode(cli.id.as_deref(), std::io::stdin().is_terminal())? {
        Mode::Send => cmd_send(&store, &cipher, &config, cli.quiet).await,
        Mode::Receive(id) => cmd_receive(&store, &cipher, &config, id, cli.quiet).await,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Mode<'a> {
    Send,
    Receive(&'a str),
}

/// Piped stdin always means send; an ID only makes sense on a terminal.
fn select_mode(id: Option<&str>, stdin_is_terminal: bool) -> Result<Mode<'_>> {
    match (stdin_is_terminal, id) {
        (false, None) => Ok(Mode::Send),
        (false, Some(_)) => anyhow::bail!(
            "stdin is piped, so qf would send; drop the ID to send, or run without a pipe to receive"
        ),
        (true, Some(id)) => Ok(Mode::Receive(id)),
        (true, None) => anyhow::bail!("nothing to send on stdin and no ID given; see `qf --help`"),
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/qf/config.toml"))
}

/// File values first, then CLI/env overrides, then validation.
fn load_config(cli: &Cli) -> Result<QfConfig> {
    let mut config = match cli.config.clone().or_else(default_config_path) {
        Some(path) => QfConfig::load(&path)?,
        None => QfConfig::default(),
    };

    let s = &mut config.storage;
    if let Some(b) = cli.backend {
        s.backend = b.into();
    }
    if let Some(v) = &cli.bucket {
        s.bucket = v.clone();
    }
    if let Some(v) = &cli.endpoint {
        s.endpoint = v.clone();
    }
    if let Some(v) = &cli.region {
        s.region = v.clone();
    }
    if let Some(v) = &cli.access_key_id {
        s.access_key_id = v.clone();
    }
    if let Some(v) = &cli.secret_access_key {
        s.secret_access_key = v.clone();
    }
    if let Some(v) = &cli.google_credentials {
        s.google_credentials = v.clone();
    }
    if cli.keep {
        config.transfer.keep = true;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the ID line and received data
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Progress ──────────────────────────────────────────────────────────────────

fn make_spinner(prefix: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn progress_callback(pb: &ProgressBar) -> ProgressFn {
    let pb = pb.clone();
    Box::new(move |chunks, bytes, _name| {
        pb.set_message(format!("{chunks} chunks, {}", fmt_bytes(bytes)));
    })
}

// ── `producer | qf` ───────────────────────────────────────────────────────────

async fn cmd_send(
    store: &OpendalStore,
    cipher: &AgeCipher,
    config: &QfConfig,
    quiet: bool,
) -> Result<()> {
    let sender = Sender::new(store, cipher, &config.transfer);
    let id = sender.identifier(&mut rand::rngs::OsRng);

    // before the first upload
    println!("ID: {}", id.reveal());

    let pb = make_spinner("send", quiet);
    let progress = progress_callback(&pb);
    let result = sender
        .send(&id, tokio::io::stdin(), Some(&progress))
        .await
        .context("send failed");

    match result {
        Ok(outcome) => {
            pb.finish_with_message(format!(
                "{} chunks, {} uploaded",
                outcome.chunks,
                fmt_bytes(outcome.bytes)
            ));
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("aborted");
            Err(e)
        }
    }
}

// ── `qf <ID>` ─────────────────────────────────────────────────────────────────

async fn cmd_receive(
    store: &OpendalStore,
    cipher: &AgeCipher,
    config: &QfConfig,
    raw_id: &str,
    quiet: bool,
) -> Result<()> {
    let id = TransferIdentifier::parse(raw_id, config.transfer.object_key_length)
        .context("invalid transfer ID")?;

    let pb = make_spinner("recv", quiet);
    let progress = progress_callback(&pb);
    let mut stdout = tokio::io::stdout();
    let result = Receiver::new(store, cipher, &config.transfer)
        .receive(&id, &mut stdout, Some(&progress))
        .await
        .with_context(|| format!("receive of {} failed", id.object_key()));

    match result {
        Ok(outcome) => {
            pb.finish_with_message(format!(
                "{} chunks, {} received",
                outcome.chunks,
                fmt_bytes(outcome.bytes)
            ));
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("aborted");
            Err(e)
        }
    }
}

// ── `qf --delete-all` ─────────────────────────────────────────────────────────

async fn cmd_delete_all(store: &OpendalStore, config: &QfConfig) -> Result<()> {
    let prefix = family_prefix(&config.transfer.prefix);
    let removed = remove_all(store, &prefix)
        .await
        .with_context(|| format!("deleting objects under {prefix}"))?;
    println!("Deleted {removed} objects");
    Ok(())
}

// ── `qf --list` ───────────────────────────────────────────────────────────────

async fn cmd_list(store: &OpendalStore, config: &QfConfig) -> Result<()> {
    let pending = pending_transfers(store, &config.transfer.prefix)
        .await
        .context("listing bucket")?;

    if pending.is_empty() {
        println!("No pending transfers");
        return Ok(());
    }

    println!("{:<10} {:>7}  {}", "KEY", "CHUNKS", "STATE");
    for t in &pending {
        let state = if t.is_complete() {
            "complete".to_string()
        } else if t.final_markers > 1 {
            format!("{} final chunks (object key reused?)", t.final_markers)
        } else if t.objects > t.chunks {
            "duplicate indices (object key reused?)".to_string()
        } else if let Some(last) = t.last_index {
            format!("gaps ({} of {last})", t.chunks)
        } else {
            "uploading or interrupted".to_string()
        };
        println!("{:<10} {:>7}  {state}", t.object_key, t.chunks);
    }
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
