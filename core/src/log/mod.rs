//! Logging bootstrap.
//!
//! Installs a `tracing` subscriber with two sinks: a non-blocking rolling file under the
//! application data directory and stderr. `log` records from dependencies are forwarded into
//! `tracing`. [`init`] is meant to run once at startup; repeated calls hand back the handle
//! from the first one.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing_appender::rolling::{Builder as RollingBuilder, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, util::SubscriberInitExt};

const FILTER_ENV_VARS: [&str; 2] = ["FOLIO_LOG", "RUST_LOG"];

static HANDLE: OnceLock<LogHandle> = OnceLock::new();

pub use tracing_subscriber::filter::LevelFilter as LogLevel;

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for the rolling log files.
    pub directory: PathBuf,
    /// Log file name prefix; files end in `.log`.
    pub file_prefix: String,
    /// Keep at most this many log files. `None` keeps everything.
    pub retention: Option<usize>,
    pub file_level: LevelFilter,
    pub console_level: LevelFilter,
    /// Forward `log` crate records into `tracing`.
    pub capture_log: bool,
    /// Filter directive such as `folio_core=debug`. Falls back to the environment.
    pub env_filter: Option<String>,
    /// Roll the file daily instead of appending to a single file forever.
    pub daily: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file_prefix: "folio".to_string(),
            retention: Some(7),
            file_level: LevelFilter::DEBUG,
            console_level: if cfg!(debug_assertions) { LevelFilter::INFO } else { LevelFilter::WARN },
            capture_log: true,
            env_filter: filter_from_env(),
            daily: true,
        }
    }
}

impl LogConfig {
    pub fn with_directory<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.directory = path.into();
        self
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.file_prefix = prefix.into();
        self
    }
}

/// Keeps the background file writer alive.
#[derive(Debug)]
pub struct LogHandle {
    _guard: tracing_appender::non_blocking::WorkerGuard,
    directory: PathBuf,
}

impl LogHandle {
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Install the global subscriber. The first successful call wins.
pub fn init(config: LogConfig) -> Result<&'static LogHandle> {
    if let Some(handle) = HANDLE.get() {
        return Ok(handle);
    }

    let handle = install(config)?;
    Ok(HANDLE.get_or_init(|| handle))
}

fn install(config: LogConfig) -> Result<LogHandle> {
    if config.capture_log {
        let verbosest = config.file_level.max(config.console_level);
        // An existing logger means someone else already bridged `log`; keep theirs.
        let _ = tracing_log::LogTracer::builder().with_max_level(as_log_level(verbosest)).init();
    }

    fs::create_dir_all(&config.directory)
        .with_context(|| format!("creating log directory {}", config.directory.display()))?;
    if let Some(keep) = config.retention.filter(|keep| *keep > 0) {
        prune(&config.directory, &config.file_prefix, keep)?;
    }

    let rotation = if config.daily { Rotation::DAILY } else { Rotation::NEVER };
    let appender = RollingBuilder::new()
        .rotation(rotation)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(&config.directory)
        .context("creating rolling log appender")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let directive = config
        .env_filter
        .unwrap_or_else(|| if cfg!(debug_assertions) { "debug" } else { "info" }.to_string());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("parsing log filter {directive:?}"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_filter(config.file_level),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(config.console_level),
        )
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;

    Ok(LogHandle { _guard: guard, directory: config.directory })
}

fn filter_from_env() -> Option<String> {
    FILTER_ENV_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .filter(|directive| !directive.trim().is_empty())
}

fn as_log_level(level: LevelFilter) -> log::LevelFilter {
    match level {
        LevelFilter::OFF => log::LevelFilter::Off,
        LevelFilter::ERROR => log::LevelFilter::Error,
        LevelFilter::WARN => log::LevelFilter::Warn,
        LevelFilter::INFO => log::LevelFilter::Info,
        LevelFilter::DEBUG => log::LevelFilter::Debug,
        LevelFilter::TRACE => log::LevelFilter::Trace,
    }
}

/// Delete the oldest files starting with `prefix` until at most `keep` remain.
fn prune(dir: &Path, prefix: &str, keep: usize) -> Result<()> {
    let mut logs: Vec<(SystemTime, PathBuf)> = fs::read_dir(dir)
        .with_context(|| format!("listing log directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let meta = entry.metadata().ok().filter(|meta| meta.is_file())?;
            let path = entry.path();
            let ours = path.file_name().and_then(OsStr::to_str).is_some_and(|n| n.starts_with(prefix));
            ours.then(|| (meta.modified().unwrap_or(SystemTime::UNIX_EPOCH), path))
        })
        .collect();

    if logs.len() <= keep {
        return Ok(());
    }

    logs.sort();
    let excess = logs.len() - keep;
    for (_, path) in logs.into_iter().take(excess) {
        let _ = fs::remove_file(&path);
    }
    Ok(())
}

fn default_log_directory() -> PathBuf {
    match directories::ProjectDirs::from("com", "Folio", "folio") {
        Some(dirs) => dirs.data_dir().join("logs"),
        None => std::env::temp_dir().join("folio-logs"),
    }
}
