use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

const LOG_PREFIX: &str = "websearch-";
const LOG_SUFFIX: &str = ".log";
const DEFAULT_KEEP: usize = 20;

#[allow(dead_code)]
pub struct LogGuard(tracing_appender::non_blocking::WorkerGuard);

/// Initialize logging.
///
/// With `debug` on, each run writes to its own `websearch-<timestamp>.log` under
/// `debug_log_dir` (default: the config directory) and older runs beyond `debug_log_keep` are
/// removed. Otherwise warnings go to stderr, filtered by `RUST_LOG` when it is set.
pub fn init(config: &Config) -> Result<Option<LogGuard>> {
    if !config.debug {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("websearch=warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
            .ok();
        return Ok(None);
    }

    let dir = log_dir(config.debug_log_dir.as_deref())?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    // Make room for the file this run is about to create.
    let keep = config.debug_log_keep.unwrap_or(DEFAULT_KEEP);
    prune_run_logs(&dir, keep.saturating_sub(1))?;

    let log_path = dir.join(run_log_name(chrono::Local::now()));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter =
        EnvFilter::try_new("websearch=debug,warn").unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer)
        .try_init()
        .ok(); // Already initialized in tests.

    tracing::info!(log_file = %log_path.display(), keep, "debug logging enabled");

    Ok(Some(LogGuard(guard)))
}

fn log_dir(configured: Option<&str>) -> Result<PathBuf> {
    match configured {
        Some(raw) => Ok(expand_home(raw)),
        None => {
            let config_path = crate::config::config_path()?;
            Ok(config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")))
        }
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match (raw.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(raw),
    }
}

fn run_log_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("{LOG_PREFIX}{}{LOG_SUFFIX}", now.format("%Y%m%d-%H%M%S"))
}

fn is_run_log(name: &str) -> bool {
    name.starts_with(LOG_PREFIX) && name.ends_with(LOG_SUFFIX)
}

/// Delete all but the newest `keep` run logs in `dir`.
fn prune_run_logs(dir: &Path, keep: usize) -> Result<()> {
    let mut logs: Vec<String> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read log directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok()?.file_name().into_string().ok())
        .filter(|name| is_run_log(name))
        .collect();

    // Timestamped names sort oldest first.
    logs.sort_unstable();
    let excess = logs.len().saturating_sub(keep);

    for name in &logs[..excess] {
        let path = dir.join(name);
        if let Err(e) = fs::remove_file(&path) {
            tracing::debug!(error = %e, file = %path.display(), "failed to remove old log file");
        }
    }
    Ok(())
}

/// Masks the value of every `key=` query parameter so request URLs can be logged.
pub fn redact_secrets(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = find_key_param(rest) {
        let value_start = pos + "key=".len();
        out.push_str(&rest[..value_start]);
        let value_len = rest[value_start..]
            .find(|c: char| c == '&' || c == '#' || c.is_whitespace())
            .unwrap_or(rest.len() - value_start);
        if value_len > 0 {
            out.push_str("***REDACTED***");
        }
        rest = &rest[value_start + value_len..];
    }

    out.push_str(rest);
    out
}

/// Offset of the next `key=` that starts a parameter (not e.g. `apikey=`).
fn find_key_param(haystack: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(found) = haystack[offset..].find("key=") {
        let pos = offset + found;
        let starts_param = pos == 0 || matches!(haystack.as_bytes()[pos - 1], b'?' | b'&');
        if starts_param {
            return Some(pos);
        }
        offset = pos + "key=".len();
    }
    None
}
