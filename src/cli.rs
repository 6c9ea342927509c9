//! Command-line interface parsing for onionscope
//!
//! This module handles parsing of CLI arguments using clap, with environment
//! variable fallbacks, and resolves them into the startup configuration of one
//! bot session.

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::Duration;
use clap::Parser;
use directories::ProjectDirs;
use thiserror::Error;

use crate::cache::DEFAULT_STALE_AFTER_SECS;
use crate::scrape::DEFAULT_BASE_URL;

/// Suffix of the cache file name, after `<nick>-<host>`
const DB_SUFFIX: &str = ".scopes.db";

/// Error types for invalid configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The freshness window is not positive or too large to represent
    #[error("Invalid --stale-after: {0}. It must be a positive number of seconds within range")]
    InvalidStaleAfter(i64),

    /// The request timeout is zero
    #[error("Invalid --timeout: it must be at least 1 second")]
    InvalidTimeout,

    /// A name that becomes part of the cache file name is unusable
    #[error("Invalid --{field}: '{value}'. It must be non-empty and contain no path separators")]
    InvalidName { field: &'static str, value: String },
}

/// onionscope - Today's horoscope from The Onion, cached on disk
#[derive(Parser, Debug)]
#[command(name = "onionscope")]
#[command(about = "Look up today's horoscope from The Onion")]
#[command(version)]
pub struct Cli {
    /// Zodiac sign to look up; any unambiguous prefix works
    ///
    /// Without a sign, chat commands are read from stdin, one per line:
    ///   .scope aquarius
    ///   .horoscope leo
    ///   gem
    #[arg(value_name = "SIGN")]
    pub sign: Option<String>,

    /// Directory holding the cache file [default: the user data directory]
    #[arg(long, env = "ONIONSCOPE_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Bot nickname, used in the cache file name
    #[arg(long, env = "ONIONSCOPE_NICK", default_value = "onionscope")]
    pub nick: String,

    /// Chat server host, used in the cache file name
    #[arg(long, env = "ONIONSCOPE_HOST", default_value = "localhost")]
    pub host: String,

    /// Seconds before cached horoscopes are fetched again
    #[arg(
        long,
        env = "ONIONSCOPE_STALE_AFTER",
        value_name = "SECONDS",
        default_value_t = DEFAULT_STALE_AFTER_SECS
    )]
    pub stale_after: i64,

    /// Site to scrape horoscopes from
    #[arg(long, env = "ONIONSCOPE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request HTTP timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub timeout: u64,

    /// Discard the cached horoscopes' freshness and fetch again
    #[arg(long)]
    pub refresh: bool,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Directory holding the cache file
    pub data_dir: PathBuf,
    /// Bot nickname
    pub nick: String,
    /// Chat server host
    pub host: String,
    /// Freshness window for cached horoscopes
    pub stale_after: Duration,
    /// Site root to scrape
    pub base_url: String,
    /// Per-request HTTP timeout
    pub timeout: StdDuration,
    /// Whether to invalidate the cache before answering
    pub force_refresh: bool,
    /// One-shot query; `None` means read commands from stdin
    pub query: Option<String>,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with every value validated
    /// * `Err(ConfigError)` for the first unusable value
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let stale_after = Some(cli.stale_after)
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .ok_or(ConfigError::InvalidStaleAfter(cli.stale_after))?;
        if cli.timeout == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        validate_name("nick", &cli.nick)?;
        validate_name("host", &cli.host)?;

        Ok(StartupConfig {
            data_dir: cli.data_dir.clone().unwrap_or_else(default_data_dir),
            nick: cli.nick.clone(),
            host: cli.host.clone(),
            stale_after,
            base_url: cli.base_url.clone(),
            timeout: StdDuration::from_secs(cli.timeout),
            force_refresh: cli.refresh,
            query: cli.sign.clone(),
        })
    }

    /// Path of the cache file: `<data_dir>/<nick>-<host>.scopes.db`
    pub fn db_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}-{}{}", self.nick, self.host, DB_SUFFIX))
    }
}

/// XDG-compliant data directory (`~/.local/share/onionscope/` on Linux),
/// or the working directory if none can be determined
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "onionscope")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn validate_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.contains(|c: char| c == '/' || c == '\\') {
        return Err(ConfigError::InvalidName {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
