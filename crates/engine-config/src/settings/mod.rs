use crate::{env::EnvManager, settings::error::SettingsError};
use serde::Serialize;
use std::{fmt::Display, path::PathBuf, str::FromStr, time::Duration};
use tracing::debug;

pub mod error;

pub const ENV_PREFIX: &str = "SLOTWATCH_";
pub const ENV_FILE_VAR: &str = "SLOTWATCH_ENV_FILE";

pub const DEFAULT_BEACON_URL: &str = "http://localhost:5052";
pub const DEFAULT_BATCH_SIZE: u64 = 500;
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 250;
pub const DEFAULT_RECHECK_CONCURRENCY: usize = 350;
pub const DEFAULT_RETRY_LIMIT: usize = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000;

/// Every tunable of a run. All fields have defaults; see [`Settings::from_env`]
/// for the variable names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub beacon_url: String,
    pub data_dir: PathBuf,
    /// Slots per ingestion batch; the checkpoint advances once per batch.
    pub batch_size: u64,
    /// Concurrent fetches while ingesting a batch.
    pub concurrency_limit: usize,
    /// Concurrent fetches while refreshing validators.
    pub recheck_concurrency: usize,
    /// Maximum attempts per fetch, including the first.
    pub retry_limit: usize,
    pub retry_base_delay: Duration,
    pub request_timeout: Duration,
    /// First slot to ingest when no checkpoint exists.
    pub start_slot: u64,
    /// Case-insensitive graffiti substring selecting blocks for stats. Empty matches all.
    pub graffiti_term: String,
    pub log_level: String,
    /// Items between recheck progress lines.
    pub progress_interval: u64,
    /// Refresh every known validator on each run.
    pub recheck: bool,
}

impl Settings {
    pub fn defaults_in(data_dir: impl Into<PathBuf>) -> Self {
        Settings {
            beacon_url: DEFAULT_BEACON_URL.to_string(),
            data_dir: data_dir.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            recheck_concurrency: DEFAULT_RECHECK_CONCURRENCY,
            retry_limit: DEFAULT_RETRY_LIMIT,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            start_slot: 0,
            graffiti_term: String::new(),
            log_level: "info".to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            recheck: true,
        }
    }

    /// Reads the process environment, overlaid by the file named in
    /// `SLOTWATCH_ENV_FILE` or by `./.env` when that exists.
    pub fn load() -> Result<Self, SettingsError> {
        let mut env = EnvManager::new();

        if let Some(path) = env.get(ENV_FILE_VAR).map(str::to_string) {
            env.load_from_file(&path)?;
            debug!(path = %path, "Loaded env file");
        } else if std::path::Path::new(".env").is_file() {
            env.load_from_file(".env")?;
            debug!("Loaded ./.env");
        }

        Self::from_env(&env)
    }

    pub fn from_env(env: &EnvManager) -> Result<Self, SettingsError> {
        let data_dir = match env.get(&key("DATA_DIR")) {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
            _ => default_data_dir()?,
        };

        let defaults = Self::defaults_in(data_dir);
        let settings = Settings {
            beacon_url: parse_or(env, "BEACON_URL", defaults.beacon_url)?,
            data_dir: defaults.data_dir,
            batch_size: parse_or(env, "BATCH_SIZE", defaults.batch_size)?,
            concurrency_limit: parse_or(env, "CONCURRENCY_LIMIT", defaults.concurrency_limit)?,
            recheck_concurrency: parse_or(
                env,
                "RECHECK_CONCURRENCY",
                defaults.recheck_concurrency,
            )?,
            retry_limit: parse_or(env, "RETRY_LIMIT", defaults.retry_limit)?,
            retry_base_delay: Duration::from_millis(parse_or(
                env,
                "RETRY_BASE_DELAY_MS",
                DEFAULT_RETRY_BASE_DELAY_MS,
            )?),
            request_timeout: Duration::from_secs(parse_or(
                env,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            start_slot: parse_or(env, "START_SLOT", defaults.start_slot)?,
            graffiti_term: env
                .get(&key("GRAFFITI_TERM"))
                .map(str::to_string)
                .unwrap_or(defaults.graffiti_term),
            log_level: parse_or(env, "LOG_LEVEL", defaults.log_level)?,
            progress_interval: parse_or(env, "PROGRESS_INTERVAL", defaults.progress_interval)?,
            recheck: match env.get(&key("RECHECK")) {
                Some(raw) => parse_bool(&key("RECHECK"), raw)?,
                None => defaults.recheck,
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            ("BATCH_SIZE", self.batch_size == 0),
            ("CONCURRENCY_LIMIT", self.concurrency_limit == 0),
            ("RECHECK_CONCURRENCY", self.recheck_concurrency == 0),
            ("RETRY_LIMIT", self.retry_limit == 0),
            ("PROGRESS_INTERVAL", self.progress_interval == 0),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, is_zero)| *is_zero) {
            return Err(SettingsError::OutOfRange {
                key: key(name),
                reason: "must be greater than zero".to_string(),
            });
        }

        if !(self.beacon_url.starts_with("http://") || self.beacon_url.starts_with("https://")) {
            return Err(SettingsError::OutOfRange {
                key: key("BEACON_URL"),
                reason: format!("'{}' is not an http(s) url", self.beacon_url),
            });
        }

        if self.request_timeout.is_zero() {
            return Err(SettingsError::OutOfRange {
                key: key("REQUEST_TIMEOUT_SECS"),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

pub fn default_data_dir() -> Result<PathBuf, SettingsError> {
    dirs::home_dir()
        .map(|home| home.join(".slotwatch").join("state"))
        .ok_or(SettingsError::NoHomeDir)
}

fn key(name: &str) -> String {
    format!("{ENV_PREFIX}{name}")
}

fn parse_or<T>(env: &EnvManager, name: &str, default: T) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: Display,
{
    let key = key(name);
    match env.get(&key).map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| SettingsError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, SettingsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
