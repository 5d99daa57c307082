//! Configuration loader
//!
//! Loads dispatcher configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, applies any `COURIER_*` environment variables over the defaults
//! 2. If none are set, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. With neither, the built-in defaults are used
//!
//! ## Environment Variables
//! - `COURIER_MAX_RETRIES`: Retries granted by the default policy, or `none`
//!   to disable it
//! - `COURIER_CALLBACK_MODE`: `inline` or `detached`
//! - `COURIER_JOIN_TIMEOUT_MS`: How long `shutdown` waits for the worker
//! - `COURIER_HTTP_TIMEOUT_SECS`: Per-attempt HTTP timeout
//! - `COURIER_USER_AGENT`: User agent sent by the HTTP transport
//! - `COURIER_LOG_PAYLOADS`: Log request/response payloads (true/false)
//! - `COURIER_LOG_LEVEL`: `EnvFilter` directive
//! - `COURIER_LOG_JSON`: Emit JSON log lines (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./courier.json` or `./courier.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use courier_domain::{CallbackMode, Config, CourierError, Result};

const ENV_KEYS: [&str; 8] = [
    "COURIER_MAX_RETRIES",
    "COURIER_CALLBACK_MODE",
    "COURIER_JOIN_TIMEOUT_MS",
    "COURIER_HTTP_TIMEOUT_SECS",
    "COURIER_USER_AGENT",
    "COURIER_LOG_PAYLOADS",
    "COURIER_LOG_LEVEL",
    "COURIER_LOG_JSON",
];

/// Load configuration with automatic fallback strategy
///
/// Environment variables win when at least one is set. Otherwise the first
/// config file found is used, and failing that the defaults.
///
/// # Errors
/// Returns `CourierError::Config` if an environment variable or the config
/// file holds an invalid value.
pub fn load() -> Result<Config> {
    match apply_env(Config::default(), env_lookup)? {
        Some(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        None => match probe_config_paths() {
            Some(path) => load_from_file(Some(path)),
            None => {
                tracing::info!("No configuration found, using defaults");
                Ok(Config::default())
            }
        },
    }
}

/// Load configuration from environment variables
///
/// Unset variables keep their default values.
///
/// # Errors
/// Returns `CourierError::Config` if no `COURIER_*` variable is set or a
/// value cannot be parsed.
pub fn load_from_env() -> Result<Config> {
    apply_env(Config::default(), env_lookup)?.ok_or_else(|| {
        CourierError::Config("No COURIER_* environment variables are set".to_string())
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CourierError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CourierError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CourierError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CourierError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `CourierError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CourierError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CourierError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CourierError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
        candidates.push(cwd.join("../config.json"));
        candidates.push(cwd.join("../config.toml"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> [PathBuf; 4] {
    [
        dir.join("courier.json"),
        dir.join("courier.toml"),
        dir.join("config.json"),
        dir.join("config.toml"),
    ]
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Apply every variable `lookup` knows about to `config`.
///
/// Returns `None` when none of the keys were present.
fn apply_env<F>(mut config: Config, lookup: F) -> Result<Option<Config>>
where
    F: Fn(&str) -> Option<String>,
{
    if !ENV_KEYS.iter().any(|key| lookup(key).is_some()) {
        return Ok(None);
    }

    if let Some(raw) = lookup("COURIER_MAX_RETRIES") {
        config.dispatcher.max_retries = if raw.trim().eq_ignore_ascii_case("none") {
            None
        } else {
            Some(parse_value("COURIER_MAX_RETRIES", &raw)?)
        };
    }
    if let Some(raw) = lookup("COURIER_CALLBACK_MODE") {
        config.dispatcher.callback_mode = CallbackMode::from_str(&raw)
            .map_err(|e| CourierError::Config(format!("Invalid COURIER_CALLBACK_MODE: {e}")))?;
    }
    if let Some(raw) = lookup("COURIER_JOIN_TIMEOUT_MS") {
        config.dispatcher.join_timeout_ms = parse_value("COURIER_JOIN_TIMEOUT_MS", &raw)?;
    }
    if let Some(raw) = lookup("COURIER_HTTP_TIMEOUT_SECS") {
        config.transport.timeout_secs = parse_value("COURIER_HTTP_TIMEOUT_SECS", &raw)?;
    }
    if let Some(raw) = lookup("COURIER_USER_AGENT") {
        config.transport.user_agent = Some(raw);
    }
    if let Some(raw) = lookup("COURIER_LOG_PAYLOADS") {
        config.transport.log_payloads = parse_bool(&raw);
    }
    if let Some(raw) = lookup("COURIER_LOG_LEVEL") {
        config.logging.level = raw;
    }
    if let Some(raw) = lookup("COURIER_LOG_JSON") {
        config.logging.json = parse_bool(&raw);
    }

    Ok(Some(config))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| CourierError::Config(format!("Invalid {key}: {e}")))
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
