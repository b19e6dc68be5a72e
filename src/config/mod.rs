use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::error;

use crate::retry::RetryConfig;

const DEFAULT_INDEXER_BASE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_INITIAL_DELAY_SECS: u64 = 1;
const DEFAULT_RETRY_MAX_DELAY_SECS: u64 = 30;

fn default_log() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// Optional TOML overrides; every field may be omitted.
/// Priority: env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// Base URL of the external indexing service (default: http://127.0.0.1:8080).
    indexer_base_url: Option<String>,
    /// Per-try HTTP timeout in seconds for submissions (default: 30).
    request_timeout_secs: Option<u64>,
    /// HTTP tries per submission, including the first (default: 3).
    max_attempts: Option<u32>,
    /// Log level filter string, e.g. "debug", "info,repograph=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured).
    log_format: Option<String>,
}

fn load_toml(path: &Path) -> Option<TomlConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config file, using defaults");
            None
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

// ─── ServiceConfig ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the external indexing service (REPOGRAPH_INDEXER_URL env var).
    pub indexer_base_url: String,
    /// Per-try HTTP timeout in seconds (REPOGRAPH_REQUEST_TIMEOUT_SECS env var).
    pub request_timeout_secs: u64,
    /// HTTP tries per submission, including the first (REPOGRAPH_MAX_ATTEMPTS env var).
    pub max_attempts: u32,
    /// Log level filter (REPOGRAPH_LOG env var, default: "info").
    pub log: String,
    /// Log output format: "pretty" (default) | "json" (REPOGRAPH_LOG_FORMAT env var).
    pub log_format: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            indexer_base_url: DEFAULT_INDEXER_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            log: default_log(),
            log_format: default_log_format(),
        }
    }
}

impl ServiceConfig {
    /// Build config from env vars plus an optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. env var
    ///   2. TOML file at `config_path`
    ///   3. built-in default
    ///
    /// Never fails: a missing or malformed file logs an error and falls back
    /// to the layers below it.
    pub fn load(config_path: Option<&Path>) -> Self {
        let toml = config_path.and_then(load_toml).unwrap_or_default();

        let indexer_base_url = env_var("REPOGRAPH_INDEXER_URL")
            .or(toml.indexer_base_url)
            .unwrap_or_else(|| DEFAULT_INDEXER_BASE_URL.to_string());

        let request_timeout_secs = env_var("REPOGRAPH_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .or(toml.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        // At least one try; a zero from either layer falls through to the
        // layer below it.
        let max_attempts = env_var("REPOGRAPH_MAX_ATTEMPTS")
            .and_then(|s| s.parse().ok())
            .filter(|&n| n >= 1)
            .or(toml.max_attempts.filter(|&n| n >= 1))
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        let log = env_var("REPOGRAPH_LOG").or(toml.log).unwrap_or_else(default_log);

        let log_format = env_var("REPOGRAPH_LOG_FORMAT")
            .or(toml.log_format)
            .unwrap_or_else(default_log_format);

        Self {
            indexer_base_url,
            request_timeout_secs,
            max_attempts,
            log,
            log_format,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry schedule for submissions: 1 s before the second try, doubling
    /// after each, capped at 30 s. Always at least one try, whatever
    /// `max_attempts` says.
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_secs(DEFAULT_RETRY_INITIAL_DELAY_SECS),
            max_delay: Duration::from_secs(DEFAULT_RETRY_MAX_DELAY_SECS),
            multiplier: 2.0,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let config = ServiceConfig::load(None);
        assert_eq!(config.indexer_base_url, DEFAULT_INDEXER_BASE_URL);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.log, "info");
        assert_eq!(config.log_format, "pretty");
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "indexer_base_url = \"http://indexer.internal:9000\"\nmax_attempts = 5\nlog_format = \"json\""
        )
        .unwrap();

        let config = ServiceConfig::load(Some(&path));
        assert_eq!(config.indexer_base_url, "http://indexer.internal:9000");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.log_format, "json");
        // Untouched fields keep their defaults.
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn malformed_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_attempts = \"not a number").unwrap();

        let config = ServiceConfig::load(Some(&path));
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn zero_max_attempts_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_attempts = 0").unwrap();

        let config = ServiceConfig::load(Some(&path));
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ServiceConfig::load(Some(Path::new("/nonexistent/config.toml")));
        assert_eq!(config.indexer_base_url, DEFAULT_INDEXER_BASE_URL);
    }

    #[test]
    fn retry_schedule_matches_config() {
        let config = ServiceConfig {
            max_attempts: 4,
            ..ServiceConfig::default()
        };
        let retry = config.retry();
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.initial_delay, Duration::from_secs(1));
        assert_eq!(retry.multiplier, 2.0);
    }

    #[test]
    fn retry_never_drops_below_one_attempt() {
        let config = ServiceConfig {
            max_attempts: 0,
            ..ServiceConfig::default()
        };
        assert_eq!(config.retry().max_attempts, 1);
    }
}
