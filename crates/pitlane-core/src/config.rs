//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/pitlane/config.toml)
//! 3. Environment variables (PITLANE_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "PITLANE";

/// Address the controller firmware serves on out of the box
const DEFAULT_BASE_URL: &str = "http://192.168.0.20:8080";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the device API (scheme, host and port)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Period of the poll loop in milliseconds (the fastest cadence)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How often the headers-only liveness probe runs
    #[serde(default = "default_connectivity_interval_ms")]
    pub connectivity_interval_ms: u64,

    /// Per-request timeout enforced by the HTTP transport
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Which status families the poller watches, and how often
    #[serde(default)]
    pub watch: WatchConfig,

    /// Log file for `watch` mode (stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Poll interval per endpoint family, in milliseconds. Zero disables a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_fast_ms")]
    pub lap_ms: u64,
    #[serde(default = "default_fast_ms")]
    pub traffic_light_ms: u64,
    #[serde(default = "default_slow_ms")]
    pub led_ms: u64,
    #[serde(default = "default_slow_ms")]
    pub racer_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            lap_ms: default_fast_ms(),
            traffic_light_ms: default_fast_ms(),
            led_ms: default_slow_ms(),
            racer_ms: default_slow_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            connectivity_interval_ms: default_connectivity_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            watch: WatchConfig::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (PITLANE_BASE_URL, PITLANE_POLL_INTERVAL_MS, ...)
    /// 2. Config file (~/.config/pitlane/config.toml or PITLANE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // PITLANE_BASE_URL
        if let Ok(val) = std::env::var(format!("{}_BASE_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.base_url = val;
            }
        }

        // Interval overrides are ignored when they don't parse
        if let Some(ms) = env_millis("POLL_INTERVAL_MS") {
            self.poll_interval_ms = ms;
        }
        if let Some(ms) = env_millis("CONNECTIVITY_INTERVAL_MS") {
            self.connectivity_interval_ms = ms;
        }
        if let Some(ms) = env_millis("REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = ms;
        }
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with PITLANE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pitlane")
            .join("config.toml")
    }

    /// Poll loop period; never zero
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn env_millis(suffix: &str) -> Option<u64> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix))
        .ok()
        .and_then(|val| val.trim().parse().ok())
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_connectivity_interval_ms() -> u64 {
    3000
}

fn default_request_timeout_ms() -> u64 {
    3000
}

fn default_fast_ms() -> u64 {
    200
}

fn default_slow_ms() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "PITLANE_BASE_URL",
        "PITLANE_POLL_INTERVAL_MS",
        "PITLANE_CONNECTIVITY_INTERVAL_MS",
        "PITLANE_REQUEST_TIMEOUT_MS",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://192.168.0.20:8080");
        assert_eq!(config.poll_interval_ms, 200);
        assert_eq!(config.connectivity_interval_ms, 3000);
        assert_eq!(config.watch.led_ms, 5000);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_poll_interval_never_zero() {
        let config = Config {
            poll_interval_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_env_override_base_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("PITLANE_BASE_URL", "http://10.0.0.7:8080");
        config.apply_env_overrides();
        assert_eq!(config.base_url, "http://10.0.0.7:8080");

        // Empty string keeps the current value
        env::set_var("PITLANE_BASE_URL", "");
        config.apply_env_overrides();
        assert_eq!(config.base_url, "http://10.0.0.7:8080");
    }

    #[test]
    fn test_env_override_intervals() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("PITLANE_POLL_INTERVAL_MS", "40");
        env::set_var("PITLANE_CONNECTIVITY_INTERVAL_MS", "not-a-number");
        env::set_var("PITLANE_REQUEST_TIMEOUT_MS", " 1500 ");
        config.apply_env_overrides();

        assert_eq!(config.poll_interval_ms, 40);
        assert_eq!(config.connectivity_interval_ms, 3000);
        assert_eq!(config.request_timeout_ms, 1500);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            base_url = "http://pico.local:8080"
            poll_interval_ms = 80

            [watch]
            led_ms = 0
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.base_url, "http://pico.local:8080");
        assert_eq!(config.poll_interval_ms, 80);
        assert_eq!(config.watch.led_ms, 0);
        // Unspecified watch entries keep their defaults
        assert_eq!(config.watch.lap_ms, 200);
        assert_eq!(config.watch.racer_ms, 5000);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/pitlane/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.base_url, "http://192.168.0.20:8080");
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            base_url: "http://192.168.1.100:8080".to_string(),
            log_file: Some(PathBuf::from("/tmp/pitlane.log")),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded.base_url, config.base_url);
        assert_eq!(loaded.log_file, config.log_file);
        assert_eq!(loaded.watch, config.watch);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let _guard = EnvGuard::new(ENV_VARS);

        let err = Config::load_from_str("poll_interval_ms = \"fast\"").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config TOML"));
    }
}
