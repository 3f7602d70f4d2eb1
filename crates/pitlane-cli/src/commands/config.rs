//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pitlane_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "base_url, poll_interval_ms, connectivity_interval_ms, \
     request_timeout_ms, watch.lap_ms, watch.traffic_light_ms, watch.led_ms, \
     watch.racer_ms, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&config).context("Failed to serialize configuration")?
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.base_url);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  base_url:                 {}", config.base_url);
            println!("  poll_interval_ms:         {}", config.poll_interval_ms);
            println!(
                "  connectivity_interval_ms: {}",
                config.connectivity_interval_ms
            );
            println!("  request_timeout_ms:       {}", config.request_timeout_ms);
            println!(
                "  log_file:                 {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Watch (ms, 0 = off):");
            println!("  lap:           {}", config.watch.lap_ms);
            println!("  traffic_light: {}", config.watch.traffic_light_ms);
            println!("  led:           {}", config.watch.led_ms);
            println!("  racer:         {}", config.watch.racer_ms);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply_setting(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Update one key in place
fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let millis = || -> Result<u64> {
        value
            .parse()
            .with_context(|| format!("Invalid value for {}. Use a number of milliseconds.", key))
    };

    match key {
        "base_url" => {
            let url = value.trim_end_matches('/');
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("Invalid base_url '{}'. Use http://host:port", value);
            }
            config.base_url = url.to_string();
        }
        "poll_interval_ms" => config.poll_interval_ms = millis()?,
        "connectivity_interval_ms" => config.connectivity_interval_ms = millis()?,
        "request_timeout_ms" => config.request_timeout_ms = millis()?,
        "watch.lap_ms" => config.watch.lap_ms = millis()?,
        "watch.traffic_light_ms" => config.watch.traffic_light_ms = millis()?,
        "watch.led_ms" => config.watch.led_ms = millis()?,
        "watch.racer_ms" => config.watch.racer_ms = millis()?,
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_apply_setting_intervals() {
        let mut config = Config::default();

        apply_setting(&mut config, "poll_interval_ms", "100").unwrap();
        apply_setting(&mut config, "watch.led_ms", "0").unwrap();

        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.watch.led_ms, 0);
        assert!(apply_setting(&mut config, "watch.racer_ms", "soon").is_err());
    }

    #[test]
    fn test_apply_setting_base_url() {
        let mut config = Config::default();

        apply_setting(&mut config, "base_url", "http://10.0.0.7:8080/").unwrap();
        assert_eq!(config.base_url, "http://10.0.0.7:8080");

        assert!(apply_setting(&mut config, "base_url", "10.0.0.7").is_err());
    }

    #[test]
    fn test_apply_setting_log_file() {
        let mut config = Config::default();

        apply_setting(&mut config, "log_file", "/tmp/pitlane.log").unwrap();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/pitlane.log")));

        apply_setting(&mut config, "log_file", "none").unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_unknown_key_lists_valid_keys() {
        let mut config = Config::default();
        let err = apply_setting(&mut config, "sync_url", "x").unwrap_err();
        assert!(err.to_string().contains("watch.traffic_light_ms"));
    }

    #[test]
    fn test_set_writes_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        set(
            "watch.lap_ms".to_string(),
            "400".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();

        let saved = Config::load_from_path(&path).unwrap();
        assert_eq!(saved.watch.lap_ms, 400);
    }
}
