//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the tide-config.toml file.
//! It names the station, the default height bands to window, and where extrema
//! come from. Command-line flags override any of these per run.
//!
//! ```toml
//! [station]
//! id = "7735"
//! name = "Point Atkinson"
//! timezone = "America/Vancouver"
//!
//! [windows]
//! bands = [{ low = -inf, high = 1.5 }, { low = 1.5, high = 2.0 }]
//! sample_minutes = 15
//!
//! [source]
//! kind = "file"
//! path = "tide-extrema.json"
//! ```

use crate::provider::CHS_BASE_URL;
use crate::HeightBand;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration loaded from tide-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Tide station configuration
    pub station: StationConfig,
    /// Default windowing options
    pub windows: WindowConfig,
    /// Where station extrema are read from
    pub source: SourceConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StationConfig {
    /// Station identifier understood by the configured source
    /// (for CHS this is the API station id, not the 5-digit code)
    pub id: String,
    /// Human-readable station name for reference
    pub name: String,
    /// IANA timezone used for calendar dates and output times
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WindowConfig {
    /// Bands windowed when none are given on the command line
    #[serde(default)]
    pub bands: Vec<HeightBand>,
    /// Raw-mode sample spacing; extrema only when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// JSON array of extrema on disk
    File { path: PathBuf },
    /// CHS IWLS API
    Chs {
        #[serde(default = "default_chs_url")]
        base_url: String,
    },
}

fn default_chs_url() -> String {
    CHS_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            station: StationConfig {
                id: "7735".to_string(),
                name: "Point Atkinson".to_string(),
                timezone: "America/Vancouver".to_string(),
            },
            windows: WindowConfig {
                bands: vec![HeightBand::below(1.5), HeightBand::below(2.0)],
                sample_minutes: None,
            },
            source: SourceConfig::File {
                path: PathBuf::from("tide-extrema.json"),
            },
        }
    }
}

impl Config {
    /// Load configuration from tide-config.toml file
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path("tide-config.toml")
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    log::info!("Loaded configuration for station: {}", config.station.name);
                    config
                }
                Err(e) => {
                    log::warn!("Invalid config file format in {}: {}", path.display(), e);
                    log::warn!("Using default configuration (Point Atkinson)");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!(
                    "No config file at {}, using default configuration (Point Atkinson)",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Save current configuration to the given path as pretty TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.station.id, "7735");
        assert_eq!(config.station.timezone, "America/Vancouver");
        assert_eq!(config.windows.bands.len(), 2);
        assert!(matches!(config.source, SourceConfig::File { .. }));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config.station.id, "7735");
    }

    #[test]
    fn test_load_chs_source() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"
[station]
id = "5cebf1de3d0f4a073c4bbd1d"
name = "Adams Harbour"
timezone = "America/Vancouver"

[windows]
bands = [{ low = 1.5, high = 2.0 }]
sample_minutes = 15

[source]
kind = "chs"
"#,
        )
        .unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.station.name, "Adams Harbour");
        assert_eq!(config.windows.sample_minutes, Some(15));
        assert_eq!(
            config.windows.bands,
            vec![HeightBand {
                low: 1.5,
                high: 2.0
            }]
        );
        assert_eq!(
            config.source,
            SourceConfig::Chs {
                base_url: CHS_BASE_URL.to_string()
            }
        );
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "station = 3").unwrap();
        assert_eq!(Config::load_from_path(file.path()), Config::default());
    }

    #[test]
    fn test_save_and_reload() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.station.name = "Tofino".to_string();
        config.save(file.path()).unwrap();

        assert_eq!(Config::load_from_path(file.path()).station.name, "Tofino");
    }
}
