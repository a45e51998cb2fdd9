//! Application configuration.
//!
//! One toml file holds every deployment tunable: sampler deadzone, active
//! encoding policy, transmitter spacing, standalone frame rate and the link
//! device. Missing or unreadable configuration degrades to defaults rather
//! than preventing startup; a default file is written on first run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::encoding::EncodingPolicy;

const CONFIG_DIR: &str = "padlink";
const CONFIG_FILE: &str = "config.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not resolve a configuration directory for this user")]
    NoConfigDir,

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct PadlinkConfig {
    pub sampler: SamplerConfig,
    pub encoder: EncoderConfig,
    pub transmitter: TransmitterConfig,
    pub pipeline: PipelineConfig,
    pub link: LinkConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct SamplerConfig {
    /// Analog stick deadzone as a fraction (0.0-1.0).
    pub deadzone: f32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { deadzone: 0.05 }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct EncoderConfig {
    /// Active encoding policy; the two policies have different wire formats.
    pub policy: EncodingPolicy,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            policy: EncodingPolicy::Discrete,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct TransmitterConfig {
    /// Minimum spacing between writes in milliseconds.
    pub min_interval_ms: u64,
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self { min_interval_ms: 8 }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tick rate of the standalone frame ticker standing in for the display
    /// refresh callback.
    pub frame_rate_hz: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { frame_rate_hz: 60 }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial device of the BLE-UART bridge module.
    pub uart_device: String,

    pub baud_rate: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            uart_device: "/dev/ttyAMA0".to_string(),
            baud_rate: 9600,
        }
    }
}

impl PadlinkConfig {
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    /// Writes a default configuration file on first run.
    pub fn ensure_default() -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        if path.exists() {
            return Ok(());
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(&Self::default())?;
        fs::write(&path, content)?;
        info!("Created default configuration at {}", path.display());
        Ok(())
    }

    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        let content = fs::read_to_string(&path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the configuration, falling back to defaults on any failure.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }
}
