//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{JogpadError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Printer serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Empty means auto-detect.
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Controller sampling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Empty means auto-detect.
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_dead_zone")]
    pub dead_zone: f32,

    #[serde(default = "default_gain_exponent")]
    pub gain_exponent: f32,

    #[serde(default = "default_frame_rate_hz")]
    pub frame_rate_hz: u32,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_command_interval_ms")]
    pub command_interval_ms: u64,
}

/// Motion limits and base feedrates
#[derive(Debug, Deserialize, Clone)]
pub struct MotionConfig {
    #[serde(default = "default_max_jog_distance")]
    pub max_jog_distance: f32,

    #[serde(default = "default_max_extrude_distance")]
    pub max_extrude_distance: f32,

    #[serde(default = "default_xy_feedrate")]
    pub xy_feedrate: u32,

    #[serde(default = "default_z_feedrate")]
    pub z_feedrate: u32,

    #[serde(default = "default_e_feedrate")]
    pub e_feedrate: u32,
}

/// Backend link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_backend_address")]
    pub address: String,

    #[serde(default = "default_plugin_id")]
    pub plugin_id: String,

    /// Per-command write timeout (ms)
    #[serde(default = "default_backend_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

/// Locations of the settings and preference files
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_settings_path")]
    pub settings_path: String,

    #[serde(default = "default_prefs_path")]
    pub prefs_path: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Empty means console only.
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 100 }

fn default_dead_zone() -> f32 { 0.1 }
fn default_gain_exponent() -> f32 { 1.0 }
fn default_frame_rate_hz() -> u32 { 60 }
fn default_poll_interval_ms() -> u64 { 1000 }
fn default_command_interval_ms() -> u64 { 100 }

fn default_max_jog_distance() -> f32 { 10.0 }
fn default_max_extrude_distance() -> f32 { 5.0 }
fn default_xy_feedrate() -> u32 { 3000 }
fn default_z_feedrate() -> u32 { 600 }
fn default_e_feedrate() -> u32 { 300 }

fn default_backend_address() -> String { "127.0.0.1:5001".to_string() }
fn default_plugin_id() -> String { "xbox_controller".to_string() }
fn default_backend_write_timeout_ms() -> u64 { 1000 }

fn default_settings_path() -> String { "./scale_factors.toml".to_string() }
fn default_prefs_path() -> String { "./prefs.toml".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            dead_zone: default_dead_zone(),
            gain_exponent: default_gain_exponent(),
            frame_rate_hz: default_frame_rate_hz(),
            poll_interval_ms: default_poll_interval_ms(),
            command_interval_ms: default_command_interval_ms(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_jog_distance: default_max_jog_distance(),
            max_extrude_distance: default_max_extrude_distance(),
            xy_feedrate: default_xy_feedrate(),
            z_feedrate: default_z_feedrate(),
            e_feedrate: default_e_feedrate(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: default_backend_address(),
            plugin_id: default_plugin_id(),
            write_timeout_ms: default_backend_write_timeout_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            prefs_path: default_prefs_path(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> JogpadError {
    JogpadError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use jogpad::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if ![57600, 115200, 230400, 250000, 500000, 1000000].contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 57600, 115200, 230400, 250000, 500000, 1000000",
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if !(0.0..=0.5).contains(&self.controller.dead_zone) {
            return Err(invalid("dead_zone must be between 0.0 and 0.5"));
        }

        if !(0.5..=3.0).contains(&self.controller.gain_exponent) {
            return Err(invalid("gain_exponent must be between 0.5 and 3.0"));
        }

        if self.controller.frame_rate_hz == 0 || self.controller.frame_rate_hz > 240 {
            return Err(invalid("frame_rate_hz must be between 1 and 240"));
        }

        if self.controller.poll_interval_ms < 50 || self.controller.poll_interval_ms > 10000 {
            return Err(invalid("poll_interval_ms must be between 50 and 10000"));
        }

        if self.controller.command_interval_ms < 10 || self.controller.command_interval_ms > 5000 {
            return Err(invalid("command_interval_ms must be between 10 and 5000"));
        }

        for (name, value) in [
            ("max_jog_distance", self.motion.max_jog_distance),
            ("max_extrude_distance", self.motion.max_extrude_distance),
        ] {
            if value <= 0.0 || value > 100.0 {
                return Err(invalid(format!("{} must be greater than 0 and at most 100", name)));
            }
        }

        for (name, value) in [
            ("xy_feedrate", self.motion.xy_feedrate),
            ("z_feedrate", self.motion.z_feedrate),
            ("e_feedrate", self.motion.e_feedrate),
        ] {
            if value == 0 || value > 30000 {
                return Err(invalid(format!("{} must be between 1 and 30000", name)));
            }
        }

        if self.backend.address.is_empty() {
            return Err(invalid("backend address cannot be empty"));
        }

        if self.backend.plugin_id.is_empty() {
            return Err(invalid("backend plugin_id cannot be empty"));
        }

        if self.backend.write_timeout_ms == 0 || self.backend.write_timeout_ms > 10000 {
            return Err(invalid("backend write_timeout_ms must be between 1 and 10000"));
        }

        if self.storage.settings_path.is_empty() || self.storage.prefs_path.is_empty() {
            return Err(invalid("storage paths cannot be empty"));
        }

        Ok(())
    }
}
