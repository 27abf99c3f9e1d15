//! # Settings Module
//!
//! Operator-adjustable scale factors for the xy, z and e axis groups.
//!
//! Scale factors are percentages applied to the base feedrate of each group.
//! They are read once at startup and written back on every change. If the
//! settings cannot be read at startup the defaults (150 for every group) are
//! used and the session keeps running.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{JogpadError, Result};

/// Fallback scale factor for every axis group.
pub const DEFAULT_SCALE_FACTOR: u32 = 150;

/// Largest accepted scale factor.
pub const MAX_SCALE_FACTOR: u32 = 1000;

/// Axis group a scale factor applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleAxis {
    Xy,
    Z,
    E,
}

impl fmt::Display for ScaleAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScaleAxis::Xy => "xy",
            ScaleAxis::Z => "z",
            ScaleAxis::E => "e",
        })
    }
}

impl FromStr for ScaleAxis {
    type Err = JogpadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xy" => Ok(ScaleAxis::Xy),
            "z" => Ok(ScaleAxis::Z),
            "e" => Ok(ScaleAxis::E),
            other => Err(JogpadError::Settings(format!(
                "unknown scale axis '{}' (expected xy, z or e)",
                other
            ))),
        }
    }
}

fn default_scale_factor() -> u32 { DEFAULT_SCALE_FACTOR }

/// Scale factors for the three axis groups.
///
/// # Examples
///
/// ```
/// use jogpad::settings::{ScaleAxis, ScaleFactors};
///
/// let mut factors = ScaleFactors::default();
/// assert_eq!(factors.get(ScaleAxis::Xy), 150);
///
/// factors.set(ScaleAxis::Z, 50)?;
/// assert_eq!(factors.scale_feedrate(ScaleAxis::Z, 600), 300);
/// # Ok::<(), jogpad::error::JogpadError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleFactors {
    #[serde(rename = "xy_scale_factor", default = "default_scale_factor")]
    pub xy: u32,
    #[serde(rename = "z_scale_factor", default = "default_scale_factor")]
    pub z: u32,
    #[serde(rename = "e_scale_factor", default = "default_scale_factor")]
    pub e: u32,
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self {
            xy: DEFAULT_SCALE_FACTOR,
            z: DEFAULT_SCALE_FACTOR,
            e: DEFAULT_SCALE_FACTOR,
        }
    }
}

impl ScaleFactors {
    #[must_use]
    pub fn get(&self, axis: ScaleAxis) -> u32 {
        match axis {
            ScaleAxis::Xy => self.xy,
            ScaleAxis::Z => self.z,
            ScaleAxis::E => self.e,
        }
    }

    /// Sets one scale factor.
    ///
    /// # Errors
    ///
    /// Returns `Settings` if `value` is 0 or above [`MAX_SCALE_FACTOR`]. The
    /// stored value is left unchanged in that case.
    pub fn set(&mut self, axis: ScaleAxis, value: u32) -> Result<()> {
        check_factor(axis, value)?;
        match axis {
            ScaleAxis::Xy => self.xy = value,
            ScaleAxis::Z => self.z = value,
            ScaleAxis::E => self.e = value,
        }
        Ok(())
    }

    /// Checks every factor is within range.
    ///
    /// # Errors
    ///
    /// Returns `Settings` naming the first offending group.
    pub fn validate(&self) -> Result<()> {
        for axis in [ScaleAxis::Xy, ScaleAxis::Z, ScaleAxis::E] {
            check_factor(axis, self.get(axis))?;
        }
        Ok(())
    }

    /// Applies the group's percentage to a base feedrate (never below 1).
    #[must_use]
    pub fn scale_feedrate(&self, axis: ScaleAxis, base: u32) -> u32 {
        let scaled = u64::from(base) * u64::from(self.get(axis)) / 100;
        u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
    }
}

fn check_factor(axis: ScaleAxis, value: u32) -> Result<()> {
    if value == 0 || value > MAX_SCALE_FACTOR {
        return Err(JogpadError::Settings(format!(
            "{} scale factor must be between 1 and {}, got {}",
            axis, MAX_SCALE_FACTOR, value
        )));
    }
    Ok(())
}

/// Storage for scale factors.
pub trait SettingsStore: Send {
    /// Reads the stored factors.
    fn load(&self) -> Result<ScaleFactors>;

    /// Persists `factors`.
    fn save(&mut self, factors: &ScaleFactors) -> Result<()>;
}

/// Scale factors stored in a TOML file.
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load(&self) -> Result<ScaleFactors> {
        let contents = fs::read_to_string(&self.path)?;
        let factors: ScaleFactors = toml::from_str(&contents)?;
        factors.validate()?;
        Ok(factors)
    }

    fn save(&mut self, factors: &ScaleFactors) -> Result<()> {
        let contents = toml::to_string(factors)
            .map_err(|e| JogpadError::Settings(format!("Failed to encode settings: {}", e)))?;
        fs::write(&self.path, contents)?;
        debug!("Saved scale factors to {}", self.path.display());
        Ok(())
    }
}

/// Loads scale factors, falling back to the defaults if the store fails.
pub fn load_or_default(store: &dyn SettingsStore) -> ScaleFactors {
    match store.load() {
        Ok(factors) => factors,
        Err(e) => {
            warn!("Settings unavailable ({}), using default scale factors", e);
            ScaleFactors::default()
        }
    }
}
