//! # Telemetry Module
//!
//! The per-axis motion snapshot shown to the operator.
//!
//! Telemetry is rewritten on every sampled frame, whether or not a command
//! was emitted for that frame. Values are kept at two decimals, the precision
//! the operator sees.

use serde::{Deserialize, Serialize};

/// Last computed motion magnitudes per axis.
///
/// # Examples
///
/// ```
/// use jogpad::telemetry::Telemetry;
///
/// let telemetry = Telemetry::rounded(1.234, -5.0, 0.0, 2.005);
/// assert_eq!(telemetry.x, 1.23);
/// assert_eq!(telemetry.y, -5.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Telemetry {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub e: f32,
}

impl Telemetry {
    /// Builds a telemetry record with every value rounded to two decimals.
    #[must_use]
    pub fn rounded(x: f32, y: f32, z: f32, e: f32) -> Self {
        Self {
            x: round_to(x, 2),
            y: round_to(y, 2),
            z: round_to(z, 2),
            e: round_to(e, 2),
        }
    }

    /// True when every axis is at rest.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0 && self.e == 0.0
    }
}

impl std::fmt::Display for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "X {:.2} Y {:.2} Z {:.2} E {:.2}",
            self.x, self.y, self.z, self.e
        )
    }
}

/// Rounds `value` to `decimals` places, half away from zero.
#[must_use]
pub fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}
