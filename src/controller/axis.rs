//! # Axis Mapper Module
//!
//! Turns a normalized analog reading into a bounded jog distance.
//!
//! ## Dead Zone
//!
//! Readings whose magnitude is at or below the dead zone map to 0.0 so that
//! stick noise near center never moves the machine.
//!
//! ## Gain
//!
//! Outside the dead zone the distance is `|value|^gain * max_distance`, clamped
//! to `max_distance`, signed like the input and rounded to one decimal place.
//! A gain exponent of 1.0 (the default) is linear; larger exponents give finer
//! control near center.
//!
//! ## Usage
//!
//! ```
//! use jogpad::controller::axis::{map_axis, DEFAULT_DEAD_ZONE, LINEAR_GAIN};
//!
//! assert_eq!(map_axis(0.5, DEFAULT_DEAD_ZONE, 10.0, LINEAR_GAIN), 5.0);
//! assert_eq!(map_axis(-1.0, DEFAULT_DEAD_ZONE, 10.0, LINEAR_GAIN), -10.0);
//! assert_eq!(map_axis(0.05, DEFAULT_DEAD_ZONE, 10.0, LINEAR_GAIN), 0.0);
//! ```

use crate::telemetry::round_to;

/// Default dead zone for sticks and triggers.
pub const DEFAULT_DEAD_ZONE: f32 = 0.1;

/// Gain exponent for a linear response.
pub const LINEAR_GAIN: f32 = 1.0;

/// Ceiling for a single X/Y/Z jog, in millimetres.
pub const MAX_JOG_DISTANCE: f32 = 10.0;

/// Ceiling for a single extrusion, in millimetres.
///
/// Smaller than the jog ceiling so a full stick deflection cannot over-extrude.
pub const MAX_EXTRUDE_DISTANCE: f32 = 5.0;

/// Maps an analog value to a signed distance.
///
/// # Arguments
///
/// * `value` - Normalized reading (-1.0 to 1.0)
/// * `dead_zone` - Magnitude at or below which the output is 0.0
/// * `max_distance` - Output ceiling
/// * `gain_exponent` - Response curve exponent (1.0 = linear)
///
/// # Returns
///
/// Distance in `-max_distance..=max_distance`, rounded to one decimal.
#[must_use]
pub fn map_axis(value: f32, dead_zone: f32, max_distance: f32, gain_exponent: f32) -> f32 {
    let magnitude = value.abs();
    if !magnitude.is_finite() || magnitude <= dead_zone {
        return 0.0;
    }

    let distance = (magnitude.powf(gain_exponent) * max_distance).min(max_distance);
    let rounded = round_to(distance, 1);

    if rounded == 0.0 {
        0.0
    } else {
        value.signum() * rounded
    }
}

/// A configured response curve for one axis.
///
/// # Examples
///
/// ```
/// use jogpad::controller::axis::AxisCurve;
///
/// let curve = AxisCurve::new(0.1, 1.0, 5.0);
/// assert_eq!(curve.apply(1.0), 5.0);
/// assert_eq!(curve.apply(0.08), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCurve {
    dead_zone: f32,
    gain_exponent: f32,
    max_distance: f32,
}

impl Default for AxisCurve {
    fn default() -> Self {
        Self {
            dead_zone: DEFAULT_DEAD_ZONE,
            gain_exponent: LINEAR_GAIN,
            max_distance: MAX_JOG_DISTANCE,
        }
    }
}

impl AxisCurve {
    /// Creates a curve. The dead zone is clamped to 0.0..=0.5, the gain to
    /// 0.5..=3.0, and a negative ceiling is treated as 0.0.
    #[must_use]
    pub fn new(dead_zone: f32, gain_exponent: f32, max_distance: f32) -> Self {
        Self {
            dead_zone: dead_zone.clamp(0.0, 0.5),
            gain_exponent: gain_exponent.clamp(0.5, 3.0),
            max_distance: max_distance.max(0.0),
        }
    }

    /// Curve for X/Y/Z jogging with the default ceiling.
    #[must_use]
    pub fn jog(dead_zone: f32, gain_exponent: f32) -> Self {
        Self::new(dead_zone, gain_exponent, MAX_JOG_DISTANCE)
    }

    /// Curve for extrusion with the default ceiling.
    #[must_use]
    pub fn extrude(dead_zone: f32, gain_exponent: f32) -> Self {
        Self::new(dead_zone, gain_exponent, MAX_EXTRUDE_DISTANCE)
    }

    #[must_use]
    pub fn dead_zone(&self) -> f32 {
        self.dead_zone
    }

    #[must_use]
    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    /// Applies the curve to a normalized reading.
    #[inline]
    #[must_use]
    pub fn apply(&self, value: f32) -> f32 {
        map_axis(value, self.dead_zone, self.max_distance, self.gain_exponent)
    }
}
