//! # Controller Snapshot Module
//!
//! A point-in-time copy of a controller's analog axes and buttons.
//!
//! Snapshots follow the standard gamepad layout: axes are normalized to
//! -1.0..=1.0 and each button carries a pressed flag plus an analog value in
//! 0.0..=1.0 (triggers report their travel there).
//!
//! Reads are checked. A report that is too short or carries a non-finite or
//! out-of-range value produces an error instead of a panic, so the sampler can
//! skip that frame and try again on the next one.

use crate::error::{JogpadError, Result};

/// Tolerance for axis values slightly outside -1.0..=1.0 due to driver rounding.
const RANGE_TOLERANCE: f32 = 0.01;

/// State of a single button.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ButtonState {
    /// Digital pressed flag.
    pub pressed: bool,
    /// Analog travel, 0.0 released to 1.0 fully pressed.
    pub value: f32,
}

impl ButtonState {
    /// A released button.
    pub const RELEASED: ButtonState = ButtonState {
        pressed: false,
        value: 0.0,
    };

    /// Digital button state, value follows the pressed flag.
    #[must_use]
    pub fn digital(pressed: bool) -> Self {
        Self {
            pressed,
            value: if pressed { 1.0 } else { 0.0 },
        }
    }

    /// Analog button state (trigger).
    #[must_use]
    pub fn analog(pressed: bool, value: f32) -> Self {
        Self { pressed, value }
    }
}

/// Immutable controller state for one frame.
///
/// # Examples
///
/// ```
/// use jogpad::controller::snapshot::{ButtonState, ControllerSnapshot};
///
/// let snapshot = ControllerSnapshot::new(
///     vec![0.0, 0.5, -0.25, 1.0],
///     vec![ButtonState::digital(true)],
/// );
/// assert_eq!(snapshot.axis(1).unwrap(), 0.5);
/// assert!(snapshot.button(0).unwrap().pressed);
/// assert!(snapshot.axis(7).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerSnapshot {
    axes: Vec<f32>,
    buttons: Vec<ButtonState>,
}

impl ControllerSnapshot {
    /// Creates a snapshot from raw axis and button vectors.
    #[must_use]
    pub fn new(axes: Vec<f32>, buttons: Vec<ButtonState>) -> Self {
        Self { axes, buttons }
    }

    /// Number of axes in the report.
    #[must_use]
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    /// Number of buttons in the report.
    #[must_use]
    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    /// Reads axis `index`.
    ///
    /// # Errors
    ///
    /// - `ShortReport` if the report has no such axis
    /// - `MalformedReport` if the value is not finite or outside -1.0..=1.0
    pub fn axis(&self, index: usize) -> Result<f32> {
        let value = *self.axes.get(index).ok_or(JogpadError::ShortReport {
            kind: "axis",
            index,
            len: self.axes.len(),
        })?;

        if !value.is_finite() || value.abs() > 1.0 + RANGE_TOLERANCE {
            return Err(JogpadError::MalformedReport(format!(
                "axis {} out of range: {}",
                index, value
            )));
        }

        Ok(value.clamp(-1.0, 1.0))
    }

    /// Reads button `index`.
    ///
    /// # Errors
    ///
    /// - `ShortReport` if the report has no such button
    /// - `MalformedReport` if the analog value is not finite or outside 0.0..=1.0
    pub fn button(&self, index: usize) -> Result<ButtonState> {
        let state = *self.buttons.get(index).ok_or(JogpadError::ShortReport {
            kind: "button",
            index,
            len: self.buttons.len(),
        })?;

        if !state.value.is_finite()
            || state.value < -RANGE_TOLERANCE
            || state.value > 1.0 + RANGE_TOLERANCE
        {
            return Err(JogpadError::MalformedReport(format!(
                "button {} value out of range: {}",
                index, state.value
            )));
        }

        Ok(ButtonState {
            pressed: state.pressed,
            value: state.value.clamp(0.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_empty() {
        let snapshot = ControllerSnapshot::default();
        assert_eq!(snapshot.axis_count(), 0);
        assert_eq!(snapshot.button_count(), 0);
    }

    #[test]
    fn test_axis_read() {
        let snapshot = ControllerSnapshot::new(vec![0.25, -1.0], vec![]);
        assert_eq!(snapshot.axis(0).unwrap(), 0.25);
        assert_eq!(snapshot.axis(1).unwrap(), -1.0);
    }

    #[test]
    fn test_short_axis_report() {
        let snapshot = ControllerSnapshot::new(vec![0.0, 0.0], vec![]);
        match snapshot.axis(3) {
            Err(JogpadError::ShortReport { kind, index, len }) => {
                assert_eq!(kind, "axis");
                assert_eq!(index, 3);
                assert_eq!(len, 2);
            }
            other => panic!("Expected ShortReport, got: {:?}", other),
        }
    }

    #[test]
    fn test_nan_axis_is_malformed() {
        let snapshot = ControllerSnapshot::new(vec![f32::NAN], vec![]);
        assert!(matches!(
            snapshot.axis(0),
            Err(JogpadError::MalformedReport(_))
        ));
    }

    #[test]
    fn test_axis_out_of_range_is_malformed() {
        let snapshot = ControllerSnapshot::new(vec![1.5], vec![]);
        assert!(matches!(
            snapshot.axis(0),
            Err(JogpadError::MalformedReport(_))
        ));
    }

    #[test]
    fn test_axis_within_tolerance_is_clamped() {
        let snapshot = ControllerSnapshot::new(vec![1.005, -1.005], vec![]);
        assert_eq!(snapshot.axis(0).unwrap(), 1.0);
        assert_eq!(snapshot.axis(1).unwrap(), -1.0);
    }

    #[test]
    fn test_button_read() {
        let snapshot = ControllerSnapshot::new(
            vec![],
            vec![ButtonState::RELEASED, ButtonState::analog(true, 0.75)],
        );
        assert!(!snapshot.button(0).unwrap().pressed);
        let trigger = snapshot.button(1).unwrap();
        assert!(trigger.pressed);
        assert_eq!(trigger.value, 0.75);
    }

    #[test]
    fn test_short_button_report() {
        let snapshot = ControllerSnapshot::new(vec![], vec![ButtonState::RELEASED]);
        assert!(matches!(
            snapshot.button(7),
            Err(JogpadError::ShortReport { kind: "button", .. })
        ));
    }

    #[test]
    fn test_button_negative_value_is_malformed() {
        let snapshot = ControllerSnapshot::new(vec![], vec![ButtonState::analog(false, -0.5)]);
        assert!(snapshot.button(0).is_err());
    }

    #[test]
    fn test_digital_button_value() {
        assert_eq!(ButtonState::digital(true).value, 1.0);
        assert_eq!(ButtonState::digital(false), ButtonState::RELEASED);
    }
}
