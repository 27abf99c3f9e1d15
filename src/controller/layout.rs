//! # Controller Layout Module
//!
//! Maps standard-layout controller snapshots to machine motion.
//!
//! ## Axis Assignments
//!
//! | Motion | Input | Index | Notes |
//! |--------|-------|-------|-------|
//! | X | Right Stick X | axis 2 | |
//! | Y | Right Stick Y | axis 3 | inverted (stick up = +Y) |
//! | Z | Right Trigger - Left Trigger | buttons 7, 6 | analog trigger travel |
//! | E | Left Stick X | axis 0 | 5 mm ceiling |
//!
//! ## Button Assignments
//!
//! | Button | Index | Action |
//! |--------|-------|--------|
//! | A | 0 | Home X and Y |
//! | B | 1 | Home X, Y and Z |
//!
//! The indices follow the standard gamepad convention and are not configurable.

use std::collections::BTreeMap;

use super::axis::AxisCurve;
use super::snapshot::ControllerSnapshot;
use crate::error::Result;
use crate::telemetry::round_to;

/// Standard gamepad indices used for motion.
pub mod indices {
    /// Left stick X - extrusion
    pub const LEFT_STICK_X: usize = 0;
    /// Left stick Y - unused
    pub const LEFT_STICK_Y: usize = 1;
    /// Right stick X - X axis
    pub const RIGHT_STICK_X: usize = 2;
    /// Right stick Y - Y axis (inverted)
    pub const RIGHT_STICK_Y: usize = 3;

    /// A button - home X/Y
    pub const BUTTON_A: usize = 0;
    /// B button - home all
    pub const BUTTON_B: usize = 1;
    /// Left trigger - Z down
    pub const LEFT_TRIGGER: usize = 6;
    /// Right trigger - Z up
    pub const RIGHT_TRIGGER: usize = 7;
}

/// One-shot action bound to a button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Home X and Y
    HomeXy,
    /// Home X, Y and Z
    HomeAll,
}

/// Buttons the sampler tracks for press edges, in evaluation order.
pub const TRACKED_BUTTONS: [(usize, ButtonAction); 2] = [
    (indices::BUTTON_A, ButtonAction::HomeXy),
    (indices::BUTTON_B, ButtonAction::HomeAll),
];

/// Raw readings behind a motion sample, as reported to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawAxes {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub e: f32,
}

/// Per-axis distances computed from one snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MotionSample {
    /// Jog distance for X (mm)
    pub x: f32,
    /// Jog distance for Y (mm)
    pub y: f32,
    /// Jog distance for Z (mm)
    pub z: f32,
    /// Extrusion distance (mm)
    pub e: f32,
    /// Readings the distances were computed from
    pub raw: RawAxes,
    /// Pressed state of each tracked button
    pub buttons: BTreeMap<usize, bool>,
}

impl MotionSample {
    /// True when any axis moves or any tracked button is down.
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.x != 0.0
            || self.y != 0.0
            || self.z != 0.0
            || self.e != 0.0
            || self.buttons.values().any(|&pressed| pressed)
    }
}

/// Converts snapshots into motion samples.
///
/// # Examples
///
/// ```
/// use jogpad::controller::layout::ControllerLayout;
/// use jogpad::controller::snapshot::{ButtonState, ControllerSnapshot};
///
/// let layout = ControllerLayout::default();
/// let mut buttons = vec![ButtonState::RELEASED; 8];
/// buttons[7] = ButtonState::analog(true, 1.0); // right trigger
///
/// let snapshot = ControllerSnapshot::new(vec![0.0, 0.0, 0.5, -1.0], buttons);
/// let sample = layout.read(&snapshot).unwrap();
///
/// assert_eq!(sample.x, 5.0);
/// assert_eq!(sample.y, 10.0); // stick pulled down reads -1.0, inverted
/// assert_eq!(sample.z, 10.0);
/// assert_eq!(sample.e, 0.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ControllerLayout {
    jog: AxisCurve,
    extrude: AxisCurve,
}

impl ControllerLayout {
    /// Creates a layout with the given jog and extrusion curves.
    #[must_use]
    pub fn new(jog: AxisCurve, extrude: AxisCurve) -> Self {
        Self { jog, extrude }
    }

    /// Reads every motion input from `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns `ShortReport` or `MalformedReport` if any mapped axis or button
    /// is missing or unusable. Nothing is partially applied.
    pub fn read(&self, snapshot: &ControllerSnapshot) -> Result<MotionSample> {
        let stick_x = snapshot.axis(indices::RIGHT_STICK_X)?;
        // Vertical stick axes read negative when pushed up
        let stick_y = -snapshot.axis(indices::RIGHT_STICK_Y)?;
        let extrude = snapshot.axis(indices::LEFT_STICK_X)?;
        let left_trigger = snapshot.button(indices::LEFT_TRIGGER)?.value;
        let right_trigger = snapshot.button(indices::RIGHT_TRIGGER)?.value;

        let mut buttons = BTreeMap::new();
        for (index, _) in TRACKED_BUTTONS {
            buttons.insert(index, snapshot.button(index)?.pressed);
        }

        let z = self.jog.apply(right_trigger) - self.jog.apply(left_trigger);

        Ok(MotionSample {
            x: self.jog.apply(stick_x),
            y: self.jog.apply(stick_y),
            z: round_to(z, 1),
            e: self.extrude.apply(extrude),
            raw: RawAxes {
                x: stick_x,
                y: stick_y,
                z: right_trigger - left_trigger,
                e: extrude,
            },
            buttons,
        })
    }
}
