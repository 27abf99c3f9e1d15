//! # Evdev Gamepad Module
//!
//! Detects a gamepad through the Linux evdev interface and reads its state
//! as standard-layout [`ControllerSnapshot`]s.
//!
//! ## Controller Detection
//!
//! Any event device that reports `BTN_SOUTH` and `ABS_X` is treated as a
//! gamepad. Devices are scanned in path order so the choice is deterministic
//! when several are plugged in.
//!
//! ## Standard Layout
//!
//! | Snapshot | evdev |
//! |----------|-------|
//! | axes 0-1 | ABS_X, ABS_Y (left stick) |
//! | axes 2-3 | ABS_RX, ABS_RY (right stick) |
//! | buttons 0-3 | BTN_SOUTH, BTN_EAST, BTN_WEST, BTN_NORTH |
//! | buttons 4-5 | BTN_TL, BTN_TR |
//! | buttons 6-7 | ABS_Z, ABS_RZ (analog triggers) |
//! | buttons 8-11 | BTN_SELECT, BTN_START, BTN_THUMBL, BTN_THUMBR |
//! | buttons 12-15 | D-pad up, down, left, right (ABS_HAT0X/Y) |
//! | button 16 | BTN_MODE |

use std::path::{Path, PathBuf};

use evdev::{AbsoluteAxisType, Device, Key};
use tracing::{debug, info, warn};

use super::snapshot::{ButtonState, ControllerSnapshot};
use super::source::{DetectedController, InputSource};

/// Number of buttons in a standard-layout snapshot.
pub const STANDARD_BUTTON_COUNT: usize = 17;

/// Stick axes in snapshot order.
const STICK_AXES: [AbsoluteAxisType; 4] = [
    AbsoluteAxisType::ABS_X,
    AbsoluteAxisType::ABS_Y,
    AbsoluteAxisType::ABS_RX,
    AbsoluteAxisType::ABS_RY,
];

/// Digital buttons and their snapshot index.
const DIGITAL_BUTTONS: [(usize, Key); 11] = [
    (0, Key::BTN_SOUTH),
    (1, Key::BTN_EAST),
    (2, Key::BTN_WEST),
    (3, Key::BTN_NORTH),
    (4, Key::BTN_TL),
    (5, Key::BTN_TR),
    (8, Key::BTN_SELECT),
    (9, Key::BTN_START),
    (10, Key::BTN_THUMBL),
    (11, Key::BTN_THUMBR),
    (16, Key::BTN_MODE),
];

/// Analog triggers, their digital click and snapshot index.
const TRIGGERS: [(usize, AbsoluteAxisType, Key); 2] = [
    (6, AbsoluteAxisType::ABS_Z, Key::BTN_TL2),
    (7, AbsoluteAxisType::ABS_RZ, Key::BTN_TR2),
];

/// Trigger travel above which a trigger without a click switch counts as pressed.
const TRIGGER_PRESS_THRESHOLD: f32 = 0.5;

/// Raw `input_absinfo` range of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AbsRange {
    value: i32,
    minimum: i32,
    maximum: i32,
}

struct OpenGamepad {
    device: Device,
    detected: DetectedController,
}

/// Evdev-backed [`InputSource`].
pub struct EvdevSource {
    /// Fixed device path, or `None` to scan `/dev/input`
    device_path: Option<PathBuf>,
    open: Option<OpenGamepad>,
}

impl std::fmt::Debug for EvdevSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevSource")
            .field("device_path", &self.device_path)
            .field("open", &self.open.as_ref().map(|g| &g.detected))
            .finish()
    }
}

impl EvdevSource {
    /// Creates a source. An empty `device_path` scans `/dev/input/event*`.
    ///
    /// No device is opened until the first [`InputSource::detect`] call.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use jogpad::controller::gamepad::EvdevSource;
    /// use jogpad::controller::source::InputSource;
    ///
    /// let mut source = EvdevSource::new("");
    /// if let Some(found) = source.detect() {
    ///     println!("Gamepad: {}", found.id);
    /// }
    /// ```
    #[must_use]
    pub fn new(device_path: &str) -> Self {
        Self {
            device_path: if device_path.is_empty() {
                None
            } else {
                Some(PathBuf::from(device_path))
            },
            open: None,
        }
    }

    /// Candidate event devices in deterministic order.
    fn candidates(&self) -> Vec<PathBuf> {
        if let Some(path) = &self.device_path {
            return vec![path.clone()];
        }

        let input_dir = Path::new("/dev/input");
        let entries = match std::fs::read_dir(input_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Failed to read {}: {}", input_dir.display(), e);
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with("event"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        paths
    }

    fn scan(&mut self) -> Option<DetectedController> {
        let candidates = self.candidates();
        for path in &candidates {
            let device = match Device::open(path) {
                Ok(device) => device,
                Err(e) => {
                    debug!("Could not open {}: {}", path.display(), e);
                    continue;
                }
            };

            if !is_gamepad(&device) {
                continue;
            }

            let id = controller_id(&device);
            info!("Found gamepad at {}: {}", path.display(), id);
            // Only the first gamepad is tracked, so it always sits at index 0
            let detected = DetectedController { index: 0, id };
            self.open = Some(OpenGamepad {
                device,
                detected: detected.clone(),
            });
            return Some(detected);
        }

        debug!("No gamepad among {} candidate device(s)", candidates.len());
        None
    }
}

impl InputSource for EvdevSource {
    /// Reports the open gamepad, or scans for one.
    ///
    /// The key-state query here is only a cheap liveness check. Unplugs are
    /// mostly caught by [`InputSource::snapshot`], which closes the device
    /// on a failed read; the next poll then rescans and the session sees
    /// the disconnect edge.
    fn detect(&mut self) -> Option<DetectedController> {
        if let Some(open) = &self.open {
            if open.device.get_key_state().is_ok() {
                return Some(open.detected.clone());
            }
            warn!("Gamepad stopped responding: {}", open.detected.id);
            self.open = None;
        }
        self.scan()
    }

    fn snapshot(&mut self, index: usize) -> Option<ControllerSnapshot> {
        let open = self.open.as_ref()?;
        if open.detected.index != index {
            return None;
        }

        match read_snapshot(&open.device) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Failed to read gamepad {}: {}", open.detected.id, e);
                self.open = None;
                None
            }
        }
    }
}

fn is_gamepad(device: &Device) -> bool {
    let has_south = device
        .supported_keys()
        .map(|keys| keys.contains(Key::BTN_SOUTH))
        .unwrap_or(false);
    let has_stick = device
        .supported_absolute_axes()
        .map(|axes| axes.contains(AbsoluteAxisType::ABS_X))
        .unwrap_or(false);
    has_south && has_stick
}

fn controller_id(device: &Device) -> String {
    let id = device.input_id();
    format!(
        "{} (Vendor: {:04x} Product: {:04x})",
        device.name().unwrap_or("Unknown gamepad"),
        id.vendor(),
        id.product()
    )
}

fn read_snapshot(device: &Device) -> std::io::Result<ControllerSnapshot> {
    let abs_state = device.get_abs_state()?;
    let keys = device.get_key_state()?;
    let supported = device.supported_absolute_axes();

    let abs = |axis: AbsoluteAxisType| -> Option<AbsRange> {
        let is_supported = supported.map(|s| s.contains(axis)).unwrap_or(false);
        if !is_supported {
            return None;
        }
        abs_state.get(axis.0 as usize).map(|info| AbsRange {
            value: info.value,
            minimum: info.minimum,
            maximum: info.maximum,
        })
    };

    // Stop at the first missing stick axis so the report stays index-aligned
    let axes: Vec<f32> = STICK_AXES
        .iter()
        .map_while(|&axis| abs(axis))
        .map(|range| normalize_axis(range.value, range.minimum, range.maximum))
        .collect();

    let mut buttons = vec![ButtonState::RELEASED; STANDARD_BUTTON_COUNT];

    for (index, key) in DIGITAL_BUTTONS {
        buttons[index] = ButtonState::digital(keys.contains(key));
    }

    for (index, axis, click) in TRIGGERS {
        let value = abs(axis)
            .map(|range| normalize_trigger(range.value, range.minimum, range.maximum))
            .unwrap_or(0.0);
        let pressed = keys.contains(click) || value > TRIGGER_PRESS_THRESHOLD;
        let value = if pressed && value == 0.0 { 1.0 } else { value };
        buttons[index] = ButtonState::analog(pressed, value);
    }

    let hat_x = abs(AbsoluteAxisType::ABS_HAT0X).map(|r| r.value).unwrap_or(0);
    let hat_y = abs(AbsoluteAxisType::ABS_HAT0Y).map(|r| r.value).unwrap_or(0);
    for (index, pressed) in dpad_buttons(hat_x, hat_y) {
        buttons[index] = ButtonState::digital(pressed);
    }

    Ok(ControllerSnapshot::new(axes, buttons))
}

/// D-pad hat values as (index, pressed) for up, down, left, right.
fn dpad_buttons(hat_x: i32, hat_y: i32) -> [(usize, bool); 4] {
    [
        (12, hat_y < 0),
        (13, hat_y > 0),
        (14, hat_x < 0),
        (15, hat_x > 0),
    ]
}

/// Converts a raw stick value to -1.0..=1.0 using the axis range.
#[must_use]
pub fn normalize_axis(value: i32, minimum: i32, maximum: i32) -> f32 {
    if maximum <= minimum {
        return 0.0;
    }
    let span = (i64::from(maximum) - i64::from(minimum)) as f32;
    let offset = (i64::from(value) - i64::from(minimum)) as f32;
    (offset / span * 2.0 - 1.0).clamp(-1.0, 1.0)
}

/// Converts a raw trigger value to 0.0..=1.0 using the axis range.
#[must_use]
pub fn normalize_trigger(value: i32, minimum: i32, maximum: i32) -> f32 {
    if maximum <= minimum {
        return 0.0;
    }
    let span = (i64::from(maximum) - i64::from(minimum)) as f32;
    let offset = (i64::from(value) - i64::from(minimum)) as f32;
    (offset / span).clamp(0.0, 1.0)
}
