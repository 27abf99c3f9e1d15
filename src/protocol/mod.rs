//! # Protocol Module
//!
//! Messages exchanged with the backend and the printer.
//!
//! Outbound commands are JSON objects discriminated by a `command` field.
//! Inbound pushes arrive wrapped in a `{plugin, data}` envelope and are
//! discriminated by a `type` field inside `data`.
//!
//! Actuation commands (`jog`, `extrude`, `home`) are not sent to the backend;
//! they are translated to G-code by [`gcode`] and written to the printer.

pub mod codec;
pub mod gcode;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::settings::ScaleAxis;

/// Machine axis addressed by a jog or home command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// G-code letter for this axis.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
        }
    }

    /// Axis group whose scale factor applies to this axis.
    #[must_use]
    pub fn scale_axis(self) -> ScaleAxis {
        match self {
            Axis::X | Axis::Y => ScaleAxis::Xy,
            Axis::Z => ScaleAxis::Z,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Where a controller discovery originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscoverySource {
    /// Detected by this process' own input polling.
    #[serde(rename = "browser")]
    Local,
}

impl DiscoverySource {
    /// Wire value of the source.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DiscoverySource::Local => "browser",
        }
    }
}

/// Outbound command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    /// Operator changed a scale factor.
    UpdateScaleFactor { axis: ScaleAxis, value: u32 },
    /// Operator toggled test mode.
    ToggleTestMode { enabled: bool },
    /// A controller was newly detected locally.
    ControllerDiscovered { id: String, source: DiscoverySource },
    /// Raw stick readings and tracked button states.
    ControllerValues {
        x: f32,
        y: f32,
        z: f32,
        e: f32,
        buttons: BTreeMap<usize, bool>,
    },
    /// Relative move of one axis.
    Jog { axis: Axis, distance: f32, feedrate: u32 },
    /// Relative extrusion.
    Extrude { distance: f32, feedrate: u32 },
    /// Home the listed axes.
    Home { axes: Vec<Axis> },
}

impl Command {
    /// True for commands that move the machine.
    #[must_use]
    pub fn is_actuation(&self) -> bool {
        matches!(
            self,
            Command::Jog { .. } | Command::Extrude { .. } | Command::Home { .. }
        )
    }

    /// Wire name of the command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::UpdateScaleFactor { .. } => "updateScaleFactor",
            Command::ToggleTestMode { .. } => "toggleTestMode",
            Command::ControllerDiscovered { .. } => "controllerDiscovered",
            Command::ControllerValues { .. } => "controllerValues",
            Command::Jog { .. } => "jog",
            Command::Extrude { .. } => "extrude",
            Command::Home { .. } => "home",
        }
    }
}

/// Inbound push from the backend, after envelope filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Backend status text.
    Status { status: String },
    /// Controller readings from a controller attached to the backend.
    ControllerValues { x: f32, y: f32, z: f32, e: f32 },
    /// Connection report from one of the sources.
    ConnectionInfo { source: String, connected: bool },
    /// Printer readiness as seen by the backend.
    PrinterState { operational: bool, printing: bool },
    /// The push stream ended. Raised locally, never on the wire.
    #[serde(skip)]
    LinkLost,
}

/// Last printer readiness reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterState {
    pub operational: bool,
    pub printing: bool,
}

impl PrinterState {
    /// Jogging is only allowed on an operational printer that is not printing.
    #[must_use]
    pub fn accepts_jogs(self) -> bool {
        self.operational && !self.printing
    }
}
