//! # Sampler
//!
//! One frame of controller processing.
//!
//! A [`Sampler`] is created when a controller is detected locally and dropped
//! when it goes away, so button edge state never outlives one connection.
//! Each tick reads the snapshot, refreshes telemetry, and returns the commands
//! to emit for that frame.

use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use super::SessionContext;
use crate::controller::edge::EdgeDetector;
use crate::controller::layout::{ButtonAction, ControllerLayout, MotionSample, TRACKED_BUTTONS};
use crate::controller::snapshot::ControllerSnapshot;
use crate::error::Result;
use crate::protocol::{Axis, Command};
use crate::settings::ScaleAxis;
use crate::telemetry::Telemetry;

/// Base feedrates (mm/min) before scale factors are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedrates {
    pub xy: u32,
    pub z: u32,
    pub e: u32,
}

impl Default for Feedrates {
    fn default() -> Self {
        Self { xy: 3000, z: 600, e: 300 }
    }
}

impl Feedrates {
    fn base(&self, axis: ScaleAxis) -> u32 {
        match axis {
            ScaleAxis::Xy => self.xy,
            ScaleAxis::Z => self.z,
            ScaleAxis::E => self.e,
        }
    }
}

/// Per-controller frame processor.
#[derive(Debug)]
pub struct Sampler {
    index: usize,
    layout: ControllerLayout,
    feedrates: Feedrates,
    edges: EdgeDetector,
    command_interval: Duration,
    last_motion: Option<Instant>,
}

impl Sampler {
    pub fn new(index: usize, layout: ControllerLayout, feedrates: Feedrates, command_interval: Duration) -> Self {
        Self {
            index,
            layout,
            feedrates,
            edges: EdgeDetector::new(),
            command_interval,
            last_motion: None,
        }
    }

    /// Index of the tracked controller.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Processes one snapshot.
    ///
    /// Telemetry is refreshed on every successful read. Motion commands and
    /// `controllerValues` are limited to one batch per command interval; press
    /// edges are never limited. Actuation is left out while test mode is on
    /// or while the printer is reported busy.
    ///
    /// # Errors
    ///
    /// Returns the read error for a short or malformed snapshot. Nothing in
    /// `ctx` or in the edge state is touched in that case.
    pub fn tick(
        &mut self,
        snapshot: &ControllerSnapshot,
        ctx: &mut SessionContext,
        now: Instant,
    ) -> Result<Vec<Command>> {
        let sample = self.layout.read(snapshot)?;
        ctx.telemetry = Telemetry::rounded(sample.x, sample.y, sample.z, sample.e);

        let mut commands = Vec::new();

        if sample.is_significant() && self.motion_due(now) {
            self.last_motion = Some(now);
            commands.push(Command::ControllerValues {
                x: sample.raw.x,
                y: sample.raw.y,
                z: sample.raw.z,
                e: sample.raw.e,
                buttons: sample.buttons.clone(),
            });

            if ctx.test_mode {
                info!("Test mode: {}", ctx.telemetry);
            } else if ctx.printer_busy() {
                debug!("Printer busy, dropping motion {}", ctx.telemetry);
            } else {
                self.push_motion(&sample, ctx, &mut commands);
            }
        }

        for (index, action) in TRACKED_BUTTONS {
            let pressed = sample.buttons.get(&index).copied().unwrap_or(false);
            if !self.edges.on_button(index, pressed) {
                continue;
            }
            if ctx.test_mode {
                info!("Test mode: {:?} suppressed", action);
                continue;
            }
            if ctx.printer_busy() {
                debug!("Printer busy, dropping {:?}", action);
                continue;
            }
            commands.push(home_command(action));
        }

        Ok(commands)
    }

    fn motion_due(&self, now: Instant) -> bool {
        match self.last_motion {
            None => true,
            Some(last) => now.duration_since(last) >= self.command_interval,
        }
    }

    fn push_motion(&self, sample: &MotionSample, ctx: &SessionContext, commands: &mut Vec<Command>) {
        for (axis, distance) in [(Axis::X, sample.x), (Axis::Y, sample.y), (Axis::Z, sample.z)] {
            if distance != 0.0 {
                let group = axis.scale_axis();
                commands.push(Command::Jog {
                    axis,
                    distance,
                    feedrate: ctx.scale.scale_feedrate(group, self.feedrates.base(group)),
                });
            }
        }

        if sample.e != 0.0 {
            commands.push(Command::Extrude {
                distance: sample.e,
                feedrate: ctx.scale.scale_feedrate(ScaleAxis::E, self.feedrates.base(ScaleAxis::E)),
            });
        }
    }
}

fn home_command(action: ButtonAction) -> Command {
    let axes = match action {
        ButtonAction::HomeXy => vec![Axis::X, Axis::Y],
        ButtonAction::HomeAll => vec![Axis::X, Axis::Y, Axis::Z],
    };
    Command::Home { axes }
}
