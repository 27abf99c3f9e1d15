//! # Session Module
//!
//! The jog engine: local detection, sampling, remote pushes and operator
//! actions, all applied to one [`SessionContext`].
//!
//! [`Session`] is synchronous. It never performs I/O on the command path;
//! every handler returns the commands to emit and the [`runner`] sends them.
//! This keeps all state mutation on one task, in one place.

pub mod connection;
pub mod runner;
pub mod sampler;

use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::controller::axis::AxisCurve;
use crate::controller::layout::ControllerLayout;
use crate::controller::source::InputSource;
use crate::prefs::{load_test_mode, PreferenceStore, TEST_MODE_KEY};
use crate::protocol::{Command, DiscoverySource, InboundMessage, PrinterState};
use crate::settings::{load_or_default, ScaleAxis, ScaleFactors, SettingsStore};
use crate::telemetry::Telemetry;
use connection::{ConnectionReconciler, LinkState, LocalEdge};
use sampler::{Feedrates, Sampler};

/// Mutable state the sampler works against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    /// Locally computed motion, refreshed every frame
    pub telemetry: Telemetry,
    /// Suppresses actuation while set
    pub test_mode: bool,
    /// Feedrate percentages per axis group
    pub scale: ScaleFactors,
    /// Last controller values pushed by the backend
    pub remote_values: Option<Telemetry>,
    /// Last status text pushed by the backend
    pub backend_status: Option<String>,
    /// Last printer readiness pushed by the backend; `None` until reported
    pub printer: Option<PrinterState>,
}

impl SessionContext {
    /// True while the backend reports a printer that must not be jogged.
    ///
    /// An unreported state does not block, so jogging works without a backend.
    pub fn printer_busy(&self) -> bool {
        self.printer.map_or(false, |state| !state.accepts_jogs())
    }
}

/// Read-only snapshot of the session, published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub status: String,
    pub link: LinkState,
    pub controller_id: Option<String>,
    pub sampling: bool,
    pub telemetry: Telemetry,
    pub remote_values: Option<Telemetry>,
    pub backend_status: Option<String>,
    pub test_mode: bool,
    pub printer_busy: bool,
    pub scale: ScaleFactors,
}

/// Operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorAction {
    ToggleTestMode,
    SetTestMode(bool),
    SetScaleFactor { axis: ScaleAxis, value: u32 },
}

/// Timing and mapping parameters of a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub frame_interval: Duration,
    pub poll_interval: Duration,
    pub command_interval: Duration,
    pub layout: ControllerLayout,
    pub feedrates: Feedrates,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(16),
            poll_interval: Duration::from_millis(1000),
            command_interval: Duration::from_millis(100),
            layout: ControllerLayout::default(),
            feedrates: Feedrates::default(),
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        let controller = &config.controller;
        let motion = &config.motion;
        Self {
            frame_interval: Duration::from_micros(1_000_000 / u64::from(controller.frame_rate_hz.max(1))),
            poll_interval: Duration::from_millis(controller.poll_interval_ms),
            command_interval: Duration::from_millis(controller.command_interval_ms),
            layout: ControllerLayout::new(
                AxisCurve::new(controller.dead_zone, controller.gain_exponent, motion.max_jog_distance),
                AxisCurve::new(controller.dead_zone, controller.gain_exponent, motion.max_extrude_distance),
            ),
            feedrates: Feedrates {
                xy: motion.xy_feedrate,
                z: motion.z_feedrate,
                e: motion.e_feedrate,
            },
        }
    }
}

/// The jog engine.
pub struct Session {
    source: Box<dyn InputSource>,
    settings: SessionSettings,
    reconciler: ConnectionReconciler,
    ctx: SessionContext,
    sampler: Option<Sampler>,
    settings_store: Box<dyn SettingsStore>,
    prefs: Box<dyn PreferenceStore>,
    last_poll: Option<Instant>,
    last_read_error: Option<String>,
}

impl Session {
    /// Creates a session, reading scale factors and test mode from the stores.
    pub fn new(
        source: Box<dyn InputSource>,
        settings: SessionSettings,
        settings_store: Box<dyn SettingsStore>,
        prefs: Box<dyn PreferenceStore>,
    ) -> Self {
        let ctx = SessionContext {
            scale: load_or_default(settings_store.as_ref()),
            test_mode: load_test_mode(prefs.as_ref()),
            ..SessionContext::default()
        };
        info!(
            "Session ready (test mode {}, scale xy={} z={} e={})",
            if ctx.test_mode { "on" } else { "off" },
            ctx.scale.xy,
            ctx.scale.z,
            ctx.scale.e
        );

        Self {
            source,
            settings,
            reconciler: ConnectionReconciler::new(),
            ctx,
            sampler: None,
            settings_store,
            prefs,
            last_poll: None,
            last_read_error: None,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn connection(&self) -> &connection::ConnectionState {
        self.reconciler.state()
    }

    /// True while a local controller is being sampled.
    pub fn is_sampling(&self) -> bool {
        self.sampler.is_some()
    }

    pub fn view(&self) -> SessionView {
        let state = self.reconciler.state();
        SessionView {
            status: state.display_status().to_string(),
            link: state.link(),
            controller_id: state.controller_id().map(str::to_string),
            sampling: self.is_sampling(),
            telemetry: self.ctx.telemetry,
            remote_values: self.ctx.remote_values,
            backend_status: self.ctx.backend_status.clone(),
            test_mode: self.ctx.test_mode,
            printer_busy: self.ctx.printer_busy(),
            scale: self.ctx.scale,
        }
    }

    /// Runs one frame: polls detection when due, then samples.
    pub fn on_frame(&mut self, now: Instant) -> Vec<Command> {
        let mut commands = Vec::new();

        let poll_due = self
            .last_poll
            .map_or(true, |last| now.duration_since(last) >= self.settings.poll_interval);
        if poll_due {
            self.last_poll = Some(now);
            self.poll_local(&mut commands);
        }

        let Some(sampler) = self.sampler.as_mut() else {
            return commands;
        };
        let Some(snapshot) = self.source.snapshot(sampler.index()) else {
            return commands;
        };

        match sampler.tick(&snapshot, &mut self.ctx, now) {
            Ok(produced) => {
                self.last_read_error = None;
                commands.extend(produced);
            }
            Err(e) => {
                let message = e.to_string();
                if self.last_read_error.as_deref() == Some(message.as_str()) {
                    debug!("Controller read failed again: {}", message);
                } else {
                    warn!("Controller read failed: {}", message);
                    self.last_read_error = Some(message);
                }
            }
        }

        commands
    }

    fn poll_local(&mut self, commands: &mut Vec<Command>) {
        let detected = self.source.detect();
        match self.reconciler.observe_local(detected) {
            Some(LocalEdge::Connected(controller)) => {
                info!("Controller connected: {}", controller.id);
                self.sampler = Some(Sampler::new(
                    controller.index,
                    self.settings.layout.clone(),
                    self.settings.feedrates,
                    self.settings.command_interval,
                ));
                commands.push(Command::ControllerDiscovered {
                    id: controller.id,
                    source: DiscoverySource::Local,
                });
            }
            Some(LocalEdge::Disconnected) => {
                info!("Controller disconnected, sampling stopped");
                self.sampler = None;
                self.last_read_error = None;
            }
            None => {}
        }
    }

    /// Applies a backend push.
    pub fn on_push(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::Status { status } => {
                debug!("Backend status: {}", status);
                self.ctx.backend_status = Some(status);
            }
            InboundMessage::ControllerValues { x, y, z, e } => {
                self.ctx.remote_values = Some(Telemetry::rounded(x, y, z, e));
            }
            InboundMessage::ConnectionInfo { source, connected } => {
                if source == DiscoverySource::Local.as_str() {
                    debug!("Ignoring echo of local connection info");
                    return;
                }
                if self.reconciler.apply_remote(connected) {
                    info!(
                        "Remote controller {} ({}), status: {}",
                        if connected { "connected" } else { "disconnected" },
                        source,
                        self.reconciler.state().display_status()
                    );
                }
            }
            InboundMessage::PrinterState { operational, printing } => {
                let state = PrinterState { operational, printing };
                if self.ctx.printer != Some(state) {
                    info!(
                        "Printer {}",
                        if state.accepts_jogs() { "ready for jogging" } else { "busy, jogging disabled" }
                    );
                }
                self.ctx.printer = Some(state);
            }
            // Printer state is kept: a print started before the loss may still be running
            InboundMessage::LinkLost => {
                warn!("Backend link lost, remote controller considered gone");
                self.reconciler.apply_remote(false);
            }
        }
    }

    /// Applies an operator action.
    pub fn on_action(&mut self, action: OperatorAction) -> Vec<Command> {
        match action {
            OperatorAction::ToggleTestMode => self.set_test_mode(!self.ctx.test_mode),
            OperatorAction::SetTestMode(enabled) => self.set_test_mode(enabled),
            OperatorAction::SetScaleFactor { axis, value } => self.set_scale_factor(axis, value),
        }
    }

    fn set_test_mode(&mut self, enabled: bool) -> Vec<Command> {
        self.ctx.test_mode = enabled;
        info!("Test mode {}", if enabled { "enabled" } else { "disabled" });

        if let Err(e) = self.prefs.set_bool(TEST_MODE_KEY, enabled) {
            warn!("Failed to persist test mode: {}", e);
        }
        vec![Command::ToggleTestMode { enabled }]
    }

    fn set_scale_factor(&mut self, axis: ScaleAxis, value: u32) -> Vec<Command> {
        if let Err(e) = self.ctx.scale.set(axis, value) {
            warn!("Rejected scale factor: {}", e);
            return Vec::new();
        }
        info!("{} scale factor set to {}", axis, value);

        if let Err(e) = self.settings_store.save(&self.ctx.scale) {
            warn!("Failed to persist scale factors: {}", e);
        }
        vec![Command::UpdateScaleFactor { axis, value }]
    }
}
