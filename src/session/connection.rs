//! # Connection Reconciler
//!
//! Merges the two independent "controller connected" signals into one status.
//!
//! | local | remote | status |
//! |-------|--------|--------|
//! | no | no | `Disconnected` |
//! | yes | no | `Connected: {id}` |
//! | no | yes | `Connected via remote source` |
//! | yes | yes | `Connected (both sources)` |
//!
//! The local signal comes from polling the input source and only changes on an
//! observed transition. The remote signal comes from backend pushes and is
//! overwritten by each one.

use std::fmt;

use crate::controller::source::DetectedController;

/// Which sources currently report a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    LocalOnly,
    RemoteOnly,
    Both,
}

impl LinkState {
    #[must_use]
    pub fn from_flags(local: bool, remote: bool) -> Self {
        match (local, remote) {
            (false, false) => LinkState::Disconnected,
            (true, false) => LinkState::LocalOnly,
            (false, true) => LinkState::RemoteOnly,
            (true, true) => LinkState::Both,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkState::Disconnected => "disconnected",
            LinkState::LocalOnly => "local",
            LinkState::RemoteOnly => "remote",
            LinkState::Both => "both",
        })
    }
}

/// Merged connection state.
///
/// `display_status` is always derived from the other three fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    local_detected: bool,
    remote_detected: bool,
    controller_id: Option<String>,
    display_status: String,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::derive(false, false, None)
    }
}

impl ConnectionState {
    fn derive(local_detected: bool, remote_detected: bool, controller_id: Option<String>) -> Self {
        let display_status = match LinkState::from_flags(local_detected, remote_detected) {
            LinkState::Disconnected => "Disconnected".to_string(),
            LinkState::LocalOnly => {
                format!("Connected: {}", controller_id.as_deref().unwrap_or("unknown"))
            }
            LinkState::RemoteOnly => "Connected via remote source".to_string(),
            LinkState::Both => "Connected (both sources)".to_string(),
        };
        Self {
            local_detected,
            remote_detected,
            controller_id,
            display_status,
        }
    }

    pub fn local_detected(&self) -> bool {
        self.local_detected
    }

    pub fn remote_detected(&self) -> bool {
        self.remote_detected
    }

    pub fn controller_id(&self) -> Option<&str> {
        self.controller_id.as_deref()
    }

    pub fn display_status(&self) -> &str {
        &self.display_status
    }

    pub fn link(&self) -> LinkState {
        LinkState::from_flags(self.local_detected, self.remote_detected)
    }

    /// True if either source sees a controller.
    pub fn is_connected(&self) -> bool {
        self.local_detected || self.remote_detected
    }
}

/// Transition of the local signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEdge {
    /// A controller appeared (or was replaced by a different one).
    Connected(DetectedController),
    /// The local controller went away.
    Disconnected,
}

/// Owns the merged [`ConnectionState`] and applies both signals to it.
#[derive(Debug, Default)]
pub struct ConnectionReconciler {
    state: ConnectionState,
    local: Option<DetectedController>,
}

impl ConnectionReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Applies one local poll result.
    ///
    /// Returns an edge only when the observation differs from the previous one.
    /// A different controller showing up in place of the old one counts as a
    /// new connection.
    pub fn observe_local(&mut self, detected: Option<DetectedController>) -> Option<LocalEdge> {
        if detected == self.local {
            return None;
        }

        self.local = detected.clone();
        self.state = ConnectionState::derive(
            detected.is_some(),
            self.state.remote_detected,
            detected.as_ref().map(|c| c.id.clone()),
        );

        Some(match detected {
            Some(controller) => LocalEdge::Connected(controller),
            None => LocalEdge::Disconnected,
        })
    }

    /// Applies a remote report. Returns true if the remote flag changed.
    pub fn apply_remote(&mut self, connected: bool) -> bool {
        let changed = self.state.remote_detected != connected;
        self.state = ConnectionState::derive(
            self.state.local_detected,
            connected,
            self.state.controller_id.clone(),
        );
        changed
    }
}
