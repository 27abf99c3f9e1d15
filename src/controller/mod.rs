//! # Controller Module
//!
//! Gamepad input handling.
//!
//! This module handles:
//! - Gamepad detection and state reads via evdev
//! - Immutable per-frame controller snapshots
//! - Dead zones and distance curves for analog inputs
//! - Mapping sticks and triggers to machine axes
//! - Press-edge detection for one-shot buttons

pub mod axis;
pub mod edge;
pub mod gamepad;
pub mod layout;
pub mod snapshot;
pub mod source;
