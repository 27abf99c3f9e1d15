//! # Jogpad Library
//!
//! Jog a 3D printer's axes with a gamepad.
//!
//! This library samples a locally attached controller every frame, turns stick
//! and trigger deflection into bounded jog, extrude and home commands, and
//! merges the local "controller connected" signal with the one pushed by the
//! printer's backend host into a single status.

pub mod backend;
pub mod config;
pub mod console;
pub mod controller;
pub mod emitter;
pub mod error;
pub mod prefs;
pub mod printer;
pub mod protocol;
pub mod session;
pub mod settings;
pub mod telemetry;
