//! # Button Edge Detector
//!
//! Fires once per press. Holding a button down produces no repeats and
//! releasing it produces nothing.

use std::collections::HashMap;

/// Tracks the last pressed state of each button index.
///
/// # Examples
///
/// ```
/// use jogpad::controller::edge::EdgeDetector;
///
/// let mut edges = EdgeDetector::new();
/// assert!(edges.on_button(0, true));   // press
/// assert!(!edges.on_button(0, true));  // held
/// assert!(!edges.on_button(0, false)); // release
/// assert!(edges.on_button(0, true));   // pressed again
/// ```
#[derive(Debug, Default, Clone)]
pub struct EdgeDetector {
    previous: HashMap<usize, bool>,
}

impl EdgeDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current state of `index` and reports whether this is a
    /// press edge (released on the previous call, pressed now).
    ///
    /// Unseen buttons count as released.
    pub fn on_button(&mut self, index: usize, pressed_now: bool) -> bool {
        let was_pressed = self.previous.insert(index, pressed_now).unwrap_or(false);
        pressed_now && !was_pressed
    }

    /// Last recorded state of `index`.
    #[must_use]
    pub fn is_held(&self, index: usize) -> bool {
        self.previous.get(&index).copied().unwrap_or(false)
    }

    /// Forgets every recorded state.
    pub fn reset(&mut self) {
        self.previous.clear();
    }
}
