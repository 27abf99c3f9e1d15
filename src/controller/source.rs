//! Trait abstraction for controller input so the sampler can be tested without hardware

use super::snapshot::ControllerSnapshot;

/// A controller found by a detection poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedController {
    /// Index to pass to [`InputSource::snapshot`]
    pub index: usize,
    /// Human-readable identifier, e.g. "Xbox Wireless Controller (Vendor: 045e Product: 0b13)"
    pub id: String,
}

/// Source of controller state.
#[cfg_attr(test, mockall::automock)]
pub trait InputSource: Send {
    /// Returns the controller currently available, if any.
    fn detect(&mut self) -> Option<DetectedController>;

    /// Reads a fresh snapshot of the controller at `index`.
    ///
    /// Returns `None` if that controller is no longer connected.
    fn snapshot(&mut self, index: usize) -> Option<ControllerSnapshot>;
}
