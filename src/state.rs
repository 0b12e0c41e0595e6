use serde::{Deserialize, Serialize};

/// Instantaneous kinematic state of the car. Immutable: every transition produces a new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarState {
    pub x: f64,
    pub y: f64,
    /// Heading, normalized to `(-pi, pi]`.
    pub yaw: f64,
    pub speed: f64,
}

impl CarState {
    pub fn new(x: f64, y: f64, yaw: f64, speed: f64) -> Self {
        Self { x, y, yaw, speed }
    }
}
