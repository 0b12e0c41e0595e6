use serde::{Deserialize, Serialize};

use crate::geometry::Point2;

/// Opaque handle to whatever body the out-of-scope physics backend uses to represent an
/// obstacle. The core never interprets this value; it only carries it alongside the
/// geometry it needs for collision checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u64);

/// Axis-aligned box obstacle, static for the lifetime of a planning call (§3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center_x: f64,
    pub center_y: f64,
    pub half_x: f64,
    pub half_y: f64,
    pub body: BodyHandle,
}

impl Obstacle {
    pub fn new(center_x: f64, center_y: f64, half_x: f64, half_y: f64, body: BodyHandle) -> Self {
        Self {
            center_x,
            center_y,
            half_x,
            half_y,
            body,
        }
    }

    pub fn center(&self) -> Point2 {
        Point2::new(self.center_x, self.center_y)
    }
}
