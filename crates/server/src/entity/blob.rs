//! A single circular mass unit owned by a player.

use crate::geometry::{self, SpeedTuning};
use glam::Vec2;

/// One physical blob of a player. Radius and speed are always updated
/// together; `set_radius` is the only way mass changes land on a blob.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Stable id, unique within the owning player.
    pub id: u32,
    pub position: Vec2,
    pub radius: f32,
    pub speed: f32,
    /// Where this blob is heading; movement stops within an epsilon.
    pub target: Vec2,
    /// Transient outward impulse from a split or spike burst. Decays each
    /// tick and is cleared once negligible.
    pub split_velocity: Option<Vec2>,
}

impl Blob {
    /// Create a stationary blob (target = spawn position).
    pub fn new(id: u32, position: Vec2, radius: f32, tuning: SpeedTuning) -> Self {
        Self {
            id,
            position,
            radius,
            speed: geometry::speed_for(radius, tuning),
            target: position,
            split_velocity: None,
        }
    }

    /// Set the radius and recompute speed.
    #[inline]
    pub fn set_radius(&mut self, radius: f32, tuning: SpeedTuning) {
        self.radius = radius;
        self.speed = geometry::speed_for(radius, tuning);
    }

    /// This blob's mass.
    #[inline]
    pub fn mass(&self) -> f32 {
        geometry::area_of(self.radius)
    }
}
