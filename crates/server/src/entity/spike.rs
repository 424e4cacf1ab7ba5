//! Static hazard spike.

use crate::geometry;
use glam::Vec2;

/// A hazard obstacle. Never moves, never despawns, never consumes mass;
/// blobs heavier than it burst on contact.
#[derive(Debug, Clone)]
pub struct Spike {
    pub id: u32,
    pub position: Vec2,
    pub radius: f32,
}

impl Spike {
    /// A spike's mass is always its own area.
    #[inline]
    pub fn mass(&self) -> f32 {
        geometry::area_of(self.radius)
    }
}
