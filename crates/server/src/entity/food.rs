//! Static food pellet.

use glam::Vec2;
use protocol::Color;

/// A food item. Sits still until eaten, then is immediately replaced
/// elsewhere so the population stays constant.
#[derive(Debug, Clone)]
pub struct Food {
    pub id: u64,
    pub position: Vec2,
    pub radius: f32,
    pub color: Color,
}
