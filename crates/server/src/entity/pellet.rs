//! Ejected mass pellet.

use glam::Vec2;
use protocol::Color;

/// Mass fired by a player's eject command. Carries a decaying velocity and
/// expires when out of bounds or past its max age.
#[derive(Debug, Clone)]
pub struct Pellet {
    pub id: u64,
    pub position: Vec2,
    pub radius: f32,
    /// Inherited from the ejecting player.
    pub color: Color,
    pub velocity: Vec2,
    /// Milliseconds, from the injected clock.
    pub created_at: u64,
}
