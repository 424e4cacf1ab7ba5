//! Coin drop.

use glam::Vec2;

/// A collectible coin. Consumed by any touching blob; only linked accounts
/// receive the credit.
#[derive(Debug, Clone)]
pub struct CoinDrop {
    pub id: u64,
    pub position: Vec2,
    pub radius: f32,
    pub value: u32,
}
