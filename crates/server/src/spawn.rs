//! Entity factories.
//!
//! Everything that enters the world at a random valid position is built
//! here: food with its weighted radius draw, spikes, coin drops and a
//! player's starting blob.

use crate::config::{CoinConfig, FoodConfig, PlayerConfig, SpikeConfig};
use crate::entity::{Blob, CoinDrop, Food, Spike};
use crate::world::{MapBounds, World};
use rand::Rng;

/// Weighted food radius: 60% small band, 30% medium, 10% large.
pub fn random_food_radius(cfg: &FoodConfig) -> f32 {
    let mut rng = rand::rng();
    let roll: f32 = rng.random_range(0.0..1.0);
    let (min, max) = if roll < 0.6 {
        (cfg.small_min, cfg.small_max)
    } else if roll < 0.9 {
        (cfg.medium_min, cfg.medium_max)
    } else {
        (cfg.large_min, cfg.large_max)
    };
    rng.random_range(min..max)
}

pub fn spawn_food(id: u64, bounds: &MapBounds, cfg: &FoodConfig) -> Food {
    let radius = random_food_radius(cfg);
    Food {
        id,
        position: bounds.random_position(radius),
        radius,
        color: World::random_color(),
    }
}

pub fn spawn_spike(id: u32, bounds: &MapBounds, cfg: &SpikeConfig) -> Spike {
    Spike {
        id,
        position: bounds.random_position(cfg.radius),
        radius: cfg.radius,
    }
}

pub fn spawn_coin(id: u64, bounds: &MapBounds, cfg: &CoinConfig) -> CoinDrop {
    CoinDrop {
        id,
        position: bounds.random_position(cfg.radius),
        radius: cfg.radius,
        value: cfg.value,
    }
}

/// A freshly connected player's single blob: random valid position,
/// stationary until the first move command.
pub fn starting_blob(bounds: &MapBounds, cfg: &PlayerConfig) -> Blob {
    let position = bounds.random_position(cfg.start_radius);
    Blob::new(0, position, cfg.start_radius, cfg.speed_tuning())
}
