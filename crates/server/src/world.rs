//! World state management.
//!
//! The single authoritative store for everything in the arena. It only
//! holds state and provides add/remove/iterate; the rules live in the tick
//! and the command handlers.

use crate::entity::{Blob, CoinDrop, Food, Pellet, Player, Spike};
use crate::spawn;
use glam::Vec2;
use protocol::{Color, PlayerId};
use rand::Rng;
use std::collections::HashMap;

/// The shared map rectangle. All positions live in
/// `[radius, dimension - radius]` per axis.
#[derive(Debug, Clone, Copy)]
pub struct MapBounds {
    pub width: f32,
    pub height: f32,
}

impl MapBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Uniform-random point at which a circle of `radius` fully fits.
    pub fn random_position(&self, radius: f32) -> Vec2 {
        let mut rng = rand::rng();
        Vec2::new(
            rng.random_range(radius..=(self.width - radius).max(radius)),
            rng.random_range(radius..=(self.height - radius).max(radius)),
        )
    }

    /// Clamp a circle's center so the circle never crosses the map edge.
    #[inline]
    pub fn clamp_circle(&self, position: Vec2, radius: f32) -> Vec2 {
        Vec2::new(
            position.x.clamp(radius, (self.width - radius).max(radius)),
            position.y.clamp(radius, (self.height - radius).max(radius)),
        )
    }

    /// Whether a point lies inside the map rectangle.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.x <= self.width && point.y >= 0.0 && point.y <= self.height
    }
}

/// The game world containing all entities.
#[derive(Debug)]
pub struct World {
    pub bounds: MapBounds,

    /// All players by connection id.
    pub(crate) players: HashMap<PlayerId, Player>,
    /// Player ids in join order; gives deterministic per-tick iteration.
    pub(crate) player_order: Vec<PlayerId>,

    pub food: Vec<Food>,
    pub pellets: Vec<Pellet>,
    pub spikes: Vec<Spike>,
    pub coins: Vec<CoinDrop>,

    next_food_id: u64,
    next_pellet_id: u64,
    next_coin_id: u64,
    next_spike_id: u32,
}

impl World {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            bounds: MapBounds::new(width, height),
            players: HashMap::new(),
            player_order: Vec::new(),
            food: Vec::new(),
            pellets: Vec::new(),
            spikes: Vec::new(),
            coins: Vec::new(),
            next_food_id: 0,
            next_pellet_id: 0,
            next_coin_id: 0,
            next_spike_id: 0,
        }
    }

    pub fn next_food_id(&mut self) -> u64 {
        let id = self.next_food_id;
        self.next_food_id += 1;
        id
    }

    pub fn next_pellet_id(&mut self) -> u64 {
        let id = self.next_pellet_id;
        self.next_pellet_id += 1;
        id
    }

    pub fn next_coin_id(&mut self) -> u64 {
        let id = self.next_coin_id;
        self.next_coin_id += 1;
        id
    }

    pub fn next_spike_id(&mut self) -> u32 {
        let id = self.next_spike_id;
        self.next_spike_id += 1;
        id
    }

    /// Generate a random entity color.
    pub fn random_color() -> Color {
        let mut rng = rand::rng();
        Color::new(
            rng.random_range(50..=255),
            rng.random_range(50..=255),
            rng.random_range(50..=255),
        )
    }

    pub fn add_player(&mut self, player: Player) {
        self.player_order.push(player.id);
        self.players.insert(player.id, player);
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let removed = self.players.remove(&id);
        if removed.is_some() {
            self.player_order.retain(|&pid| pid != id);
        }
        removed
    }

    #[inline]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    #[inline]
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Player ids in deterministic join order.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.player_order.clone()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.player_order
            .iter()
            .filter_map(|id| self.players.get(id))
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Find a blob by owner and blob id.
    pub fn blob(&self, player_id: PlayerId, blob_id: u32) -> Option<&Blob> {
        self.players
            .get(&player_id)
            .and_then(|p| p.blobs.iter().find(|b| b.id == blob_id))
    }

    /// Grow or shrink the live food population to `target`.
    pub fn set_food_target(&mut self, target: usize, food_cfg: &crate::config::FoodConfig) {
        if self.food.len() > target {
            self.food.truncate(target);
            return;
        }
        while self.food.len() < target {
            let id = self.next_food_id();
            self.food.push(spawn::spawn_food(id, &self.bounds, food_cfg));
        }
    }

    /// Resize the map, pulling every live position back inside the new
    /// bounds.
    pub fn set_bounds(&mut self, width: f32, height: f32) {
        self.bounds = MapBounds::new(width, height);
        let bounds = self.bounds;
        for id in self.player_order.clone() {
            if let Some(player) = self.players.get_mut(&id) {
                for blob in &mut player.blobs {
                    blob.position = bounds.clamp_circle(blob.position, blob.radius);
                }
            }
        }
        for food in &mut self.food {
            food.position = bounds.clamp_circle(food.position, food.radius);
        }
        for pellet in &mut self.pellets {
            pellet.position = bounds.clamp_circle(pellet.position, pellet.radius);
        }
        for spike in &mut self.spikes {
            spike.position = bounds.clamp_circle(spike.position, spike.radius);
        }
        for coin in &mut self.coins {
            coin.position = bounds.clamp_circle(coin.position, coin.radius);
        }
    }
}
