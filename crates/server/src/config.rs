//! Server configuration.

use crate::geometry::SpeedTuning;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Bounds for runtime-adjustable map dimensions.
pub const MAP_DIMENSION_MIN: f32 = 1000.0;
pub const MAP_DIMENSION_MAX: f32 = 10000.0;

/// Bounds for the runtime-adjustable food target.
pub const FOOD_TARGET_MIN: usize = 50;
pub const FOOD_TARGET_MAX: usize = 1000;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub eject: EjectConfig,
    #[serde(default)]
    pub spike: SpikeConfig,
    #[serde(default)]
    pub coin: CoinConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.clamp();
        Ok(config)
    }

    /// Clamp runtime-adjustable values into their allowed ranges.
    pub fn clamp(&mut self) {
        self.map.width = self.map.width.clamp(MAP_DIMENSION_MIN, MAP_DIMENSION_MAX);
        self.map.height = self.map.height.clamp(MAP_DIMENSION_MIN, MAP_DIMENSION_MAX);
        self.map.food_count = self.map.food_count.clamp(FOOD_TARGET_MIN, FOOD_TARGET_MAX);
    }
}

/// Networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum simultaneous connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Tick interval in milliseconds (33 ms ≈ 30 Hz).
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_max_connections() -> usize {
    100
}
fn default_ip_limit() -> usize {
    8
}
fn default_tick_interval() -> u64 {
    33
}

/// Map bounds and food population target (runtime adjustable).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MapConfig {
    #[serde(default = "default_map_dimension")]
    pub width: f32,
    #[serde(default = "default_map_dimension")]
    pub height: f32,
    /// Live food population; held constant by immediate respawn.
    #[serde(default = "default_food_count")]
    pub food_count: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: default_map_dimension(),
            height: default_map_dimension(),
            food_count: default_food_count(),
        }
    }
}

fn default_map_dimension() -> f32 {
    2000.0
}
fn default_food_count() -> usize {
    150
}

/// Player and blob tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_start_radius")]
    pub start_radius: f32,
    /// Hard cap on blobs per player.
    #[serde(default = "default_max_blobs")]
    pub max_blobs: usize,
    /// Minimum radius for a blob to be allowed to split.
    #[serde(default = "default_min_split_radius")]
    pub min_split_radius: f32,
    /// Outward impulse applied to each half of a split.
    #[serde(default = "default_split_impulse")]
    pub split_impulse: f32,
    /// Milliseconds after a split before blobs auto-merge.
    #[serde(default = "default_merge_after_ms")]
    pub merge_after_ms: u64,
    #[serde(default = "default_min_speed")]
    pub min_speed: f32,
    #[serde(default = "default_base_speed")]
    pub base_speed: f32,
    #[serde(default = "default_speed_divisor")]
    pub speed_divisor: f32,
}

impl PlayerConfig {
    pub fn speed_tuning(&self) -> SpeedTuning {
        SpeedTuning {
            min_speed: self.min_speed,
            base_speed: self.base_speed,
            speed_divisor: self.speed_divisor,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_radius: default_start_radius(),
            max_blobs: default_max_blobs(),
            min_split_radius: default_min_split_radius(),
            split_impulse: default_split_impulse(),
            merge_after_ms: default_merge_after_ms(),
            min_speed: default_min_speed(),
            base_speed: default_base_speed(),
            speed_divisor: default_speed_divisor(),
        }
    }
}

fn default_start_radius() -> f32 {
    20.0
}
fn default_max_blobs() -> usize {
    16
}
fn default_min_split_radius() -> f32 {
    15.0
}
fn default_split_impulse() -> f32 {
    12.0
}
fn default_merge_after_ms() -> u64 {
    60_000
}
fn default_min_speed() -> f32 {
    1.0
}
fn default_base_speed() -> f32 {
    4.0
}
fn default_speed_divisor() -> f32 {
    100.0
}

/// Food radius bands. Draws are 60% small, 30% medium, 10% large; the bands
/// must stay ordered small < medium < large.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    #[serde(default = "default_food_small_min")]
    pub small_min: f32,
    #[serde(default = "default_food_small_max")]
    pub small_max: f32,
    #[serde(default = "default_food_medium_min")]
    pub medium_min: f32,
    #[serde(default = "default_food_medium_max")]
    pub medium_max: f32,
    #[serde(default = "default_food_large_min")]
    pub large_min: f32,
    #[serde(default = "default_food_large_max")]
    pub large_max: f32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            small_min: default_food_small_min(),
            small_max: default_food_small_max(),
            medium_min: default_food_medium_min(),
            medium_max: default_food_medium_max(),
            large_min: default_food_large_min(),
            large_max: default_food_large_max(),
        }
    }
}

fn default_food_small_min() -> f32 {
    3.0
}
fn default_food_small_max() -> f32 {
    5.0
}
fn default_food_medium_min() -> f32 {
    5.0
}
fn default_food_medium_max() -> f32 {
    7.0
}
fn default_food_large_min() -> f32 {
    7.0
}
fn default_food_large_max() -> f32 {
    10.0
}

/// Ejected-pellet tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EjectConfig {
    /// Fraction of a blob's mass carried by each ejected pellet.
    #[serde(default = "default_eject_fraction")]
    pub fraction: f32,
    /// Minimum radius for a blob to be allowed to eject.
    #[serde(default = "default_min_eject_radius")]
    pub min_eject_radius: f32,
    /// Initial pellet speed.
    #[serde(default = "default_pellet_speed")]
    pub pellet_speed: f32,
    /// Pellets older than this are dropped.
    #[serde(default = "default_pellet_max_age_ms")]
    pub pellet_max_age_ms: u64,
}

impl Default for EjectConfig {
    fn default() -> Self {
        Self {
            fraction: default_eject_fraction(),
            min_eject_radius: default_min_eject_radius(),
            pellet_speed: default_pellet_speed(),
            pellet_max_age_ms: default_pellet_max_age_ms(),
        }
    }
}

fn default_eject_fraction() -> f32 {
    0.03
}
fn default_min_eject_radius() -> f32 {
    15.0
}
fn default_pellet_speed() -> f32 {
    15.0
}
fn default_pellet_max_age_ms() -> u64 {
    30_000
}

/// Hazard-spike tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpikeConfig {
    /// Number of spikes placed at startup.
    #[serde(default = "default_spike_count")]
    pub count: usize,
    #[serde(default = "default_spike_radius")]
    pub radius: f32,
    /// Fragments a bursting blob breaks into.
    #[serde(default = "default_fragment_count")]
    pub fragment_count: usize,
    /// Fraction of the spike's mass added to the burst total.
    #[serde(default = "default_bonus_fraction")]
    pub bonus_fraction: f32,
    /// Outward impulse on each fragment.
    #[serde(default = "default_fragment_impulse")]
    pub fragment_impulse: f32,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            count: default_spike_count(),
            radius: default_spike_radius(),
            fragment_count: default_fragment_count(),
            bonus_fraction: default_bonus_fraction(),
            fragment_impulse: default_fragment_impulse(),
        }
    }
}

fn default_spike_count() -> usize {
    12
}
fn default_spike_radius() -> f32 {
    40.0
}
fn default_fragment_count() -> usize {
    8
}
fn default_bonus_fraction() -> f32 {
    0.2
}
fn default_fragment_impulse() -> f32 {
    15.0
}

/// Coin-drop tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoinConfig {
    /// Live coin population; topped up as coins are collected.
    #[serde(default = "default_coin_count")]
    pub count: usize,
    #[serde(default = "default_coin_radius")]
    pub radius: f32,
    /// Coins credited per pickup (linked accounts only).
    #[serde(default = "default_coin_value")]
    pub value: u32,
}

impl Default for CoinConfig {
    fn default() -> Self {
        Self {
            count: default_coin_count(),
            radius: default_coin_radius(),
            value: default_coin_value(),
        }
    }
}

fn default_coin_count() -> usize {
    20
}
fn default_coin_radius() -> f32 {
    8.0
}
fn default_coin_value() -> u32 {
    50
}
