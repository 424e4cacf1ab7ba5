//! Client command and server event definitions.

use crate::{Color, ProtocolError, Skin, Vector2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum accepted chat message length; longer messages are truncated.
pub const MAX_CHAT_LEN: usize = 100;

/// Connection identifier assigned by the server.
pub type PlayerId = u32;

/// Commands a client may send. Clients only express intents; they never
/// mutate server state directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Steer all of the player's blobs toward a world-space point.
    Move { target: Vector2 },
    /// Set the display name (trimmed server-side; empty permitted).
    SetName { name: String },
    /// Select a skin. `skin` is "none", "custom", or an image filename;
    /// `custom_color` accompanies "custom".
    #[serde(rename_all = "camelCase")]
    SetSkin {
        skin: String,
        custom_color: Option<Color>,
    },
    /// Split every eligible blob in two.
    Split,
    /// Eject a mass pellet from every eligible blob.
    EjectMass,
    /// Say something to everyone.
    Chat { text: String },
}

impl ClientMessage {
    /// Decode a client command from a JSON text frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        if frame.is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent once on connect: the full world plus the current announcement.
    Init {
        snapshot: WorldSnapshot,
        announcement: Announcement,
    },
    /// Sent to everyone once per tick.
    Update { snapshot: WorldSnapshot },
    /// A new player entered the arena.
    PlayerJoined { player: PlayerSnapshot },
    /// A player disconnected.
    PlayerLeft { id: PlayerId },
    /// A player lost their last blob to another player.
    #[serde(rename_all = "camelCase")]
    PlayerEaten { eaten_id: PlayerId, eater_id: PlayerId },
    /// The server announcement changed.
    Announcement { announcement: Announcement },
    /// Chat relay.
    Chat {
        name: String,
        color: Color,
        text: String,
    },
    /// Sent to a linked player whose blob picked up a coin.
    CoinCollected { amount: u32 },
    /// Sent to a guest whose blob picked up a coin (no credit applied).
    CoinCollectedGuest { amount: u32 },
}

impl ServerMessage {
    /// Encode a server event as a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// The shared server announcement banner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Announcement {
    pub text: String,
    pub enabled: bool,
}

/// One blob of a player, as broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlobSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// One player, as broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    pub skin: Skin,
    pub blobs: Vec<BlobSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoodSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PelletSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoinSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub value: u32,
}

/// Map bounds as broadcast to clients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapSize {
    pub width: f32,
    pub height: f32,
}

/// The full world state emitted every tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub players: HashMap<PlayerId, PlayerSnapshot>,
    pub food: Vec<FoodSnapshot>,
    pub pellets: Vec<PelletSnapshot>,
    pub spikes: Vec<SpikeSnapshot>,
    pub coin_drops: Vec<CoinSnapshot>,
    pub map: MapSize,
}
