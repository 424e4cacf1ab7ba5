//! Shared protocol crate for the mitosis arena server.
//!
//! This crate contains:
//! - Client command and server event definitions
//! - The per-tick world snapshot types
//! - Shared types (Color, Vector2, Skin)
//!
//! Messages travel as JSON text frames; encoding and decoding live on the
//! message enums themselves.

mod error;
mod messages;

pub use error::ProtocolError;
pub use messages::{
    Announcement, BlobSnapshot, ClientMessage, CoinSnapshot, FoodSnapshot, MapSize,
    PelletSnapshot, PlayerId, PlayerSnapshot, ServerMessage, SpikeSnapshot, WorldSnapshot,
    MAX_CHAT_LEN,
};

use serde::{Deserialize, Serialize};

/// RGB color used for players, food and pellets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A 2D world coordinate as it appears on the wire.
///
/// The simulation itself works in `glam::Vec2`; this mirror exists so wire
/// structs stay plain serde types.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<glam::Vec2> for Vector2 {
    fn from(v: glam::Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Vector2> for glam::Vec2 {
    fn from(v: Vector2) -> Self {
        glam::Vec2::new(v.x, v.y)
    }
}

/// A player's skin selection.
///
/// Invalid states (a guest with a purchased skin, a custom color without a
/// color payload) are unrepresentable by construction; validation happens
/// server-side before one of these is ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Skin {
    /// No skin; the player renders with their base color.
    #[default]
    None,
    /// A custom display color (linked accounts only).
    Custom { color: Color },
    /// A purchased image skin, by filename (linked accounts only).
    Owned { filename: String },
}
