//! A connected participant and their blobs.

use super::Blob;
use protocol::{BlobSnapshot, Color, PlayerId, PlayerSnapshot, Skin};

/// Persistent-account identifier (absent for guests).
pub type AccountId = i64;

/// One connected player. Created on connection, removed on disconnect or
/// when the last blob is eaten.
#[derive(Debug)]
pub struct Player {
    /// Connection identity.
    pub id: PlayerId,
    /// Linked persistent account, if any.
    pub account_id: Option<AccountId>,
    pub name: String,
    pub color: Color,
    pub skin: Skin,
    /// 1..=16 blobs while connected; index 0 is the legacy "primary".
    pub blobs: Vec<Blob>,
    /// When the player last split; `None` once consolidated to one blob.
    pub split_at: Option<u64>,
    next_blob_id: u32,
}

impl Player {
    pub fn new(id: PlayerId, account_id: Option<AccountId>, color: Color, blob: Blob) -> Self {
        Self {
            id,
            account_id,
            name: String::new(),
            color,
            skin: Skin::None,
            blobs: vec![blob],
            split_at: None,
            next_blob_id: 1,
        }
    }

    /// Allocate a blob id unique within this player.
    pub fn next_blob_id(&mut self) -> u32 {
        let id = self.next_blob_id;
        self.next_blob_id += 1;
        id
    }

    /// Total mass across all blobs.
    pub fn total_mass(&self) -> f32 {
        self.blobs.iter().map(Blob::mass).sum()
    }

    /// Whether this player has a linked persistent account.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.account_id.is_some()
    }

    /// Build the broadcast view of this player.
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            color: self.color,
            skin: self.skin.clone(),
            blobs: self
                .blobs
                .iter()
                .map(|b| BlobSnapshot {
                    id: b.id,
                    x: b.position.x,
                    y: b.position.y,
                    radius: b.radius,
                })
                .collect(),
        }
    }
}
