//! Game entities.
//!
//! Everything that lives in the world: player blobs, food, ejected pellets,
//! hazard spikes and coin drops.

mod blob;
mod coin;
mod food;
mod pellet;
mod player;
mod spike;

pub use blob::Blob;
pub use coin::CoinDrop;
pub use food::Food;
pub use pellet::Pellet;
pub use player::{AccountId, Player};
pub use spike::Spike;
