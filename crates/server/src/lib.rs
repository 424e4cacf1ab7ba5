//! Mitosis arena game server library.

pub mod accounts;
pub mod config;
pub mod entity;
pub mod geometry;
pub mod server;
pub mod spawn;
pub mod world;

// Re-export commonly used types
pub use accounts::{AccountStore, MemoryAccounts};
pub use config::Config;
pub use server::{run, GameState, Outbound, Target};
pub use world::World;
