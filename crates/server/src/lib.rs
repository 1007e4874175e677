//! Arena game server library.
//!
//! Rooms are split into a fixed grid of chunks; each player only receives
//! the chunks around its own.

pub mod config;
pub mod entity;
pub mod registry;
pub mod room;
pub mod server;
pub mod spatial;

// Re-export commonly used types
pub use config::Config;
pub use server::{
    Effect, GameState, Outbound, Outbox, Recipient, ServerStats, SessionId, run, run_game_loop,
};
