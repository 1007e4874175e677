//! Packet definitions for the arena protocol.
//!
//! Every message is a single JSON object with a `type` discriminator.
//! This module contains both client->server and server->client packet types.

mod client;
mod server;

pub use client::*;
pub use server::*;
