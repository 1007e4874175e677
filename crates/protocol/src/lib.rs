//! Shared protocol crate for the arena server.
//!
//! This crate contains:
//! - Packet definitions (client -> server and server -> client)
//! - Snapshot views sent inside packets
//! - Shared types (Color, Point, ids)

mod error;
pub mod packets;

use serde::{Deserialize, Serialize};

pub use error::ProtocolError;

/// Server-generated player identity.
pub type PlayerId = uuid::Uuid;

/// Room identity (1-based).
pub type RoomId = u32;

/// Index of a chunk inside its room's grid.
pub type ChunkId = usize;

/// RGB color used for players and food.
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

/// A point as it appears on the wire (`{"x": .., "y": ..}`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<glam::Vec2> for Point {
    #[inline]
    fn from(v: glam::Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Point> for glam::Vec2 {
    #[inline]
    fn from(p: Point) -> Self {
        glam::Vec2::new(p.x, p.y)
    }
}
