//! Server -> Client packet building.

use serde::Serialize;

use crate::{ChunkId, Color, PlayerId, Point, ProtocolError, RoomId};

/// Public state of a player as seen by others.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub username: String,
    pub position: Point,
    pub size: f32,
    pub color: Color,
    pub chunk_id: ChunkId,
}

/// A food pellet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodView {
    pub x: f32,
    pub y: f32,
    pub r: f32,
    pub color: Color,
}

/// One chunk of a neighbourhood snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkView {
    pub id: ChunkId,
    /// Minimum corner of the chunk rectangle.
    pub position: Point,
    pub players: Vec<PlayerView>,
    pub food: Vec<FoodView>,
}

/// A `gameOver` result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    pub username: String,
    pub size: f32,
}

/// Outbound packet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerPacket {
    /// Reply to `connect`.
    RoomFound {
        room_id: RoomId,
        chunks: Vec<ChunkView>,
        #[serde(rename = "playerID")]
        player_id: PlayerId,
        /// Match length in milliseconds.
        match_duration: u64,
        username: String,
        position: Point,
        size: f32,
        color: Color,
    },
    /// Full snapshot after a match reset.
    RoomReset {
        chunks: Vec<ChunkView>,
        position: Point,
        size: f32,
        color: Color,
    },
    /// Periodic neighbourhood snapshot.
    Tick { chunks: Vec<ChunkView> },
    /// Remaining match time in milliseconds.
    TimeUpdate { time_left: u64 },
    /// Sent to a player that was eaten.
    Eaten { eater: String },
    /// Match results, smallest first.
    GameOver { results: Vec<ResultEntry> },
    /// `connect` refused (every room is full).
    Rejected { reason: String },
}

impl ServerPacket {
    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerPacket::RoomFound { .. } => "roomFound",
            ServerPacket::RoomReset { .. } => "roomReset",
            ServerPacket::Tick { .. } => "tick",
            ServerPacket::TimeUpdate { .. } => "timeUpdate",
            ServerPacket::Eaten { .. } => "eaten",
            ServerPacket::GameOver { .. } => "gameOver",
            ServerPacket::Rejected { .. } => "rejected",
        }
    }
}
