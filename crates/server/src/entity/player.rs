//! Player state.

use glam::Vec2;
use protocol::packets::PlayerView;
use protocol::{ChunkId, Color, PlayerId, RoomId};

/// Authoritative state of one connected player.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub room_id: RoomId,
    pub position: Vec2,
    /// Radius.
    pub size: f32,
    pub color: Color,
    /// Chunk whose rectangle contains `position`.
    pub chunk_id: ChunkId,
}

impl Player {
    pub fn new(
        id: PlayerId,
        username: String,
        room_id: RoomId,
        position: Vec2,
        size: f32,
        color: Color,
    ) -> Self {
        Self {
            id,
            username,
            room_id,
            position,
            size,
            color,
            chunk_id: 0,
        }
    }

    /// Public view sent to other players.
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            username: self.username.clone(),
            position: self.position.into(),
            size: self.size,
            color: self.color,
            chunk_id: self.chunk_id,
        }
    }
}
