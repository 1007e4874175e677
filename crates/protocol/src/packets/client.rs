//! Client -> Server packet parsing.

use serde::Deserialize;

use crate::{PlayerId, Point, ProtocolError, RoomId};

/// Parsed client packet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientPacket {
    /// Join the first room with free capacity.
    Connect { username: String },
    /// The player's blob moved.
    PositionChanged {
        id: PlayerId,
        room_id: RoomId,
        new_pos: Point,
    },
    /// The player's blob grew, usually by eating the food at `food`.
    SizeChanged {
        id: PlayerId,
        room_id: RoomId,
        new_size: f32,
        #[serde(default)]
        food: Option<Point>,
    },
    /// `eater` consumed `eaten` (decided client-side).
    PlayerEaten {
        room_id: RoomId,
        eater: PlayerId,
        eaten: PlayerId,
    },
    /// Graceful disconnect.
    Close { id: PlayerId, room_id: RoomId },
}

impl ClientPacket {
    /// Parse a client packet from a text frame.
    ///
    /// Frames longer than `max_len` bytes are rejected without being parsed.
    pub fn parse(text: &str, max_len: usize) -> Result<Self, ProtocolError> {
        if text.len() > max_len {
            return Err(ProtocolError::TooLarge {
                len: text.len(),
                max: max_len,
            });
        }
        serde_json::from_str(text).map_err(ProtocolError::Malformed)
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientPacket::Connect { .. } => "connect",
            ClientPacket::PositionChanged { .. } => "positionChanged",
            ClientPacket::SizeChanged { .. } => "sizeChanged",
            ClientPacket::PlayerEaten { .. } => "playerEaten",
            ClientPacket::Close { .. } => "close",
        }
    }
}
