//! Player registry: the single owner of per-player state.

use glam::Vec2;
use protocol::{ChunkId, PlayerId, RoomId};
use std::collections::HashMap;

use crate::entity::Player;

/// A partial update to a player. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerPatch {
    pub position: Option<Vec2>,
    pub size: Option<f32>,
    pub chunk_id: Option<ChunkId>,
}

impl PlayerPatch {
    pub fn position(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn size(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn chunk(mut self, chunk_id: ChunkId) -> Self {
        self.chunk_id = Some(chunk_id);
        self
    }

    fn apply(self, player: &mut Player) {
        if let Some(position) = self.position {
            player.position = position;
        }
        if let Some(size) = self.size {
            player.size = size;
        }
        if let Some(chunk_id) = self.chunk_id {
            player.chunk_id = chunk_id;
        }
    }
}

/// Map from player id to player state.
///
/// Ids are never reused: once removed, an id only comes back through a new
/// `connect`, which always allocates a fresh one.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player. Returns `false` (and changes nothing) if the id is taken.
    pub fn create(&mut self, player: Player) -> bool {
        if self.players.contains_key(&player.id) {
            return false;
        }
        self.players.insert(player.id, player);
        true
    }

    #[inline]
    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    #[inline]
    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    /// Apply `patch` to a live player. Unknown ids are ignored.
    pub fn update(&mut self, id: &PlayerId, patch: PlayerPatch) -> bool {
        match self.players.get_mut(id) {
            Some(player) => {
                patch.apply(player);
                true
            }
            None => false,
        }
    }

    /// Remove a player. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: &PlayerId) -> Option<Player> {
        self.players.remove(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Ids of every player assigned to `room_id`.
    pub fn ids_in_room(&self, room_id: RoomId) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|p| p.room_id == room_id)
            .map(|p| p.id)
            .collect()
    }
}
