//! Chunk membership: which players and food occupy which chunk.

use glam::Vec2;
use protocol::{ChunkId, PlayerId, Point};
use tracing::warn;

use crate::entity::Food;
use crate::spatial::WorldGrid;

/// Occupants of one chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkMembers {
    pub players: Vec<PlayerId>,
    pub food: Vec<Food>,
}

/// Outcome of [`ChunkIndex::migrate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    /// The current chunk still contains the position.
    Stayed,
    /// The player moved to a different chunk.
    Moved { from: ChunkId, to: ChunkId },
    /// No chunk contains the position; membership is unchanged.
    OutOfBounds,
}

/// Per-room membership lists, indexed by chunk id.
#[derive(Debug, Clone)]
pub struct ChunkIndex {
    chunks: Vec<ChunkMembers>,
    player_count: usize,
}

impl ChunkIndex {
    /// Empty index for a grid of `len` chunks.
    pub fn new(len: usize) -> Self {
        Self {
            chunks: vec![ChunkMembers::default(); len],
            player_count: 0,
        }
    }

    /// Put a newly spawned player into the chunk containing `position`.
    pub fn place(&mut self, grid: &WorldGrid, id: PlayerId, position: Vec2) -> Option<ChunkId> {
        let chunk = grid.chunk_at(position)?;
        self.chunks[chunk].players.push(id);
        self.player_count += 1;
        Some(chunk)
    }

    /// Move `id` out of `current` if `position` left it.
    pub fn migrate(
        &mut self,
        grid: &WorldGrid,
        id: PlayerId,
        current: ChunkId,
        position: Vec2,
    ) -> Migration {
        if grid.contains(current, position) {
            return Migration::Stayed;
        }
        let Some(to) = grid.chunk_at(position) else {
            return Migration::OutOfBounds;
        };
        let listed = self
            .chunks
            .get_mut(current)
            .is_some_and(|members| remove_id(&mut members.players, &id));
        if !listed {
            warn!("Player {} was not listed in chunk {} during migration", id, current);
        }
        self.chunks[to].players.push(id);
        Migration::Moved { from: current, to }
    }

    /// Remove `id` from `chunk`. Returns `false` if it was not listed there.
    pub fn remove(&mut self, chunk: ChunkId, id: &PlayerId) -> bool {
        let Some(members) = self.chunks.get_mut(chunk) else {
            return false;
        };
        if remove_id(&mut members.players, id) {
            self.player_count -= 1;
            true
        } else {
            false
        }
    }

    /// The chunk plus its neighbours: the visibility set for its occupants.
    pub fn neighbourhood(&self, grid: &WorldGrid, chunk: ChunkId) -> Vec<ChunkId> {
        grid.neighbourhood(chunk).collect()
    }

    #[inline]
    pub fn members(&self, chunk: ChunkId) -> Option<&ChunkMembers> {
        self.chunks.get(chunk)
    }

    #[inline]
    pub fn players(&self, chunk: ChunkId) -> &[PlayerId] {
        self.chunks.get(chunk).map(|c| c.players.as_slice()).unwrap_or(&[])
    }

    #[inline]
    pub fn food(&self, chunk: ChunkId) -> &[Food] {
        self.chunks.get(chunk).map(|c| c.food.as_slice()).unwrap_or(&[])
    }

    /// Chunks with at least one player.
    pub fn occupied(&self) -> impl Iterator<Item = (ChunkId, &[PlayerId])> {
        self.chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.players.is_empty())
            .map(|(id, c)| (id, c.players.as_slice()))
    }

    /// Every player in the room, in chunk order.
    pub fn all_players(&self) -> impl Iterator<Item = &PlayerId> {
        self.chunks.iter().flat_map(|c| c.players.iter())
    }

    #[inline]
    pub fn player_count(&self) -> usize {
        self.player_count
    }

    pub fn add_food(&mut self, chunk: ChunkId, food: Food) {
        if let Some(members) = self.chunks.get_mut(chunk) {
            members.food.push(food);
        }
    }

    /// Remove the first food item in `chunk` lying exactly at `point`.
    pub fn take_food_at(&mut self, chunk: ChunkId, point: Point) -> Option<Food> {
        let members = self.chunks.get_mut(chunk)?;
        let idx = members.food.iter().position(|f| f.is_at(point))?;
        Some(members.food.remove(idx))
    }

    /// Total food across all chunks.
    pub fn food_len(&self) -> usize {
        self.chunks.iter().map(|c| c.food.len()).sum()
    }

    /// Drop all players and food.
    pub fn clear(&mut self) {
        for members in &mut self.chunks {
            members.players.clear();
            members.food.clear();
        }
        self.player_count = 0;
    }
}

/// Search-then-splice removal preserving list order.
fn remove_id(list: &mut Vec<PlayerId>, id: &PlayerId) -> bool {
    match list.iter().position(|p| p == id) {
        Some(idx) => {
            list.remove(idx);
            true
        }
        None => false,
    }
}
