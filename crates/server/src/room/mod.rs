//! Rooms: independent match instances.
//!
//! A room owns its chunk grid, the chunk membership lists, its food pool
//! and its match clock. Player state itself lives in the shared
//! [`PlayerRegistry`]; the room only files ids under chunks.

pub mod chunks;
pub mod clock;
pub mod food;

pub use chunks::{ChunkIndex, ChunkMembers, Migration};
pub use clock::{ClockEvent, MatchClock, MatchPhase};
pub use food::FoodPool;

use glam::Vec2;
use protocol::packets::ResultEntry;
use protocol::{ChunkId, PlayerId, Point, RoomId};
use rand::Rng;
use std::time::Instant;
use tracing::debug;

use crate::config::Config;
use crate::entity::Player;
use crate::registry::{PlayerPatch, PlayerRegistry};
use crate::spatial::WorldGrid;

/// One independent game instance.
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub grid: WorldGrid,
    pub index: ChunkIndex,
    pub food: FoodPool,
    pub clock: MatchClock,
    max_players: usize,
}

impl Room {
    /// Build a room and fill it with food.
    pub fn new<R: Rng + ?Sized>(id: RoomId, config: &Config, now: Instant, rng: &mut R) -> Self {
        let grid = WorldGrid::new(
            config.world.width,
            config.world.height,
            config.world.chunks_per_axis,
        );
        let mut index = ChunkIndex::new(grid.len());
        let mut food = FoodPool::new(config.food.max_amount, config.food.radius);
        food.top_up(&grid, &mut index, rng);

        Self {
            id,
            grid,
            index,
            food,
            clock: MatchClock::new(
                config.rooms.match_duration(),
                config.rooms.reset_delay(),
                now,
            ),
            max_players: config.rooms.max_players,
        }
    }

    #[inline]
    pub fn has_capacity(&self) -> bool {
        self.index.player_count() < self.max_players
    }

    #[inline]
    pub fn is_ended(&self) -> bool {
        self.clock.is_ended()
    }

    #[inline]
    pub fn player_count(&self) -> usize {
        self.index.player_count()
    }

    /// Every player filed in this room.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.index.all_players().copied().collect()
    }

    /// File a new player under its spawn chunk and register it.
    pub fn admit(&mut self, players: &mut PlayerRegistry, mut player: Player) -> Option<ChunkId> {
        if players.contains(&player.id) {
            return None;
        }
        let chunk = self.index.place(&self.grid, player.id, player.position)?;
        player.chunk_id = chunk;
        players.create(player);
        Some(chunk)
    }

    /// Update a player's position (clamped to the world) and migrate it.
    pub fn move_player(
        &mut self,
        players: &mut PlayerRegistry,
        id: &PlayerId,
        position: Vec2,
    ) -> Option<Migration> {
        let current = players.get(id)?.chunk_id;
        let position = self.grid.clamp(position);
        let migration = self.index.migrate(&self.grid, *id, current, position);
        let mut patch = PlayerPatch::default().position(position);
        if let Migration::Moved { from, to } = migration {
            debug!("Player {} moved from chunk {} to chunk {}", id, from, to);
            patch = patch.chunk(to);
        }
        players.update(id, patch);
        Some(migration)
    }

    /// Update a player's size and consume the food it reports eating.
    /// Returns whether a food item was removed.
    pub fn resize_player(
        &mut self,
        players: &mut PlayerRegistry,
        id: &PlayerId,
        size: f32,
        food: Option<Point>,
    ) -> bool {
        let Some(chunk) = players.get(id).map(|p| p.chunk_id) else {
            return false;
        };
        players.update(id, PlayerPatch::default().size(size));
        match food {
            Some(point) => self.food.consume(&self.grid, &mut self.index, chunk, point),
            None => false,
        }
    }

    /// Drop a player from its chunk. Returns `false` if it was not filed here.
    pub fn remove_player(&mut self, player: &Player) -> bool {
        self.index.remove(player.chunk_id, &player.id)
    }

    /// Ranking of every player in the room, smallest first.
    pub fn results(&self, players: &PlayerRegistry) -> Vec<ResultEntry> {
        let mut results: Vec<ResultEntry> = self
            .index
            .all_players()
            .filter_map(|id| players.get(id))
            .map(|p| ResultEntry {
                username: p.username.clone(),
                size: p.size,
            })
            .collect();
        results.sort_by(|a, b| {
            a.size
                .total_cmp(&b.size)
                .then_with(|| a.username.cmp(&b.username))
        });
        results
    }

    /// Start a new match: fresh food, empty chunks, and every player of the
    /// room respawned at a random position with the initial size.
    /// Returns the respawned ids.
    pub fn reset<R: Rng + ?Sized>(
        &mut self,
        players: &mut PlayerRegistry,
        initial_size: f32,
        now: Instant,
        rng: &mut R,
    ) -> Vec<PlayerId> {
        self.index.clear();
        self.food.clear();
        self.food.top_up(&self.grid, &mut self.index, rng);
        self.clock.restart(now);

        let mut respawned = Vec::new();
        for id in players.ids_in_room(self.id) {
            let position = self.grid.random_position(rng);
            let Some(chunk) = self.index.place(&self.grid, id, position) else {
                continue;
            };
            players.update(
                &id,
                PlayerPatch::default().position(position).size(initial_size).chunk(chunk),
            );
            respawned.push(id);
        }
        respawned
    }
}
