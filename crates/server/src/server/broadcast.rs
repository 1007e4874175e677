//! Neighbourhood snapshots and the per-room broadcast pass.

use protocol::packets::{ChunkView, ServerPacket};
use protocol::{ChunkId, PlayerId};
use rand::Rng;

use super::{Effect, Recipient};
use crate::registry::PlayerRegistry;
use crate::room::Room;

/// Snapshot of `chunk` and its neighbours, own chunk first.
pub fn neighbourhood_view(room: &Room, players: &PlayerRegistry, chunk: ChunkId) -> Vec<ChunkView> {
    room.index
        .neighbourhood(&room.grid, chunk)
        .into_iter()
        .filter_map(|id| {
            let geometry = room.grid.chunk(id)?;
            Some(ChunkView {
                id,
                position: geometry.bounds.min().into(),
                players: room
                    .index
                    .players(id)
                    .iter()
                    .filter_map(|p| players.get(p))
                    .map(|p| p.view())
                    .collect(),
                food: room.index.food(id).iter().map(|f| f.view()).collect(),
            })
        })
        .collect()
}

/// Copy of `views` with `player` left out of every player list.
pub fn without_player(views: &[ChunkView], player: &PlayerId) -> Vec<ChunkView> {
    views
        .iter()
        .map(|view| ChunkView {
            players: view.players.iter().filter(|p| p.id != *player).cloned().collect(),
            ..view.clone()
        })
        .collect()
}

/// Snapshot for one player: its neighbourhood without itself.
pub fn player_view(room: &Room, players: &PlayerRegistry, player: &PlayerId) -> Vec<ChunkView> {
    match players.get(player) {
        Some(p) => without_player(&neighbourhood_view(room, players, p.chunk_id), player),
        None => Vec::new(),
    }
}

/// One broadcast pass over a room: top up the food, then send every
/// occupant a `tick` with its neighbourhood. Ended rooms are frozen.
pub fn room_tick<R: Rng + ?Sized>(
    room: &mut Room,
    players: &PlayerRegistry,
    rng: &mut R,
) -> Vec<Effect> {
    if room.is_ended() {
        return Vec::new();
    }
    room.food.top_up(&room.grid, &mut room.index, rng);

    let mut effects = Vec::with_capacity(room.player_count());
    for (chunk, occupants) in room.index.occupied() {
        let views = neighbourhood_view(room, players, chunk);
        for id in occupants {
            effects.push(Effect::Send(
                Recipient::Player(*id),
                ServerPacket::Tick {
                    chunks: without_player(&views, id),
                },
            ));
        }
    }
    effects
}
