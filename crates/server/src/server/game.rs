//! Game state aggregate and the game loop.
//!
//! All mutation goes through [`GameState`]: inbound packets via
//! [`GameState::dispatch`], timers via [`GameState::tick`] and
//! [`GameState::clock_tick`]. Each returns [`Effect`]s which
//! [`GameState::deliver`] applies to the sessions.

use glam::Vec2;
use protocol::packets::{ClientPacket, ServerPacket};
use protocol::{PlayerId, Point, ProtocolError, RoomId};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::time::{MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use super::broadcast::{self, neighbourhood_view, without_player};
use super::session::{SessionId, SessionTable};
use super::{Effect, Outbound, Outbox, Recipient};
use crate::config::Config;
use crate::entity::{Player, random_color};
use crate::registry::PlayerRegistry;
use crate::room::{ClockEvent, MatchPhase, Room};

/// Name reported to an eaten player when the eater is gone or nameless.
const UNNAMED_EATER: &str = "An unnamed cell";

/// Main game state.
#[derive(Debug)]
pub struct GameState {
    /// Server configuration.
    pub config: Config,
    /// Rooms, `rooms[i]` has id `i + 1`.
    pub rooms: Vec<Room>,
    /// Every connected player across all rooms.
    pub players: PlayerRegistry,
    /// Open connections.
    pub sessions: SessionTable,
    /// Broadcast passes run so far.
    pub tick_count: u64,
    /// Server start time.
    pub start_time: Instant,
    /// Smoothed broadcast pass duration in milliseconds.
    pub update_time_avg: f64,
}

impl GameState {
    /// Create the rooms, each filled with food.
    pub fn new(config: &Config) -> Self {
        Self::new_at(config, Instant::now())
    }

    /// Like [`GameState::new`] with an explicit match start time.
    pub fn new_at(config: &Config, now: Instant) -> Self {
        let mut rng = rand::rng();
        let rooms: Vec<Room> = (1..=config.rooms.count as RoomId)
            .map(|id| Room::new(id, config, now, &mut rng))
            .collect();
        info!(
            "Created {} room(s): {} chunks, {} food each",
            rooms.len(),
            config.world.chunks_per_axis * config.world.chunks_per_axis,
            config.food.max_amount
        );

        Self {
            config: config.clone(),
            rooms,
            players: PlayerRegistry::new(),
            sessions: SessionTable::new(),
            tick_count: 0,
            start_time: now,
            update_time_avg: 0.0,
        }
    }

    /// Look up a room by id.
    pub fn room(&self, room_id: RoomId) -> Option<&Room> {
        room_index(room_id).and_then(|i| self.rooms.get(i))
    }

    /// Register a new connection.
    pub fn open_session(&mut self, addr: SocketAddr, outbox: Outbox) -> SessionId {
        let id = self.sessions.open(addr, outbox);
        info!("Session {} opened from {}", id, addr);
        id
    }

    /// Tear down a connection, removing every player still bound to it.
    pub fn close_session(&mut self, session: SessionId) {
        let Some(closed) = self.sessions.close(session) else {
            return;
        };
        for id in &closed.players {
            if let Some(player) = self.remove_player(id) {
                info!("Player '{}' left room {}", player.username, player.room_id);
            }
        }
        info!("Session {} ({}) closed", session, closed.addr);
    }

    /// Parse one text frame from `session`, apply it and deliver the effects.
    pub fn handle_message(&mut self, session: SessionId, text: &str) -> Result<(), ProtocolError> {
        let packet = ClientPacket::parse(text, self.config.server.max_message_len)?;
        if !matches!(packet, ClientPacket::PositionChanged { .. }) {
            debug!("Session {} sent {}", session, packet.kind());
        }
        let effects = self.dispatch(session, packet);
        self.deliver(effects);
        Ok(())
    }

    /// Apply one packet and return what must be sent.
    pub fn dispatch(&mut self, session: SessionId, packet: ClientPacket) -> Vec<Effect> {
        match packet {
            ClientPacket::Connect { username } => self.handle_connect(session, username),
            ClientPacket::PositionChanged { id, room_id, new_pos } => {
                self.handle_position_changed(id, room_id, new_pos)
            }
            ClientPacket::SizeChanged {
                id,
                room_id,
                new_size,
                food,
            } => self.handle_size_changed(id, room_id, new_size, food),
            ClientPacket::PlayerEaten {
                room_id,
                eater,
                eaten,
            } => self.handle_player_eaten(room_id, eater, eaten),
            ClientPacket::Close { id, room_id } => self.handle_close(session, id, room_id),
        }
    }

    fn handle_connect(&mut self, session: SessionId, username: String) -> Vec<Effect> {
        if !self.sessions.contains(session) {
            return Vec::new();
        }
        let username: String = username
            .chars()
            .take(self.config.player.max_name_length)
            .collect();

        let Some(room) = self.rooms.iter_mut().find(|r| r.has_capacity()) else {
            info!("Rejected '{}' from session {}: every room is full", username, session);
            return vec![Effect::Send(
                Recipient::Session(session),
                ServerPacket::Rejected {
                    reason: "every room is full".to_string(),
                },
            )];
        };

        let mut rng = rand::rng();
        let player = Player::new(
            PlayerId::new_v4(),
            username,
            room.id,
            room.grid.random_position(&mut rng),
            self.config.player.initial_size,
            random_color(&mut rng),
        );
        let id = player.id;
        let Some(chunk) = room.admit(&mut self.players, player) else {
            warn!("Could not place new player {} in room {}", id, room.id);
            return Vec::new();
        };
        self.sessions.bind(session, id);

        let Some(player) = self.players.get(&id) else {
            return Vec::new();
        };
        info!(
            "Player '{}' ({}) joined room {} in chunk {} ({}/{} players)",
            player.username,
            id,
            room.id,
            chunk,
            room.player_count(),
            self.config.rooms.max_players
        );

        let chunks = without_player(&neighbourhood_view(room, &self.players, chunk), &id);
        vec![Effect::Send(
            Recipient::Player(id),
            ServerPacket::RoomFound {
                room_id: room.id,
                chunks,
                player_id: id,
                match_duration: room.clock.duration().as_millis() as u64,
                username: player.username.clone(),
                position: player.position.into(),
                size: player.size,
                color: player.color,
            },
        )]
    }

    fn handle_position_changed(&mut self, id: PlayerId, room_id: RoomId, new_pos: Point) -> Vec<Effect> {
        if !(new_pos.x.is_finite() && new_pos.y.is_finite()) {
            debug!("Ignoring non-finite position from {}", id);
            return Vec::new();
        }
        let Some(room) = active_room(&mut self.rooms, &self.players, &id, room_id) else {
            return Vec::new();
        };
        room.move_player(&mut self.players, &id, Vec2::from(new_pos));
        Vec::new()
    }

    fn handle_size_changed(
        &mut self,
        id: PlayerId,
        room_id: RoomId,
        new_size: f32,
        food: Option<Point>,
    ) -> Vec<Effect> {
        if !new_size.is_finite() || new_size < 0.0 {
            debug!("Ignoring size {} from {}", new_size, id);
            return Vec::new();
        }
        let Some(room) = active_room(&mut self.rooms, &self.players, &id, room_id) else {
            return Vec::new();
        };
        if !room.resize_player(&mut self.players, &id, new_size, food) && food.is_some() {
            debug!("Player {} reported food outside its neighbourhood", id);
        }
        Vec::new()
    }

    fn handle_player_eaten(&mut self, room_id: RoomId, eater: PlayerId, eaten: PlayerId) -> Vec<Effect> {
        if active_room(&mut self.rooms, &self.players, &eaten, room_id).is_none() {
            return Vec::new();
        }
        let eater_name = self
            .players
            .get(&eater)
            .map(|p| p.username.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNNAMED_EATER.to_string());

        let Some(victim) = self.remove_player(&eaten) else {
            return Vec::new();
        };
        info!(
            "Player '{}' was eaten by '{}' in room {}",
            victim.username, eater_name, room_id
        );
        vec![
            Effect::Send(Recipient::Player(eaten), ServerPacket::Eaten { eater: eater_name }),
            Effect::Sever(eaten),
        ]
    }

    fn handle_close(&mut self, session: SessionId, id: PlayerId, room_id: RoomId) -> Vec<Effect> {
        if self.sessions.session_of(&id) != Some(session) {
            debug!("Session {} tried to close player {} it does not own", session, id);
            return Vec::new();
        }
        if let Some(player) = self.remove_player(&id) {
            info!("Player '{}' closed in room {}", player.username, room_id);
        }
        vec![Effect::Sever(id)]
    }

    /// Drop a player from the registry and its room's chunk index.
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        let player = self.players.remove(id)?;
        if let Some(room) = room_index(player.room_id).and_then(|i| self.rooms.get_mut(i)) {
            if !room.remove_player(&player) {
                warn!(
                    "Player {} was not listed in chunk {} of room {}",
                    id, player.chunk_id, player.room_id
                );
            }
        }
        Some(player)
    }

    /// One broadcast pass over every room.
    pub fn tick(&mut self) -> Vec<Effect> {
        self.tick_count += 1;
        let mut rng = rand::rng();
        let mut effects = Vec::new();
        for room in &mut self.rooms {
            effects.extend(broadcast::room_tick(room, &self.players, &mut rng));
        }
        effects
    }

    /// Advance every room's match clock to `now`.
    pub fn clock_tick(&mut self, now: Instant) -> Vec<Effect> {
        let mut rng = rand::rng();
        let initial_size = self.config.player.initial_size;
        let mut effects = Vec::new();

        for room in &mut self.rooms {
            match room.clock.poll(now) {
                ClockEvent::TimeLeft(left) => {
                    let time_left = left.as_millis() as u64;
                    for id in room.player_ids() {
                        effects.push(Effect::Send(
                            Recipient::Player(id),
                            ServerPacket::TimeUpdate { time_left },
                        ));
                    }
                }
                ClockEvent::MatchEnded => {
                    let results = room.results(&self.players);
                    info!("Match over in room {} ({} players)", room.id, results.len());
                    for id in room.player_ids() {
                        effects.push(Effect::Send(
                            Recipient::Player(id),
                            ServerPacket::GameOver {
                                results: results.clone(),
                            },
                        ));
                    }
                }
                ClockEvent::ResetDue => {
                    let respawned = room.reset(&mut self.players, initial_size, now, &mut rng);
                    info!(
                        "Room {} reset: {} food, {} players respawned",
                        room.id,
                        room.food.count(),
                        respawned.len()
                    );
                    for id in respawned {
                        let Some(player) = self.players.get(&id) else {
                            continue;
                        };
                        effects.push(Effect::Send(
                            Recipient::Player(id),
                            ServerPacket::RoomReset {
                                chunks: broadcast::player_view(room, &self.players, &id),
                                position: player.position.into(),
                                size: player.size,
                                color: player.color,
                            },
                        ));
                    }
                }
                ClockEvent::Waiting => {}
            }
        }
        effects
    }

    /// Apply effects: encode and queue packets, sever bindings.
    ///
    /// Sessions whose channel is gone are closed after the pass.
    pub fn deliver(&mut self, effects: Vec<Effect>) {
        let mut dead: Vec<SessionId> = Vec::new();

        for effect in effects {
            match effect {
                Effect::Send(to, packet) => {
                    let target = match to {
                        Recipient::Session(s) => Some(s),
                        Recipient::Player(p) => self.sessions.session_of(&p),
                    };
                    // Already disconnected.
                    let Some(session) = target.and_then(|s| self.sessions.get(s)) else {
                        continue;
                    };
                    let text = match packet.encode() {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode {}: {}", packet.kind(), e);
                            continue;
                        }
                    };
                    if !session.send(Outbound::Text(text)) && !dead.contains(&session.id) {
                        dead.push(session.id);
                    }
                }
                Effect::Sever(player) => {
                    let Some(session) = self.sessions.unbind(&player) else {
                        continue;
                    };
                    let idle = self
                        .sessions
                        .get(session)
                        .is_some_and(|s| s.players.is_empty());
                    if idle {
                        if let Some(closed) = self.sessions.close(session) {
                            closed.close();
                            info!("Session {} ({}) severed", session, closed.addr);
                        }
                    }
                }
            }
        }

        for session in dead {
            warn!("Session {} is unreachable, disconnecting", session);
            self.close_session(session);
        }
    }

    /// Snapshot of the server for the status route.
    pub fn stats(&self, now: Instant) -> ServerStats {
        ServerStats {
            uptime_secs: now.saturating_duration_since(self.start_time).as_secs(),
            sessions: self.sessions.len(),
            players: self.players.len(),
            tick_count: self.tick_count,
            update_time_avg_ms: self.update_time_avg,
            rooms: self
                .rooms
                .iter()
                .map(|room| RoomStats {
                    id: room.id,
                    players: room.player_count(),
                    food: room.food.count(),
                    phase: match room.clock.phase() {
                        MatchPhase::Running { .. } => "running",
                        MatchPhase::Ended { .. } => "ended",
                    },
                    time_left_ms: room.clock.time_left(now).as_millis() as u64,
                })
                .collect(),
        }
    }
}

/// Server status, serialized by the `/stats` route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    pub uptime_secs: u64,
    pub sessions: usize,
    pub players: usize,
    pub tick_count: u64,
    pub update_time_avg_ms: f64,
    pub rooms: Vec<RoomStats>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub id: RoomId,
    pub players: usize,
    pub food: usize,
    pub phase: &'static str,
    pub time_left_ms: u64,
}

#[inline]
fn room_index(room_id: RoomId) -> Option<usize> {
    (room_id as usize).checked_sub(1)
}

/// The room `id` lives in, if it matches `room_id` and the match is running.
fn active_room<'a>(
    rooms: &'a mut [Room],
    players: &PlayerRegistry,
    id: &PlayerId,
    room_id: RoomId,
) -> Option<&'a mut Room> {
    let Some(player) = players.get(id) else {
        debug!("Unknown player {}", id);
        return None;
    };
    if player.room_id != room_id {
        debug!("Player {} is in room {}, not {}", id, player.room_id, room_id);
        return None;
    }
    let room = rooms.get_mut(room_index(room_id)?)?;
    if room.is_ended() {
        return None;
    }
    Some(room)
}

/// Run the game loop: broadcast passes and match clock polls.
pub async fn run_game_loop(state: Arc<RwLock<GameState>>) {
    let (tick_interval, clock_interval) = {
        let game = state.read().await;
        (
            game.config.server.tick_interval(),
            game.config.server.clock_interval(),
        )
    };
    let start = tokio::time::Instant::now();
    let mut ticker = interval_at(start + tick_interval, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut clock = interval_at(start + clock_interval, clock_interval);
    clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let tick_budget = tick_interval.as_secs_f64() * 1000.0 * 0.9;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mut game = state.write().await;
                // Hibernate while nobody is connected.
                if game.sessions.is_empty() {
                    continue;
                }
                let tick_start = Instant::now();
                let effects = game.tick();
                game.deliver(effects);
                let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;
                game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

                if tick_ms > tick_budget {
                    warn!(
                        "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players",
                        game.tick_count,
                        tick_ms,
                        tick_budget,
                        game.players.len()
                    );
                }
                if game.tick_count % 600 == 0 {
                    let food: usize = game.rooms.iter().map(|r| r.food.count()).sum();
                    debug!(
                        "Tick #{}: {} players, {} food, avg {:.3}ms",
                        game.tick_count,
                        game.players.len(),
                        food,
                        game.update_time_avg
                    );
                }
            }
            scheduled = clock.tick() => {
                let mut game = state.write().await;
                let effects = game.clock_tick(scheduled.into_std());
                game.deliver(effects);
            }
        }
    }
}
