//! Connection sessions and player bindings.

use protocol::PlayerId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use super::{Outbound, Outbox};

/// Transport-level connection id (server-assigned counter).
pub type SessionId = u32;

/// One open transport connection.
#[derive(Debug)]
pub struct Session {
    /// Unique session ID.
    pub id: SessionId,
    /// Remote address.
    pub addr: SocketAddr,
    /// Players currently bound to this connection.
    pub players: Vec<PlayerId>,
    /// When the connection was opened.
    pub opened_at: Instant,
    outbox: Outbox,
}

impl Session {
    fn new(id: SessionId, addr: SocketAddr, outbox: Outbox) -> Self {
        Self {
            id,
            addr,
            players: Vec::new(),
            opened_at: Instant::now(),
            outbox,
        }
    }

    /// Queue a frame. Returns `false` when the connection task is gone.
    #[inline]
    pub fn send(&self, message: Outbound) -> bool {
        self.outbox.send(message).is_ok()
    }

    /// Ask the connection task to close the socket.
    pub fn close(&self) {
        let _ = self.outbox.send(Outbound::Close);
    }
}

/// All open sessions plus the player -> session bindings.
///
/// A missing binding means the player is already disconnected.
#[derive(Debug)]
pub struct SessionTable {
    next_id: SessionId,
    sessions: HashMap<SessionId, Session>,
    bindings: HashMap<PlayerId, SessionId>,
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            sessions: HashMap::new(),
            bindings: HashMap::new(),
        }
    }

    /// Register a new connection.
    pub fn open(&mut self, addr: SocketAddr, outbox: Outbox) -> SessionId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.sessions.insert(id, Session::new(id, addr, outbox));
        id
    }

    /// Forget a connection and all of its bindings.
    pub fn close(&mut self, id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        for player in &session.players {
            self.bindings.remove(player);
        }
        Some(session)
    }

    #[inline]
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Attach a player to a session. Returns `false` for an unknown session.
    pub fn bind(&mut self, id: SessionId, player: PlayerId) -> bool {
        let Some(session) = self.sessions.get_mut(&id) else {
            return false;
        };
        session.players.push(player);
        self.bindings.insert(player, id);
        true
    }

    /// Detach a player from its session.
    pub fn unbind(&mut self, player: &PlayerId) -> Option<SessionId> {
        let id = self.bindings.remove(player)?;
        if let Some(session) = self.sessions.get_mut(&id) {
            session.players.retain(|p| p != player);
        }
        Some(id)
    }

    #[inline]
    pub fn session_of(&self, player: &PlayerId) -> Option<SessionId> {
        self.bindings.get(player).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
