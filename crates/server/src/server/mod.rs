//! Game server implementation.

use crate::config::Config;
use futures_util::{SinkExt, StreamExt};
use protocol::packets::ServerPacket;
use protocol::{PlayerId, ProtocolError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};

pub mod broadcast;
pub mod game;
pub mod session;

pub use game::{GameState, RoomStats, ServerStats, run_game_loop};
pub use session::{Session, SessionId, SessionTable};

/// A frame queued for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// JSON text frame.
    Text(String),
    /// Close the socket.
    Close,
}

/// Sending half of a connection's outbound queue.
pub type Outbox = mpsc::UnboundedSender<Outbound>;

/// Who a packet is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Whatever session the player is bound to.
    Player(PlayerId),
    /// A session that may not have a player yet.
    Session(SessionId),
}

/// Side effect produced by a handler or a timer pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(Recipient, ServerPacket),
    /// Unbind the player from its session, closing the session if it has
    /// no players left.
    Sever(PlayerId),
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    // Shared game state
    let game_state = Arc::new(RwLock::new(GameState::new(&config)));

    // Start the game loop
    let game_loop_state = Arc::clone(&game_state);
    tokio::spawn(async move {
        run_game_loop(game_loop_state).await;
    });

    let max_connections = config.server.max_connections;

    loop {
        let (stream, addr) = listener.accept().await?;

        if game_state.read().await.sessions.len() >= max_connections {
            warn!("Connection rejected (limit reached): {}", addr);
            continue;
        }

        let game_state = Arc::clone(&game_state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, game_state).await {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let session = {
        let mut state = game_state.write().await;
        state.open_session(addr, tx)
    };

    // Message loop - handle both incoming messages and queued packets
    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let mut state = game_state.write().await;
                        if let Err(e) = state.handle_message(session, text.as_str()) {
                            warn!("Packet error from {}: {}", addr, e);
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!("Packet error from {}: {}", addr, ProtocolError::UnexpectedBinary);
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => {
                        break;
                    }
                    _ => {}
                }
            }
            out = rx.recv() => {
                match out {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            warn!("Failed to send to {}: {}", addr, e);
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    {
        let mut state = game_state.write().await;
        state.close_session(session);
    }

    Ok(())
}
