//! Arena - game server behind axum, with a status route.

use axum::{
    Json, Router,
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use protocol::ProtocolError;
use server::{GameState, Outbound};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{RwLock, mpsc};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    game_state: Arc<RwLock<GameState>>,
    max_connections: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Arena Server v{}", env!("CARGO_PKG_VERSION"));

    // Load server configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  World: {}x{}", config.world.width, config.world.height);
    info!(
        "  Rooms: {} x {} players, {}s matches",
        config.rooms.count,
        config.rooms.max_players,
        config.rooms.match_duration_ms / 1000
    );

    // Create shared game state
    let game_state = Arc::new(RwLock::new(GameState::new(&config)));

    // Start the game loop
    let game_loop_state = Arc::clone(&game_state);
    tokio::spawn(async move {
        server::run_game_loop(game_loop_state).await;
    });

    let state = AppState {
        game_state,
        max_connections: config.server.max_connections,
    };

    // Build the axum router
    let app = Router::new()
        .route("/", get(websocket_handler))
        .route("/game", get(websocket_handler))
        .route("/stats", get(stats_handler))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Game WebSocket endpoint: ws://{}/game", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Server and room status as JSON.
async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let game = state.game_state.read().await;
    Json(game.stats(Instant::now()))
}

/// Handle WebSocket upgrades for the game
async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    if state.game_state.read().await.sessions.len() >= state.max_connections {
        warn!("Connection rejected (limit reached): {}", addr);
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_game_connection(socket, addr, state.game_state).await {
            error!("Connection error from {}: {}", addr, e);
        }
    })
}

/// Pump one axum WebSocket through the game state.
async fn handle_game_connection(
    socket: WebSocket,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
) -> anyhow::Result<()> {
    info!("New game connection from {}", addr);

    let (mut write, mut read) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let session = {
        let mut state = game_state.write().await;
        state.open_session(addr, tx)
    };

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
