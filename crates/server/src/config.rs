//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rooms: RoomsConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load configuration from `path`, writing the defaults there if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the game cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.rooms.count > 0, "rooms.count must be at least 1");
        anyhow::ensure!(self.rooms.max_players > 0, "rooms.max_players must be at least 1");
        anyhow::ensure!(self.rooms.match_duration_ms > 0, "rooms.match_duration_ms must be positive");
        anyhow::ensure!(self.world.chunks_per_axis > 0, "world.chunks_per_axis must be at least 1");
        anyhow::ensure!(
            self.world.width > 0.0 && self.world.height > 0.0,
            "world.width and world.height must be positive"
        );
        anyhow::ensure!(
            self.server.tick_interval_ms > 0 && self.server.clock_interval_ms > 0,
            "server intervals must be positive"
        );
        anyhow::ensure!(self.food.radius > 0.0, "food.radius must be positive");
        anyhow::ensure!(self.player.initial_size > 0.0, "player.initial_size must be positive");
        Ok(())
    }
}

/// Server networking and scheduling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Broadcast (tick) interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Match clock interval in milliseconds.
    #[serde(default = "default_clock_interval")]
    pub clock_interval_ms: u64,
    /// Largest inbound text frame accepted, in bytes.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            tick_interval_ms: default_tick_interval(),
            clock_interval_ms: default_clock_interval(),
            max_message_len: default_max_message_len(),
        }
    }
}

impl ServerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.clock_interval_ms)
    }
}

fn default_port() -> u16 {
    16000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    500
}
fn default_tick_interval() -> u64 {
    100
}
fn default_clock_interval() -> u64 {
    1000
}
fn default_max_message_len() -> usize {
    4096
}

/// Room and match settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoomsConfig {
    /// Number of rooms created at startup.
    #[serde(default = "default_room_count")]
    pub count: usize,
    /// Players per room.
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    /// Match length in milliseconds.
    #[serde(default = "default_match_duration")]
    pub match_duration_ms: u64,
    /// Delay between game over and the room reset, in milliseconds.
    #[serde(default = "default_reset_delay")]
    pub reset_delay_ms: u64,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            count: default_room_count(),
            max_players: default_max_players(),
            match_duration_ms: default_match_duration(),
            reset_delay_ms: default_reset_delay(),
        }
    }
}

impl RoomsConfig {
    pub fn match_duration(&self) -> Duration {
        Duration::from_millis(self.match_duration_ms)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }
}

fn default_room_count() -> usize {
    1
}
fn default_max_players() -> usize {
    100
}
fn default_match_duration() -> u64 {
    30_000
}
fn default_reset_delay() -> u64 {
    10_000
}

/// World geometry.
///
/// `width` and `height` are half-extents: the world spans
/// `[-width, width] x [-height, height]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_extent")]
    pub width: f32,
    #[serde(default = "default_world_extent")]
    pub height: f32,
    /// Grid resolution (N for an N x N grid of chunks).
    #[serde(default = "default_chunks_per_axis")]
    pub chunks_per_axis: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_world_extent(),
            height: default_world_extent(),
            chunks_per_axis: default_chunks_per_axis(),
        }
    }
}

fn default_world_extent() -> f32 {
    10_000.0
}
fn default_chunks_per_axis() -> usize {
    16
}

/// Food configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    /// Target food population per room.
    #[serde(default = "default_food_max_amount")]
    pub max_amount: usize,
    #[serde(default = "default_food_radius")]
    pub radius: f32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            max_amount: default_food_max_amount(),
            radius: default_food_radius(),
        }
    }
}

fn default_food_max_amount() -> usize {
    40_000
}
fn default_food_radius() -> f32 {
    10.0
}

/// Player configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_initial_size")]
    pub initial_size: f32,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_size: default_initial_size(),
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_initial_size() -> f32 {
    60.0
}
fn default_max_name_length() -> usize {
    30
}
