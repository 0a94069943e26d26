//! An abstract key/value + pub/sub layer the session engine reads and
//! mutates `GameState` through. No SQL; every entry is a JSON blob with a
//! TTL, refreshed on every write so idle games expire on their own.
//!
//! Two implementations: [`InMemoryStore`] (an in-process room map, used
//! for dev/test) and [`RedisStore`] (production, a single shared instance
//! across server processes so a session's state and its pub/sub channel
//! are reachable from any instance a client's websocket happens to land on).

mod memory;
mod redis_store;

pub use memory::InMemoryStore;
pub use redis_store::RedisStore;

use async_trait::async_trait;

use crate::error::AppError;
use crate::model::{GameId, GameState};

/// How long an idle game's state survives before the store reclaims it.
/// Refreshed on every `set_game` call.
pub const GAME_TTL_SECS: u64 = 24 * 60 * 60;

/// How long a join code resolves to its game id before expiring alongside it.
pub const CODE_TTL_SECS: u64 = GAME_TTL_SECS;

#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn get_game(&self, id: &GameId) -> Result<Option<GameState>, AppError>;
    async fn set_game(&self, state: &GameState) -> Result<(), AppError>;
    async fn del_game(&self, id: &GameId) -> Result<(), AppError>;

    /// Resolve a human join code to the game id it was minted for.
    async fn get_game_id_by_code(&self, code: &str) -> Result<Option<GameId>, AppError>;
    async fn set_code(&self, code: &str, id: &GameId) -> Result<(), AppError>;
    async fn del_code(&self, code: &str) -> Result<(), AppError>;

    /// Resolve a connection's opaque socket id to the game it last joined.
    /// Lets any instance recognize a still-TTL-live socket without relying
    /// on the client to resend `gameId` first (every wire command already
    /// does, so nothing else in the engine depends on this).
    async fn get_socket_game(&self, socket_id: &str) -> Result<Option<GameId>, AppError>;
    async fn set_socket_game(&self, socket_id: &str, id: &GameId) -> Result<(), AppError>;
    async fn del_socket_game(&self, socket_id: &str) -> Result<(), AppError>;

    /// Publish an event payload to every instance subscribed to a game's
    /// channel (cross-instance fan-out).
    async fn publish(&self, game_id: &GameId, payload: &str) -> Result<(), AppError>;

    /// Subscribe to a game's channel, returning a receiver fed by a
    /// background forwarding task. Dropping the receiver unsubscribes.
    async fn subscribe(&self, game_id: &GameId) -> Result<tokio::sync::mpsc::UnboundedReceiver<String>, AppError>;
}
