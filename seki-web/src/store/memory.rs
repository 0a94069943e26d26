use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use super::SessionStore;
use crate::error::AppError;
use crate::model::{GameId, GameState};

/// Single-process `SessionStore` backed by an `Arc<RwLock<HashMap<_>>>`.
/// Used for local development and the integration test harness; a process
/// restart loses every game, which is acceptable since dev/test never
/// needs cross-instance delivery.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    games: Arc<RwLock<HashMap<GameId, GameState>>>,
    codes: Arc<RwLock<HashMap<String, GameId>>>,
    sockets: Arc<RwLock<HashMap<String, GameId>>>,
    channels: Arc<RwLock<HashMap<GameId, broadcast::Sender<String>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn channel(&self, id: &GameId) -> broadcast::Sender<String> {
        if let Some(tx) = self.channels.read().await.get(id) {
            return tx.clone();
        }
        let mut channels = self.channels.write().await;
        channels
            .entry(id.clone())
            .or_insert_with(|| broadcast::channel(256).0)
            .clone()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn get_game(&self, id: &GameId) -> Result<Option<GameState>, AppError> {
        Ok(self.games.read().await.get(id).cloned())
    }

    async fn set_game(&self, state: &GameState) -> Result<(), AppError> {
        self.games.write().await.insert(state.id.clone(), state.clone());
        Ok(())
    }

    async fn del_game(&self, id: &GameId) -> Result<(), AppError> {
        self.games.write().await.remove(id);
        self.channels.write().await.remove(id);
        Ok(())
    }

    async fn get_game_id_by_code(&self, code: &str) -> Result<Option<GameId>, AppError> {
        Ok(self.codes.read().await.get(&code.to_uppercase()).cloned())
    }

    async fn set_code(&self, code: &str, id: &GameId) -> Result<(), AppError> {
        self.codes.write().await.insert(code.to_uppercase(), id.clone());
        Ok(())
    }

    async fn del_code(&self, code: &str) -> Result<(), AppError> {
        self.codes.write().await.remove(&code.to_uppercase());
        Ok(())
    }

    async fn get_socket_game(&self, socket_id: &str) -> Result<Option<GameId>, AppError> {
        Ok(self.sockets.read().await.get(socket_id).cloned())
    }

    async fn set_socket_game(&self, socket_id: &str, id: &GameId) -> Result<(), AppError> {
        self.sockets.write().await.insert(socket_id.to_string(), id.clone());
        Ok(())
    }

    async fn del_socket_game(&self, socket_id: &str) -> Result<(), AppError> {
        self.sockets.write().await.remove(socket_id);
        Ok(())
    }

    async fn publish(&self, game_id: &GameId, payload: &str) -> Result<(), AppError> {
        // No subscribers is fine: `send` only errors when the channel has
        // zero receivers, which just means nobody local is listening.
        let _ = self.channel(game_id).await.send(payload.to_string());
        Ok(())
    }

    async fn subscribe(
        &self,
        game_id: &GameId,
    ) -> Result<tokio::sync::mpsc::UnboundedReceiver<String>, AppError> {
        let mut rx = self.channel(game_id).await.subscribe();
        let (tx, forwarded) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok(msg) = rx.recv().await {
                if tx.send(msg).is_err() {
                    break;
                }
            }
        });
        Ok(forwarded)
    }
}
