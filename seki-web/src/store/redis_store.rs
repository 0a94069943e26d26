use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{SessionStore, CODE_TTL_SECS, GAME_TTL_SECS};
use crate::error::AppError;
use crate::model::{GameId, GameState};

/// Production `SessionStore`. Backed by a single shared Redis instance so
/// any server process can serve any client regardless of which process
/// accepted its websocket: state lives in Redis keys, events cross
/// instances over Redis pub/sub.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    client: redis::Client,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(url).map_err(|e| AppError::Store(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        Ok(RedisStore { conn, client })
    }

    fn channel_key(game_id: &GameId) -> String {
        format!("game:{}:events", game_id.0)
    }

    fn code_key(code: &str) -> String {
        format!("code:{}", code.to_uppercase())
    }

    fn socket_key(socket_id: &str) -> String {
        format!("socket:{socket_id}")
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get_game(&self, id: &GameId) -> Result<Option<GameState>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(id.store_key())
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| AppError::Store(e.to_string())),
            None => Ok(None),
        }
    }

    async fn set_game(&self, state: &GameState) -> Result<(), AppError> {
        let json = serde_json::to_string(state).map_err(|e| AppError::Store(e.to_string()))?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(state.id.store_key(), json, GAME_TTL_SECS)
            .await
            .map_err(|e| AppError::Store(e.to_string()))
    }

    async fn del_game(&self, id: &GameId) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(id.store_key())
            .await
            .map_err(|e| AppError::Store(e.to_string()))
    }

    async fn get_game_id_by_code(&self, code: &str) -> Result<Option<GameId>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(Self::code_key(code))
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        Ok(raw.map(GameId))
    }

    async fn set_code(&self, code: &str, id: &GameId) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(Self::code_key(code), id.0.clone(), CODE_TTL_SECS)
            .await
            .map_err(|e| AppError::Store(e.to_string()))
    }

    async fn del_code(&self, code: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(Self::code_key(code))
            .await
            .map_err(|e| AppError::Store(e.to_string()))
    }

    async fn get_socket_game(&self, socket_id: &str) -> Result<Option<GameId>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(Self::socket_key(socket_id))
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        Ok(raw.map(GameId))
    }

    async fn set_socket_game(&self, socket_id: &str, id: &GameId) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(Self::socket_key(socket_id), id.0.clone(), GAME_TTL_SECS)
            .await
            .map_err(|e| AppError::Store(e.to_string()))
    }

    async fn del_socket_game(&self, socket_id: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(Self::socket_key(socket_id))
            .await
            .map_err(|e| AppError::Store(e.to_string()))
    }

    async fn publish(&self, game_id: &GameId, payload: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(Self::channel_key(game_id), payload)
            .await
            .map_err(|e| AppError::Store(e.to_string()))
    }

    async fn subscribe(
        &self,
        game_id: &GameId,
    ) -> Result<tokio::sync::mpsc::UnboundedReceiver<String>, AppError> {
        use futures_util::StreamExt;

        let client = self.client.clone();
        let key = Self::channel_key(game_id);
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            let pubsub = match client.get_async_pubsub().await {
                Ok(p) => p,
                Err(_) => return,
            };
            let mut pubsub = pubsub;
            if pubsub.subscribe(&key).await.is_err() {
                return;
            }
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                if tx.send(payload).is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}
