//! Local fan-out: which connections on *this* process are in which game's
//! room, and how to reach them. Cross-instance delivery is the session
//! store's job (`SessionStore::publish`/`subscribe`); this registry is only
//! ever consulted for connections accepted by this process.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::model::GameId;

pub type ConnectionId = u64;

#[derive(Default)]
struct Room {
    /// connection -> the player id it authenticated as for this game.
    members: HashMap<ConnectionId, String>,
}

#[derive(Clone, Default)]
pub struct GameRegistry {
    rooms: Arc<RwLock<HashMap<GameId, Room>>>,
    conns: Arc<RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<String>>>>,
    next_id: Arc<AtomicU64>,
    /// Games with an active store-subscription-forwarding task on this
    /// process. Tracked independently of `rooms`, whose entries come and
    /// go with local membership — a room emptying out and refilling within
    /// the purge grace period must not spawn a second forwarder.
    subscribed: Arc<RwLock<HashSet<GameId>>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn register_conn(&self, conn_id: ConnectionId, tx: mpsc::UnboundedSender<String>) {
        self.conns.write().await.insert(conn_id, tx);
    }

    pub async fn unregister_conn(&self, conn_id: ConnectionId) {
        self.conns.write().await.remove(&conn_id);
    }

    pub async fn join(&self, game_id: &GameId, conn_id: ConnectionId, player_id: String) {
        let mut rooms = self.rooms.write().await;
        rooms.entry(game_id.clone()).or_default().members.insert(conn_id, player_id);
    }

    /// Remove a connection from a room, returning the player id it was
    /// joined as (if any) and whether the room is now empty.
    pub async fn leave(&self, game_id: &GameId, conn_id: ConnectionId) -> Option<String> {
        let mut rooms = self.rooms.write().await;
        let player_id = rooms.get_mut(game_id).and_then(|r| r.members.remove(&conn_id));
        if rooms.get(game_id).is_some_and(|r| r.members.is_empty()) {
            rooms.remove(game_id);
        }
        player_id
    }

    /// Whether no connection on this process currently holds the room open.
    /// A room can also be absent entirely (never joined, or already purged),
    /// which counts as empty too.
    pub async fn is_empty(&self, game_id: &GameId) -> bool {
        self.rooms.read().await.get(game_id).is_none_or(|r| r.members.is_empty())
    }

    /// Mark a game's store subscription as active, returning `true` only
    /// the first time this is called for that game so the caller spawns
    /// exactly one forwarding task per game per process.
    pub async fn mark_subscribed(&self, game_id: &GameId) -> bool {
        self.subscribed.write().await.insert(game_id.clone())
    }

    /// Release the forwarding-task bookkeeping for a purged game. The task
    /// itself exits on its own once the store drops its subscription (the
    /// game key being deleted); this just lets a later id reuse (or a
    /// fresh game that somehow shares an id) spawn a forwarder again.
    pub async fn forget_subscription(&self, game_id: &GameId) {
        self.subscribed.write().await.remove(game_id);
    }

    pub async fn send_to_conn(&self, conn_id: ConnectionId, payload: String) {
        if let Some(tx) = self.conns.read().await.get(&conn_id) {
            let _ = tx.send(payload);
        }
    }

    pub async fn send_to_player(&self, game_id: &GameId, player_id: &str, payload: String) {
        let conn_id = {
            let rooms = self.rooms.read().await;
            rooms.get(game_id).and_then(|r| {
                r.members.iter().find(|(_, p)| p.as_str() == player_id).map(|(c, _)| *c)
            })
        };
        if let Some(conn_id) = conn_id {
            self.send_to_conn(conn_id, payload).await;
        }
    }

    /// Deliver a payload (already received from the store's pub/sub, or
    /// produced locally) to every connection this process holds for the room.
    pub async fn broadcast_local(&self, game_id: &GameId, payload: &str) {
        let members: Vec<ConnectionId> = {
            let rooms = self.rooms.read().await;
            rooms.get(game_id).map(|r| r.members.keys().copied().collect()).unwrap_or_default()
        };
        let conns = self.conns.read().await;
        for conn_id in members {
            if let Some(tx) = conns.get(&conn_id) {
                let _ = tx.send(payload.to_string());
            }
        }
    }

    /// Games this process currently has at least one live connection for.
    /// The clock sweep only needs to act on locally-visible games: a game
    /// with no connection anywhere is reclaimed by the store's own TTL
    /// instead of needing a store-wide scan.
    pub async fn active_game_ids(&self) -> Vec<GameId> {
        self.rooms.read().await.keys().cloned().collect()
    }
}
