#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use seki_web::store::{InMemoryStore, SessionStore};
use seki_web::ws::presence::UserPresence;

/// A running server bound to an ephemeral port, backed by a fresh
/// in-memory session store. Each test gets its own instance.
pub struct TestServer {
    addr: SocketAddr,
}

impl TestServer {
    pub async fn start() -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(InMemoryStore::new());
        // Short grace period so disconnect tests don't sit around for minutes.
        let presence = UserPresence::with_grace_period(Duration::from_millis(150));
        let (app, _state) = seki_web::build_router_with_presence(store, presence);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        // Give the listener a beat to start accepting.
        tokio::time::sleep(Duration::from_millis(20)).await;

        TestServer { addr }
    }

    pub async fn connect(&self) -> WsClient {
        let url = format!("ws://{}/ws", self.addr);
        let (stream, _) = connect_async(url).await.expect("ws connect");
        WsClient { stream }
    }

    /// Create a 9x9 even game and join a second player as White.
    /// Returns (game_id, black client, white client), with both clients
    /// drained of the setup frames so the next `recv` on either is the
    /// first frame produced by the test itself.
    pub async fn new_even_game(&self) -> (String, WsClient, WsClient) {
        self.new_even_game_with(json!({})).await
    }

    /// Same as [`Self::new_even_game`], merging `extra` fields into the
    /// `createGame` payload (e.g. `{"scoringRule": "chinese"}`).
    pub async fn new_even_game_with(&self, extra: Value) -> (String, WsClient, WsClient) {
        let mut black = self.connect().await;
        let mut payload = json!({"boardSize": 9, "username": "black"});
        merge(&mut payload, extra);
        let game_id = black.create_game(payload, "p-black").await;
        let _ = black.recv_kind("gameState").await;

        let mut white = self.connect().await;
        white.join_game(&game_id, "p-white", "white", false, false).await;
        let _ = black.recv_kind("playerJoined").await;
        let _ = black.recv_kind("gameState").await;

        (game_id, black, white)
    }
}

fn merge(base: &mut Value, extra: Value) {
    if let Some(obj) = extra.as_object() {
        for (k, v) in obj {
            base[k] = v.clone();
        }
    }
}

pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn send(&mut self, value: Value) {
        self.stream.send(Message::Text(value.to_string().into())).await.expect("send");
    }

    /// Receive and decode the next text frame.
    pub async fn recv(&mut self) -> Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(2), self.stream.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("stream closed")
                .expect("ws transport error");
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).expect("frame was not valid json");
            }
        }
    }

    /// Receive frames, skipping any whose `kind` doesn't match, until one does.
    pub async fn recv_kind(&mut self, kind: &str) -> Value {
        for _ in 0..25 {
            let v = self.recv().await;
            if v.get("kind").and_then(Value::as_str) == Some(kind) {
                return v;
            }
        }
        panic!("never received a '{kind}' frame");
    }

    pub async fn create_game(&mut self, game_state: Value, player_id: &str) -> String {
        self.send(json!({"action": "createGame", "gameState": game_state, "playerId": player_id})).await;
        let created = self.recv_kind("gameCreated").await;
        created["gameId"].as_str().expect("gameId").to_string()
    }

    pub async fn join_game(
        &mut self,
        game_id: &str,
        player_id: &str,
        username: &str,
        as_spectator: bool,
        is_reconnect: bool,
    ) -> Value {
        self.send(json!({
            "action": "joinGame",
            "gameId": game_id,
            "playerId": player_id,
            "username": username,
            "asSpectator": as_spectator,
            "isReconnect": is_reconnect,
        }))
        .await;
        self.recv_kind("joinedGame").await
    }

    pub async fn play(&mut self, game_id: &str, player_id: &str, color: &str, x: u8, y: u8) {
        self.send(json!({
            "action": "makeMove",
            "gameId": game_id,
            "playerId": player_id,
            "color": color,
            "position": {"x": x, "y": y},
        }))
        .await;
    }

    pub async fn pass(&mut self, game_id: &str, player_id: &str, color: &str) {
        self.send(json!({
            "action": "passTurn",
            "gameId": game_id,
            "playerId": player_id,
            "color": color,
            "endGame": false,
        }))
        .await;
    }

    pub async fn resign(&mut self, game_id: &str, player_id: &str, color: &str) {
        self.send(json!({"action": "resignGame", "gameId": game_id, "playerId": player_id, "color": color})).await;
    }

    pub async fn toggle_dead_stone(&mut self, game_id: &str, player_id: &str, x: u8, y: u8) {
        self.send(json!({
            "action": "toggleDeadStone",
            "gameId": game_id,
            "playerId": player_id,
            "position": {"x": x, "y": y},
        }))
        .await;
    }

    pub async fn confirm_score(&mut self, game_id: &str, winner: &str) {
        self.send(json!({
            "action": "gameEnded",
            "gameId": game_id,
            "score": {
                "black": 0.0, "white": 0.0,
                "blackTerritory": 0, "whiteTerritory": 0,
                "blackCaptures": 0, "whiteCaptures": 0,
                "deadBlackStones": 0, "deadWhiteStones": 0,
                "komi": 0.0,
            },
            "winner": winner,
            "territory": {},
        }))
        .await;
    }

    pub async fn cancel_scoring(&mut self, game_id: &str) {
        self.send(json!({"action": "cancelScoring", "gameId": game_id})).await;
    }

    pub async fn request_undo(&mut self, game_id: &str, player_id: &str, move_index: usize) {
        self.send(json!({
            "action": "requestUndo",
            "gameId": game_id,
            "playerId": player_id,
            "moveIndex": move_index,
        }))
        .await;
    }

    pub async fn respond_undo(&mut self, game_id: &str, player_id: &str, accepted: bool, move_index: usize) {
        self.send(json!({
            "action": "respondToUndoRequest",
            "gameId": game_id,
            "playerId": player_id,
            "accepted": accepted,
            "moveIndex": move_index,
        }))
        .await;
    }

    pub async fn chat(&mut self, game_id: &str, player_id: &str, username: &str, message: &str) {
        self.send(json!({
            "action": "chatMessage",
            "gameId": game_id,
            "playerId": player_id,
            "username": username,
            "message": message,
        }))
        .await;
    }

    pub async fn request_sync(&mut self, game_id: &str, player_id: &str) {
        self.send(json!({"action": "requestSync", "gameId": game_id, "playerId": player_id})).await;
    }

    pub async fn leave(&mut self, game_id: &str, player_id: &str) {
        self.send(json!({"action": "leaveGame", "gameId": game_id, "playerId": player_id})).await;
    }

    pub async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
