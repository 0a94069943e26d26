use crate::common::TestServer;

#[tokio::test]
async fn create_and_join_status_transitions() {
    let server = TestServer::start().await;

    let mut black = server.connect().await;
    let game_id =
        black.create_game(serde_json::json!({"boardSize": 9, "username": "black"}), "p-black").await;
    let state = black.recv_kind("gameState").await;
    assert_eq!(state["status"], "waiting");

    let mut white = server.connect().await;
    let joined = white.join_game(&game_id, "p-white", "white", false, false).await;
    assert_eq!(joined["status"], "playing");
    assert_eq!(joined["currentTurn"], "black");
}

#[tokio::test]
async fn third_joiner_becomes_a_spectator_when_opting_in() {
    let server = TestServer::start().await;
    let (game_id, mut black, _white) = server.new_even_game().await;

    let mut onlooker = server.connect().await;
    let joined = onlooker.join_game(&game_id, "p-watch", "watcher", true, false).await;
    assert_eq!(joined["status"], "playing");

    let player_joined = black.recv_kind("playerJoined").await;
    assert_eq!(player_joined["playerId"], "p-watch");
}

#[tokio::test]
async fn explicit_spectator_never_occupies_a_player_slot() {
    let server = TestServer::start().await;
    let server_game = server.new_even_game().await;
    let (game_id, mut black, _white) = server_game;

    let mut onlooker = server.connect().await;
    onlooker.join_game(&game_id, "p-watch", "watcher", true, false).await;
    let _ = black.recv_kind("playerJoined").await;

    black.request_sync(&game_id, "p-black").await;
    let sync = black.recv_kind("syncGameState").await;
    assert_eq!(sync["players"].as_array().unwrap().len(), 2);
    assert_eq!(sync["spectators"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn join_by_human_readable_code_resolves_to_the_same_game() {
    let server = TestServer::start().await;

    let mut black = server.connect().await;
    black.create_game(serde_json::json!({"boardSize": 9, "username": "black"}), "p-black").await;
    let state = black.recv_kind("gameState").await;
    let code = state["code"].as_str().expect("code").to_string();
    let real_id = state["id"].as_str().expect("id").to_string();

    let mut white = server.connect().await;
    let joined = white.join_game(&code, "p-white", "white", false, false).await;
    assert_eq!(joined["status"], "playing");
    assert_eq!(joined["gameId"], real_id);

    // Events for the resolved game still reach the first player's socket.
    let player_joined = black.recv_kind("playerJoined").await;
    assert_eq!(player_joined["playerId"], "p-white");
}

#[tokio::test]
async fn joining_unknown_game_id_is_an_error() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;
    client
        .send(serde_json::json!({
            "action": "joinGame",
            "gameId": "does-not-exist",
            "playerId": "p-ghost",
            "username": "ghost",
            "asSpectator": false,
            "isReconnect": false,
        }))
        .await;
    let err = client.recv_kind("error").await;
    assert_eq!(err["errorKind"], "UnknownGame");
}

#[tokio::test]
async fn handicap_game_seeds_hoshi_stones_and_reduces_komi() {
    let server = TestServer::start().await;

    let mut black = server.connect().await;
    let game_id = black
        .create_game(
            serde_json::json!({
                "boardSize": 19,
                "username": "black",
                "gameType": "handicap",
                "handicap": 4,
                "scoringRule": "japanese",
            }),
            "p-black",
        )
        .await;
    let state = black.recv_kind("gameState").await;

    assert_eq!(state["currentTurn"], "white");
    assert_eq!(state["komi"], 0.5);
    assert!(state["history"].as_array().unwrap().is_empty());

    let stones = state["board"]["stones"].as_array().unwrap();
    assert_eq!(stones.len(), 4);
    let expected = [(3u8, 3u8), (15, 3), (3, 15), (15, 15)];
    for (x, y) in expected {
        let at = stones
            .iter()
            .find(|s| s["position"]["x"] == x && s["position"]["y"] == y)
            .unwrap_or_else(|| panic!("missing handicap stone at ({x},{y})"));
        assert_eq!(at["color"], "black");
    }

    let _ = game_id;
}

#[tokio::test]
async fn third_player_join_attempt_is_rejected_as_game_full() {
    let server = TestServer::start().await;
    let (game_id, _black, _white) = server.new_even_game().await;

    // A third distinct player id, not opting into spectating, is bounced
    // with GameFull rather than silently seated as a spectator.
    let mut third = server.connect().await;
    third
        .send(serde_json::json!({
            "action": "joinGame",
            "gameId": game_id,
            "playerId": "p-third",
            "username": "third",
            "asSpectator": false,
            "isReconnect": false,
        }))
        .await;
    let err = third.recv_kind("error").await;
    assert_eq!(err["errorKind"], "GameFull");
}
