use serde_json::json;

use crate::common::TestServer;

#[tokio::test]
async fn disconnect_does_not_forfeit_a_clockless_game() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    white.close().await;
    let disconnected = black.recv_kind("playerDisconnected").await;
    assert_eq!(disconnected["playerId"], "p-white");

    // The game has no time control, so losing a connection is never
    // terminal by itself — play continues once the opponent reconnects.
    black.play(&game_id, "p-black", "black", 4, 4).await;
    let state = black.recv_kind("gameState").await;
    assert_eq!(state["status"], "playing");
    assert_eq!(state["currentTurn"], "white");
}

#[tokio::test]
async fn reconnect_preserves_clock_state() {
    let server = TestServer::start().await;
    let extra = json!({
        "timeControl": {
            "timeControl": 5.0,
            "byoYomiPeriods": 3,
            "byoYomiTime": 30.0,
            "timePerMove": 0.0,
            "fischerTime": 0.0,
        },
    });
    let (game_id, mut black, mut white) = server.new_even_game_with(extra).await;

    white.close().await;
    let _ = black.recv_kind("playerDisconnected").await;

    let mut white2 = server.connect().await;
    let joined = white2.join_game(&game_id, "p-white", "white", false, true).await;
    assert_eq!(joined["success"], true);
    assert_eq!(joined["status"], "playing");

    white2.request_sync(&game_id, "p-white").await;
    let synced = white2.recv_kind("syncGameState").await;
    let players = synced["players"].as_array().expect("players array");
    let white_player = players
        .iter()
        .find(|p| p["id"] == "p-white")
        .expect("white player present after reconnect");
    assert_eq!(white_player["timeRemaining"], 300.0);
    assert_eq!(white_player["byoYomiPeriodsLeft"], 3);

    let _ = game_id;
}

#[tokio::test]
async fn leaving_removes_the_player_from_the_roster() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    white.leave(&game_id, "p-white").await;
    let left = black.recv_kind("playerLeft").await;
    assert_eq!(left["playerId"], "p-white");

    black.request_sync(&game_id, "p-black").await;
    let state = black.recv_kind("syncGameState").await;
    let players = state["players"].as_array().unwrap();
    assert!(players.iter().all(|p| p["id"] != "p-white"));
    let _ = white;
}
