use crate::common::TestServer;

#[tokio::test]
async fn smoke_create_and_join() {
    let server = TestServer::start().await;
    let (_game_id, _black, _white) = server.new_even_game().await;
}

#[tokio::test]
async fn create_game_reports_waiting_status_until_second_player_joins() {
    let server = TestServer::start().await;
    let mut black = server.connect().await;
    let game_id = black.create_game(serde_json::json!({"boardSize": 9, "username": "black"}), "p-black").await;

    let state = black.recv_kind("gameState").await;
    assert_eq!(state["status"], "waiting");
    assert_eq!(state["board"]["size"], 9);
    assert_eq!(state["currentTurn"], "black");

    let mut white = server.connect().await;
    let joined = white.join_game(&game_id, "p-white", "white", false, false).await;
    assert_eq!(joined["status"], "playing");
    assert_eq!(joined["numPlayers"], 2);
}
