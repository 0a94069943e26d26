use crate::common::TestServer;

#[tokio::test]
async fn black_resigning_hands_white_the_win() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.play(&game_id, "p-black", "black", 0, 0).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    black.resign(&game_id, "p-black", "black").await;

    let _ = black.recv_kind("playerResigned").await;
    let state_b = black.recv_kind("gameState").await;
    assert_eq!(state_b["status"], "finished");
    assert_eq!(state_b["winner"], "white");
    assert_eq!(state_b["result"], "W+R");

    let state_w = white.recv_kind("gameState").await;
    assert_eq!(state_w["winner"], "white");
}

#[tokio::test]
async fn white_resigning_hands_black_the_win() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.play(&game_id, "p-black", "black", 0, 0).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    white.resign(&game_id, "p-white", "white").await;

    let state_b = black.recv_kind("gameState").await;
    assert_eq!(state_b["winner"], "black");
    assert_eq!(state_b["result"], "B+R");
}

#[tokio::test]
async fn resigning_is_allowed_even_on_the_opponents_turn() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.play(&game_id, "p-black", "black", 0, 0).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    // It's White's turn; White resigns immediately, which must still work.
    white.resign(&game_id, "p-white", "white").await;

    let state_b = black.recv_kind("gameState").await;
    assert_eq!(state_b["status"], "finished");
    assert_eq!(state_b["winner"], "black");
}

#[tokio::test]
async fn resigning_a_finished_game_is_rejected() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.resign(&game_id, "p-black", "black").await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    white.resign(&game_id, "p-white", "white").await;
    let err = white.recv_kind("error").await;
    assert_eq!(err["errorKind"], "WrongPhase");
}
