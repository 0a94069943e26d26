use crate::common::TestServer;

#[tokio::test]
async fn undo_accepted_rolls_the_board_back() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.play(&game_id, "p-black", "black", 2, 2).await;
    let _ = black.recv_kind("gameState").await;
    let _ = white.recv_kind("gameState").await;
    white.play(&game_id, "p-white", "white", 3, 3).await;
    let _ = black.recv_kind("gameState").await;
    let _ = white.recv_kind("gameState").await;

    // Roll back to just after Black's first move (history index 1).
    black.request_undo(&game_id, "p-black", 1).await;
    let _ = black.recv_kind("gameState").await; // undoRequest now pending
    let _ = white.recv_kind("gameState").await;

    white.respond_undo(&game_id, "p-white", true, 1).await;

    let state = black.recv_kind("gameState").await;
    assert_eq!(state["status"], "playing");
    assert!(state["undoRequest"].is_null());
    assert_eq!(state["currentTurn"], "white");
    let stones = state["board"]["stones"].as_array().unwrap();
    assert_eq!(stones.len(), 1);
    assert_eq!(stones[0]["position"]["x"], 2);
    assert_eq!(stones[0]["position"]["y"], 2);
    assert_eq!(state["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn undo_rejected_leaves_the_board_untouched() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.play(&game_id, "p-black", "black", 2, 2).await;
    let _ = black.recv_kind("gameState").await;
    let _ = white.recv_kind("gameState").await;

    black.request_undo(&game_id, "p-black", 0).await;
    let _ = black.recv_kind("gameState").await; // undoRequest now pending
    let _ = white.recv_kind("gameState").await;

    white.respond_undo(&game_id, "p-white", false, 0).await;

    let state = black.recv_kind("gameState").await;
    assert!(state["undoRequest"].is_null());
    let stones = state["board"]["stones"].as_array().unwrap();
    assert_eq!(stones.len(), 1, "the declined move stays on the board");
    assert_eq!(state["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn a_second_undo_request_is_rejected_while_one_is_pending() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.play(&game_id, "p-black", "black", 2, 2).await;
    let _ = black.recv_kind("gameState").await;
    let _ = white.recv_kind("gameState").await;

    black.request_undo(&game_id, "p-black", 0).await;
    black.request_undo(&game_id, "p-black", 0).await;

    let err = black.recv_kind("error").await;
    assert_eq!(err["errorKind"], "WrongPhase");
}
