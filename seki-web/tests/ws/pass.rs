use crate::common::TestServer;

#[tokio::test]
async fn single_pass_flips_the_turn_without_entering_scoring() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.pass(&game_id, "p-black", "black").await;
    let state_b = black.recv_kind("gameState").await;
    let state_w = white.recv_kind("gameState").await;

    assert_eq!(state_b["currentTurn"], "white");
    assert_eq!(state_b["status"], "playing");
    assert_eq!(state_w["status"], "playing");
}

#[tokio::test]
async fn two_consecutive_passes_enter_scoring_with_dead_stones_seeded() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.pass(&game_id, "p-black", "black").await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    white.pass(&game_id, "p-white", "white").await;
    let _ = black.recv_kind("scoringPhaseStarted").await;
    let state_b = black.recv_kind("gameState").await;
    let _ = white.recv_kind("scoringPhaseStarted").await;
    let state_w = white.recv_kind("gameState").await;

    assert_eq!(state_b["status"], "scoring");
    assert_eq!(state_w["status"], "scoring");
}

#[tokio::test]
async fn a_move_in_between_resets_the_pass_counter() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.pass(&game_id, "p-black", "black").await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    white.play(&game_id, "p-white", "white", 4, 4).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    black.pass(&game_id, "p-black", "black").await;
    let state_b = black.recv_kind("gameState").await;
    let state_w = white.recv_kind("gameState").await;

    assert_eq!(state_b["status"], "playing", "non-consecutive passes should not trigger scoring");
    assert_eq!(state_w["currentTurn"], "white");
}

#[tokio::test]
async fn passing_out_of_turn_is_rejected() {
    let server = TestServer::start().await;
    let (game_id, _black, mut white) = server.new_even_game().await;

    white.pass(&game_id, "p-white", "white").await;
    let err = white.recv_kind("error").await;
    assert_eq!(err["errorKind"], "NotYourTurn");
}
