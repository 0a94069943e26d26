use crate::common::TestServer;

/// Two consecutive passes on an empty board: no territory for either side,
/// so the only points on the table are White's komi.
#[tokio::test]
async fn double_pass_on_an_empty_board_scores_by_komi_alone() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.pass(&game_id, "p-black", "black").await;
    let _ = black.recv_kind("gameState").await;
    let _ = white.recv_kind("gameState").await;

    white.pass(&game_id, "p-white", "white").await;
    let _ = black.recv_kind("scoringPhaseStarted").await;
    let scoring_state = black.recv_kind("gameState").await;
    assert_eq!(scoring_state["status"], "scoring");

    black.confirm_score(&game_id, "white").await;
    let finished = black.recv_kind("gameFinished").await;
    assert_eq!(finished["winner"], "white");
    assert_eq!(finished["result"], "W+6.5");

    let state = white.recv_kind("gameState").await;
    assert_eq!(state["status"], "finished");
    assert_eq!(state["score"]["komi"], 6.5);
    assert_eq!(state["score"]["blackTerritory"], 0);
    assert_eq!(state["score"]["whiteTerritory"], 0);
}

#[tokio::test]
async fn toggling_a_dead_stone_broadcasts_the_toggle() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.play(&game_id, "p-black", "black", 0, 0).await;
    let _ = black.recv_kind("gameState").await;
    let _ = white.recv_kind("gameState").await;
    white.play(&game_id, "p-white", "white", 8, 8).await;
    let _ = black.recv_kind("gameState").await;
    let _ = white.recv_kind("gameState").await;

    black.pass(&game_id, "p-black", "black").await;
    let _ = black.recv_kind("gameState").await;
    let _ = white.recv_kind("gameState").await;
    white.pass(&game_id, "p-white", "white").await;
    let _ = black.recv_kind("scoringPhaseStarted").await;
    let _ = black.recv_kind("gameState").await;
    let _ = white.recv_kind("scoringPhaseStarted").await;
    let _ = white.recv_kind("gameState").await;

    black.toggle_dead_stone(&game_id, "p-black", 8, 8).await;
    let toggled = black.recv_kind("deadStoneToggled").await;
    assert_eq!(toggled["position"]["x"], 8);
    assert_eq!(toggled["position"]["y"], 8);

    let state = white.recv_kind("gameState").await;
    let dead: Vec<_> = state["deadStones"].as_array().unwrap().to_vec();
    assert!(dead.iter().any(|p| p["x"] == 8 && p["y"] == 8));
}

#[tokio::test]
async fn cancel_scoring_reopens_the_game_for_play() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.pass(&game_id, "p-black", "black").await;
    let _ = black.recv_kind("gameState").await;
    let _ = white.recv_kind("gameState").await;
    white.pass(&game_id, "p-white", "white").await;
    let _ = black.recv_kind("scoringPhaseStarted").await;
    let _ = black.recv_kind("gameState").await;
    let _ = white.recv_kind("scoringPhaseStarted").await;
    let _ = white.recv_kind("gameState").await;

    black.cancel_scoring(&game_id).await;
    let _ = black.recv_kind("scoringCanceled").await;
    let state = black.recv_kind("gameState").await;
    assert_eq!(state["status"], "playing");
    assert_eq!(state["deadStones"].as_array().unwrap().len(), 0);

    // Play resumes normally: the turn sits with White after the pass pair
    // (passing doesn't hand the turn back), and a real move breaks the
    // pass streak so a single subsequent pass doesn't immediately reopen
    // scoring.
    assert_eq!(state["currentTurn"], "white");
    white.play(&game_id, "p-white", "white", 2, 2).await;
    let after_move = black.recv_kind("gameState").await;
    assert_eq!(after_move["status"], "playing");
    let _ = white.recv_kind("gameState").await;
}
