use crate::common::TestServer;
use serde_json::Value;

fn stone_color_at(state: &Value, x: u8, y: u8) -> Option<String> {
    state["board"]["stones"].as_array()?.iter().find_map(|s| {
        if s["position"]["x"] == x && s["position"]["y"] == y {
            s["color"].as_str().map(str::to_string)
        } else {
            None
        }
    })
}

#[tokio::test]
async fn legal_move_flips_the_turn_and_places_a_stone() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.play(&game_id, "p-black", "black", 3, 3).await;
    let _move_made = black.recv_kind("moveMade").await;
    let state_b = black.recv_kind("gameState").await;
    let state_w = white.recv_kind("gameState").await;

    assert_eq!(stone_color_at(&state_b, 3, 3).as_deref(), Some("black"));
    assert_eq!(state_b["currentTurn"], "white");
    assert_eq!(stone_color_at(&state_w, 3, 3).as_deref(), Some("black"));
}

#[tokio::test]
async fn capture_removes_the_surrounded_stone_and_counts_it() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    // B(1,0), W(0,0), B(0,1) captures W(0,0).
    black.play(&game_id, "p-black", "black", 1, 0).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    white.play(&game_id, "p-white", "white", 0, 0).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    black.play(&game_id, "p-black", "black", 0, 1).await;
    let state_b = black.recv_kind("gameState").await;
    let state_w = white.recv_kind("gameState").await;

    assert!(stone_color_at(&state_b, 0, 0).is_none(), "captured stone should be gone");
    assert_eq!(state_b["capturedStones"]["black"], 1);
    assert_eq!(state_w["capturedStones"]["black"], 1);
}

#[tokio::test]
async fn playing_out_of_turn_is_rejected_and_does_not_reach_the_opponent() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.play(&game_id, "p-black", "black", 3, 3).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    // It's White's turn now; Black tries again.
    black.play(&game_id, "p-black", "black", 4, 4).await;
    let err = black.recv_kind("error").await;
    assert_eq!(err["errorKind"], "NotYourTurn");

    // White's own move still goes through cleanly afterwards.
    white.play(&game_id, "p-white", "white", 5, 5).await;
    let state_w = white.recv_kind("gameState").await;
    assert_eq!(state_w["currentTurn"], "black");
}

#[tokio::test]
async fn playing_on_an_occupied_point_is_rejected() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.play(&game_id, "p-black", "black", 3, 3).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    white.play(&game_id, "p-white", "white", 3, 3).await;
    let err = white.recv_kind("error").await;
    assert_eq!(err["errorKind"], "Occupied");
}

#[tokio::test]
async fn suicide_move_is_rejected() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    // B(1,0), W(5,5) throwaway, B(0,1). Now (0,0) is surrounded by Black
    // with no captures available to White.
    black.play(&game_id, "p-black", "black", 1, 0).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    white.play(&game_id, "p-white", "white", 5, 5).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    black.play(&game_id, "p-black", "black", 0, 1).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    white.play(&game_id, "p-white", "white", 0, 0).await;
    let err = white.recv_kind("error").await;
    assert_eq!(err["errorKind"], "Suicide");
}

#[tokio::test]
async fn playing_as_the_wrong_color_for_your_player_id_is_rejected() {
    let server = TestServer::start().await;
    let (game_id, mut black, _white) = server.new_even_game().await;

    black.play(&game_id, "p-black", "white", 3, 3).await;
    let err = black.recv_kind("error").await;
    assert_eq!(err["errorKind"], "UnauthorizedForColor");
}
