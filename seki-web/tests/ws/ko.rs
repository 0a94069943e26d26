use crate::common::{TestServer, WsClient};

/// Build a ko shape in the top-left corner of a 9x9 board:
///
/// ```text
///      c0  c1  c2  c3
/// r0:   .   B   W   .
/// r1:   B   W   .   W
/// r2:   .   B   W   .
/// ```
///
/// Move sequence (alternating, Black first):
///  1. B(1,0)  2. W(2,0)  3. B(0,1)  4. W(1,1)
///  5. B(1,2)  6. W(3,1)  7. B(8,8)  8. W(2,2)
///
/// Then Black plays (2,1), capturing White's lone stone at (1,1) and
/// opening a ko there, illegal for White to immediately retake.
async fn setup_ko(game_id: &str, black: &mut WsClient, white: &mut WsClient) {
    let moves: &[(bool, u8, u8)] = &[
        (true, 1, 0),
        (false, 2, 0),
        (true, 0, 1),
        (false, 1, 1),
        (true, 1, 2),
        (false, 3, 1),
        (true, 8, 8),
        (false, 2, 2),
    ];
    for &(is_black, x, y) in moves {
        if is_black {
            black.play(game_id, "p-black", "black", x, y).await;
        } else {
            white.play(game_id, "p-white", "white", x, y).await;
        }
        black.recv_kind("gameState").await;
        white.recv_kind("gameState").await;
    }
}

#[tokio::test]
async fn immediate_recapture_at_the_ko_point_is_blocked() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;
    setup_ko(&game_id, &mut black, &mut white).await;

    black.play(&game_id, "p-black", "black", 2, 1).await;
    let state = black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    let ko = &state["koPosition"];
    assert!(!ko.is_null(), "ko should be set after the capturing move");
    assert_eq!(ko["x"], 1);
    assert_eq!(ko["y"], 1);

    white.play(&game_id, "p-white", "white", 1, 1).await;
    let err = white.recv_kind("error").await;
    assert_eq!(err["errorKind"], "KoViolation");
}

#[tokio::test]
async fn ko_clears_after_an_intervening_move_each_way() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;
    setup_ko(&game_id, &mut black, &mut white).await;

    black.play(&game_id, "p-black", "black", 2, 1).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    // Ko threat elsewhere, then Black responds elsewhere too.
    white.play(&game_id, "p-white", "white", 7, 7).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    black.play(&game_id, "p-black", "black", 6, 6).await;
    black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    // White may now retake (1,1).
    white.play(&game_id, "p-white", "white", 1, 1).await;
    let state = black.recv_kind("gameState").await;
    white.recv_kind("gameState").await;

    let stone = state["board"]["stones"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["position"]["x"] == 1 && s["position"]["y"] == 1)
        .expect("white stone should now sit at (1,1)");
    assert_eq!(stone["color"], "white");
    assert!(state["koPosition"].is_null(), "ko should have cleared");
}
