use std::time::Duration;

use crate::common::TestServer;

/// The harness runs with a 150ms grace period (see `TestServer::start`).
const GRACE: Duration = Duration::from_millis(150);

#[tokio::test]
async fn disconnect_emits_player_disconnected_after_grace_period() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    white.close().await;

    let event = black.recv_kind("playerDisconnected").await;
    assert_eq!(event["playerId"], "p-white");
    let _ = game_id;
}

#[tokio::test]
async fn reconnecting_within_grace_period_suppresses_the_disconnect_event() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    white.close().await;

    // Reconnect well inside the grace window, cancelling the pending timer.
    tokio::time::sleep(GRACE / 3).await;
    let mut white2 = server.connect().await;
    white2.join_game(&game_id, "p-white", "white", false, true).await;

    // Wait past the original grace period: no disconnect should fire.
    tokio::time::sleep(GRACE * 3).await;
    black.chat(&game_id, "p-black", "black", "still here?").await;
    // Read directly (not recv_kind) so a spurious playerDisconnected frame
    // ahead of the chat would fail the assertion instead of being skipped.
    let next = black.recv().await;
    assert_eq!(next["kind"], "chatMessage");
    assert_eq!(next["message"], "still here?");
}
