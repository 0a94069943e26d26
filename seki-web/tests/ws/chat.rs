use crate::common::TestServer;

#[tokio::test]
async fn chat_message_is_broadcast_to_every_participant() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.chat(&game_id, "p-black", "black", "hello there").await;

    let msg_b = black.recv_kind("chatMessage").await;
    let msg_w = white.recv_kind("chatMessage").await;

    assert_eq!(msg_b["message"], "hello there");
    assert_eq!(msg_b["playerId"], "p-black");
    assert_eq!(msg_b["username"], "black");
    assert!(msg_b["id"].as_str().is_some(), "chat message needs a server-assigned id");
    assert!(msg_b["timestamp"].as_i64().is_some());

    assert_eq!(msg_w["message"], "hello there");
    assert_eq!(msg_w["id"], msg_b["id"], "both participants see the same message id");
}

#[tokio::test]
async fn spectators_receive_chat_broadcasts_too() {
    let server = TestServer::start().await;
    let (game_id, mut black, _white) = server.new_even_game().await;

    let mut onlooker = server.connect().await;
    onlooker.join_game(&game_id, "p-watch", "watcher", true, false).await;
    let _ = black.recv_kind("playerJoined").await;

    black.chat(&game_id, "p-black", "black", "hi everyone").await;
    let _ = black.recv_kind("chatMessage").await;

    let msg = onlooker.recv_kind("chatMessage").await;
    assert_eq!(msg["message"], "hi everyone");
    assert_eq!(msg["playerId"], "p-black");
}

#[tokio::test]
async fn chat_does_not_disturb_turn_order() {
    let server = TestServer::start().await;
    let (game_id, mut black, mut white) = server.new_even_game().await;

    black.chat(&game_id, "p-black", "black", "just talk, no move").await;
    let _ = black.recv_kind("chatMessage").await;
    let _ = white.recv_kind("chatMessage").await;

    black.play(&game_id, "p-black", "black", 3, 3).await;
    let state = black.recv_kind("gameState").await;
    assert_eq!(state["currentTurn"], "white");
}
