//! The single `/ws` upgrade handler. One connection may join several
//! games (as player or spectator) over its lifetime; each inbound frame
//! is a [`Command`], dispatched to the session engine and fanned back out
//! as [`Event`]s.

use std::collections::HashSet;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::error::{AppError, TimingKind};
use crate::model::GameId;
use crate::protocol::{Command, Event};
use crate::services::session_engine::{self, Effect, Outgoing};
use crate::ws::registry::ConnectionId;
use crate::AppState;

/// How long a game may sit with no channel subscribed to its topic before
/// it is reclaimed. Distinct from [`crate::ws::presence::UserPresence`]'s
/// grace period, which tracks a single player's connection, not the room.
const ROOM_PURGE_GRACE: Duration = Duration::from_secs(5 * 60);

/// Soft deadline for a single command's read-modify-write against the
/// store. A command that blows past this is abandoned before its write, so
/// no partial state is ever committed; the caller just sees a `Timeout`.
const COMMAND_DEADLINE: Duration = Duration::from_secs(5);

pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let conn_id = state.registry.next_connection_id();
    state.registry.register_conn(conn_id, tx).await;

    let forward = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_tx.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    let mut joined_games: HashSet<GameId> = HashSet::new();

    while let Some(Ok(msg)) = ws_rx.next().await {
        let Message::Text(text) = msg else { continue };
        let command: Command = match serde_json::from_str(&text) {
            Ok(c) => c,
            Err(_) => {
                send_error(&state, conn_id, &AppError::Protocol(crate::error::ProtocolKind::InvalidCommand))
                    .await;
                continue;
            }
        };

        // `gameId` on a `joinGame` frame may be the human-readable join
        // code rather than the real id; resolve it to the real id up front
        // so the registry, executor lock, and pub/sub topic downstream all
        // key on the same value as every other command.
        let command = if let Command::JoinGame { game_id, player_id, username, as_spectator, is_reconnect } = command {
            match session_engine::resolve_game_ref(state.store.as_ref(), &game_id).await {
                Ok(id) => {
                    state.registry.join(&id, conn_id, player_id.clone()).await;
                    state.presence.connect(&player_id).await;
                    ensure_subscribed(&state, id.clone()).await;
                    let _ = state.store.set_socket_game(&conn_id.to_string(), &id).await;
                    joined_games.insert(id.clone());
                    Command::JoinGame { game_id: id.0, player_id, username, as_spectator, is_reconnect }
                }
                Err(e) => {
                    send_error(&state, conn_id, &e).await;
                    continue;
                }
            }
        } else {
            command
        };

        dispatch(&state, conn_id, command).await;
    }

    forward.abort();
    state.registry.unregister_conn(conn_id).await;
    let _ = state.store.del_socket_game(&conn_id.to_string()).await;
    for game_id in joined_games {
        if let Some(player_id) = state.registry.leave(&game_id, conn_id).await {
            let st = state.clone();
            let gid = game_id.clone();
            state
                .presence
                .disconnect(&player_id, move |player_id| {
                    tokio::spawn(async move {
                        if let Ok(effect) =
                            session_engine::mark_disconnected(st.store.as_ref(), &gid.0, &player_id).await
                        {
                            deliver(&st, &gid, effect).await;
                        }
                    });
                })
                .await;
        }
        if state.registry.is_empty(&game_id).await {
            arm_room_purge(&state, game_id);
        }
    }
}

/// Arm a deletion timer for a room that just went empty on this process. If
/// no connection has rejoined its topic by the time it fires, the game and
/// its join code are removed from the store outright.
fn arm_room_purge(state: &AppState, game_id: GameId) {
    let state = state.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ROOM_PURGE_GRACE).await;
        if !state.registry.is_empty(&game_id).await {
            return;
        }
        let Ok(Some(game)) = state.store.get_game(&game_id).await else { return };
        if !game.players.is_empty() || !game.spectators.is_empty() {
            return;
        }
        let _ = state.store.del_code(&game.code).await;
        let _ = state.store.del_game(&game_id).await;
        state.executor.forget(&game_id).await;
        state.registry.forget_subscription(&game_id).await;
    });
}

/// Spawn (once per game, per process) a task forwarding the session
/// store's pub/sub channel into this process's locally-connected sockets.
async fn ensure_subscribed(state: &AppState, game_id: GameId) {
    if !state.registry.mark_subscribed(&game_id).await {
        return;
    }
    let store = state.store.clone();
    let registry = state.registry.clone();
    tokio::spawn(async move {
        let Ok(mut rx) = store.subscribe(&game_id).await else { return };
        while let Some(payload) = rx.recv().await {
            registry.broadcast_local(&game_id, &payload).await;
        }
    });
}

async fn dispatch(state: &AppState, conn_id: ConnectionId, command: Command) {
    if let Command::CreateGame { initial, player_id } = command {
        match session_engine::create_game(state.store.as_ref(), initial, player_id.clone()).await {
            Ok(game_state) => {
                let game_id = game_state.id.clone();
                state.registry.join(&game_id, conn_id, player_id).await;
                ensure_subscribed(state, game_id.clone()).await;
                let _ = state.store.set_socket_game(&conn_id.to_string(), &game_id).await;
                send_direct(state, conn_id, &Event::GameCreated { game_id: game_id.0.clone() }).await;
                send_direct(state, conn_id, &Event::GameState(Box::new(game_state))).await;
            }
            Err(e) => send_error(state, conn_id, &e).await,
        }
        return;
    }

    let Some(game_id) = command.game_id().map(|s| GameId(s.to_string())) else {
        send_error(state, conn_id, &AppError::Protocol(crate::error::ProtocolKind::InvalidCommand)).await;
        return;
    };

    // Every read-modify-write against this game's state runs under its
    // single-writer lock, so two commands for the same game never race
    // each other's store round-trip on this process.
    let store = state.store.clone();
    let command_future = state.executor.run(&game_id, || async move {
        match command {
            Command::JoinGame { game_id, player_id, username, as_spectator, is_reconnect } => {
                session_engine::join_game(
                    store.as_ref(),
                    &game_id,
                    player_id,
                    username,
                    as_spectator,
                    is_reconnect,
                )
                .await
            }
            Command::MakeMove { game_id, position, color, player_id } => {
                session_engine::make_move(store.as_ref(), &game_id, position, color, &player_id).await
            }
            Command::PassTurn { game_id, color, player_id, end_game } => {
                session_engine::pass_turn(store.as_ref(), &game_id, color, &player_id, end_game).await
            }
            Command::ResignGame { game_id, player_id, color } => {
                session_engine::resign_game(store.as_ref(), &game_id, &player_id, color).await
            }
            Command::ToggleDeadStone { game_id, position, player_id } => {
                session_engine::toggle_dead_stone(store.as_ref(), &game_id, position, &player_id).await
            }
            Command::SyncDeadStones { game_id, player_id, dead_stones, .. } => {
                session_engine::sync_dead_stones(store.as_ref(), &game_id, &player_id, dead_stones).await
            }
            Command::CancelScoring { game_id } => session_engine::cancel_scoring(store.as_ref(), &game_id).await,
            Command::ConfirmScore { game_id, .. } => {
                session_engine::confirm_score(store.as_ref(), &game_id).await
            }
            Command::RequestUndo { game_id, player_id, move_index } => {
                session_engine::request_undo(store.as_ref(), &game_id, &player_id, move_index).await
            }
            Command::RespondToUndoRequest { game_id, player_id, accepted, move_index } => {
                session_engine::respond_to_undo_request(
                    store.as_ref(),
                    &game_id,
                    &player_id,
                    accepted,
                    move_index,
                )
                .await
            }
            Command::ChatMessage { player_id, username, message, .. } => {
                Ok(session_engine::chat_message(player_id, username, message).await)
            }
            Command::RequestSync { game_id, player_id } => {
                session_engine::request_sync(store.as_ref(), &game_id, player_id).await
            }
            Command::TimerTick { game_id } => session_engine::timer_tick(store.as_ref(), &game_id).await,
            Command::LeaveGame { game_id, player_id } => {
                session_engine::leave_game(store.as_ref(), &game_id, &player_id).await
            }
            Command::CreateGame { .. } => unreachable!("handled above"),
        }
    });
    let result: Result<Effect, AppError> =
        match tokio::time::timeout(COMMAND_DEADLINE, command_future).await {
            Ok(r) => r,
            Err(_) => Err(AppError::Timing(TimingKind::Timeout)),
        };

    match result {
        Ok(effect) => deliver(state, &game_id, effect).await,
        Err(e) => send_error(state, conn_id, &e).await,
    }
}

/// Fan out one command's effect: broadcasts go through the session store
/// (so every process serving this game's connections sees them),
/// direct replies go straight to the initiator's local connection.
/// `outgoing` lands before the `gameState` broadcast, `trailing` after it —
/// `timeUpdate` is carried in `trailing` so the wire order always matches
/// §4.5/§5: `byoYomiReset → moveMade → gameState → timeUpdate`.
pub async fn deliver(state: &AppState, game_id: &GameId, effect: Effect) {
    for out in effect.outgoing {
        deliver_one(state, game_id, out).await;
    }
    if let Some(new_state) = effect.state {
        publish(state, game_id, &Event::GameState(Box::new(new_state))).await;
    }
    for out in effect.trailing {
        deliver_one(state, game_id, out).await;
    }
}

async fn deliver_one(state: &AppState, game_id: &GameId, out: Outgoing) {
    match out {
        Outgoing::Broadcast(event) => publish(state, game_id, &event).await,
        Outgoing::ToPlayer(player_id, event) => {
            state.registry.send_to_player(game_id, &player_id, to_json(&event)).await;
        }
    }
}

async fn publish(state: &AppState, game_id: &GameId, event: &Event) {
    if let Err(e) = state.store.publish(game_id, &to_json(event)).await {
        tracing::error!("failed to publish event for game {game_id}: {e}");
    }
}

async fn send_direct(state: &AppState, conn_id: ConnectionId, event: &Event) {
    state.registry.send_to_conn(conn_id, to_json(event)).await;
}

async fn send_error(state: &AppState, conn_id: ConnectionId, err: &AppError) {
    if err.is_terminal() {
        tracing::warn!("terminal error on conn {conn_id}: {err}");
    }
    state.registry.send_to_conn(conn_id, err.to_event_json().to_string()).await;
}

fn to_json(event: &Event) -> String {
    serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string())
}
