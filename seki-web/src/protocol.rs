//! The tagged JSON envelopes clients send and receive over the single
//! `/ws` channel. Every inbound message carries an `action` discriminant;
//! `Command` is the typed form the session engine dispatches on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Color, GameState, Position, Score};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    CreateGame {
        #[serde(rename = "gameState")]
        initial: Value,
        #[serde(rename = "playerId")]
        player_id: String,
    },
    JoinGame {
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(rename = "playerId")]
        player_id: String,
        username: String,
        #[serde(default, rename = "asSpectator")]
        as_spectator: bool,
        #[serde(default, rename = "isReconnect")]
        is_reconnect: bool,
    },
    MakeMove {
        #[serde(rename = "gameId")]
        game_id: String,
        position: Position,
        color: Color,
        #[serde(rename = "playerId")]
        player_id: String,
    },
    PassTurn {
        #[serde(rename = "gameId")]
        game_id: String,
        color: Color,
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(default, rename = "endGame")]
        end_game: bool,
    },
    ResignGame {
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(rename = "playerId")]
        player_id: String,
        color: Color,
    },
    ToggleDeadStone {
        #[serde(rename = "gameId")]
        game_id: String,
        position: Position,
        #[serde(rename = "playerId")]
        player_id: String,
    },
    SyncDeadStones {
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(rename = "deadStones")]
        dead_stones: Vec<Position>,
        #[serde(rename = "deadBlackStones")]
        dead_black_stones: u32,
        #[serde(rename = "deadWhiteStones")]
        dead_white_stones: u32,
    },
    CancelScoring {
        #[serde(rename = "gameId")]
        game_id: String,
    },
    /// `gameEnded` is the wire name for confirming the final score.
    #[serde(rename = "gameEnded")]
    ConfirmScore {
        #[serde(rename = "gameId")]
        game_id: String,
        score: Score,
        winner: Color,
        territory: std::collections::HashMap<String, Color>,
    },
    RequestUndo {
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(rename = "moveIndex")]
        move_index: usize,
    },
    RespondToUndoRequest {
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(rename = "playerId")]
        player_id: String,
        accepted: bool,
        #[serde(rename = "moveIndex")]
        move_index: usize,
    },
    ChatMessage {
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(rename = "playerId")]
        player_id: String,
        username: String,
        message: String,
    },
    RequestSync {
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(rename = "playerId")]
        player_id: String,
    },
    TimerTick {
        #[serde(rename = "gameId")]
        game_id: String,
    },
    LeaveGame {
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(rename = "playerId")]
        player_id: String,
    },
}

impl Command {
    pub fn game_id(&self) -> Option<&str> {
        match self {
            Command::CreateGame { .. } => None,
            Command::JoinGame { game_id, .. }
            | Command::MakeMove { game_id, .. }
            | Command::PassTurn { game_id, .. }
            | Command::ResignGame { game_id, .. }
            | Command::ToggleDeadStone { game_id, .. }
            | Command::SyncDeadStones { game_id, .. }
            | Command::CancelScoring { game_id }
            | Command::ConfirmScore { game_id, .. }
            | Command::RequestUndo { game_id, .. }
            | Command::RespondToUndoRequest { game_id, .. }
            | Command::ChatMessage { game_id, .. }
            | Command::RequestSync { game_id, .. }
            | Command::TimerTick { game_id }
            | Command::LeaveGame { game_id, .. } => Some(game_id),
        }
    }
}

/// Server → client events. `#[serde(tag = "kind")]` puts the discriminant
/// alongside the payload, so every frame looks like `{kind: "...", ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Event {
    GameCreated { #[serde(rename = "gameId")] game_id: String },
    GameState(Box<GameState>),
    JoinedGame {
        success: bool,
        #[serde(rename = "gameId")]
        game_id: String,
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(rename = "numPlayers")]
        num_players: usize,
        status: crate::model::GameStatus,
        #[serde(rename = "currentTurn")]
        current_turn: Color,
    },
    MoveMade { position: Option<Position>, color: Color },
    TimeUpdate {
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(rename = "timeRemaining")]
        time_remaining: f64,
        #[serde(rename = "isInByoYomi")]
        is_in_byo_yomi: bool,
        #[serde(rename = "byoYomiTimeLeft")]
        byo_yomi_time_left: f64,
        #[serde(rename = "byoYomiPeriodsLeft")]
        byo_yomi_periods_left: u32,
    },
    ByoYomiStarted { color: Color },
    ByoYomiPeriodUsed { color: Color, #[serde(rename = "periodsLeft")] periods_left: u32 },
    ByoYomiReset { color: Color },
    PlayerTimeout { color: Color },
    PlayerJoined { #[serde(rename = "playerId")] player_id: String, username: String },
    PlayerLeft { #[serde(rename = "playerId")] player_id: String },
    PlayerDisconnected { #[serde(rename = "playerId")] player_id: String },
    PlayerResigned { color: Color },
    ScoringPhaseStarted,
    DeadStoneToggled { position: Position },
    ScoringCanceled,
    GameFinished { winner: Option<Color>, result: Option<String> },
    ChatMessage {
        id: String,
        #[serde(rename = "playerId")]
        player_id: String,
        username: String,
        message: String,
        timestamp: i64,
    },
    SyncGameState(Box<GameState>),
    Error { #[serde(rename = "errorKind")] error_kind: String, message: String },
}
