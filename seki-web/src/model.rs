//! The session's single source of truth: `GameState` and the types it is built from.
//!
//! Mirrors the wire shapes the session engine and protocol surface both
//! serialize against. The whole `GameState` is one JSON document — it is
//! written to the session store as a single blob and sent to clients as a
//! single `gameState` event, never split into fragments.

use std::collections::HashMap;

use chrono::Utc;
use go_engine::territory::ScoringRule;
use go_engine::Stone;
use serde::{Deserialize, Serialize};

/// Opaque session id. Generated by the server, never a database key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(pub String);

impl GameId {
    pub fn new() -> Self {
        GameId(nanoid())
    }

    pub fn store_key(&self) -> String {
        format!("game:{}", self.0)
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn nanoid() -> String {
    use rand::RngExt;
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..21).map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char).collect()
}

/// A human-readable, case-insensitive join token, unique while the session is live.
pub fn generate_join_code() -> String {
    use rand::RngExt;
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789"; // no 0/O/1/I
    let mut rng = rand::rng();
    (0..6).map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }
}

impl From<Stone> for Color {
    fn from(s: Stone) -> Self {
        match s {
            Stone::Black => Color::Black,
            Stone::White => Color::White,
        }
    }
}

impl From<Color> for Stone {
    fn from(c: Color) -> Self {
        match c {
            Color::Black => Stone::Black,
            Color::White => Stone::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Playing,
    Scoring,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    #[default]
    Even,
    Handicap,
    Blitz,
    Teaching,
    Rengo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u8,
    pub y: u8,
}

impl Position {
    pub fn new(x: u8, y: u8) -> Self {
        Position { x, y }
    }
}

impl From<(u8, u8)> for Position {
    fn from((x, y): (u8, u8)) -> Self {
        Position { x, y }
    }
}

impl From<Position> for (u8, u8) {
    fn from(p: Position) -> Self {
        (p.x, p.y)
    }
}

/// The board as the wire protocol describes it: a size and an ordered stone list.
/// Internally the session engine keeps a `go_engine::Goban`; this is only the
/// serialized projection of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub size: u8,
    pub stones: Vec<PlacedStone>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlacedStone {
    pub position: Position,
    pub color: Color,
}

impl Board {
    pub fn from_goban(goban: &go_engine::Goban) -> Self {
        let mut stones = Vec::new();
        for y in 0..goban.rows() {
            for x in 0..goban.cols() {
                if let Some(stone) = goban.stone_at((x, y)) {
                    stones.push(PlacedStone {
                        position: Position::new(x, y),
                        color: stone.into(),
                    });
                }
            }
        }
        Board { size: goban.cols(), stones }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub username: String,
    pub color: Color,
    #[serde(rename = "timeRemaining")]
    pub time_remaining: f64,
    #[serde(rename = "byoYomiPeriodsLeft")]
    pub byo_yomi_periods_left: u32,
    #[serde(rename = "byoYomiTimeLeft")]
    pub byo_yomi_time_left: f64,
    #[serde(rename = "isInByoYomi")]
    pub is_in_byo_yomi: bool,
    #[serde(rename = "isSpectator")]
    pub is_spectator: bool,
    #[serde(rename = "isAI")]
    pub is_ai: bool,
    #[serde(rename = "joinedAt")]
    pub joined_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Move {
    pub position: Option<Position>,
    pub color: Color,
    #[serde(rename = "playerId")]
    pub player_id: String,
    pub timestamp: i64,
    #[serde(rename = "timeSpentOnMove")]
    pub time_spent_on_move: f64,
    #[serde(rename = "isInByoYomi")]
    pub is_in_byo_yomi: bool,
    #[serde(rename = "byoYomiTimeLeft")]
    pub byo_yomi_time_left: f64,
    #[serde(rename = "byoYomiPeriodsLeft")]
    pub byo_yomi_periods_left: u32,
    #[serde(rename = "capturedCount")]
    pub captured_count: u32,
    pub pass: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CapturedStones {
    pub black: u32,
    pub white: u32,
}

/// Time control configuration as carried on the wire; the active mode is
/// derived from `game_type` (blitz) or the presence of `fischer_time` vs.
/// `byo_yomi_periods` (standard vs. fischer).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimeControlConfig {
    /// Main time in minutes (0 means the game starts already in byo-yomi/sudden-death).
    #[serde(rename = "timeControl")]
    pub main_time_minutes: f64,
    #[serde(rename = "byoYomiPeriods")]
    pub byo_yomi_periods: u32,
    /// Byo-yomi period length in seconds.
    #[serde(rename = "byoYomiTime")]
    pub byo_yomi_time_secs: f64,
    /// Per-move budget in seconds, used only when `gameType == blitz`.
    #[serde(rename = "timePerMove")]
    pub time_per_move_secs: f64,
    /// Fischer increment in seconds; only applied when the client explicitly
    /// opts into the additive `fischer` shape (see DESIGN.md).
    #[serde(rename = "fischerTime")]
    pub fischer_time_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    pub black: f64,
    pub white: f64,
    #[serde(rename = "blackTerritory")]
    pub black_territory: u32,
    #[serde(rename = "whiteTerritory")]
    pub white_territory: u32,
    #[serde(rename = "blackCaptures")]
    pub black_captures: u32,
    #[serde(rename = "whiteCaptures")]
    pub white_captures: u32,
    #[serde(rename = "deadBlackStones")]
    pub dead_black_stones: u32,
    #[serde(rename = "deadWhiteStones")]
    pub dead_white_stones: u32,
    pub komi: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoRequest {
    #[serde(rename = "requestedBy")]
    pub requested_by: String,
    #[serde(rename = "moveIndex")]
    pub move_index: usize,
}

/// The single source of truth for one session. Everything the session
/// engine reads or mutates lives here; it is the exact unit stored at
/// `game:<id>` and sent as the `gameState` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub id: GameId,
    pub code: String,
    pub status: GameStatus,
    pub board: Board,
    pub current_turn: Color,
    pub players: Vec<Player>,
    pub spectators: Vec<Player>,
    pub history: Vec<Move>,
    pub captured_stones: CapturedStones,
    pub ko_position: Option<Position>,
    pub time_control: TimeControlConfig,
    pub game_type: GameType,
    pub handicap: u8,
    pub komi: f64,
    pub scoring_rule: ScoringRule,
    pub last_move_time: Option<i64>,
    pub last_move: Option<Position>,
    pub last_move_color: Option<Color>,
    pub last_move_player_id: Option<String>,
    pub last_move_captured_count: u32,
    pub dead_stones: Vec<Position>,
    pub territory: HashMap<String, Color>,
    pub score: Option<Score>,
    pub winner: Option<Color>,
    pub result: Option<String>,
    pub undo_request: Option<UndoRequest>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl GameState {
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().timestamp_millis();
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn player_by_color(&self, color: Color) -> Option<&Player> {
        self.players.iter().find(|p| p.color == color)
    }

    pub fn player_by_color_mut(&mut self, color: Color) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.color == color)
    }

    pub fn opponent_of(&self, player_id: &str) -> Option<&Player> {
        let color = self.player(player_id)?.color;
        self.player_by_color(color.opposite())
    }

    pub fn is_blitz(&self) -> bool {
        self.game_type == GameType::Blitz
    }

    /// Build a `go_engine::Goban` from the current board + ko state, for
    /// running rule validation and capture logic through the kernel.
    pub fn to_goban(&self) -> go_engine::Goban {
        let mut flat = vec![0i8; self.board.size as usize * self.board.size as usize];
        for s in &self.board.stones {
            let idx = s.position.y as usize * self.board.size as usize + s.position.x as usize;
            flat[idx] = Stone::from(s.color).to_int();
        }
        let captures = go_engine::goban::Captures {
            black: self.captured_stones.black,
            white: self.captured_stones.white,
        };
        let ko = self.ko_position.map(|p| go_engine::Ko {
            pos: (p.x as i8, p.y as i8),
            illegal: self.current_turn.into(),
        });
        go_engine::Goban::from_state(go_engine::GameState {
            board: flat,
            cols: self.board.size,
            rows: self.board.size,
            captures,
            ko,
        })
    }
}
