//! One function per command in the wire protocol, each taking the session
//! store and the command's fields and returning the events to fan out.
//! This is the load-bearing module of the crate: every rule about who may
//! do what, when, is enforced here and nowhere else — handlers read the
//! current `GameState` out of the store, validate against it, mutate it
//! (often through `go_engine::Goban`), persist it back, and return the
//! narrower set of events the caller should broadcast or reply with.
//! Undo reconstruction replays the wire move history straight through the
//! rules kernel rather than keeping a separate replay structure (see
//! DESIGN.md for why).

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use go_engine::{Goban, Stone};
use serde_json::Value;

use crate::error::{AppError, CapacityKind, ProtocolKind};
use crate::model::{
    Board, CapturedStones, Color, GameId, GameState, GameStatus, GameType, Move, Player, Position,
    Score, TimeControlConfig, UndoRequest,
};
use crate::protocol::Event;
use crate::services::clock::{self, TimeControl};
use crate::store::SessionStore;

/// Where an outgoing event must go.
pub enum Outgoing {
    Broadcast(Event),
    ToPlayer(String, Event),
}

/// The result of handling one command: the state to persist (if any
/// mutation happened) and the events to deliver. The caller persists
/// `state` and always broadcasts an `Event::GameState` of it between
/// `outgoing` and `trailing` — individual handlers only return the
/// narrower, specific events. `trailing` exists for events the protocol
/// requires to land *after* `gameState` (see §4.5/§5's ordering guarantee:
/// `byoYomiReset → moveMade → gameState → timeUpdate`).
pub struct Effect {
    pub state: Option<GameState>,
    pub outgoing: Vec<Outgoing>,
    pub trailing: Vec<Outgoing>,
}

impl Effect {
    fn mutated(state: GameState, outgoing: Vec<Outgoing>) -> Self {
        Effect { state: Some(state), outgoing, trailing: Vec::new() }
    }

    fn mutated_with_trailing(state: GameState, outgoing: Vec<Outgoing>, trailing: Vec<Outgoing>) -> Self {
        Effect { state: Some(state), outgoing, trailing }
    }

    fn read_only(outgoing: Vec<Outgoing>) -> Self {
        Effect { state: None, outgoing, trailing: Vec::new() }
    }
}

async fn load(store: &dyn SessionStore, id: &GameId) -> Result<GameState, AppError> {
    store
        .get_game(id)
        .await?
        .ok_or(AppError::Protocol(ProtocolKind::UnknownGame))
}

/// Resolve a wire-supplied `gameId` field, which may actually be a
/// human-readable join code, to the game's real opaque id. Tried as a
/// literal id first (the common case — every command other than
/// `joinGame` always carries the real id already).
pub async fn resolve_game_ref(store: &dyn SessionStore, raw: &str) -> Result<GameId, AppError> {
    let literal = GameId(raw.to_string());
    if store.get_game(&literal).await?.is_some() {
        return Ok(literal);
    }
    store
        .get_game_id_by_code(raw)
        .await?
        .ok_or(AppError::Protocol(ProtocolKind::UnknownGame))
}

fn require_status(state: &GameState, status: GameStatus) -> Result<(), AppError> {
    if state.status == status {
        Ok(())
    } else {
        Err(AppError::Protocol(ProtocolKind::WrongPhase))
    }
}

fn elapsed_secs_since_last_move(state: &GameState, now: i64) -> f64 {
    let since = state.last_move_time.unwrap_or(state.created_at);
    (now - since).max(0) as f64 / 1000.0
}

/// Clock transitions to announce for one color, comparing the player's
/// record before and after a clock deduction. Emitted before the turn
/// actually changes hands, so a client always sees "my byo-yomi reset"
/// before "it's no longer my turn".
fn clock_transition_events(color: Color, before: &Player, after: &Player) -> Vec<Event> {
    let mut events = Vec::new();
    if !before.is_in_byo_yomi && after.is_in_byo_yomi {
        events.push(Event::ByoYomiStarted { color });
    } else if before.is_in_byo_yomi && after.is_in_byo_yomi {
        if after.byo_yomi_periods_left < before.byo_yomi_periods_left {
            events.push(Event::ByoYomiPeriodUsed { color, periods_left: after.byo_yomi_periods_left });
        } else {
            events.push(Event::ByoYomiReset { color });
        }
    }
    events
}

fn time_update_event(player: &Player) -> Event {
    Event::TimeUpdate {
        player_id: player.id.clone(),
        time_remaining: if player.is_in_byo_yomi { player.byo_yomi_time_left } else { player.time_remaining },
        is_in_byo_yomi: player.is_in_byo_yomi,
        byo_yomi_time_left: player.byo_yomi_time_left,
        byo_yomi_periods_left: player.byo_yomi_periods_left,
    }
}

/// Flag the clock-holder's color as having lost on time: ends the game
/// immediately. This is terminal for the game, so the caller broadcasts
/// rather than replying only to the initiator.
fn finish_on_time(state: &mut GameState, flagged_color: Color) -> Vec<Event> {
    let winner = flagged_color.opposite();
    state.status = GameStatus::Finished;
    state.winner = Some(winner);
    state.result = Some(format!("{}+T", if winner == Color::Black { "B" } else { "W" }));
    vec![Event::PlayerTimeout { color: flagged_color }, Event::GameFinished { winner: Some(winner), result: state.result.clone() }]
}

/// Rebuild a `Goban` by replaying the wire move history up to (but not
/// including) `history[upto]`, seeded by any handicap stones. Used only for
/// undo reconstruction — normal moves mutate the board incrementally.
fn replay_through(state: &GameState, upto: usize) -> Result<Goban, AppError> {
    let size = state.board.size;
    let mut goban = Goban::with_dimensions(size, size);
    if state.handicap >= 2 {
        if let Some(points) = go_engine::handicap::handicap_points(size, size, state.handicap) {
            for p in points {
                goban = goban.play(p, Stone::Black).map_err(AppError::from_go_error)?;
            }
        }
    }
    for mv in state.history.iter().take(upto) {
        if mv.pass {
            goban.pass();
        } else if let Some(pos) = mv.position {
            goban = goban.play((pos.x, pos.y), mv.color.into()).map_err(AppError::from_go_error)?;
        }
    }
    Ok(goban)
}

fn require_active_player<'a>(state: &'a GameState, player_id: &str) -> Result<&'a Player, AppError> {
    state
        .players
        .iter()
        .find(|p| p.id == player_id && !p.is_spectator)
        .ok_or(AppError::Protocol(ProtocolKind::UnauthorizedForColor))
}

fn message_id() -> String {
    use rand::RngExt;
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..12).map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char).collect()
}

// -- createGame --------------------------------------------------------

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewGameRequest {
    #[serde(default = "default_board_size")]
    board_size: u8,
    #[serde(default)]
    game_type: GameType,
    #[serde(default)]
    scoring_rule: Option<go_engine::ScoringRule>,
    #[serde(default)]
    handicap: u8,
    #[serde(default)]
    komi: Option<f64>,
    #[serde(default)]
    time_control: TimeControlConfig,
    username: String,
    #[serde(default)]
    color: Option<Color>,
}

fn default_board_size() -> u8 {
    19
}

pub async fn create_game(
    store: &dyn SessionStore,
    initial: Value,
    player_id: String,
) -> Result<GameState, AppError> {
    let req: NewGameRequest =
        serde_json::from_value(initial).map_err(|_| AppError::Protocol(ProtocolKind::InvalidCommand))?;

    let id = GameId::new();
    let mut code;
    loop {
        code = crate::model::generate_join_code();
        if store.get_game_id_by_code(&code).await?.is_none() {
            break;
        }
    }

    let scoring_rule = req.scoring_rule.unwrap_or(go_engine::ScoringRule::Japanese);
    // A handicap game owes White no first-move-advantage komi, so the
    // default collapses to the rule's small handicap remainder (§4.6) unless
    // the client supplied an explicit komi of its own.
    let komi = req.komi.unwrap_or_else(|| {
        if req.handicap >= 2 {
            scoring_rule.handicap_komi()
        } else {
            scoring_rule.default_komi()
        }
    });
    let now = Utc::now().timestamp_millis();
    let board = Board { size: req.board_size, stones: Vec::new() };

    let mut state = GameState {
        id: id.clone(),
        code: code.clone(),
        status: GameStatus::Waiting,
        board,
        current_turn: Color::Black,
        players: Vec::new(),
        spectators: Vec::new(),
        history: Vec::new(),
        captured_stones: CapturedStones::default(),
        ko_position: None,
        time_control: req.time_control,
        game_type: req.game_type,
        handicap: req.handicap,
        komi,
        scoring_rule,
        last_move_time: None,
        last_move: None,
        last_move_color: None,
        last_move_player_id: None,
        last_move_captured_count: 0,
        dead_stones: Vec::new(),
        territory: HashMap::new(),
        score: None,
        winner: None,
        result: None,
        undo_request: None,
        created_at: now,
        updated_at: now,
    };

    // Handicap stones go down for Black before White's clock ever starts;
    // the first move of the game is White's.
    if state.handicap >= 2 {
        if let Some(points) =
            go_engine::handicap::handicap_points(state.board.size, state.board.size, state.handicap)
        {
            let mut goban = Goban::with_dimensions(state.board.size, state.board.size);
            for p in &points {
                goban = goban.play(*p, Stone::Black).map_err(AppError::from_go_error)?;
            }
            state.board = Board::from_goban(&goban);
            state.current_turn = Color::White;
        }
    }

    let color = req.color.unwrap_or(Color::Black);
    let tc = TimeControl::derive(&state.time_control, state.game_type);
    let mut player = Player {
        id: player_id,
        username: req.username,
        color,
        time_remaining: 0.0,
        byo_yomi_periods_left: 0,
        byo_yomi_time_left: 0.0,
        is_in_byo_yomi: false,
        is_spectator: false,
        is_ai: false,
        joined_at: now,
    };
    clock::init_player_clock(&mut player, &tc);
    state.players.push(player);

    store.set_game(&state).await?;
    store.set_code(&code, &id).await?;
    Ok(state)
}

// -- joinGame ------------------------------------------------------------

pub async fn join_game(
    store: &dyn SessionStore,
    game_id: &str,
    player_id: String,
    username: String,
    as_spectator: bool,
    is_reconnect: bool,
) -> Result<Effect, AppError> {
    let id = resolve_game_ref(store, game_id).await?;
    let state = load(store, &id).await?;
    join_resolved(store, state, player_id, username, as_spectator, is_reconnect).await
}

async fn join_resolved(
    store: &dyn SessionStore,
    mut state: GameState,
    player_id: String,
    username: String,
    as_spectator: bool,
    is_reconnect: bool,
) -> Result<Effect, AppError> {
    let already_known = state.player(&player_id).is_some()
        || state.spectators.iter().any(|p| p.id == player_id);
    let now = Utc::now().timestamp_millis();
    let mut newly_joined_as_player = false;

    if !already_known {
        if !as_spectator && state.players.len() >= 2 {
            return Err(AppError::Capacity(CapacityKind::GameFull));
        }
        if as_spectator || state.players.len() >= 2 {
            state.spectators.push(Player {
                id: player_id.clone(),
                username: username.clone(),
                color: Color::Black,
                time_remaining: 0.0,
                byo_yomi_periods_left: 0,
                byo_yomi_time_left: 0.0,
                is_in_byo_yomi: false,
                is_spectator: true,
                is_ai: false,
                joined_at: now,
            });
        } else {
            let color = match state.players.first().map(|p| p.color) {
                Some(Color::Black) => Color::White,
                Some(Color::White) => Color::Black,
                None => Color::Black,
            };
            let tc = TimeControl::derive(&state.time_control, state.game_type);
            let mut player = Player {
                id: player_id.clone(),
                username: username.clone(),
                color,
                time_remaining: 0.0,
                byo_yomi_periods_left: 0,
                byo_yomi_time_left: 0.0,
                is_in_byo_yomi: false,
                is_spectator: false,
                is_ai: false,
                joined_at: now,
            };
            clock::init_player_clock(&mut player, &tc);
            state.players.push(player);
            newly_joined_as_player = true;
            if state.players.len() == 2 {
                state.status = GameStatus::Playing;
            }
        }
    }

    state.touch();
    store.set_game(&state).await?;

    let joined_event = Event::JoinedGame {
        success: true,
        game_id: state.id.0.clone(),
        player_id: player_id.clone(),
        num_players: state.players.len(),
        status: state.status,
        current_turn: state.current_turn,
    };
    let mut outgoing = vec![Outgoing::ToPlayer(player_id.clone(), joined_event)];
    if (newly_joined_as_player || as_spectator) && !already_known && !is_reconnect {
        outgoing.push(Outgoing::Broadcast(Event::PlayerJoined { player_id, username }));
    }
    Ok(Effect::mutated(state, outgoing))
}

// -- makeMove --------------------------------------------------------------

pub async fn make_move(
    store: &dyn SessionStore,
    game_id: &str,
    position: Position,
    color: Color,
    player_id: &str,
) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let mut state = load(store, &id).await?;
    require_status(&state, GameStatus::Playing)?;

    let actor = require_active_player(&state, player_id)?;
    if actor.color != color {
        return Err(AppError::Protocol(ProtocolKind::UnauthorizedForColor));
    }
    if state.current_turn != color {
        return Err(AppError::Protocol(ProtocolKind::NotYourTurn));
    }

    let goban = state.to_goban();
    let stone: Stone = color.into();
    let new_goban =
        goban.play((position.x, position.y), stone).map_err(AppError::from_go_error)?;
    let captured_count = new_goban.captures().get(stone) - goban.captures().get(stone);

    state.board = Board::from_goban(&new_goban);
    state.captured_stones = CapturedStones {
        black: new_goban.captures().get(Stone::Black),
        white: new_goban.captures().get(Stone::White),
    };
    state.ko_position =
        new_goban.ko().as_ref().map(|k| Position::new(k.pos.0 as u8, k.pos.1 as u8));

    let now = Utc::now().timestamp_millis();
    let elapsed = elapsed_secs_since_last_move(&state, now);
    let tc = TimeControl::derive(&state.time_control, state.game_type);

    let before = state.player_by_color(color).expect("validated above").clone();
    let flagged = {
        let p = state.player_by_color_mut(color).expect("validated above");
        clock::apply_move(p, &tc, elapsed)
    };
    let mover = state.player_by_color(color).expect("validated above").clone();

    // `timeUpdate` for the mover is emitted last of all (see `Effect::trailing`):
    // §4.5/§5 order this `byoYomiReset → moveMade → gameState → timeUpdate`.
    let mut events = clock_transition_events(color, &before, &mover);

    state.history.push(Move {
        position: Some(position),
        color,
        player_id: mover.id.clone(),
        timestamp: now,
        time_spent_on_move: elapsed,
        is_in_byo_yomi: mover.is_in_byo_yomi,
        byo_yomi_time_left: mover.byo_yomi_time_left,
        byo_yomi_periods_left: mover.byo_yomi_periods_left,
        captured_count,
        pass: false,
    });
    state.last_move_time = Some(now);
    state.last_move = Some(position);
    state.last_move_color = Some(color);
    state.last_move_player_id = Some(mover.id.clone());
    state.last_move_captured_count = captured_count;

    if flagged {
        events.extend(finish_on_time(&mut state, color));
    } else {
        state.current_turn = color.opposite();
        events.push(Event::MoveMade { position: Some(position), color });
    }
    state.touch();
    store.set_game(&state).await?;

    let trailing = vec![Outgoing::Broadcast(time_update_event(&mover))];
    Ok(Effect::mutated_with_trailing(
        state,
        events.into_iter().map(Outgoing::Broadcast).collect(),
        trailing,
    ))
}

// -- passTurn ---------------------------------------------------------------

pub async fn pass_turn(
    store: &dyn SessionStore,
    game_id: &str,
    color: Color,
    player_id: &str,
    _end_game: bool,
) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let mut state = load(store, &id).await?;
    require_status(&state, GameStatus::Playing)?;

    let actor = require_active_player(&state, player_id)?;
    if actor.color != color {
        return Err(AppError::Protocol(ProtocolKind::UnauthorizedForColor));
    }
    if state.current_turn != color {
        return Err(AppError::Protocol(ProtocolKind::NotYourTurn));
    }

    let now = Utc::now().timestamp_millis();
    let elapsed = elapsed_secs_since_last_move(&state, now);
    let tc = TimeControl::derive(&state.time_control, state.game_type);

    let before = state.player_by_color(color).expect("validated above").clone();
    let flagged = {
        let p = state.player_by_color_mut(color).expect("validated above");
        clock::apply_move(p, &tc, elapsed)
    };
    let mover = state.player_by_color(color).expect("validated above").clone();

    // `timeUpdate` for the mover is emitted last of all (see `Effect::trailing`);
    // same ordering contract as `make_move`.
    let mut events = clock_transition_events(color, &before, &mover);

    let both_passed = state.history.last().is_some_and(|m| m.pass && m.color != color);

    state.history.push(Move {
        position: None,
        color,
        player_id: mover.id.clone(),
        timestamp: now,
        time_spent_on_move: elapsed,
        is_in_byo_yomi: mover.is_in_byo_yomi,
        byo_yomi_time_left: mover.byo_yomi_time_left,
        byo_yomi_periods_left: mover.byo_yomi_periods_left,
        captured_count: 0,
        pass: true,
    });
    state.last_move_time = Some(now);
    state.last_move = None;
    state.last_move_color = Some(color);
    state.last_move_player_id = Some(mover.id.clone());
    state.last_move_captured_count = 0;

    if flagged {
        events.extend(finish_on_time(&mut state, color));
    } else if both_passed {
        let goban = state.to_goban();
        let dead: HashSet<go_engine::Point> = go_engine::territory::detect_dead_stones(&goban);
        state.dead_stones = dead.into_iter().map(Position::from).collect();
        state.status = GameStatus::Scoring;
        events.push(Event::ScoringPhaseStarted);
    } else {
        state.current_turn = color.opposite();
    }
    state.touch();
    store.set_game(&state).await?;

    let trailing = vec![Outgoing::Broadcast(time_update_event(&mover))];
    Ok(Effect::mutated_with_trailing(
        state,
        events.into_iter().map(Outgoing::Broadcast).collect(),
        trailing,
    ))
}

// -- resignGame --------------------------------------------------------------

pub async fn resign_game(
    store: &dyn SessionStore,
    game_id: &str,
    player_id: &str,
    color: Color,
) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let mut state = load(store, &id).await?;
    if state.status == GameStatus::Finished {
        return Err(AppError::Protocol(ProtocolKind::WrongPhase));
    }
    let actor = require_active_player(&state, player_id)?;
    if actor.color != color {
        return Err(AppError::Protocol(ProtocolKind::UnauthorizedForColor));
    }

    let winner = color.opposite();
    state.status = GameStatus::Finished;
    state.winner = Some(winner);
    state.result = Some(format!("{}+R", if winner == Color::Black { "B" } else { "W" }));
    state.touch();
    store.set_game(&state).await?;

    let events = vec![
        Event::PlayerResigned { color },
        Event::GameFinished { winner: Some(winner), result: state.result.clone() },
    ];
    Ok(Effect::mutated(state, events.into_iter().map(Outgoing::Broadcast).collect()))
}

// -- toggleDeadStone / syncDeadStones ----------------------------------------

pub async fn toggle_dead_stone(
    store: &dyn SessionStore,
    game_id: &str,
    position: Position,
    player_id: &str,
) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let mut state = load(store, &id).await?;
    require_status(&state, GameStatus::Scoring)?;
    require_active_player(&state, player_id)?;

    let goban = state.to_goban();
    let mut dead: HashSet<go_engine::Point> =
        state.dead_stones.iter().map(|p| (*p).into()).collect();
    go_engine::territory::toggle_dead_chain_with_auto_extend(&goban, &mut dead, position.into());
    state.dead_stones = dead.into_iter().map(Position::from).collect();
    state.touch();
    store.set_game(&state).await?;

    Ok(Effect::mutated(state, vec![Outgoing::Broadcast(Event::DeadStoneToggled { position })]))
}

pub async fn sync_dead_stones(
    store: &dyn SessionStore,
    game_id: &str,
    player_id: &str,
    dead_stones: Vec<Position>,
) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let mut state = load(store, &id).await?;
    require_status(&state, GameStatus::Scoring)?;
    require_active_player(&state, player_id)?;

    state.dead_stones = dead_stones;
    state.touch();
    store.set_game(&state).await?;
    Ok(Effect::mutated(state, Vec::new()))
}

pub async fn cancel_scoring(store: &dyn SessionStore, game_id: &str) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let mut state = load(store, &id).await?;
    require_status(&state, GameStatus::Scoring)?;

    state.status = GameStatus::Playing;
    state.dead_stones.clear();
    state.territory.clear();
    state.touch();
    store.set_game(&state).await?;
    Ok(Effect::mutated(state, vec![Outgoing::Broadcast(Event::ScoringCanceled)]))
}

/// `gameEnded` on the wire. Client-submitted score/territory are advisory
/// only — the server recomputes the authoritative result from
/// `dead_stones` and the rule in force.
pub async fn confirm_score(store: &dyn SessionStore, game_id: &str) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let mut state = load(store, &id).await?;
    require_status(&state, GameStatus::Scoring)?;

    let goban = state.to_goban();
    let dead: HashSet<go_engine::Point> = state.dead_stones.iter().map(|p| (*p).into()).collect();
    let ownership = go_engine::territory::estimate_territory(&goban, &dead);
    let result = go_engine::territory::score_with_rule(&goban, &ownership, &dead, state.komi, state.scoring_rule);

    let mut territory = HashMap::new();
    for (idx, &o) in ownership.iter().enumerate() {
        let color = match o {
            1 => Some(Color::Black),
            -1 => Some(Color::White),
            _ => None,
        };
        if let Some(color) = color {
            let x = (idx % state.board.size as usize) as u8;
            let y = (idx / state.board.size as usize) as u8;
            territory.insert(format!("{x},{y}"), color);
        }
    }

    let mut dead_black = 0u32;
    let mut dead_white = 0u32;
    for &pt in &dead {
        match goban.stone_at(pt) {
            Some(Stone::Black) => dead_black += 1,
            Some(Stone::White) => dead_white += 1,
            None => {}
        }
    }

    let black_total = result.black_total();
    let white_total = result.white_total();
    let winner = if black_total > white_total { Color::Black } else { Color::White };

    state.score = Some(Score {
        black: black_total,
        white: white_total,
        black_territory: result.black.territory,
        white_territory: result.white.territory,
        black_captures: result.black.captures,
        white_captures: result.white.captures,
        dead_black_stones: dead_black,
        dead_white_stones: dead_white,
        komi: state.komi,
    });
    state.territory = territory;
    state.winner = Some(winner);
    state.result = Some(result.result());
    state.status = GameStatus::Finished;
    state.touch();
    store.set_game(&state).await?;

    let result_str = state.result.clone();
    Ok(Effect::mutated(
        state,
        vec![Outgoing::Broadcast(Event::GameFinished { winner: Some(winner), result: result_str })],
    ))
}

// -- undo -------------------------------------------------------------------

pub async fn request_undo(
    store: &dyn SessionStore,
    game_id: &str,
    player_id: &str,
    move_index: usize,
) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let mut state = load(store, &id).await?;
    require_status(&state, GameStatus::Playing)?;
    require_active_player(&state, player_id)?;
    if state.undo_request.is_some() {
        return Err(AppError::Protocol(ProtocolKind::WrongPhase));
    }
    if move_index > state.history.len() {
        return Err(AppError::Protocol(ProtocolKind::InvalidCommand));
    }

    state.undo_request = Some(UndoRequest { requested_by: player_id.to_string(), move_index });
    state.touch();
    store.set_game(&state).await?;
    Ok(Effect::mutated(state, Vec::new()))
}

pub async fn respond_to_undo_request(
    store: &dyn SessionStore,
    game_id: &str,
    player_id: &str,
    accepted: bool,
    move_index: usize,
) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let mut state = load(store, &id).await?;
    require_active_player(&state, player_id)?;

    let request = state
        .undo_request
        .clone()
        .ok_or(AppError::Protocol(ProtocolKind::WrongPhase))?;
    if request.move_index != move_index {
        return Err(AppError::Protocol(ProtocolKind::InvalidCommand));
    }

    state.undo_request = None;
    if accepted {
        let goban = replay_through(&state, move_index)?;
        state.board = Board::from_goban(&goban);
        state.captured_stones =
            CapturedStones { black: goban.captures().get(Stone::Black), white: goban.captures().get(Stone::White) };
        state.ko_position = goban.ko().as_ref().map(|k| Position::new(k.pos.0 as u8, k.pos.1 as u8));
        state.history.truncate(move_index);
        state.current_turn = match state.history.last() {
            Some(last) => last.color.opposite(),
            None => Color::Black,
        };
        state.last_move = state.history.last().and_then(|m| m.position);
        state.last_move_color = state.history.last().map(|m| m.color);
        state.last_move_player_id = state.history.last().map(|m| m.player_id.clone());
        state.last_move_time = state.history.last().map(|m| m.timestamp);
        state.last_move_captured_count = state.history.last().map(|m| m.captured_count).unwrap_or(0);
        state.status = GameStatus::Playing;
    }
    state.touch();
    store.set_game(&state).await?;
    Ok(Effect::mutated(state, Vec::new()))
}

// -- chat / sync / timer / leave ---------------------------------------------

pub async fn chat_message(
    player_id: String,
    username: String,
    message: String,
) -> Effect {
    let event = Event::ChatMessage {
        id: message_id(),
        player_id,
        username,
        message,
        timestamp: Utc::now().timestamp_millis(),
    };
    Effect::read_only(vec![Outgoing::Broadcast(event)])
}

pub async fn request_sync(
    store: &dyn SessionStore,
    game_id: &str,
    player_id: String,
) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let state = load(store, &id).await?;
    let event = Event::SyncGameState(Box::new(state));
    Ok(Effect::read_only(vec![Outgoing::ToPlayer(player_id, event)]))
}

/// Checked both on an explicit `timerTick` command and by the periodic
/// clock sweep. Never mutates stored time itself — it only projects the
/// mover's clock forward from `last_move_time` for display, and detects a
/// timeout the way a move commit would. Always replies with a
/// `timeUpdate` per player so both sides stay in sync between moves.
pub async fn timer_tick(store: &dyn SessionStore, game_id: &str) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let mut state = load(store, &id).await?;
    if state.status != GameStatus::Playing {
        return Ok(Effect::read_only(Vec::new()));
    }
    let tc = TimeControl::derive(&state.time_control, state.game_type);
    if tc.is_none() {
        return Ok(Effect::read_only(Vec::new()));
    }

    let now = Utc::now().timestamp_millis();
    let started_at = chrono::DateTime::from_timestamp_millis(state.last_move_time.unwrap_or(state.created_at))
        .ok_or_else(|| AppError::Internal("bad timestamp".into()))?;
    let now_dt = chrono::DateTime::from_timestamp_millis(now)
        .ok_or_else(|| AppError::Internal("bad timestamp".into()))?;

    let mover_color = state.current_turn;
    let mover = state.player_by_color(mover_color).ok_or(AppError::Internal("missing mover".into()))?;
    if clock::is_flagged(mover, &tc, started_at, now_dt) {
        let events = finish_on_time(&mut state, mover_color);
        state.touch();
        store.set_game(&state).await?;
        return Ok(Effect::mutated(state, events.into_iter().map(Outgoing::Broadcast).collect()));
    }

    let projected = clock::live_remaining(mover, started_at, now_dt);
    let events: Vec<Event> = state
        .players
        .iter()
        .map(|p| {
            if p.color == mover_color {
                Event::TimeUpdate {
                    player_id: p.id.clone(),
                    time_remaining: projected,
                    is_in_byo_yomi: p.is_in_byo_yomi,
                    byo_yomi_time_left: if p.is_in_byo_yomi { projected } else { p.byo_yomi_time_left },
                    byo_yomi_periods_left: p.byo_yomi_periods_left,
                }
            } else {
                time_update_event(p)
            }
        })
        .collect();
    Ok(Effect::read_only(events.into_iter().map(Outgoing::Broadcast).collect()))
}

pub async fn leave_game(
    store: &dyn SessionStore,
    game_id: &str,
    player_id: &str,
) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let mut state = load(store, &id).await?;
    state.players.retain(|p| p.id != player_id);
    state.spectators.retain(|p| p.id != player_id);
    state.touch();
    store.set_game(&state).await?;
    Ok(Effect::mutated(
        state,
        vec![Outgoing::Broadcast(Event::PlayerLeft { player_id: player_id.to_string() })],
    ))
}

/// Mark a player as disconnected without dropping them from the roster —
/// called by the connection layer's presence grace timer, not a wire
/// command. Distinct from `leaveGame`, which is a voluntary departure.
pub async fn mark_disconnected(
    store: &dyn SessionStore,
    game_id: &str,
    player_id: &str,
) -> Result<Effect, AppError> {
    let id = GameId(game_id.to_string());
    let state = load(store, &id).await?;
    if state.player(player_id).is_none() && !state.spectators.iter().any(|p| p.id == player_id) {
        return Ok(Effect::read_only(Vec::new()));
    }
    Ok(Effect::read_only(vec![Outgoing::Broadcast(Event::PlayerDisconnected {
        player_id: player_id.to_string(),
    })]))
}
