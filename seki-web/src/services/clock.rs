use chrono::{DateTime, Utc};

use crate::model::{GameType, Player, TimeControlConfig};

/// The clock regime a session actually runs under, derived once from its
/// `TimeControlConfig` + `gameType`. `Standard` is byo-yomi; `Blitz` is a
/// flat per-move budget; `Fischer` adds a fixed increment after each move.
#[derive(Debug, Clone, Copy)]
pub enum TimeControl {
    /// No clock at all (`mainTimeMinutes == 0 && byoYomiPeriods == 0`).
    None,
    Standard {
        main_time_secs: f64,
        byo_yomi_periods: u32,
        byo_yomi_time_secs: f64,
    },
    Blitz {
        time_per_move_secs: f64,
    },
    Fischer {
        main_time_secs: f64,
        increment_secs: f64,
    },
}

impl TimeControl {
    pub fn derive(cfg: &TimeControlConfig, game_type: GameType) -> Self {
        if game_type == GameType::Blitz {
            return TimeControl::Blitz { time_per_move_secs: cfg.time_per_move_secs };
        }
        if cfg.fischer_time_secs > 0.0 {
            return TimeControl::Fischer {
                main_time_secs: cfg.main_time_minutes * 60.0,
                increment_secs: cfg.fischer_time_secs,
            };
        }
        if cfg.main_time_minutes <= 0.0 && cfg.byo_yomi_periods == 0 {
            return TimeControl::None;
        }
        TimeControl::Standard {
            main_time_secs: cfg.main_time_minutes * 60.0,
            byo_yomi_periods: cfg.byo_yomi_periods,
            byo_yomi_time_secs: cfg.byo_yomi_time_secs,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, TimeControl::None)
    }
}

/// Initialize a freshly-joined player's clock fields from the session's
/// time control. Blitz players start each move with a full per-move budget
/// rather than a bank, so `time_remaining` tracks the current move's clock.
pub fn init_player_clock(player: &mut Player, tc: &TimeControl) {
    match tc {
        TimeControl::None => {
            player.time_remaining = 0.0;
            player.byo_yomi_periods_left = 0;
            player.byo_yomi_time_left = 0.0;
            player.is_in_byo_yomi = false;
        }
        TimeControl::Standard { main_time_secs, byo_yomi_periods, byo_yomi_time_secs } => {
            player.time_remaining = *main_time_secs;
            player.byo_yomi_periods_left = *byo_yomi_periods;
            // A zero main-time bank means the game starts already in
            // sudden-death byo-yomi rather than instantly forfeiting.
            player.is_in_byo_yomi = *main_time_secs <= 0.0 && *byo_yomi_periods > 0;
            player.byo_yomi_time_left = *byo_yomi_time_secs;
        }
        TimeControl::Blitz { time_per_move_secs } => {
            player.time_remaining = *time_per_move_secs;
            player.byo_yomi_periods_left = 0;
            player.byo_yomi_time_left = 0.0;
            player.is_in_byo_yomi = false;
        }
        TimeControl::Fischer { main_time_secs, .. } => {
            player.time_remaining = *main_time_secs;
            player.byo_yomi_periods_left = 0;
            player.byo_yomi_time_left = 0.0;
            player.is_in_byo_yomi = false;
        }
    }
}

/// Apply the clock cost of a move that took `elapsed_secs` to make, via a
/// deduct/reset/consume-period/forfeit ladder, mutating the wire `Player`
/// record directly.
///
/// Returns `true` if the move exhausted the player's clock (a flag/forfeit
/// the caller must turn into `playerTimeout` + game end).
pub fn apply_move(player: &mut Player, tc: &TimeControl, elapsed_secs: f64) -> bool {
    match tc {
        TimeControl::None => false,
        TimeControl::Fischer { increment_secs, .. } => {
            player.time_remaining -= elapsed_secs;
            let flagged = player.time_remaining <= 0.0;
            player.time_remaining += increment_secs;
            flagged
        }
        TimeControl::Blitz { time_per_move_secs } => {
            let flagged = elapsed_secs > *time_per_move_secs;
            player.time_remaining = *time_per_move_secs;
            flagged
        }
        TimeControl::Standard { byo_yomi_time_secs, .. } => {
            if player.is_in_byo_yomi {
                if elapsed_secs <= player.byo_yomi_time_left {
                    player.byo_yomi_time_left = *byo_yomi_time_secs;
                    false
                } else if player.byo_yomi_periods_left > 1 {
                    player.byo_yomi_periods_left -= 1;
                    player.byo_yomi_time_left = *byo_yomi_time_secs;
                    false
                } else {
                    player.byo_yomi_periods_left = 0;
                    true
                }
            } else if elapsed_secs <= player.time_remaining {
                player.time_remaining -= elapsed_secs;
                false
            } else if player.byo_yomi_periods_left > 0 {
                player.is_in_byo_yomi = true;
                player.byo_yomi_time_left = *byo_yomi_time_secs;
                player.time_remaining = 0.0;
                false
            } else {
                player.time_remaining = 0.0;
                true
            }
        }
    }
}

/// Real-time remaining seconds for the player whose clock is currently
/// ticking, for `timeUpdate` broadcasts between moves. Does not mutate
/// stored time — authoritative deduction only happens at move commit.
pub fn live_remaining(player: &Player, started_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let elapsed = (now - started_at).num_milliseconds().max(0) as f64 / 1000.0;
    if player.is_in_byo_yomi {
        (player.byo_yomi_time_left - elapsed).max(0.0)
    } else {
        (player.time_remaining - elapsed).max(0.0)
    }
}

/// Whether the player's clock has already run out mid-think, as of `now`.
/// Unlike [`apply_move`] this never mutates; it projects the same
/// deduct/byo-yomi ladder forward to decide whether `timerTick` should
/// flag a timeout before the mover ever commits a move. A standard-clock
/// player whose main time would run out but who still has byo-yomi
/// periods in reserve is not flagged — that transition only happens at
/// commit, same as `apply_move`.
pub fn is_flagged(player: &Player, tc: &TimeControl, started_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let elapsed = (now - started_at).num_milliseconds().max(0) as f64 / 1000.0;
    match tc {
        TimeControl::None => false,
        TimeControl::Blitz { time_per_move_secs } => elapsed > *time_per_move_secs,
        TimeControl::Fischer { .. } => elapsed > player.time_remaining,
        TimeControl::Standard { .. } => {
            if player.is_in_byo_yomi {
                elapsed > player.byo_yomi_time_left && player.byo_yomi_periods_left <= 1
            } else {
                elapsed > player.time_remaining && player.byo_yomi_periods_left == 0
            }
        }
    }
}
