use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Illegal-move kinds the Board Rules Kernel can reject a move with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalMoveKind {
    Occupied,
    OutOfBounds,
    KoViolation,
    Suicide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    NotYourTurn,
    WrongPhase,
    UnknownGame,
    InvalidCommand,
    UnauthorizedForColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityKind {
    GameFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingKind {
    MoveDeadlineExceeded,
    Timeout,
}

#[derive(Debug)]
pub enum AppError {
    IllegalMove(IllegalMoveKind),
    Protocol(ProtocolKind),
    Capacity(CapacityKind),
    Timing(TimingKind),
    Store(String),
    Internal(String),
}

impl AppError {
    /// The `{kind, message}` pair sent to clients on the `error` channel.
    /// `kind` names the taxonomy entry; `message` is a human-readable
    /// summary for logging / debugging clients.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::IllegalMove(IllegalMoveKind::Occupied) => "Occupied",
            AppError::IllegalMove(IllegalMoveKind::OutOfBounds) => "OutOfBounds",
            AppError::IllegalMove(IllegalMoveKind::KoViolation) => "KoViolation",
            AppError::IllegalMove(IllegalMoveKind::Suicide) => "Suicide",
            AppError::Protocol(ProtocolKind::NotYourTurn) => "NotYourTurn",
            AppError::Protocol(ProtocolKind::WrongPhase) => "WrongPhase",
            AppError::Protocol(ProtocolKind::UnknownGame) => "UnknownGame",
            AppError::Protocol(ProtocolKind::InvalidCommand) => "InvalidCommand",
            AppError::Protocol(ProtocolKind::UnauthorizedForColor) => "UnauthorizedForColor",
            AppError::Capacity(CapacityKind::GameFull) => "GameFull",
            AppError::Timing(TimingKind::MoveDeadlineExceeded) => "MoveDeadlineExceeded",
            AppError::Timing(TimingKind::Timeout) => "Timeout",
            AppError::Store(_) => "StoreError",
            AppError::Internal(_) => "InternalError",
        }
    }

    pub fn from_go_error(e: go_engine::GoError) -> Self {
        use go_engine::GoError;
        match e {
            GoError::Overwrite => AppError::IllegalMove(IllegalMoveKind::Occupied),
            GoError::NotOnBoard => AppError::IllegalMove(IllegalMoveKind::OutOfBounds),
            GoError::KoViolation => AppError::IllegalMove(IllegalMoveKind::KoViolation),
            GoError::Suicide => AppError::IllegalMove(IllegalMoveKind::Suicide),
            GoError::OutOfTurn => AppError::Protocol(ProtocolKind::NotYourTurn),
        }
    }

    /// `{kind: "error", message, details?}` payload, sourced from one
    /// mapping instead of `e.to_string()`.
    pub fn to_event_json(&self) -> serde_json::Value {
        json!({
            "kind": "error",
            "errorKind": self.kind(),
            "message": self.to_string(),
        })
    }

    /// Whether this error is terminal for the game: timing errors end the
    /// game and broadcast to the group; everything else is recovered
    /// locally and sent only to the initiator.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppError::Timing(_))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::IllegalMove(k) => write!(f, "illegal move: {k:?}"),
            AppError::Protocol(k) => write!(f, "protocol error: {k:?}"),
            AppError::Capacity(k) => write!(f, "capacity error: {k:?}"),
            AppError::Timing(k) => write!(f, "timing error: {k:?}"),
            AppError::Store(msg) => write!(f, "store error: {msg}"),
            AppError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Protocol(ProtocolKind::UnknownGame) => StatusCode::NOT_FOUND,
            AppError::IllegalMove(_) | AppError::Protocol(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Capacity(_) => StatusCode::CONFLICT,
            AppError::Timing(_) => StatusCode::GONE,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if matches!(self, AppError::Store(_) | AppError::Internal(_)) {
            tracing::error!("{self}");
        }
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
