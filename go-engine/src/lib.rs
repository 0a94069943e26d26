pub mod error;
pub mod goban;
pub mod handicap;
pub mod ko;
pub mod stone;
pub mod territory;
pub mod turn;

pub type Point = (u8, u8);

pub use error::GoError;
pub use goban::{Captures, GameState, Goban};
pub use ko::Ko;
pub use stone::Stone;
pub use territory::ScoringRule;
pub use turn::{Move, Turn};
