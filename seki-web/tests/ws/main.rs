mod common;

mod chat;
mod disconnect;
mod game_lifecycle;
mod ko;
mod moves;
mod pass;
mod presence;
mod resign;
mod smoke;
mod territory;
mod undo;
