pub mod clock;
pub mod clock_sweep;
pub mod session_engine;
