//! Periodic safety-net sweep that flags clocks which ran out without a
//! client-sent `timerTick` (the owning player disconnected, or simply
//! never polled). Iterates the locally-visible games this process's
//! registry already tracks — a store-wide scan isn't needed since every
//! game with a live connection is visible to some process's sweep, and
//! the session store's own TTL reclaims anything with no connections at all.

use std::time::Duration;

use crate::ws::handler;
use crate::AppState;

pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(5));
    loop {
        interval.tick().await;
        sweep(&state).await;
    }
}

async fn sweep(state: &AppState) {
    for game_id in state.registry.active_game_ids().await {
        let store = state.store.clone();
        let gid = game_id.clone();
        let result = state
            .executor
            .run(&game_id, || async move { crate::services::session_engine::timer_tick(store.as_ref(), &gid.0).await })
            .await;
        match result {
            Ok(effect) => handler::deliver(state, &game_id, effect).await,
            Err(e) => tracing::error!("clock sweep: {game_id}: {e}"),
        }
    }
}
