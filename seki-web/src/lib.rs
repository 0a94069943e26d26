use std::sync::Arc;

use axum::routing::get;
use axum::Router;

pub mod error;
pub mod model;
pub mod protocol;
pub mod routes;
pub mod services;
pub mod store;
pub mod ws;

use store::SessionStore;

/// Everything a connection or a background task needs to serve a command:
/// the session store (the single source of truth for `GameState`), the
/// local fan-out registry, the per-game write lock, and disconnect-grace
/// presence tracking. Cheap to clone — every field is an `Arc` underneath.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub registry: ws::registry::GameRegistry,
    pub executor: ws::executor::GameExecutor,
    pub presence: ws::presence::UserPresence,
}

pub fn build_router(store: Arc<dyn SessionStore>) -> (Router, AppState) {
    build_router_with_presence(store, ws::presence::UserPresence::new())
}

/// Same as [`build_router`], but with an injectable [`ws::presence::UserPresence`]
/// so tests can use a short disconnect-grace window instead of the
/// production five-minute default.
pub fn build_router_with_presence(
    store: Arc<dyn SessionStore>,
    presence: ws::presence::UserPresence,
) -> (Router, AppState) {
    let state = AppState {
        store,
        registry: ws::registry::GameRegistry::new(),
        executor: ws::executor::GameExecutor::new(),
        presence,
    };

    let app = Router::new()
        .route("/", get(routes::health::health_check))
        .route("/health", get(routes::health::health_check))
        .route("/ws", get(ws::handler::ws_upgrade))
        .with_state(state.clone());

    (app, state)
}
