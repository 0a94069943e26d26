use std::sync::Arc;

use seki_web::services::clock_sweep;
use seki_web::store::{InMemoryStore, RedisStore, SessionStore};

/// `REDIS_URL` wins outright; otherwise assemble one from the discrete
/// `REDIS_HOST`/`REDIS_PORT`/`REDIS_PASSWORD` variables, defaulting the
/// port to Redis's own 6379 when a host is given without one.
fn redis_url_from_env() -> Option<String> {
    if let Ok(url) = std::env::var("REDIS_URL") {
        return Some(url);
    }
    let host = std::env::var("REDIS_HOST").ok()?;
    let port = std::env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
    match std::env::var("REDIS_PASSWORD") {
        Ok(password) if !password.is_empty() => Some(format!("redis://:{password}@{host}:{port}")),
        _ => Some(format!("redis://{host}:{port}")),
    }
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(std::env::var("SEKI_LOG").unwrap_or_else(|_| "seki_web=info".to_string()))
    });
    let is_production = std::env::var("ENVIRONMENT").is_ok_and(|v| v == "production");
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if is_production {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let store: Arc<dyn SessionStore> = match redis_url_from_env() {
        Some(url) => Arc::new(
            RedisStore::connect(&url)
                .await
                .expect("failed to connect to Redis"),
        ),
        None => {
            tracing::warn!(
                "no REDIS_URL/REDIS_HOST set, falling back to single-process in-memory session store"
            );
            Arc::new(InMemoryStore::new())
        }
    };

    let (app, state) = seki_web::build_router(store);
    tokio::spawn(clock_sweep::run(state));

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");
    tracing::info!("Starting seki-web on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await.expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
