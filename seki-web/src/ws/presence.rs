use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// How long a player can be fully disconnected before the game treats them
/// as gone. Five minutes — enough room for a dropped wifi or a phone going
/// to sleep without forfeiting a slow-to-reconnect opponent's clock.
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Per-player connection tracking with grace-period disconnect.
///
/// Each WS connection increments the player's count. When count drops to
/// zero, a timer starts. If no new connection arrives before the timer
/// fires, the disconnect callback runs.
#[derive(Debug, Clone)]
pub struct UserPresence {
    inner: Arc<RwLock<PresenceInner>>,
    grace_period: Duration,
}

#[derive(Debug, Default)]
struct PresenceInner {
    connections: HashMap<String, usize>,
    timers: HashMap<String, JoinHandle<()>>,
}

impl Default for UserPresence {
    fn default() -> Self {
        Self::new()
    }
}

impl UserPresence {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(PresenceInner::default())),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Create with a custom grace period (useful for tests).
    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self { inner: Arc::new(RwLock::new(PresenceInner::default())), grace_period }
    }

    /// Register a new WS connection for a player.
    /// Returns `true` if the player was previously marked as disconnected
    /// (i.e. had zero connections and a pending timer was cancelled).
    pub async fn connect(&self, player_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        let count = inner.connections.entry(player_id.to_string()).or_insert(0);
        *count += 1;

        if let Some(handle) = inner.timers.remove(player_id) {
            handle.abort();
            return true;
        }
        false
    }

    /// Unregister a WS connection for a player.
    /// If count drops to zero, starts a grace-period timer that calls
    /// `callback` if no reconnection happens in time.
    pub async fn disconnect<F>(&self, player_id: &str, callback: F)
    where
        F: FnOnce(String) + Send + 'static,
    {
        let mut inner = self.inner.write().await;
        if let Some(count) = inner.connections.get_mut(player_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                inner.connections.remove(player_id);

                let presence = self.inner.clone();
                let grace = self.grace_period;
                let id = player_id.to_string();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    let mut inner = presence.write().await;
                    inner.timers.remove(&id);
                    if !inner.connections.contains_key(&id) {
                        drop(inner);
                        callback(id);
                    }
                });
                inner.timers.insert(player_id.to_string(), handle);
            }
        }
    }

    /// Check if a player currently has at least one active connection.
    pub async fn is_connected(&self, player_id: &str) -> bool {
        let inner = self.inner.read().await;
        inner.connections.get(player_id).is_some_and(|count| *count > 0)
    }
}
