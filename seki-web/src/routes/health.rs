//! Liveness probe. No readiness check against the session store is done
//! here — an unreachable Redis only fails the commands that need it, and
//! a load balancer shouldn't pull an instance just because its store is
//! briefly slow.

pub async fn health_check() -> &'static str {
    "ok"
}
