//! Sliding-window rate limiting for write endpoints, carried over from the
//! teacher's `rate_limit::RateLimiter` — same sliding-window-over-Instants
//! algorithm, trimmed to the one config knob this core's write surface
//! needs. 429s are surfaced through `AppError::RateLimited`, which already
//! carries the taxonomy's HTTP/JSON-RPC mapping, so the teacher's dedicated
//! `RateLimited<T>`/`RateLimitedError` response wrappers aren't needed here.

use std::collections::HashMap;
use std::env;
use std::sync::Mutex;
use std::time::Instant;

pub struct RateLimitConfig {
    /// Writes (send/createRoom) per minute per caller.
    pub writes_max: usize,
    pub writes_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { writes_max: 120, writes_window_secs: 60 }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = env::var("RATE_LIMIT_WRITES") {
            if let Ok(n) = v.parse::<usize>() {
                config.writes_max = n;
            }
        }
        config
    }
}

pub struct RateLimiter {
    limits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        RateLimiter { limits: Mutex::new(HashMap::new()) }
    }

    /// `key` is typically `"write:<tenant_id>:<user_id>"`.
    pub fn check(&self, key: &str, max: usize, window_secs: u64) -> bool {
        let mut limits = self.limits.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let window = std::time::Duration::from_secs(window_secs);

        let entries = limits.entry(key.to_string()).or_default();
        entries.retain(|t| now.duration_since(*t) < window);

        if entries.len() >= max {
            return false;
        }
        entries.push(now);
        true
    }
}
