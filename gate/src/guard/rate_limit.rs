//! Fixed-window rate limiter keyed by actor

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::errors::AccessDenied;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// At most `max_requests` per actor in each `window`.
///
/// The window starts at an actor's first request and resets once it has
/// expired, so bursts across a boundary are possible.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    counters: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            counters: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, actor_id: &str) -> Result<(), AccessDenied> {
        self.check_at(actor_id, Instant::now())
    }

    /// Count one request for `actor_id` at `now`
    pub fn check_at(&self, actor_id: &str, now: Instant) -> Result<(), AccessDenied> {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let entry = counters.entry(actor_id.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            let retry_after = self.window.saturating_sub(elapsed.min(self.window));
            return Err(AccessDenied::RateLimited { retry_after });
        }

        entry.count += 1;
        Ok(())
    }
}
