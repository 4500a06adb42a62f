//! Sliding-window request limiter keyed by client.
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use actix_web::HttpRequest;

// Number of checks between two sweeps of idle clients
const PURGE_EVERY: u64 = 256;

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    state: Mutex<LimiterState>,
}

#[derive(Default)]
struct LimiterState {
    hits: HashMap<String, VecDeque<Instant>>,
    checks: u64,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Counts a request for `key` at `now`.
    ///
    /// Returns the number of requests still allowed in the current window, or how long
    /// the caller has to wait before the oldest counted request leaves the window.
    pub fn check(&self, key: &str, now: Instant) -> Result<usize, Duration> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        state.checks += 1;
        if state.checks % PURGE_EVERY == 0 {
            let window = self.window;
            state.hits.retain(|_, hits| {
                hits.back()
                    .map_or(false, |last| now.saturating_duration_since(*last) < window)
            });
        }

        let hits = state.hits.entry(key.to_string()).or_default();

        while let Some(oldest) = hits.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                hits.pop_front();
            } else {
                break;
            }
        }

        if hits.len() >= self.max_requests {
            let oldest = hits.front().copied().unwrap_or(now);
            let retry_after = self.window - now.saturating_duration_since(oldest);

            return Err(retry_after);
        }

        hits.push_back(now);

        Ok(self.max_requests - hits.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.hits.len())
            .unwrap_or_default()
    }
}

/// Identifies the caller by the first `X-Forwarded-For` hop, falling back to the peer address.
pub fn client_key(request: &HttpRequest) -> String {
    request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .or_else(|| request.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| String::from("anonymous"))
}
