//! Per-caller sliding window rate limiting.
//!
//! Each caller keeps the timestamps of its accepted requests inside the
//! current window. A request is rejected when the window already holds
//! `max_requests` entries. This map is the only state shared across
//! requests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::RateLimitConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Rejected { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Builds a limiter from configuration, or `None` when limiting is off.
    pub fn from_config(config: &RateLimitConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.max_requests, Duration::from_secs(config.window_secs)))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Records a request from `caller` now, if the window allows it.
    pub fn check(&self, caller: &str) -> RateLimitDecision {
        self.check_at(caller, Instant::now())
    }

    /// Same as [`SlidingWindowLimiter::check`] with an explicit clock reading.
    pub fn check_at(&self, caller: &str, now: Instant) -> RateLimitDecision {
        let mut windows = self.windows.lock().unwrap_or_else(|p| p.into_inner());
        let stamps = windows.entry(caller.to_string()).or_default();

        while let Some(oldest) = stamps.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                stamps.pop_front();
            } else {
                break;
            }
        }

        if stamps.len() >= self.max_requests as usize {
            let retry_after = stamps
                .front()
                .map(|oldest| self.window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(self.window);
            debug!(caller, retry_after_ms = retry_after.as_millis() as u64, "rate limit exceeded");
            return RateLimitDecision::Rejected { retry_after };
        }

        stamps.push_back(now);
        RateLimitDecision::Allowed {
            remaining: self.max_requests - stamps.len() as u32,
        }
    }

    /// Drops callers whose windows have fully expired.
    pub fn prune(&self, now: Instant) {
        let mut windows = self.windows.lock().unwrap_or_else(|p| p.into_inner());
        windows.retain(|_, stamps| {
            stamps
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) < self.window)
        });
    }

    /// Number of callers currently tracked.
    pub fn tracked_callers(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_third_request_in_window_rejected_then_recovers() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(10));
        let t0 = Instant::now();

        assert_eq!(
            limiter.check_at("client", t0),
            RateLimitDecision::Allowed { remaining: 1 }
        );
        assert!(limiter.check_at("client", t0 + Duration::from_secs(1)).is_allowed());

        match limiter.check_at("client", t0 + Duration::from_secs(2)) {
            RateLimitDecision::Rejected { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(8))
            }
            other => panic!("expected rejection, got {:?}", other),
        }

        assert!(limiter
            .check_at("client", t0 + Duration::from_secs(11))
            .is_allowed());
    }

    #[test]
    fn test_callers_are_independent() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0).is_allowed());
        assert!(!limiter.check_at("a", t0).is_allowed());
        assert!(limiter.check_at("b", t0).is_allowed());
    }

    #[test]
    fn test_prune_removes_expired_callers() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(1));
        let t0 = Instant::now();
        limiter.check_at("a", t0);
        assert_eq!(limiter.tracked_callers(), 1);
        limiter.prune(t0 + Duration::from_secs(2));
        assert_eq!(limiter.tracked_callers(), 0);
    }

    #[test]
    fn test_disabled_config_builds_no_limiter() {
        let config = RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        };
        assert!(SlidingWindowLimiter::from_config(&config).is_none());
    }
}
