//! Per-request context, timing, logging, and error normalization.
//!
//! A request moves `received -> executing -> completed | failed` and is
//! never retried. Failures leave the middleware as a [`NormalizedError`]
//! whose message is safe to hand to the client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::RateLimitConfig;
use crate::errors::{ContextError, Result};

use super::rate_limit::{RateLimitDecision, SlidingWindowLimiter};
use super::transport::ErrorCode;

/// Read-only facts about one in-flight request.
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub params: Option<Value>,
    pub caller: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    Executing,
    Completed,
    Failed,
}

impl RequestPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestPhase::Received => "received",
            RequestPhase::Executing => "executing",
            RequestPhase::Completed => "completed",
            RequestPhase::Failed => "failed",
        }
    }
}

/// A classified failure ready to become a JSON-RPC error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    pub code: ErrorCode,
    pub message: String,
}

/// Classifies an error into a protocol code and a client-facing message.
///
/// The original message is kept for validation, not-found, and permission
/// errors; internal errors are replaced by a generic phrase.
pub fn normalize_error(err: &ContextError) -> NormalizedError {
    match err {
        ContextError::Validation { message } => NormalizedError {
            code: ErrorCode::InvalidParams,
            message: format!("Invalid request: {}", message),
        },
        ContextError::NotFound { message } => NormalizedError {
            code: ErrorCode::ResourceNotFound,
            message: format!("Resource not found: {}", message),
        },
        ContextError::Permission { message } => NormalizedError {
            code: ErrorCode::PermissionDenied,
            message: format!("Permission denied: {}", message),
        },
        ContextError::Internal { .. } => NormalizedError {
            code: ErrorCode::InternalError,
            message: "Internal server error: an unexpected error occurred".to_string(),
        },
    }
}

/// Expired rate limit windows are dropped once every this many checks.
const PRUNE_EVERY: u64 = 256;

/// Wraps every handler invocation of the server.
pub struct Middleware {
    next_id: AtomicU64,
    checks: AtomicU64,
    limiter: Option<SlidingWindowLimiter>,
}

impl Middleware {
    pub fn new(rate_limit: &RateLimitConfig) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            checks: AtomicU64::new(0),
            limiter: SlidingWindowLimiter::from_config(rate_limit),
        }
    }

    /// A middleware that never rate limits.
    pub fn unlimited() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            checks: AtomicU64::new(0),
            limiter: None,
        }
    }

    /// Creates a fresh context with a unique request id.
    pub fn context(&self, method: &str, params: Option<&Value>, caller: &str) -> MiddlewareContext {
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timestamp = Utc::now();
        MiddlewareContext {
            request_id: format!("req-{:x}-{}", timestamp.timestamp_millis(), seq),
            timestamp,
            method: method.to_string(),
            params: params.cloned(),
            caller: caller.to_string(),
        }
    }

    /// Runs `op` under a new context: rate limit check, timing, structured
    /// logging, and error normalization. Successful results pass through
    /// unchanged.
    pub fn run<F>(
        &self,
        method: &str,
        params: Option<&Value>,
        caller: &str,
        op: F,
    ) -> std::result::Result<Value, NormalizedError>
    where
        F: FnOnce(&MiddlewareContext) -> Result<Value>,
    {
        let ctx = self.context(method, params, caller);
        debug!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            caller = %ctx.caller,
            phase = RequestPhase::Received.as_str(),
            "request received"
        );

        let start = Instant::now();
        let result = self.admit(&ctx).and_then(|()| {
            debug!(
                request_id = %ctx.request_id,
                phase = RequestPhase::Executing.as_str(),
                "executing request"
            );
            op(&ctx)
        });
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                info!(
                    request_id = %ctx.request_id,
                    method = %ctx.method,
                    duration_ms,
                    phase = RequestPhase::Completed.as_str(),
                    "request completed"
                );
                Ok(value)
            }
            Err(err) => {
                warn!(
                    request_id = %ctx.request_id,
                    method = %ctx.method,
                    duration_ms,
                    kind = err.kind(),
                    error = %err,
                    phase = RequestPhase::Failed.as_str(),
                    "request failed"
                );
                Err(normalize_error(&err))
            }
        }
    }

    fn admit(&self, ctx: &MiddlewareContext) -> Result<()> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        let decision = limiter.check(&ctx.caller);
        if (self.checks.fetch_add(1, Ordering::Relaxed) + 1) % PRUNE_EVERY == 0 {
            limiter.prune(Instant::now());
            debug!(callers = limiter.tracked_callers(), "pruned rate limit windows");
        }
        match decision {
            RateLimitDecision::Allowed { .. } => Ok(()),
            RateLimitDecision::Rejected { retry_after } => Err(ContextError::validation(format!(
                "rate limit exceeded ({} requests per {}s); retry in {}s",
                limiter.max_requests(),
                limiter.window().as_secs(),
                retry_after.as_secs().max(1)
            ))),
        }
    }
}
