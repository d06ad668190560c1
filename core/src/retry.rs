// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Retry policies.

use crate::{Error, Result};
use log::debug;
use rand::Rng;
use std::fmt::Debug;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Why an attempt may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    /// 5xx responses and I/O failures.
    Transient,
    /// The service asked the client to slow down.
    Throttling,
}

/// State of one call across its attempts.
#[derive(Debug)]
pub struct RetryContext {
    attempts: u32,
    started: Instant,
    last_error: Option<String>,
    last_status: Option<http::StatusCode>,
    retry_tokens: usize,
}

impl Default for RetryContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryContext {
    /// A context before the first attempt.
    pub fn new() -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
            last_error: None,
            last_status: None,
            retry_tokens: 0,
        }
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Time since the call started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Rendered error of the last failed attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// HTTP status of the last failed attempt, if it got a response.
    pub fn last_status(&self) -> Option<http::StatusCode> {
        self.last_status
    }

    /// Retry tokens this call holds.
    pub fn retry_tokens(&self) -> usize {
        self.retry_tokens
    }

    pub(crate) fn start_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    pub(crate) fn record_failure(&mut self, err: &Error) {
        self.last_error = Some(err.to_string());
        self.last_status = err.status();
    }

    fn add_retry_tokens(&mut self, n: usize) {
        self.retry_tokens += n;
    }
}

/// RetryPolicy decides whether and when a failed attempt is retried.
pub trait RetryPolicy: Debug + Send + Sync + 'static {
    /// Upper bound of attempts, the first one included.
    fn max_attempts(&self) -> u32;

    /// Whether another attempt may start. Called only when attempts remain.
    fn should_retry(&self, ctx: &mut RetryContext, kind: RetryKind) -> bool;

    /// Delay before the attempt following attempt number `attempt` (1-based).
    fn backoff_delay(&self, attempt: u32, kind: RetryKind) -> Duration;

    /// The call succeeded.
    fn on_success(&self, ctx: &RetryContext) {
        let _ = ctx;
    }
}

/// NoRetryPolicy makes exactly one attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetryPolicy;

impl RetryPolicy for NoRetryPolicy {
    fn max_attempts(&self) -> u32 {
        1
    }

    fn should_retry(&self, _: &mut RetryContext, _: RetryKind) -> bool {
        false
    }

    fn backoff_delay(&self, _: u32, _: RetryKind) -> Duration {
        Duration::ZERO
    }
}

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Always wait the same time.
    Fixed(Duration),
    /// Exponential backoff with full jitter: a uniform delay in
    /// `[0, min(max, base * 2^(attempt-1))]`.
    FullJitter {
        /// Base delay for transient failures.
        base: Duration,
        /// Base delay for throttling.
        throttling_base: Duration,
        /// Upper bound of any delay.
        max: Duration,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::FullJitter {
            base: Duration::from_millis(100),
            throttling_base: Duration::from_secs(1),
            max: Duration::from_secs(20),
        }
    }
}

impl Backoff {
    /// Upper bound of the delay after attempt `attempt`.
    pub fn ceiling(&self, attempt: u32, kind: RetryKind) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(d) => d,
            Backoff::FullJitter {
                base,
                throttling_base,
                max,
            } => {
                let base = match kind {
                    RetryKind::Transient => base,
                    RetryKind::Throttling => throttling_base,
                };
                let exp = attempt.saturating_sub(1).min(31);
                base.checked_mul(1u32 << exp).unwrap_or(max).min(max)
            }
        }
    }

    /// Delay after attempt `attempt`.
    pub fn delay(&self, attempt: u32, kind: RetryKind) -> Duration {
        match self {
            Backoff::FullJitter { .. } => {
                let ceiling = self.ceiling(attempt, kind);
                ceiling.mul_f64(rand::thread_rng().gen_range(0.0..=1.0))
            }
            _ => self.ceiling(attempt, kind),
        }
    }
}

/// Configuration of [`StandardRetryPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Upper bound of attempts, the first one included. Must be at least 1.
    pub max_attempts: u32,
    /// Delay strategy.
    pub backoff: Backoff,
    /// Whether retries draw from the shared retry token bucket.
    pub token_bucket: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
            token_bucket: true,
        }
    }
}

/// Tokens in a full bucket.
pub const TOKEN_BUCKET_CAPACITY: usize = 500;
/// Tokens one retry costs.
pub const RETRY_COST: usize = 5;

/// StandardRetryPolicy retries transient and throttling failures with jittered
/// exponential backoff, rate limited by a token bucket shared by every call
/// that uses the same policy.
#[derive(Debug)]
pub struct StandardRetryPolicy {
    config: RetryConfig,
    tokens: Mutex<usize>,
}

impl Default for StandardRetryPolicy {
    fn default() -> Self {
        Self {
            config: RetryConfig::default(),
            tokens: Mutex::new(TOKEN_BUCKET_CAPACITY),
        }
    }
}

impl StandardRetryPolicy {
    /// Create a policy, validating `config`.
    pub fn new(config: RetryConfig) -> Result<Self> {
        if config.max_attempts == 0 {
            return Err(Error::config_invalid("max_attempts must be at least 1"));
        }
        Ok(Self {
            config,
            tokens: Mutex::new(TOKEN_BUCKET_CAPACITY),
        })
    }

    /// Tokens left in the bucket.
    pub fn available_tokens(&self) -> usize {
        *self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_acquire(&self, cost: usize) -> Option<usize> {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        if *tokens < cost {
            return None;
        }
        *tokens -= cost;
        Some(*tokens)
    }

    fn release(&self, n: usize) {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        *tokens = (*tokens + n).min(TOKEN_BUCKET_CAPACITY);
    }
}

impl RetryPolicy for StandardRetryPolicy {
    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    fn should_retry(&self, ctx: &mut RetryContext, kind: RetryKind) -> bool {
        if ctx.attempts() >= self.config.max_attempts {
            debug!("request will not be retried, retries have been exhausted");
            return false;
        }
        if !self.config.token_bucket {
            return true;
        }

        match self.try_acquire(RETRY_COST) {
            Some(left) => {
                ctx.add_retry_tokens(RETRY_COST);
                debug!(
                    "request attempt {} token acquired for {kind:?} retry (cost: {RETRY_COST}, capacity: {left}/{TOKEN_BUCKET_CAPACITY})",
                    ctx.attempts() + 1
                );
                true
            }
            None => {
                debug!(
                    "request will not be retried, retry token bucket is empty (capacity: {}/{TOKEN_BUCKET_CAPACITY})",
                    self.available_tokens()
                );
                false
            }
        }
    }

    fn backoff_delay(&self, attempt: u32, kind: RetryKind) -> Duration {
        self.config.backoff.delay(attempt, kind)
    }

    fn on_success(&self, ctx: &RetryContext) {
        if self.config.token_bucket {
            self.release(ctx.retry_tokens().max(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn policy(max_attempts: u32) -> StandardRetryPolicy {
        StandardRetryPolicy::new(RetryConfig {
            max_attempts,
            backoff: Backoff::None,
            token_bucket: true,
        })
        .expect("config must be valid")
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = StandardRetryPolicy::new(RetryConfig {
            max_attempts: 0,
            ..Default::default()
        })
        .expect_err("must fail");
        assert_eq!(err.kind(), crate::ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_attempt_limit() {
        let p = policy(3);
        let mut ctx = RetryContext::new();
        ctx.start_attempt();
        assert!(p.should_retry(&mut ctx, RetryKind::Transient));
        ctx.start_attempt();
        assert!(p.should_retry(&mut ctx, RetryKind::Throttling));
        ctx.start_attempt();
        assert!(!p.should_retry(&mut ctx, RetryKind::Transient));
        assert_eq!(ctx.retry_tokens(), 2 * RETRY_COST);
    }

    #[test]
    fn test_token_bucket_drains_and_refills() {
        let p = policy(u32::MAX);
        let mut ctx = RetryContext::new();
        ctx.start_attempt();
        for _ in 0..TOKEN_BUCKET_CAPACITY / RETRY_COST {
            assert!(p.should_retry(&mut ctx, RetryKind::Transient));
        }
        assert_eq!(p.available_tokens(), 0);
        assert!(!p.should_retry(&mut ctx, RetryKind::Transient));

        p.on_success(&ctx);
        assert_eq!(p.available_tokens(), TOKEN_BUCKET_CAPACITY);
    }

    #[test]
    fn test_success_without_retry_refunds_one() {
        let p = policy(3);
        let mut ctx = RetryContext::new();
        ctx.start_attempt();
        assert!(p.should_retry(&mut ctx, RetryKind::Transient));
        assert_eq!(p.available_tokens(), TOKEN_BUCKET_CAPACITY - RETRY_COST);

        // A different call that succeeded first try.
        p.on_success(&RetryContext::new());
        assert_eq!(p.available_tokens(), TOKEN_BUCKET_CAPACITY - RETRY_COST + 1);
    }

    #[test]
    fn test_bucket_disabled() {
        let p = StandardRetryPolicy::new(RetryConfig {
            max_attempts: 1000,
            backoff: Backoff::None,
            token_bucket: false,
        })
        .expect("config must be valid");
        let mut ctx = RetryContext::new();
        ctx.start_attempt();
        for _ in 0..200 {
            assert!(p.should_retry(&mut ctx, RetryKind::Transient));
        }
        assert_eq!(p.available_tokens(), TOKEN_BUCKET_CAPACITY);
    }

    #[test_case(1, RetryKind::Transient, 100)]
    #[test_case(2, RetryKind::Transient, 200)]
    #[test_case(4, RetryKind::Transient, 800)]
    #[test_case(1, RetryKind::Throttling, 1_000)]
    #[test_case(3, RetryKind::Throttling, 4_000)]
    #[test_case(10, RetryKind::Throttling, 20_000)]
    #[test_case(64, RetryKind::Transient, 20_000)]
    fn test_full_jitter_ceiling(attempt: u32, kind: RetryKind, millis: u64) {
        let backoff = Backoff::default();
        let ceiling = backoff.ceiling(attempt, kind);
        assert_eq!(ceiling, Duration::from_millis(millis));
        for _ in 0..32 {
            assert!(backoff.delay(attempt, kind) <= ceiling);
        }
    }

    #[test]
    fn test_no_retry_policy() {
        let mut ctx = RetryContext::new();
        ctx.start_attempt();
        assert_eq!(NoRetryPolicy.max_attempts(), 1);
        assert!(!NoRetryPolicy.should_retry(&mut ctx, RetryKind::Throttling));
        assert_eq!(
            Backoff::Fixed(Duration::from_millis(5)).delay(9, RetryKind::Transient),
            Duration::from_millis(5)
        );
    }
}
