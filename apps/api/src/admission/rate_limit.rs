//! Two-tier fixed-window rate limiter.
//!
//! Each `(tier, identifier)` pair owns one counter that resets completely when
//! its window ends. The minute tier bounds bursts, the daily tier bounds total
//! usage; they are counted independently.
//!
//! State lives in a `DashMap`, so an increment locks only the shard holding
//! its key. Expired entries are swept opportunistically on a random fraction
//! of calls instead of by a background task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use dashmap::DashMap;
use tracing::debug;

use crate::admission::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use crate::errors::{AppError, ErrorCode};

pub const HEADER_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const HEADER_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Minute,
    Daily,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Minute => "minute",
            Tier::Daily => "daily",
        }
    }

    pub fn error_code(self) -> ErrorCode {
        match self {
            Tier::Minute => ErrorCode::RateLimitExceeded,
            Tier::Daily => ErrorCode::DailyLimitExceeded,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TierLimit {
    max: u32,
    window: Duration,
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at: Instant,
}

/// Outcome of one tier check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub tier: Tier,
    pub limited: bool,
    pub remaining: u32,
    pub reset_in: Duration,
    /// Zero unless `limited`.
    pub retry_after_secs: u64,
}

impl RateLimitDecision {
    pub fn reset_in_ms(&self) -> u64 {
        self.reset_in.as_millis() as u64
    }

    /// Seconds until the window resets, rounded up.
    pub fn reset_in_secs(&self) -> u64 {
        self.reset_in_ms().div_ceil(1000)
    }

    /// The decision that leaves the caller fewer requests. Minute wins ties.
    pub fn tighter(self, other: RateLimitDecision) -> RateLimitDecision {
        if other.remaining < self.remaining {
            other
        } else {
            self
        }
    }

    /// Writes `X-RateLimit-Remaining`, `X-RateLimit-Reset` and, when a delay
    /// applies, `Retry-After`.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(HEADER_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(HEADER_RESET, HeaderValue::from(self.reset_in_secs()));
        if self.retry_after_secs > 0 {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(self.retry_after_secs));
        }
    }

    pub fn into_error(self) -> AppError {
        AppError::RateLimited {
            code: self.tier.error_code(),
            tier: self.tier.as_str(),
            retry_after: self.retry_after_secs,
        }
    }
}

/// Process-wide limiter. Construct once at startup and share via `Arc`.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    minute: TierLimit,
    daily: TierLimit,
    sweep_probability: f64,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            minute: TierLimit {
                max: config.per_minute,
                window: config.minute_window,
            },
            daily: TierLimit {
                max: config.per_day,
                window: config.daily_window,
            },
            sweep_probability: config.sweep_probability,
            clock,
        }
    }

    fn limit(&self, tier: Tier) -> TierLimit {
        match tier {
            Tier::Minute => self.minute,
            Tier::Daily => self.daily,
        }
    }

    fn key(tier: Tier, identifier: &str) -> String {
        format!("{}:{}", tier.as_str(), identifier)
    }

    /// Counts one request against `tier` for `identifier`.
    pub fn check(&self, identifier: &str, tier: Tier) -> RateLimitDecision {
        let now = self.clock.now();

        // Sweep before taking the entry guard: retain() locks every shard.
        if self.sweep_probability > 0.0 && rand::random::<f64>() < self.sweep_probability {
            self.sweep_expired_at(now);
        }

        let limit = self.limit(tier);
        let fresh = RateLimitEntry {
            count: 0,
            reset_at: now + limit.window,
        };

        let mut entry = self
            .entries
            .entry(Self::key(tier, identifier))
            .or_insert(fresh);
        if now >= entry.reset_at {
            *entry = fresh;
        }
        entry.count = entry.count.saturating_add(1);

        let count = entry.count;
        let reset_in = entry.reset_at.saturating_duration_since(now);
        drop(entry);

        if count > limit.max {
            RateLimitDecision {
                tier,
                limited: true,
                remaining: 0,
                reset_in,
                retry_after_secs: (reset_in.as_millis() as u64).div_ceil(1000),
            }
        } else {
            RateLimitDecision {
                tier,
                limited: false,
                remaining: limit.max - count,
                reset_in,
                retry_after_secs: 0,
            }
        }
    }

    /// Reports the current state of a tier without counting a request.
    pub fn peek(&self, identifier: &str, tier: Tier) -> RateLimitDecision {
        let now = self.clock.now();
        let limit = self.limit(tier);

        let active = self
            .entries
            .get(&Self::key(tier, identifier))
            .map(|entry| *entry)
            .filter(|entry| now < entry.reset_at);

        match active {
            Some(entry) => {
                let reset_in = entry.reset_at.saturating_duration_since(now);
                let exhausted = entry.count >= limit.max;
                RateLimitDecision {
                    tier,
                    limited: exhausted,
                    remaining: limit.max.saturating_sub(entry.count),
                    reset_in,
                    retry_after_secs: if exhausted {
                        (reset_in.as_millis() as u64).div_ceil(1000)
                    } else {
                        0
                    },
                }
            }
            None => RateLimitDecision {
                tier,
                limited: false,
                remaining: limit.max,
                reset_in: limit.window,
                retry_after_secs: 0,
            },
        }
    }

    /// Runs the minute tier, then the daily tier. The first tier that rejects
    /// ends the check, so a burst rejection never consumes daily quota.
    ///
    /// `Ok` carries the tighter of the two decisions for response headers.
    pub fn admit(&self, identifier: &str) -> Result<RateLimitDecision, RateLimitDecision> {
        let minute = self.check(identifier, Tier::Minute);
        if minute.limited {
            return Err(minute);
        }
        let daily = self.check(identifier, Tier::Daily);
        if daily.limited {
            return Err(daily);
        }
        Ok(minute.tighter(daily))
    }

    /// Drops every entry whose window has ended. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(self.clock.now())
    }

    fn sweep_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.reset_at);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!("Rate limiter swept {removed} expired entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::clock::MockClock;

    fn config(per_minute: u32, per_day: u32) -> RateLimitConfig {
        RateLimitConfig {
            per_minute,
            minute_window: Duration::from_secs(60),
            per_day,
            daily_window: Duration::from_secs(24 * 60 * 60),
            sweep_probability: 0.0,
        }
    }

    fn limiter(per_minute: u32, per_day: u32) -> (RateLimiter, MockClock) {
        let clock = MockClock::new(Instant::now());
        let limiter = RateLimiter::with_clock(&config(per_minute, per_day), Arc::new(clock.clone()));
        (limiter, clock)
    }

    #[test]
    fn test_first_request_opens_window() {
        let (limiter, _) = limiter(5, 100);
        let d = limiter.check("1.2.3.4", Tier::Minute);
        assert!(!d.limited);
        assert_eq!(d.remaining, 4);
        assert_eq!(d.reset_in, Duration::from_secs(60));
        assert_eq!(d.retry_after_secs, 0);
    }

    #[test]
    fn test_max_accepted_and_max_plus_one_rejected() {
        let (limiter, clock) = limiter(3, 100);
        for expected_remaining in [2, 1, 0] {
            let d = limiter.check("ip", Tier::Minute);
            assert!(!d.limited);
            assert_eq!(d.remaining, expected_remaining);
        }
        clock.advance(Duration::from_millis(20_500));
        let d = limiter.check("ip", Tier::Minute);
        assert!(d.limited);
        assert_eq!(d.remaining, 0);
        assert_eq!(d.reset_in_ms(), 39_500);
        assert_eq!(d.retry_after_secs, 40);
    }

    #[test]
    fn test_daily_tier_is_independent() {
        let (limiter, _) = limiter(100, 2);
        assert!(!limiter.check("ip", Tier::Daily).limited);
        assert!(!limiter.check("ip", Tier::Daily).limited);
        assert!(limiter.check("ip", Tier::Daily).limited);
        // The minute tier for the same identifier is untouched.
        assert_eq!(limiter.check("ip", Tier::Minute).remaining, 99);
    }

    #[test]
    fn test_window_expiry_starts_fresh_count() {
        let (limiter, clock) = limiter(2, 100);
        limiter.check("ip", Tier::Minute);
        limiter.check("ip", Tier::Minute);
        assert!(limiter.check("ip", Tier::Minute).limited);

        clock.advance(Duration::from_secs(60));
        let d = limiter.check("ip", Tier::Minute);
        assert!(!d.limited);
        assert_eq!(d.remaining, 1);
        assert_eq!(d.reset_in, Duration::from_secs(60));
    }

    #[test]
    fn test_identifiers_do_not_share_state() {
        let (limiter, _) = limiter(1, 100);
        limiter.check("a", Tier::Minute);
        assert!(limiter.check("a", Tier::Minute).limited);
        assert!(!limiter.check("b", Tier::Minute).limited);
    }

    #[test]
    fn test_admit_stops_at_minute_tier() {
        let (limiter, _) = limiter(1, 10);
        assert!(limiter.admit("ip").is_ok());
        let rejected = limiter.admit("ip").unwrap_err();
        assert_eq!(rejected.tier, Tier::Minute);
        // Only the first admitted request reached the daily tier.
        assert_eq!(limiter.peek("ip", Tier::Daily).remaining, 9);
    }

    #[test]
    fn test_admit_reports_daily_rejection() {
        let (limiter, _) = limiter(10, 1);
        assert!(limiter.admit("ip").is_ok());
        let rejected = limiter.admit("ip").unwrap_err();
        assert_eq!(rejected.tier, Tier::Daily);
        assert_eq!(rejected.retry_after_secs, 24 * 60 * 60);
        assert_eq!(
            rejected.into_error().to_api_error().error_code,
            ErrorCode::DailyLimitExceeded
        );
    }

    #[test]
    fn test_admit_surfaces_tighter_tier() {
        let (limiter, _) = limiter(10, 3);
        let d = limiter.admit("ip").unwrap();
        assert_eq!(d.tier, Tier::Daily);
        assert_eq!(d.remaining, 2);
    }

    #[test]
    fn test_peek_does_not_count() {
        let (limiter, _) = limiter(2, 100);
        assert_eq!(limiter.peek("ip", Tier::Minute).remaining, 2);
        limiter.check("ip", Tier::Minute);
        assert_eq!(limiter.peek("ip", Tier::Minute).remaining, 1);
        assert_eq!(limiter.peek("ip", Tier::Minute).remaining, 1);
        limiter.check("ip", Tier::Minute);
        let exhausted = limiter.peek("ip", Tier::Minute);
        assert!(exhausted.limited);
        assert_eq!(exhausted.retry_after_secs, 60);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (limiter, clock) = limiter(5, 100);
        limiter.check("old", Tier::Minute);
        limiter.check("old", Tier::Daily);
        clock.advance(Duration::from_secs(61));
        limiter.check("new", Tier::Minute);
        assert_eq!(limiter.len(), 3);
        assert_eq!(limiter.sweep_expired(), 1);
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn test_probabilistic_sweep_runs_on_check() {
        let clock = MockClock::new(Instant::now());
        let mut cfg = config(5, 100);
        cfg.sweep_probability = 1.0;
        let limiter = RateLimiter::with_clock(&cfg, Arc::new(clock.clone()));
        limiter.check("old", Tier::Minute);
        clock.advance(Duration::from_secs(61));
        limiter.check("new", Tier::Minute);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_concurrent_increments_are_atomic() {
        let (limiter, _) = limiter(100, 10_000);
        let limiter = Arc::new(limiter);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| !limiter.check("shared", Tier::Minute).limited)
                        .count()
                })
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
    }

    #[test]
    fn test_headers_written() {
        let decision = RateLimitDecision {
            tier: Tier::Minute,
            limited: true,
            remaining: 0,
            reset_in: Duration::from_millis(1_200),
            retry_after_secs: 2,
        };
        let mut headers = HeaderMap::new();
        decision.apply_headers(&mut headers);
        assert_eq!(headers["x-ratelimit-remaining"], "0");
        assert_eq!(headers["x-ratelimit-reset"], "2");
        assert_eq!(headers["retry-after"], "2");
    }

    #[test]
    fn test_retry_after_omitted_when_not_limited() {
        let (limiter, _) = limiter(5, 100);
        let mut headers = HeaderMap::new();
        limiter.check("ip", Tier::Minute).apply_headers(&mut headers);
        assert_eq!(headers["x-ratelimit-remaining"], "4");
        assert_eq!(headers["x-ratelimit-reset"], "60");
        assert!(headers.get("retry-after").is_none());
    }
}
