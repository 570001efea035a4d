//! Async token bucket shared by every request the client sends.
//!
//! The bucket holds up to `capacity` tokens and refills continuously at
//! `rate` tokens per second. [`TokenBucket::acquire`] waits until enough
//! tokens are available and deducts them. The state lock is never held
//! across an `.await`, so a sleeping caller does not block others.
//!
//! Tokens are only deducted while the lock is held and the request can be
//! satisfied. Dropping a pending `acquire` future (for example under
//! `tokio::time::timeout`) therefore leaves the bucket untouched.

use crate::error::{KalshiError, Result};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Float slack when comparing accumulated tokens against a request.
const EPSILON: f64 = 1e-9;

/// Longest single sleep. A slower refill is re-checked after this long.
const MAX_WAIT: Duration = Duration::from_secs(3600);

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket rate limiter.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a bucket refilling at `rate` tokens/sec with room for
    /// `capacity` tokens. The bucket starts full.
    ///
    /// # Errors
    /// Returns [`KalshiError::Configuration`] if `rate` is not positive or
    /// `capacity` is below one token.
    pub fn new(rate: f64, capacity: f64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(KalshiError::Configuration(format!(
                "rate limit must be positive, got {rate}"
            )));
        }
        if !capacity.is_finite() || capacity < 1.0 {
            return Err(KalshiError::Configuration(format!(
                "burst capacity must be at least 1, got {capacity}"
            )));
        }

        Ok(Self {
            rate,
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        })
    }

    /// Creates a bucket allowing one second of burst.
    ///
    /// # Errors
    /// Returns an error if `rate` is below one request per second.
    pub fn per_second(rate: f64) -> Result<Self> {
        Self::new(rate, rate)
    }

    /// Refill rate in tokens per second.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Maximum number of tokens the bucket holds.
    #[must_use]
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Returns the current token count after refilling.
    #[must_use]
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    /// Waits until `n` tokens are available and deducts them.
    ///
    /// Requests larger than the capacity are clamped to the capacity.
    pub async fn acquire(&self, n: u32) {
        let needed = self.clamp(n);

        loop {
            let wait = {
                let mut state = self.state.lock();
                self.refill(&mut state);

                if state.tokens + EPSILON >= needed {
                    state.tokens = (state.tokens - needed).max(0.0);
                    return;
                }

                (needed - state.tokens) / self.rate
            };

            tracing::trace!(wait_ms = wait * 1000.0, "rate limiter waiting for tokens");
            let wait = Duration::try_from_secs_f64(wait).map_or(MAX_WAIT, |d| d.min(MAX_WAIT));
            tokio::time::sleep(wait).await;
        }
    }

    /// Deducts `n` tokens if they are available right now.
    pub fn try_acquire(&self, n: u32) -> bool {
        let needed = self.clamp(n);
        let mut state = self.state.lock();
        self.refill(&mut state);

        if state.tokens + EPSILON >= needed {
            state.tokens = (state.tokens - needed).max(0.0);
            true
        } else {
            false
        }
    }

    fn clamp(&self, n: u32) -> f64 {
        let requested = f64::from(n);
        if requested > self.capacity {
            tracing::warn!(
                requested = n,
                capacity = self.capacity,
                "token request exceeds bucket capacity, clamping"
            );
            self.capacity
        } else {
            requested
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;
    }
}
