//! Token-bucket rate limiting for host resources (§6 "host functions may be
//! rate limited per context"). Grounded in the teacher's own use of `may`
//! for cooperative, fiber-friendly blocking (`may::coroutine::sleep`
//! instead of `std::thread::sleep`, so a throttled fiber yields the OS
//! thread to its siblings rather than parking it).

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketStats {
    pub capacity: u64,
    pub available: u64,
    pub refill_per_second: u64,
}

struct Inner {
    available: f64,
    last_refill: Instant,
}

/// A single token bucket: `capacity` tokens, refilled continuously at
/// `refill_per_second`. `try_take`/`take`/`wait` all draw from the same
/// bucket, differing only in what happens when it is empty.
pub struct TokenBucket {
    capacity: u64,
    refill_per_second: u64,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket")
            .field("capacity", &self.capacity)
            .field("refill_per_second", &self.refill_per_second)
            .finish()
    }
}

impl TokenBucket {
    pub fn new(capacity: u64, refill_per_second: u64) -> Self {
        Self {
            capacity,
            refill_per_second,
            inner: Mutex::new(Inner {
                available: capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill_locked(&self, inner: &mut Inner) {
        let elapsed = inner.last_refill.elapsed();
        let refilled = elapsed.as_secs_f64() * self.refill_per_second as f64;
        if refilled > 0.0 {
            inner.available = (inner.available + refilled).min(self.capacity as f64);
            inner.last_refill = Instant::now();
        }
    }

    /// Take `n` tokens if immediately available, otherwise take none and
    /// return `false`.
    pub fn try_take(&self, n: u64) -> bool {
        let mut inner = self.inner.lock().expect("token bucket lock poisoned");
        self.refill_locked(&mut inner);
        if inner.available >= n as f64 {
            inner.available -= n as f64;
            true
        } else {
            false
        }
    }

    /// Take `n` tokens, cooperatively sleeping the current fiber until
    /// enough have accumulated.
    pub fn take(&self, n: u64) {
        loop {
            if self.try_take(n) {
                return;
            }
            may::coroutine::sleep(self.retry_delay(n));
        }
    }

    /// Alias for `take`, named for the host-function-facing vocabulary
    /// (§6): "wait for capacity" reads more naturally than "take" at a
    /// call site that discards the loop's existence.
    pub fn wait(&self, n: u64) {
        self.take(n)
    }

    fn retry_delay(&self, n: u64) -> Duration {
        let inner = self.inner.lock().expect("token bucket lock poisoned");
        let deficit = (n as f64 - inner.available).max(0.0);
        let seconds = deficit / self.refill_per_second.max(1) as f64;
        Duration::from_secs_f64(seconds.clamp(0.001, 1.0))
    }

    pub fn stats(&self) -> BucketStats {
        let mut inner = self.inner.lock().expect("token bucket lock poisoned");
        self.refill_locked(&mut inner);
        BucketStats {
            capacity: self.capacity,
            available: inner.available as u64,
            refill_per_second: self.refill_per_second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_take_drains_bucket() {
        let bucket = TokenBucket::new(2, 1);
        assert!(bucket.try_take(2));
        assert!(!bucket.try_take(1));
    }

    #[test]
    fn stats_reports_capacity_and_refill_rate() {
        let bucket = TokenBucket::new(5, 10);
        let stats = bucket.stats();
        assert_eq!(stats.capacity, 5);
        assert_eq!(stats.refill_per_second, 10);
        assert_eq!(stats.available, 5);
    }

    #[test]
    fn refill_replenishes_over_time() {
        let bucket = TokenBucket::new(1, 1000);
        assert!(bucket.try_take(1));
        assert!(!bucket.try_take(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(bucket.try_take(1));
    }
}
