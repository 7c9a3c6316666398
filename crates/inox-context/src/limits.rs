//! Named rate-limit configuration (§6), loaded once per run and applied to
//! every `Context` descending from it so sibling fibers sharing a bucket
//! name agree on its size rather than each guessing at the call site.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketLimit {
    pub capacity: u64,
    pub refill_per_second: u64,
}

/// A named table of bucket sizes, keyed the same way `Context::limiter`
/// keys its buckets ("network", "fs", ...). Empty by default: a `Context`
/// with no configured `Limits` falls back to whatever capacity the call
/// site passes to `limiter`.
#[derive(Debug, Clone, Default)]
pub struct Limits {
    buckets: HashMap<String, BucketLimit>,
}

impl Limits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(mut self, name: impl Into<String>, capacity: u64, refill_per_second: u64) -> Self {
        self.buckets.insert(
            name.into(),
            BucketLimit {
                capacity,
                refill_per_second,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<BucketLimit> {
        self.buckets.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_bucket_name_returns_none() {
        let limits = Limits::new();
        assert!(limits.get("network").is_none());
    }

    #[test]
    fn configured_bucket_overrides_are_retrievable_by_name() {
        let limits = Limits::new().with_bucket("network", 100, 10);
        assert_eq!(
            limits.get("network"),
            Some(BucketLimit {
                capacity: 100,
                refill_per_second: 10
            })
        );
    }
}
