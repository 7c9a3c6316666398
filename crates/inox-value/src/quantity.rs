//! Quantity, Rate, Duration, DateTime and Year scalar kinds (§3 Values).
//!
//! These are plain immutable, serializable scalars; there is no equivalent
//! in the teacher runtime (`Seq` only has Int/Float/Bool/String), so they are
//! grounded directly in spec.md's table rather than in any teacher file.
//! Kept deliberately small: unit conversion and calendar arithmetic are
//! outside this crate's job, which is only to carry the value and compare it.

use std::fmt;

/// A numeric value tagged with a unit string (e.g. `10` + `"ms"`).
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// A quantity per unit of time (e.g. `10req/s`).
#[derive(Debug, Clone, PartialEq)]
pub struct Rate {
    pub quantity: Quantity,
    pub period: Duration,
}

/// Nanosecond-precision duration. Stored as i64 nanoseconds like Go's
/// `time.Duration`, the closest analogue available in the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(pub i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub fn from_nanos(n: i64) -> Self {
        Duration(n)
    }

    pub fn as_nanos(self) -> i64 {
        self.0
    }
}

/// Calendar timestamp; intentionally opaque beyond an epoch-nanosecond count
/// plus a fixed UTC-offset tag, since calendar semantics are not this crate's
/// concern (a full library would use `jiff`/`chrono`, out of scope here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub epoch_nanos: i64,
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Year(pub i32);
