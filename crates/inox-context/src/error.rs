//! Errors raised by context-level bookkeeping: sharing violations, rate
//! limit exhaustion, cancellation.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ContextError {
    /// A mutable, non-shared value attempted to cross a fiber boundary
    /// (§3 Invariants, §5).
    NotShareable { value_kind: &'static str },
    /// A rate limiter had no tokens available and the caller asked not to
    /// wait (`try_take`).
    RateLimited { bucket: String },
    /// The context (or an ancestor) has been cancelled.
    Cancelled,
    /// A requested permission is not covered by this context's granted set,
    /// or is explicitly forbidden (§4.3, §7 "Permission: never recovered
    /// locally").
    PermissionDenied { permission: String },
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::NotShareable { value_kind } => write!(
                f,
                "value of kind {value_kind} is mutable and not marked shared; cannot cross a fiber boundary"
            ),
            ContextError::RateLimited { bucket } => write!(f, "rate limit exceeded for {bucket}"),
            ContextError::Cancelled => write!(f, "context cancelled"),
            ContextError::PermissionDenied { permission } => {
                write!(f, "permission denied: {permission}")
            }
        }
    }
}

impl std::error::Error for ContextError {}

pub type ContextResult<T> = Result<T, ContextError>;
