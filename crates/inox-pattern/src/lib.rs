//! Pattern / subtype lattice built on top of `inox-value`'s open value
//! hierarchy (§3 Patterns, §4.3 pattern matching and narrowing).

pub mod error;
pub mod pattern;

pub use error::{PatternError, PatternResult};
pub use pattern::{FunctionPattern, ListPattern, ObjectPattern, ObjectPatternEntry, Pattern, RegexPattern};
