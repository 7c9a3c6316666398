//! Errors raised while building or applying a pattern.
//!
//! Hand-rolled, matching `inox_value::error::ValueError`'s style rather than
//! pulling in a derive macro crate this low in the dependency graph.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum PatternError {
    /// A regex pattern literal failed to compile.
    InvalidRegex { source: String, message: String },
    /// A union/intersection pattern was built with zero members.
    EmptyCombinator { combinator: &'static str },
    /// An object/record pattern referenced the same property name twice.
    DuplicateProperty { name: String },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::InvalidRegex { source, message } => {
                write!(f, "invalid regex pattern {source:?}: {message}")
            }
            PatternError::EmptyCombinator { combinator } => {
                write!(f, "{combinator} pattern must have at least one member")
            }
            PatternError::DuplicateProperty { name } => {
                write!(f, "duplicate property {name:?} in object/record pattern")
            }
        }
    }
}

impl std::error::Error for PatternError {}

pub type PatternResult<T> = Result<T, PatternError>;
