//! Hand-rolled error enum (§4.7's three named failure modes), matching the
//! rest of the workspace's `Display`/`std::error::Error` style rather than
//! a derive-macro crate.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    InvalidMigrationPseudoPath(String),
    ValueAtPathSegmentsDoesNotExist(String),
    ValueAtPathSegmentsIsNotMigrationCapable(String),
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationError::InvalidMigrationPseudoPath(path) => {
                write!(f, "invalid migration pseudo-path `{path}`")
            }
            MigrationError::ValueAtPathSegmentsDoesNotExist(path) => {
                write!(f, "no value at path `{path}`")
            }
            MigrationError::ValueAtPathSegmentsIsNotMigrationCapable(path) => {
                write!(f, "value at path `{path}` is not migration-capable")
            }
        }
    }
}

impl std::error::Error for MigrationError {}

pub type MigrationResult<T> = Result<T, MigrationError>;
