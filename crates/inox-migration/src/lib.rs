//! Pattern-diff migration engine (§4.7): derives `MigrationOp`s between a
//! current and a next `inox_pattern::Pattern`, then applies them to a live
//! `inox_value::Value`.

pub mod apply;
pub mod diff;
pub mod error;
pub mod op;
pub mod path;

pub use apply::{migrate, MigrationHandler, MigrationHandlers};
pub use diff::get_migration_operations;
pub use error::{MigrationError, MigrationResult};
pub use op::MigrationOp;
pub use path::{PathSegment, PseudoPath};
