//! Symbolic evaluator for the core runtime (§4.6): abstract interpretation
//! over an `inox_ast::Program`, producing [`diagnostics::Diagnostics`] and a
//! span-keyed abstract-value map rather than a pass/fail verdict.

pub mod checker;
pub mod diagnostics;
pub mod lower;
pub mod scope;
pub mod symbols;

pub use checker::{CheckResult, Checker};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use lower::{lower_pattern_expr, LowerError};
pub use scope::{Scope, ScopeStack};
pub use symbols::SymbolicContext;
