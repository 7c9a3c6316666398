//! Callable value kinds and the two extension points of the value hierarchy.
//!
//! §9's "open value hierarchy via interfaces with runtime type queries" note
//! says the concrete values become an exhaustive tagged sum, with trait-based
//! extension points reserved for values that are inherently open-ended:
//! host functions (arbitrary Rust closures the embedder registers) and
//! patterns (defined one layer up, in `inox-pattern`, since a pattern needs
//! to test `Value`s but `inox-value` must not depend on `inox-pattern`).

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// A compiled Inox function: parameter count is carried by the bytecode's
/// `CompiledFunction` (`inox-bytecode`), so this only needs to be a thin
/// handle plus the locals it captured when created — mirrors the teacher's
/// `Value::Closure { fn_ptr, env }`.
#[derive(Debug, Clone)]
pub struct InoxFunctionData {
    /// Opaque handle into a `CompiledFunction` table owned by the VM.
    pub bytecode_id: u32,
    /// Captured locals, ordered outermost-first (teacher: "env[0] is top of
    /// stack at creation").
    pub captured: Arc<[Value]>,
}

impl PartialEq for InoxFunctionData {
    fn eq(&self, other: &Self) -> bool {
        self.bytecode_id == other.bytecode_id && Arc::ptr_eq(&self.captured, &other.captured)
    }
}

/// A host-implemented callable exposed to the VM as a typed value (§6 "Host
/// function signature protocol"). Kept as a trait object rather than a
/// concrete enum precisely because the host surface (filesystem, HTTP,
/// chrome automation, ...) is out of this crate's scope (§1) — callers
/// provide their own implementations.
pub trait GoFunction: fmt::Debug + Send + Sync {
    /// Stable name used in error messages and diagnostics.
    fn name(&self) -> &str;

    /// Whether the last declared parameter absorbs any extra positional
    /// arguments as a List (§4.4 `OpCall`'s `spread_flag`).
    fn is_variadic(&self) -> bool {
        false
    }

    /// Invoke with already-evaluated arguments. A `must`-style host function
    /// returns a two-element List whose last element is an `Error` on
    /// failure (§4.5 call semantics); this trait does not special-case that
    /// convention, the VM does.
    fn call(&self, args: &[Value]) -> Result<Value, GoFunctionError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoFunctionError(pub String);

impl fmt::Display for GoFunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for GoFunctionError {}

/// Extension point implemented by `inox_pattern::Pattern`. `inox-value`
/// depends only on this trait, breaking what would otherwise be a
/// `Value` <-> `Pattern` dependency cycle (Value::Pattern holds one of
/// these; Pattern::ExactValuePattern holds a `Value`).
pub trait PatternLike: fmt::Debug + Send + Sync {
    fn test(&self, value: &Value) -> bool;
    fn type_name(&self) -> &'static str;
}

pub type PatternHandle = Arc<dyn PatternLike>;
pub type GoFunctionHandle = Arc<dyn GoFunction>;

/// Error(message, data) — never recovered locally at the call site that
/// raised it; propagated via `?`/raise until caught by a `must` conversion
/// or a reception handler (§7).
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorData {
    pub message: InoxMessage,
    pub data: Option<Value>,
}

pub type InoxMessage = Arc<str>;
