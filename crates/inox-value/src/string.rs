//! Shared immutable string used by every scalar text-like value kind
//! (String, Path, URL, Host, Scheme, Identifier, PropertyName).
//!
//! Cloning a value that carries text should be O(1), the same way cloning a
//! `Variant` is O(1) in the teacher runtime by sharing an `Arc`. There is no
//! arena/global split here: without a native-codegen FFI boundary to cross,
//! a single `Arc<str>` is simplest and still gives cheap clones plus
//! structural equality.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Eq, PartialOrd, Ord)]
pub struct InoxStr(Arc<str>);

impl InoxStr {
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        InoxStr(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// O(1) identity check, useful before falling back to content comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for InoxStr {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0.as_ref() == other.0.as_ref()
    }
}

impl std::hash::Hash for InoxStr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_ref().hash(state);
    }
}

impl fmt::Display for InoxStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InoxStr {
    fn from(s: &str) -> Self {
        InoxStr::new(s)
    }
}

impl From<String> for InoxStr {
    fn from(s: String) -> Self {
        InoxStr::new(s)
    }
}
