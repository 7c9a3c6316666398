//! The checker's symbolic context: named patterns, pattern namespaces and
//! host aliases (§4.6 "a symbolic context holding named patterns, pattern
//! namespaces, and host aliases"). Distinct from `inox_context::Context`
//! (see the grounding ledger's Open Question decision) — this is a
//! check-time-only table, not threaded through the running VM.

use inox_pattern::Pattern;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct SymbolicContext {
    patterns: HashMap<String, Arc<Pattern>>,
    namespaces: HashMap<String, HashMap<String, Arc<Pattern>>>,
    host_aliases: HashMap<String, String>,
}

impl SymbolicContext {
    pub fn new() -> Self {
        let mut patterns = HashMap::new();
        for (name, kind) in BUILTIN_KIND_PATTERNS {
            patterns.insert((*name).to_string(), Arc::new(Pattern::OfKind(*kind)));
        }
        Self {
            patterns,
            namespaces: HashMap::new(),
            host_aliases: HashMap::new(),
        }
    }

    /// `add_named_pattern` (§4.3): returns `false` on redefinition rather
    /// than panicking, since at check time a redefinition is a diagnostic,
    /// not a fatal error (§4.6 "redefinitions are diagnostics"). The
    /// runtime Context's "panics if already bound" rule applies to the
    /// already-resolved, already-compiled program, where a redefinition
    /// could only happen through a host bug.
    pub fn define_pattern(&mut self, name: impl Into<String>, pattern: Arc<Pattern>) -> bool {
        let name = name.into();
        if self.patterns.contains_key(&name) {
            return false;
        }
        self.patterns.insert(name, pattern);
        true
    }

    pub fn define_namespace(
        &mut self,
        name: impl Into<String>,
        entries: HashMap<String, Arc<Pattern>>,
    ) -> bool {
        let name = name.into();
        if self.namespaces.contains_key(&name) {
            return false;
        }
        self.namespaces.insert(name, entries);
        true
    }

    pub fn resolve_pattern(&self, name: &str) -> Option<Arc<Pattern>> {
        self.patterns.get(name).cloned()
    }

    pub fn resolve_namespace_member(&self, namespace: &str, member: &str) -> Option<Arc<Pattern>> {
        self.namespaces.get(namespace)?.get(member).cloned()
    }

    pub fn define_host_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.host_aliases.insert(alias.into(), target.into());
    }

    pub fn resolve_host_alias(&self, alias: &str) -> Option<&str> {
        self.host_aliases.get(alias).map(String::as_str)
    }
}

const BUILTIN_KIND_PATTERNS: &[(&str, inox_value::ValueKind)] = &[
    ("nil", inox_value::ValueKind::Nil),
    ("bool", inox_value::ValueKind::Bool),
    ("int", inox_value::ValueKind::Int),
    ("float", inox_value::ValueKind::Float),
    ("string", inox_value::ValueKind::String),
    ("list", inox_value::ValueKind::List),
    ("object", inox_value::ValueKind::Object),
    ("record", inox_value::ValueKind::Record),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_kind_patterns_preregistered() {
        let symbols = SymbolicContext::new();
        assert!(symbols.resolve_pattern("int").is_some());
    }

    #[test]
    fn redefining_a_pattern_is_rejected() {
        let mut symbols = SymbolicContext::new();
        assert!(symbols.define_pattern("user", Arc::new(Pattern::Any)));
        assert!(!symbols.define_pattern("user", Arc::new(Pattern::Never)));
    }

    #[test]
    fn namespace_member_resolves() {
        let mut symbols = SymbolicContext::new();
        let mut entries = HashMap::new();
        entries.insert("circle".to_string(), Arc::new(Pattern::Any));
        symbols.define_namespace("shapes", entries);
        assert!(symbols.resolve_namespace_member("shapes", "circle").is_some());
        assert!(symbols.resolve_namespace_member("shapes", "square").is_none());
    }
}
