//! Local-scope stack the evaluator threads through a function body (§4.6
//! "the evaluator maintains a stack of local scopes, one global scope").
//! Branches (`if`, the two sides of a narrowing test) `fork` a scope,
//! evaluate independently, then `join` by pointwise widening.

use inox_value::AbstractValue;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Scope {
    locals: HashMap<String, AbstractValue>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<&AbstractValue> {
        self.locals.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: AbstractValue) {
        self.locals.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.locals.contains_key(name)
    }
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    globals: Scope,
    locals: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            globals: Scope::default(),
            locals: vec![Scope::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.locals.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        self.locals.pop();
    }

    pub fn declare_local(&mut self, name: impl Into<String>, value: AbstractValue) {
        self.locals
            .last_mut()
            .expect("scope stack is never empty")
            .set(name, value);
    }

    pub fn declare_global(&mut self, name: impl Into<String>, value: AbstractValue) {
        self.globals.set(name, value);
    }

    /// Read-through resolution (§4.3): innermost local scope first, then
    /// outward, then the global scope.
    pub fn resolve(&self, name: &str) -> Option<&AbstractValue> {
        self.locals
            .iter()
            .rev()
            .find_map(|s| s.get(name))
            .or_else(|| self.globals.get(name))
    }

    /// Assign to whichever scope already declares `name`, innermost first;
    /// returns `false` if no enclosing scope declares it.
    pub fn assign(&mut self, name: &str, value: AbstractValue) -> bool {
        for scope in self.locals.iter_mut().rev() {
            if scope.contains(name) {
                scope.set(name, value);
                return true;
            }
        }
        if self.globals.contains(name) {
            self.globals.set(name, value);
            return true;
        }
        false
    }

    /// Duplicate the current innermost scope for independent evaluation of
    /// a branch (§4.6 "forks duplicate scope tops").
    pub fn fork(&self) -> Scope {
        self.locals.last().cloned().unwrap_or_default()
    }

    /// Replace the current innermost scope with the pointwise widened join
    /// of every fork (§4.6 "join(forks...) merges by pointwise widening").
    pub fn join(&mut self, forks: Vec<Scope>) {
        let Some(top) = self.locals.last_mut() else {
            return;
        };
        let mut names: Vec<String> = Vec::new();
        for fork in &forks {
            for name in fork.locals.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        for name in names {
            let values: Vec<AbstractValue> = forks
                .iter()
                .map(|f| f.get(&name).cloned().unwrap_or(AbstractValue::Any))
                .collect();
            top.set(name, AbstractValue::multivalue(values));
        }
    }

    /// Restore the innermost scope from a single fork, used when a branch
    /// is known to always narrow the same way (e.g. after an `if` with no
    /// `else`, only the fallthrough fork survives).
    pub fn restore(&mut self, fork: Scope) {
        if let Some(top) = self.locals.last_mut() {
            *top = fork;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_innermost_scope() {
        let mut stack = ScopeStack::new();
        stack.declare_local("x", AbstractValue::Int);
        stack.push_scope();
        stack.declare_local("x", AbstractValue::ExactInt(5));
        assert_eq!(stack.resolve("x"), Some(&AbstractValue::ExactInt(5)));
        stack.pop_scope();
        assert_eq!(stack.resolve("x"), Some(&AbstractValue::Int));
    }

    #[test]
    fn join_widens_divergent_branches() {
        let mut stack = ScopeStack::new();
        stack.declare_local("x", AbstractValue::Any);
        let then_fork = {
            let mut f = stack.fork();
            f.set("x", AbstractValue::ExactInt(1));
            f
        };
        let else_fork = {
            let mut f = stack.fork();
            f.set("x", AbstractValue::ExactInt(2));
            f
        };
        stack.join(vec![then_fork, else_fork]);
        assert_eq!(
            stack.resolve("x"),
            Some(&AbstractValue::multivalue([
                AbstractValue::ExactInt(1),
                AbstractValue::ExactInt(2)
            ]))
        );
    }

    #[test]
    fn assign_to_undeclared_name_fails() {
        let mut stack = ScopeStack::new();
        assert!(!stack.assign("missing", AbstractValue::Any));
    }
}
