//! The symbolic counterpart of [`Value`] used by the abstract interpreter
//! (§4.2 "Abstract values"). An `AbstractValue` approximates the set of
//! concrete values an expression might produce without running it.
//!
//! There is no teacher analogue for this — `Seq`'s typechecker works over
//! concrete HM-style types, not a value-approximation lattice — so the shape
//! here follows spec.md §4.2 directly, expressed in the teacher's general
//! idiom of small enums with a `test`/`narrow`-style method surface (compare
//! `runtime::value::Value::as_bool` et al: cheap, total, non-panicking
//! projections rather than `TryFrom`).

use crate::value::{Value, ValueKind};
use std::sync::Arc;

/// A symbolic approximation of the value(s) an expression can evaluate to.
#[derive(Debug, Clone, PartialEq)]
pub enum AbstractValue {
    /// No information: any value is possible. Top of the lattice.
    Any,
    /// The expression never returns (e.g. after an unconditional `raise`).
    /// Bottom of the lattice.
    Never,
    Nil,
    Bool,
    ExactBool(bool),
    Int,
    ExactInt(i64),
    Float,
    String,
    ExactString(Arc<str>),
    /// Any value of kind `kind`, with no further narrowing.
    OfKind(ValueKind),
    /// The unique concrete value this expression is known to produce.
    ExactValue(ExactValueHandle),
    /// A finite join of more than one possibility, deduplicated and
    /// flattened (§4.2 "multivalues do not nest").
    Multivalue(Arc<[AbstractValue]>),
}

/// Equality for `ExactValue` is by the underlying value's own `equal`
/// (depth-capped, like everywhere else `Value` equality is needed), not by
/// `AbstractValue`'s derived structural equality, since two different
/// `Arc<Value>` allocations can still hold equal values.
#[derive(Debug, Clone)]
pub struct ExactValueHandle(pub Arc<Value>);

impl PartialEq for ExactValueHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || crate::value::equal(&self.0, &other.0, 64)
    }
}

impl AbstractValue {
    pub fn exact(v: Value) -> Self {
        match v {
            Value::Nil => AbstractValue::Nil,
            Value::Bool(b) => AbstractValue::ExactBool(b),
            Value::Int(i) => AbstractValue::ExactInt(i),
            Value::String(ref s) => AbstractValue::ExactString(Arc::from(s.as_str())),
            other => AbstractValue::ExactValue(ExactValueHandle(Arc::new(other))),
        }
    }

    pub fn of_kind(kind: ValueKind) -> Self {
        AbstractValue::OfKind(kind)
    }

    /// Build a multivalue from a set of alternatives, collapsing trivial
    /// cases and flattening nested multivalues (§4.2).
    pub fn multivalue(alternatives: impl IntoIterator<Item = AbstractValue>) -> Self {
        let mut flat: Vec<AbstractValue> = Vec::new();
        for alt in alternatives {
            match alt {
                AbstractValue::Never => {}
                AbstractValue::Multivalue(nested) => {
                    for n in nested.iter() {
                        if !flat.contains(n) {
                            flat.push(n.clone());
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            0 => AbstractValue::Never,
            1 => flat.into_iter().next().unwrap(),
            _ => AbstractValue::Multivalue(flat.into()),
        }
    }

    pub fn kind_of(&self) -> Option<ValueKind> {
        match self {
            AbstractValue::Nil => Some(ValueKind::Nil),
            AbstractValue::Bool | AbstractValue::ExactBool(_) => Some(ValueKind::Bool),
            AbstractValue::Int | AbstractValue::ExactInt(_) => Some(ValueKind::Int),
            AbstractValue::Float => Some(ValueKind::Float),
            AbstractValue::String | AbstractValue::ExactString(_) => Some(ValueKind::String),
            AbstractValue::OfKind(k) => Some(*k),
            AbstractValue::ExactValue(v) => Some(v.0.kind()),
            AbstractValue::Any | AbstractValue::Never | AbstractValue::Multivalue(_) => None,
        }
    }

    /// Whether `concrete` is among the values this abstract value can stand
    /// for. Used by the checker to validate narrowing and by pattern
    /// matching against a known-static expression (§4.2, §4.3).
    pub fn test(&self, concrete: &Value) -> bool {
        match self {
            AbstractValue::Any => true,
            AbstractValue::Never => false,
            AbstractValue::Nil => concrete.is_nil(),
            AbstractValue::Bool => matches!(concrete, Value::Bool(_)),
            AbstractValue::ExactBool(b) => matches!(concrete, Value::Bool(x) if x == b),
            AbstractValue::Int => matches!(concrete, Value::Int(_)),
            AbstractValue::ExactInt(i) => matches!(concrete, Value::Int(x) if x == i),
            AbstractValue::Float => matches!(concrete, Value::Float(_)),
            AbstractValue::String => matches!(concrete, Value::String(_)),
            AbstractValue::ExactString(s) => {
                matches!(concrete, Value::String(x) if x.as_str() == s.as_ref())
            }
            AbstractValue::OfKind(k) => concrete.kind() == *k,
            AbstractValue::ExactValue(v) => crate::value::equal(&v.0, concrete, 64),
            AbstractValue::Multivalue(alts) => alts.iter().any(|a| a.test(concrete)),
        }
    }

    /// Whether every value `self` can stand for is also a value `other` can
    /// stand for (§4.2 "narrowing never widens"). Used to check that a
    /// reassignment or a return value stays within a declared abstract type.
    pub fn is_subset_of(&self, other: &AbstractValue) -> bool {
        if matches!(other, AbstractValue::Any) || self == other {
            return true;
        }
        if matches!(self, AbstractValue::Never) {
            return true;
        }
        match self {
            AbstractValue::Multivalue(alts) => alts.iter().all(|a| a.is_subset_of(other)),
            _ => match other {
                AbstractValue::Multivalue(alts) => alts.iter().any(|a| self.is_subset_of(a)),
                AbstractValue::OfKind(k) => self.kind_of() == Some(*k),
                AbstractValue::Bool => matches!(self, AbstractValue::ExactBool(_)),
                AbstractValue::Int => matches!(self, AbstractValue::ExactInt(_)),
                AbstractValue::String => matches!(self, AbstractValue::ExactString(_)),
                _ => false,
            },
        }
    }

    /// Collapse exact/narrow values up to the widest abstract value of the
    /// same kind, used when a loop body or a shared mutable binding forces
    /// the checker to give up precision (§4.2 "join at merge points").
    pub fn widen_simple_values(&self) -> AbstractValue {
        match self {
            AbstractValue::ExactBool(_) => AbstractValue::Bool,
            AbstractValue::ExactInt(_) => AbstractValue::Int,
            AbstractValue::ExactString(_) => AbstractValue::String,
            AbstractValue::ExactValue(v) => AbstractValue::OfKind(v.0.kind()),
            AbstractValue::Multivalue(alts) => {
                AbstractValue::multivalue(alts.iter().map(|a| a.widen_simple_values()))
            }
            other => other.clone(),
        }
    }

    /// The widest abstract value that still only matches `kind` (§4.2),
    /// the starting point for `OfKind`-based narrowing.
    pub fn widest_of_kind(kind: ValueKind) -> AbstractValue {
        match kind {
            ValueKind::Nil => AbstractValue::Nil,
            ValueKind::Bool => AbstractValue::Bool,
            ValueKind::Int => AbstractValue::Int,
            ValueKind::Float => AbstractValue::Float,
            ValueKind::String => AbstractValue::String,
            other => AbstractValue::OfKind(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multivalue_flattens_and_dedups() {
        let mv = AbstractValue::multivalue([
            AbstractValue::Int,
            AbstractValue::multivalue([AbstractValue::Int, AbstractValue::String]),
        ]);
        assert_eq!(
            mv,
            AbstractValue::multivalue([AbstractValue::Int, AbstractValue::String])
        );
    }

    #[test]
    fn never_absorbs_in_multivalue() {
        let mv = AbstractValue::multivalue([AbstractValue::Never, AbstractValue::Int]);
        assert_eq!(mv, AbstractValue::Int);
    }

    #[test]
    fn exact_subset_of_widened_kind() {
        let exact = AbstractValue::ExactInt(3);
        assert!(exact.is_subset_of(&AbstractValue::Int));
        assert!(!AbstractValue::Int.is_subset_of(&exact));
    }

    #[test]
    fn any_absorbs_everything() {
        assert!(AbstractValue::ExactInt(1).is_subset_of(&AbstractValue::Any));
    }

    #[test]
    fn widen_collapses_exact_to_kind() {
        assert_eq!(
            AbstractValue::ExactInt(42).widen_simple_values(),
            AbstractValue::Int
        );
    }

    #[test]
    fn test_matches_concrete_value_against_exact_string() {
        let av = AbstractValue::ExactString(Arc::from("hi"));
        assert!(av.test(&Value::String(crate::string::InoxStr::new("hi"))));
        assert!(!av.test(&Value::String(crate::string::InoxStr::new("bye"))));
    }
}
