//! The pattern / subtype lattice (§3 Patterns, §4.3).
//!
//! A `Pattern` is both a runtime value (`Value::Pattern` wraps a
//! `PatternHandle`) and a static-analysis artifact: the checker turns a
//! pattern literal into an [`AbstractValue`](inox_value::AbstractValue) via
//! [`Pattern::symbolic_value`], and the migration engine (`inox-migration`)
//! diffs two patterns structurally without ever touching a concrete value.
//!
//! Composition (`Union`/`Intersection`/`Optional`/`List`/`Object`) holds
//! `Arc<Pattern>` rather than the open `PatternHandle` trait object so that
//! `contains`/`symbolic_value` can recurse structurally; a `Custom` variant
//! is the escape hatch for host-supplied `PatternLike` implementations that
//! this crate cannot see into.

use crate::error::{PatternError, PatternResult};
use inox_value::{AbstractValue, InoxStr, PatternHandle, PatternLike, Value, ValueKind};
use regex::Regex;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches any value. Top of the lattice.
    Any,
    /// Matches no value. Bottom of the lattice.
    Never,
    /// Matches exactly one concrete value, by `Value::equal`.
    Exact(Value),
    /// Matches any value of a given dynamic kind.
    OfKind(ValueKind),
    Object(ObjectPattern),
    Record(ObjectPattern),
    List(ListPattern),
    Tuple(ListPattern),
    Union(Arc<[Arc<Pattern>]>),
    Intersection(Arc<[Arc<Pattern>]>),
    /// `pattern?` — matches `pattern` or `Nil`.
    Optional(Arc<Pattern>),
    Regex(RegexPattern),
    Function(FunctionPattern),
    KeyList(Arc<[InoxStr]>),
    /// A pattern bound to a name for error messages and recursive
    /// definitions (`%user = {...}`); transparent to `test`/`contains`.
    Named(InoxStr, Arc<Pattern>),
    /// A host-registered pattern this crate cannot look inside.
    Custom(PatternHandle),
}

#[derive(Debug, Clone)]
pub struct ObjectPatternEntry {
    pub name: InoxStr,
    pub pattern: Arc<Pattern>,
    pub optional: bool,
}

/// `exact: true` rejects objects/records carrying properties not named in
/// `entries` (§4.3 "exact object patterns"); `exact: false` only requires
/// the named properties to be present and matching.
#[derive(Debug, Clone)]
pub struct ObjectPattern {
    pub entries: Vec<ObjectPatternEntry>,
    pub exact: bool,
}

#[derive(Debug, Clone)]
pub struct ListPattern {
    pub element: Arc<Pattern>,
    pub min_len: usize,
    pub max_len: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RegexPattern {
    pub regex: Regex,
    pub source: String,
}

impl RegexPattern {
    pub fn compile(source: impl Into<String>) -> PatternResult<Self> {
        let source = source.into();
        let regex = Regex::new(&source).map_err(|e| PatternError::InvalidRegex {
            source: source.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { regex, source })
    }
}

#[derive(Debug, Clone)]
pub struct FunctionPattern {
    pub params: Vec<Arc<Pattern>>,
    pub variadic: bool,
    pub result: Option<Arc<Pattern>>,
}

impl Pattern {
    pub fn union(members: Vec<Arc<Pattern>>) -> PatternResult<Pattern> {
        if members.is_empty() {
            return Err(PatternError::EmptyCombinator { combinator: "union" });
        }
        Ok(Pattern::Union(members.into()))
    }

    pub fn intersection(members: Vec<Arc<Pattern>>) -> PatternResult<Pattern> {
        if members.is_empty() {
            return Err(PatternError::EmptyCombinator {
                combinator: "intersection",
            });
        }
        Ok(Pattern::Intersection(members.into()))
    }

    pub fn object(entries: Vec<ObjectPatternEntry>, exact: bool) -> PatternResult<Pattern> {
        for (i, e) in entries.iter().enumerate() {
            if entries[..i].iter().any(|p| p.name == e.name) {
                return Err(PatternError::DuplicateProperty {
                    name: e.name.as_str().to_string(),
                });
            }
        }
        Ok(Pattern::Object(ObjectPattern { entries, exact }))
    }

    /// Whether every value matched by `other` is also matched by `self`
    /// (§4.3 "pattern containment"), used by the checker to validate
    /// narrowing and by the migration engine to decide whether a property
    /// can be left untouched across a schema change.
    ///
    /// This is necessarily conservative: it returns `false` for some pairs
    /// that are in fact equivalent (e.g. two differently-shaped unions that
    /// happen to describe the same set), rather than attempting full
    /// lattice normalization.
    pub fn contains(&self, other: &Pattern) -> bool {
        match (self, other) {
            (Pattern::Any, _) => true,
            (_, Pattern::Never) => true,
            (Pattern::Never, _) => false,
            (Pattern::Named(_, inner), _) => inner.contains(other),
            (_, Pattern::Named(_, inner)) => self.contains(inner),
            (a, b) if a.shape_eq(b) => true,
            (Pattern::OfKind(k), other) => other.always_has_kind(*k),
            (Pattern::Union(members), other) => members.iter().any(|m| m.contains(other)),
            (self_, Pattern::Union(members)) => members.iter().all(|m| self_.contains(m)),
            (Pattern::Intersection(members), other) => members.iter().all(|m| m.contains(other)),
            (self_, Pattern::Intersection(members)) => members.iter().any(|m| self_.contains(m)),
            (Pattern::Optional(inner), Pattern::Optional(other_inner)) => {
                inner.contains(other_inner)
            }
            (Pattern::Optional(inner), other) => {
                matches!(other, Pattern::Exact(Value::Nil)) || inner.contains(other)
            }
            (Pattern::Exact(a), Pattern::Exact(b)) => inox_value::value::equal(a, b, 64),
            (Pattern::List(a), Pattern::List(b)) | (Pattern::Tuple(a), Pattern::Tuple(b)) => {
                a.element.contains(&b.element)
                    && a.min_len <= b.min_len
                    && match (a.max_len, b.max_len) {
                        (None, _) => true,
                        (Some(amax), Some(bmax)) => amax >= bmax,
                        (Some(_), None) => false,
                    }
            }
            (Pattern::Object(a), Pattern::Object(b)) | (Pattern::Record(a), Pattern::Record(b)) => {
                if a.exact && b.entries.iter().any(|eb| !a.entries.iter().any(|ea| ea.name == eb.name)) {
                    return false;
                }
                a.entries.iter().all(|ea| {
                    b.entries
                        .iter()
                        .find(|eb| eb.name == ea.name)
                        .is_some_and(|eb| ea.optional || !eb.optional)
                        && b.entries
                            .iter()
                            .find(|eb| eb.name == ea.name)
                            .is_some_and(|eb| ea.pattern.contains(&eb.pattern))
                })
            }
            (Pattern::Function(a), Pattern::Function(b)) => {
                a.variadic == b.variadic
                    && a.params.len() == b.params.len()
                    && a.params.iter().zip(b.params.iter()).all(|(pa, pb)| pa.contains(pb))
                    && match (&a.result, &b.result) {
                        (None, None) => true,
                        (Some(ra), Some(rb)) => ra.contains(rb),
                        _ => false,
                    }
            }
            _ => false,
        }
    }

    fn shape_eq(&self, other: &Pattern) -> bool {
        match (self, other) {
            (Pattern::Any, Pattern::Any) | (Pattern::Never, Pattern::Never) => true,
            (Pattern::OfKind(a), Pattern::OfKind(b)) => a == b,
            (Pattern::Exact(a), Pattern::Exact(b)) => inox_value::value::equal(a, b, 64),
            (Pattern::KeyList(a), Pattern::KeyList(b)) => a == b,
            (Pattern::Regex(a), Pattern::Regex(b)) => a.source == b.source,
            (Pattern::Custom(a), Pattern::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Whether every value of dynamic kind `kind` necessarily matches
    /// `self` (conservative: only answers `true` for patterns this crate
    /// can prove total over that kind).
    fn always_has_kind(&self, kind: ValueKind) -> bool {
        matches!(self, Pattern::OfKind(k) if *k == kind)
    }

    /// The closest [`AbstractValue`] approximation of this pattern, the
    /// bridge the checker uses to fold a pattern-match/narrowing
    /// expression into its abstract-interpretation state (§4.2, §4.3).
    pub fn symbolic_value(&self) -> AbstractValue {
        match self {
            Pattern::Any => AbstractValue::Any,
            Pattern::Never => AbstractValue::Never,
            Pattern::Exact(v) => AbstractValue::exact(v.clone()),
            Pattern::OfKind(k) => AbstractValue::widest_of_kind(*k),
            Pattern::Named(_, inner) => inner.symbolic_value(),
            Pattern::Union(members) => {
                AbstractValue::multivalue(members.iter().map(|m| m.symbolic_value()))
            }
            Pattern::Intersection(members) => members
                .first()
                .map(|m| m.symbolic_value())
                .unwrap_or(AbstractValue::Never),
            Pattern::Optional(inner) => {
                AbstractValue::multivalue([AbstractValue::Nil, inner.symbolic_value()])
            }
            Pattern::List(_) | Pattern::Tuple(_) => AbstractValue::OfKind(ValueKind::List),
            Pattern::Object(_) => AbstractValue::OfKind(ValueKind::Object),
            Pattern::Record(_) => AbstractValue::OfKind(ValueKind::Record),
            Pattern::Regex(_) => AbstractValue::OfKind(ValueKind::String),
            Pattern::Function(_) => AbstractValue::OfKind(ValueKind::InoxFunction),
            Pattern::KeyList(_) => AbstractValue::OfKind(ValueKind::KeyList),
            Pattern::Custom(_) => AbstractValue::Any,
        }
    }
}

impl PatternLike for Pattern {
    fn test(&self, value: &Value) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Never => false,
            Pattern::Exact(v) => inox_value::value::equal(v, value, 64),
            Pattern::OfKind(k) => value.kind() == *k,
            Pattern::Named(_, inner) => inner.test(value),
            Pattern::Union(members) => members.iter().any(|m| m.test(value)),
            Pattern::Intersection(members) => members.iter().all(|m| m.test(value)),
            Pattern::Optional(inner) => value.is_nil() || inner.test(value),
            Pattern::Custom(handle) => handle.test(value),
            Pattern::Regex(r) => matches!(value, Value::String(s) if r.regex.is_match(s.as_str())),
            Pattern::KeyList(names) => {
                matches!(value, Value::KeyList(vs) if vs.len() == names.len() && vs.iter().all(|v| names.contains(v)))
            }
            Pattern::List(list) | Pattern::Tuple(list) => {
                let elements: Vec<Value> = match value {
                    Value::List(l) => l.lock().expect("list lock poisoned").elements.clone(),
                    Value::Tuple(t) => t.to_vec(),
                    _ => return false,
                };
                elements.len() >= list.min_len
                    && list.max_len.is_none_or(|max| elements.len() <= max)
                    && elements.iter().all(|e| list.element.test(e))
            }
            Pattern::Object(obj) | Pattern::Record(obj) => {
                let (names, get): (Vec<InoxStr>, Box<dyn Fn(&str) -> Option<Value>>) = match value
                {
                    Value::Object(o) => (o.property_names(), Box::new(|n: &str| o.get(n))),
                    Value::Record(r) => (
                        r.properties.iter().map(|p| p.name.clone()).collect(),
                        Box::new(|n: &str| r.get(n)),
                    ),
                    _ => return false,
                };
                if obj.exact && names.len() != obj.entries.len() {
                    return false;
                }
                obj.entries.iter().all(|e| match get(e.name.as_str()) {
                    Some(v) => e.pattern.test(&v),
                    None => e.optional,
                })
            }
            Pattern::Function(_) => matches!(
                value,
                Value::InoxFunction(_) | Value::GoFunction(_)
            ),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Pattern::Any => "any",
            Pattern::Never => "never",
            Pattern::Exact(_) => "exact-value-pattern",
            Pattern::OfKind(_) => "type-pattern",
            Pattern::Object(_) => "object-pattern",
            Pattern::Record(_) => "record-pattern",
            Pattern::List(_) => "list-pattern",
            Pattern::Tuple(_) => "tuple-pattern",
            Pattern::Union(_) => "union-pattern",
            Pattern::Intersection(_) => "intersection-pattern",
            Pattern::Optional(_) => "optional-pattern",
            Pattern::Regex(_) => "regex-pattern",
            Pattern::Function(_) => "function-pattern",
            Pattern::KeyList(_) => "key-list-pattern",
            Pattern::Named(_, _) => "named-pattern",
            Pattern::Custom(_) => "custom-pattern",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inox_value::Value;

    fn handle(p: Pattern) -> PatternHandle {
        Arc::new(p)
    }

    #[test]
    fn of_kind_matches_any_value_of_that_kind() {
        let p = Pattern::OfKind(ValueKind::Int);
        assert!(p.test(&Value::Int(7)));
        assert!(!p.test(&Value::Bool(true)));
    }

    #[test]
    fn union_matches_any_member() {
        let p = Pattern::union(vec![
            Arc::new(Pattern::OfKind(ValueKind::Int)),
            Arc::new(Pattern::OfKind(ValueKind::String)),
        ])
        .unwrap();
        assert!(p.test(&Value::Int(1)));
        assert!(p.test(&Value::String(InoxStr::new("x"))));
        assert!(!p.test(&Value::Bool(false)));
    }

    #[test]
    fn optional_accepts_nil() {
        let p = Pattern::Optional(Arc::new(Pattern::OfKind(ValueKind::Int)));
        assert!(p.test(&Value::Nil));
        assert!(p.test(&Value::Int(3)));
        assert!(!p.test(&Value::Bool(true)));
    }

    #[test]
    fn exact_object_pattern_rejects_extra_properties() {
        let p = Pattern::object(
            vec![ObjectPatternEntry {
                name: InoxStr::new("x"),
                pattern: Arc::new(Pattern::OfKind(ValueKind::Int)),
                optional: false,
            }],
            true,
        )
        .unwrap();
        let obj = Value::Object(inox_value::collections::ObjectData::new(vec![
            inox_value::collections::Property {
                name: InoxStr::new("x"),
                value: Value::Int(1),
            },
            inox_value::collections::Property {
                name: InoxStr::new("y"),
                value: Value::Int(2),
            },
        ]));
        assert!(!p.test(&obj));
    }

    #[test]
    fn any_contains_everything() {
        assert!(Pattern::Any.contains(&Pattern::OfKind(ValueKind::Int)));
    }

    #[test]
    fn regex_pattern_matches_strings() {
        let p = Pattern::Regex(RegexPattern::compile("^[a-z]+$").unwrap());
        assert!(p.test(&Value::String(InoxStr::new("abc"))));
        assert!(!p.test(&Value::String(InoxStr::new("ABC"))));
    }

    #[test]
    fn symbolic_value_of_union_is_multivalue() {
        let p = Pattern::union(vec![
            Arc::new(Pattern::OfKind(ValueKind::Int)),
            Arc::new(Pattern::OfKind(ValueKind::String)),
        ])
        .unwrap();
        assert_eq!(
            p.symbolic_value(),
            AbstractValue::multivalue([
                AbstractValue::Int,
                AbstractValue::String
            ])
        );
    }

    #[test]
    fn pattern_handle_roundtrips_through_value() {
        let h = handle(Pattern::OfKind(ValueKind::Bool));
        assert!(h.test(&Value::Bool(true)));
    }
}
