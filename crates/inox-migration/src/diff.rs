//! The diff algorithm (§4.7 `get_migration_operations`): given a current and
//! a next pattern, produce the ops that carry a value from one to the other.

use crate::op::MigrationOp;
use crate::path::{PathSegment, PseudoPath};
use inox_pattern::{ObjectPattern, Pattern};
use std::sync::Arc;

fn unwrap_named(pattern: &Pattern) -> &Pattern {
    match pattern {
        Pattern::Named(_, inner) => unwrap_named(inner),
        other => other,
    }
}

/// `contains` is directional and conservative (§4.3), so two-way containment
/// stands in for the full structural equality `Pattern` doesn't implement.
fn patterns_equivalent(a: &Pattern, b: &Pattern) -> bool {
    a.contains(b) && b.contains(a)
}

pub fn get_migration_operations(
    current: &Pattern,
    next: &Pattern,
    path: &PseudoPath,
) -> Vec<MigrationOp> {
    let current = unwrap_named(current);
    let next = unwrap_named(next);

    // Rule 1: no-op if unchanged or next only widens current.
    if patterns_equivalent(current, next) || next.contains(current) {
        return Vec::new();
    }

    match (current, next) {
        (Pattern::Object(a), Pattern::Object(b)) => diff_object(a, b, path, Pattern::Object),
        (Pattern::Record(a), Pattern::Record(b)) => diff_object(a, b, path, Pattern::Record),
        (Pattern::List(a), Pattern::List(b)) => {
            get_migration_operations(&a.element, &b.element, &path.child(PathSegment::Wildcard))
        }
        (Pattern::Tuple(a), Pattern::Tuple(b)) => {
            let a_fixed = a.min_len == a.max_len;
            let b_fixed = b.min_len == b.max_len;
            if a_fixed && b_fixed && a.max_len == b.max_len {
                get_migration_operations(
                    &a.element,
                    &b.element,
                    &path.child(PathSegment::Wildcard),
                )
            } else {
                replacement(current, next, path)
            }
        }
        // Rule 2 (current not migration-aware) and any kind mismatch both
        // fall through to a wholesale replacement.
        _ => replacement(current, next, path),
    }
}

fn replacement(current: &Pattern, next: &Pattern, path: &PseudoPath) -> Vec<MigrationOp> {
    vec![MigrationOp::Replacement {
        path: path.clone(),
        current: Arc::new(current.clone()),
        next: Arc::new(next.clone()),
    }]
}

fn diff_object(
    current: &ObjectPattern,
    next: &ObjectPattern,
    path: &PseudoPath,
    wrap: fn(ObjectPattern) -> Pattern,
) -> Vec<MigrationOp> {
    let overlaps = current
        .entries
        .iter()
        .any(|e| next.entries.iter().any(|n| n.name == e.name));
    if !overlaps && !next.entries.is_empty() {
        return vec![MigrationOp::Replacement {
            path: path.clone(),
            current: Arc::new(wrap(current.clone())),
            next: Arc::new(wrap(next.clone())),
        }];
    }

    let mut ops = Vec::new();
    for entry in &current.entries {
        let child_path = path.child(PathSegment::Name(entry.name.as_str().to_string()));
        match next.entries.iter().find(|n| n.name == entry.name) {
            None => ops.push(MigrationOp::Removal {
                path: child_path,
                value: entry.pattern.clone(),
            }),
            Some(next_entry) => {
                ops.extend(get_migration_operations(
                    &entry.pattern,
                    &next_entry.pattern,
                    &child_path,
                ));
                if entry.optional && !next_entry.optional {
                    ops.push(MigrationOp::NillableInitialization {
                        path: child_path,
                        value: next_entry.pattern.clone(),
                    });
                }
            }
        }
    }
    for entry in &next.entries {
        if !current.entries.iter().any(|c| c.name == entry.name) {
            let child_path = path.child(PathSegment::Name(entry.name.as_str().to_string()));
            ops.push(MigrationOp::Inclusion {
                path: child_path,
                value: entry.pattern.clone(),
                optional: entry.optional,
            });
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use inox_pattern::ObjectPatternEntry;
    use inox_value::ValueKind;

    fn of_kind(kind: ValueKind) -> Arc<Pattern> {
        Arc::new(Pattern::OfKind(kind))
    }

    #[test]
    fn equivalent_patterns_produce_no_ops() {
        let ops = get_migration_operations(
            &Pattern::OfKind(ValueKind::Int),
            &Pattern::OfKind(ValueKind::Int),
            &PseudoPath::root(),
        );
        assert!(ops.is_empty());
    }

    #[test]
    fn widening_to_any_produces_no_ops() {
        let ops = get_migration_operations(
            &Pattern::OfKind(ValueKind::Int),
            &Pattern::Any,
            &PseudoPath::root(),
        );
        assert!(ops.is_empty());
    }

    #[test]
    fn new_property_yields_inclusion() {
        let current = Pattern::Object(ObjectPattern {
            entries: vec![ObjectPatternEntry {
                name: "name".into(),
                pattern: of_kind(ValueKind::String),
                optional: false,
            }],
            exact: false,
        });
        let next = Pattern::Object(ObjectPattern {
            entries: vec![
                ObjectPatternEntry {
                    name: "name".into(),
                    pattern: of_kind(ValueKind::String),
                    optional: false,
                },
                ObjectPatternEntry {
                    name: "age".into(),
                    pattern: of_kind(ValueKind::Int),
                    optional: false,
                },
            ],
            exact: false,
        });
        let ops = get_migration_operations(&current, &next, &PseudoPath::root());
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], MigrationOp::Inclusion { .. }));
        assert_eq!(ops[0].path(), &PseudoPath::parse("/age").unwrap());
    }

    #[test]
    fn removed_property_yields_removal() {
        let current = Pattern::Object(ObjectPattern {
            entries: vec![ObjectPatternEntry {
                name: "legacy".into(),
                pattern: of_kind(ValueKind::String),
                optional: false,
            }],
            exact: false,
        });
        let next = Pattern::Object(ObjectPattern {
            entries: vec![],
            exact: false,
        });
        let ops = get_migration_operations(&current, &next, &PseudoPath::root());
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], MigrationOp::Removal { .. }));
    }

    #[test]
    fn optional_becoming_required_yields_nillable_initialization() {
        let current = Pattern::Object(ObjectPattern {
            entries: vec![ObjectPatternEntry {
                name: "nickname".into(),
                pattern: of_kind(ValueKind::String),
                optional: true,
            }],
            exact: false,
        });
        let next = Pattern::Object(ObjectPattern {
            entries: vec![ObjectPatternEntry {
                name: "nickname".into(),
                pattern: of_kind(ValueKind::String),
                optional: false,
            }],
            exact: false,
        });
        let ops = get_migration_operations(&current, &next, &PseudoPath::root());
        assert!(ops
            .iter()
            .any(|op| matches!(op, MigrationOp::NillableInitialization { .. })));
    }

    #[test]
    fn total_property_turnover_yields_one_replacement() {
        let current = Pattern::Object(ObjectPattern {
            entries: vec![ObjectPatternEntry {
                name: "old".into(),
                pattern: of_kind(ValueKind::String),
                optional: false,
            }],
            exact: false,
        });
        let next = Pattern::Object(ObjectPattern {
            entries: vec![ObjectPatternEntry {
                name: "new".into(),
                pattern: of_kind(ValueKind::Int),
                optional: false,
            }],
            exact: false,
        });
        let ops = get_migration_operations(&current, &next, &PseudoPath::root());
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], MigrationOp::Replacement { .. }));
    }

    #[test]
    fn list_element_change_recurses_under_wildcard() {
        let current = Pattern::List(inox_pattern::ListPattern {
            element: of_kind(ValueKind::String),
            min_len: 0,
            max_len: None,
        });
        let next = Pattern::List(inox_pattern::ListPattern {
            element: of_kind(ValueKind::Int),
            min_len: 0,
            max_len: None,
        });
        let ops = get_migration_operations(&current, &next, &PseudoPath::root());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].path(), &PseudoPath::parse("/*").unwrap());
    }
}
