//! Applies a set of `MigrationOp`s to a live value (§4.7 `migrate`).
//!
//! Ops are grouped by path depth relative to the value currently being
//! visited: same depth means the whole value is swapped out; depth + 1 means
//! a named property is deleted/replaced/inserted; anything deeper means
//! recursing into the named property, which must itself be migration-capable.

use crate::error::{MigrationError, MigrationResult};
use crate::op::MigrationOp;
use crate::path::{PathSegment, PseudoPath};
use inox_value::collections::{ListData, ObjectData, Property, RecordData};
use inox_value::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// How a handler produces the value to use for a `Replacement`, `Inclusion`
/// or `NillableInitialization` op (§4.7 "call handler function with old
/// value, or clone handler's initial value").
#[derive(Clone)]
pub enum MigrationHandler {
    Transform(Arc<dyn Fn(&Value) -> Value + Send + Sync>),
    Initial(Value),
}

impl MigrationHandler {
    fn resolve(&self, old: Option<&Value>) -> Value {
        match self {
            MigrationHandler::Transform(f) => f(old.unwrap_or(&Value::Nil)),
            MigrationHandler::Initial(v) => v.clone(),
        }
    }
}

/// User-supplied handlers, keyed by the op's own path. A `Removal` never
/// needs one: deleting a property requires no value to produce.
#[derive(Default, Clone)]
pub struct MigrationHandlers {
    replacements: HashMap<PseudoPath, MigrationHandler>,
    inclusions: HashMap<PseudoPath, MigrationHandler>,
    initializations: HashMap<PseudoPath, MigrationHandler>,
}

impl MigrationHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_replacement(mut self, path: PseudoPath, handler: MigrationHandler) -> Self {
        self.replacements.insert(path, handler);
        self
    }

    pub fn on_inclusion(mut self, path: PseudoPath, handler: MigrationHandler) -> Self {
        self.inclusions.insert(path, handler);
        self
    }

    pub fn on_initialization(mut self, path: PseudoPath, handler: MigrationHandler) -> Self {
        self.initializations.insert(path, handler);
        self
    }
}

pub fn migrate(value: &Value, ops: &[MigrationOp], handlers: &MigrationHandlers) -> MigrationResult<Value> {
    let refs: Vec<&MigrationOp> = ops.iter().collect();
    migrate_at(value, &PseudoPath::root(), &refs, handlers)
}

fn migrate_at(
    value: &Value,
    here: &PseudoPath,
    ops: &[&MigrationOp],
    handlers: &MigrationHandlers,
) -> MigrationResult<Value> {
    let depth = here.depth();
    let is_relevant = |op: &MigrationOp| -> bool {
        let op_depth = op.path().depth();
        op_depth >= depth && op.path().segments()[..depth] == here.segments()[..]
    };
    let relevant: Vec<&MigrationOp> = ops.iter().copied().filter(|op| is_relevant(op)).collect();
    if relevant.is_empty() {
        return Ok(value.clone());
    }

    let whole_value_replacement = relevant
        .iter()
        .find(|op| matches!(op, MigrationOp::Replacement { .. }) && op.path().depth() == depth);
    if whole_value_replacement.is_some() {
        let handler = handlers
            .replacements
            .get(here)
            .cloned()
            .unwrap_or_else(|| MigrationHandler::Initial(value.clone()));
        return Ok(handler.resolve(Some(value)));
    }

    let property_level: Vec<&MigrationOp> = relevant
        .iter()
        .copied()
        .filter(|op| op.path().depth() == depth + 1)
        .collect();
    let deeper: Vec<&MigrationOp> = relevant
        .iter()
        .copied()
        .filter(|op| op.path().depth() > depth + 1)
        .collect();

    match value {
        Value::Object(obj) => {
            let mut properties: Vec<Property> = obj
                .property_names()
                .into_iter()
                .map(|name| Property {
                    value: obj.get(name.as_str()).expect("name came from property_names"),
                    name,
                })
                .collect();
            apply_object_ops(&mut properties, here, &property_level, &deeper, handlers)?;
            Ok(Value::Object(ObjectData::new(properties)))
        }
        Value::Record(rec) => {
            let mut properties: Vec<Property> = rec.properties.to_vec();
            apply_object_ops(&mut properties, here, &property_level, &deeper, handlers)?;
            Ok(Value::Record(Arc::new(RecordData::new(properties))))
        }
        Value::List(list) => {
            let elements = list.lock().expect("list lock poisoned").elements.clone();
            let wildcard_here = here.child(PathSegment::Wildcard);
            let child_ops: Vec<&MigrationOp> = ops
                .iter()
                .filter(|op| op.path().depth() > depth)
                .copied()
                .collect();
            let mut migrated = Vec::with_capacity(elements.len());
            for element in &elements {
                migrated.push(migrate_at(element, &wildcard_here, &child_ops, handlers)?);
            }
            Ok(Value::List(Arc::new(Mutex::new(ListData::new(migrated)))))
        }
        _ if property_level.is_empty() && deeper.is_empty() => Ok(value.clone()),
        _ => Err(MigrationError::ValueAtPathSegmentsIsNotMigrationCapable(
            here.to_string(),
        )),
    }
}

fn apply_object_ops(
    properties: &mut Vec<Property>,
    here: &PseudoPath,
    property_level: &[&MigrationOp],
    deeper: &[&MigrationOp],
    handlers: &MigrationHandlers,
) -> MigrationResult<()> {
    // Fixed processing order (§4.7): Deletions, Replacements, Inclusions,
    // Initializations.
    for op in property_level.iter().filter(|o| matches!(o, MigrationOp::Removal { .. })) {
        if let Some(PathSegment::Name(name)) = op.path().last() {
            properties.retain(|p| p.name.as_str() != name);
        }
    }
    for op in property_level
        .iter()
        .filter(|o| matches!(o, MigrationOp::Replacement { .. }))
    {
        let Some(PathSegment::Name(name)) = op.path().last() else {
            continue;
        };
        let old = properties.iter().find(|p| p.name.as_str() == name);
        let Some(old_value) = old.map(|p| p.value.clone()) else {
            return Err(MigrationError::ValueAtPathSegmentsDoesNotExist(
                op.path().to_string(),
            ));
        };
        let handler = handlers
            .replacements
            .get(op.path())
            .cloned()
            .unwrap_or_else(|| MigrationHandler::Initial(old_value.clone()));
        let new_value = handler.resolve(Some(&old_value));
        if let Some(p) = properties.iter_mut().find(|p| p.name.as_str() == name) {
            p.value = new_value;
        }
    }
    for op in property_level
        .iter()
        .filter(|o| matches!(o, MigrationOp::Inclusion { .. }))
    {
        let Some(PathSegment::Name(name)) = op.path().last() else {
            continue;
        };
        if properties.iter().any(|p| p.name.as_str() == name) {
            continue;
        }
        let MigrationOp::Inclusion { optional, .. } = op else {
            unreachable!()
        };
        let handler = match handlers.inclusions.get(op.path()).cloned() {
            Some(handler) => handler,
            // No handler and the new property is optional: leave the value
            // untouched rather than inventing a `Nil` (§8 Scenario E).
            None if *optional => continue,
            None => MigrationHandler::Initial(Value::Nil),
        };
        properties.push(Property {
            name: name.as_str().into(),
            value: handler.resolve(None),
        });
    }
    for op in property_level
        .iter()
        .filter(|o| matches!(o, MigrationOp::NillableInitialization { .. }))
    {
        let Some(PathSegment::Name(name)) = op.path().last() else {
            continue;
        };
        let already_set = properties
            .iter()
            .any(|p| p.name.as_str() == name && !matches!(p.value, Value::Nil));
        if already_set {
            continue;
        }
        let handler = handlers
            .initializations
            .get(op.path())
            .cloned()
            .unwrap_or(MigrationHandler::Initial(Value::Nil));
        let new_value = handler.resolve(None);
        match properties.iter_mut().find(|p| p.name.as_str() == name) {
            Some(p) => p.value = new_value,
            None => properties.push(Property {
                name: name.as_str().into(),
                value: new_value,
            }),
        }
    }

    // Recurse for every op at least two levels deeper, grouped by the
    // property name they pass through at this depth.
    let depth = here.depth();
    let mut by_name: HashMap<String, Vec<&MigrationOp>> = HashMap::new();
    for op in deeper {
        if let Some(PathSegment::Name(name)) = op.path().segments().get(depth) {
            by_name.entry(name.clone()).or_default().push(*op);
        }
    }
    for (name, ops) in by_name {
        let child_here = here.child(PathSegment::Name(name.clone()));
        let Some(prop) = properties.iter().find(|p| p.name.as_str() == name) else {
            return Err(MigrationError::ValueAtPathSegmentsDoesNotExist(
                child_here.to_string(),
            ));
        };
        let migrated = migrate_at(&prop.value.clone(), &child_here, &ops, handlers)?;
        if let Some(p) = properties.iter_mut().find(|p| p.name.as_str() == name) {
            p.value = migrated;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inox_value::string::InoxStr;

    fn object(props: &[(&str, Value)]) -> Value {
        Value::Object(ObjectData::new(
            props
                .iter()
                .map(|(n, v)| Property {
                    name: InoxStr::new(*n),
                    value: v.clone(),
                })
                .collect(),
        ))
    }

    #[test]
    fn removal_deletes_the_named_property() {
        let value = object(&[("name", Value::String(InoxStr::new("a"))), ("legacy", Value::Nil)]);
        let ops = vec![MigrationOp::Removal {
            path: PseudoPath::parse("/legacy").unwrap(),
            value: Arc::new(inox_pattern::Pattern::Any),
        }];
        let migrated = migrate(&value, &ops, &MigrationHandlers::new()).unwrap();
        let Value::Object(obj) = migrated else { panic!("expected object") };
        assert!(obj.get("legacy").is_none());
        assert!(obj.get("name").is_some());
    }

    #[test]
    fn inclusion_adds_a_property_via_handler() {
        let value = object(&[]);
        let ops = vec![MigrationOp::Inclusion {
            path: PseudoPath::parse("/age").unwrap(),
            value: Arc::new(inox_pattern::Pattern::Any),
            optional: false,
        }];
        let handlers = MigrationHandlers::new().on_inclusion(
            PseudoPath::parse("/age").unwrap(),
            MigrationHandler::Initial(Value::Int(0)),
        );
        let migrated = migrate(&value, &ops, &handlers).unwrap();
        let Value::Object(obj) = migrated else { panic!("expected object") };
        assert!(matches!(obj.get("age"), Some(Value::Int(0))));
    }

    #[test]
    fn missing_property_for_replacement_is_an_error() {
        let value = object(&[]);
        let ops = vec![MigrationOp::Replacement {
            path: PseudoPath::parse("/missing").unwrap(),
            current: Arc::new(inox_pattern::Pattern::Any),
            next: Arc::new(inox_pattern::Pattern::Any),
        }];
        let err = migrate(&value, &ops, &MigrationHandlers::new()).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::ValueAtPathSegmentsDoesNotExist(_)
        ));
    }

    #[test]
    fn replacement_at_root_swaps_the_whole_value() {
        let value = Value::Int(1);
        let ops = vec![MigrationOp::Replacement {
            path: PseudoPath::root(),
            current: Arc::new(inox_pattern::Pattern::Any),
            next: Arc::new(inox_pattern::Pattern::Any),
        }];
        let handlers = MigrationHandlers::new().on_replacement(
            PseudoPath::root(),
            MigrationHandler::Transform(Arc::new(|old| match old {
                Value::Int(n) => Value::Int(n + 1),
                other => other.clone(),
            })),
        );
        let migrated = migrate(&value, &ops, &handlers).unwrap();
        assert!(matches!(migrated, Value::Int(2)));
    }
}
