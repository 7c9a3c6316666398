//! The tagged union of runtime values (§3 Values).
//!
//! Matches the teacher's "Value is pure data, independent of Stack
//! structure" principle (`runtime::value::Value` doc comment) but drops the
//! `#[repr(C)]` / fixed-40-byte-layout discipline: that discipline exists in
//! the teacher only to keep compiled LLVM IR and Rust agreeing on a struct
//! layout across an FFI boundary, and this runtime has no such boundary — it
//! interprets bytecode directly (§4.5), it does not JIT/AOT it (§1 Non-goals).

use crate::actors::{LifetimeJobData, ReceptionHandlerData, SystemGraphData};
use crate::callable::{ErrorData, GoFunctionHandle, InoxFunctionData, PatternHandle};
use crate::collections::{
    DictData, FloatRange, IntRange, ListData, MappingData, ObjectData, OptionData, QuantityRange,
    RecordData, RuneRange, TreedataNode,
};
use crate::quantity::{DateTime, Duration, Quantity, Rate, Year};
use crate::string::InoxStr;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Rune(char),
    Byte(u8),

    String(InoxStr),
    Path(InoxStr),
    Url(InoxStr),
    Host(InoxStr),
    Scheme(InoxStr),
    Identifier(InoxStr),
    PropertyName(InoxStr),

    Quantity(Quantity),
    Rate(Rate),
    Duration(Duration),
    DateTime(DateTime),
    Year(Year),

    ByteSlice(Arc<Mutex<Vec<u8>>>),
    RuneSlice(Arc<Mutex<Vec<char>>>),

    List(Arc<Mutex<ListData>>),
    Tuple(Arc<[Value]>),
    Object(Arc<ObjectData>),
    Record(Arc<RecordData>),
    Dictionary(Arc<Mutex<DictData>>),
    KeyList(Arc<[InoxStr]>),
    OptionValue(Arc<OptionData>),
    Mapping(Arc<Mutex<MappingData>>),

    IntRange(IntRange),
    FloatRange(FloatRange),
    RuneRange(RuneRange),
    QuantityRange(Arc<QuantityRange>),

    Pattern(PatternHandle),
    InoxFunction(Arc<InoxFunctionData>),
    GoFunction(GoFunctionHandle),

    Error(Arc<ErrorData>),

    LifetimeJob(Arc<LifetimeJobData>),
    ReceptionHandler(Arc<ReceptionHandlerData>),
    SystemGraph(Arc<SystemGraphData>),

    Treedata(Arc<TreedataNode>),
}

/// Dynamic kind discriminant, used by `TypePattern` (§3 Patterns) and in
/// `ValueError::TypeMismatch` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Bool,
    Int,
    Float,
    Rune,
    Byte,
    String,
    Path,
    Url,
    Host,
    Scheme,
    Identifier,
    PropertyName,
    Quantity,
    Rate,
    Duration,
    DateTime,
    Year,
    ByteSlice,
    RuneSlice,
    List,
    Tuple,
    Object,
    Record,
    Dictionary,
    KeyList,
    Option,
    Mapping,
    IntRange,
    FloatRange,
    RuneRange,
    QuantityRange,
    Pattern,
    InoxFunction,
    GoFunction,
    Error,
    LifetimeJob,
    ReceptionHandler,
    SystemGraph,
    Treedata,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        use ValueKind::*;
        match self {
            Nil => "nil",
            Bool => "bool",
            Int => "int",
            Float => "float",
            Rune => "rune",
            Byte => "byte",
            String => "string",
            Path => "path",
            Url => "url",
            Host => "host",
            Scheme => "scheme",
            Identifier => "identifier",
            PropertyName => "property-name",
            Quantity => "quantity",
            Rate => "rate",
            Duration => "duration",
            DateTime => "datetime",
            Year => "year",
            ByteSlice => "byte-slice",
            RuneSlice => "rune-slice",
            List => "list",
            Tuple => "tuple",
            Object => "object",
            Record => "record",
            Dictionary => "dictionary",
            KeyList => "key-list",
            Option => "option",
            Mapping => "mapping",
            IntRange => "int-range",
            FloatRange => "float-range",
            RuneRange => "rune-range",
            QuantityRange => "quantity-range",
            Pattern => "pattern",
            InoxFunction => "inox-function",
            GoFunction => "go-function",
            Error => "error",
            LifetimeJob => "lifetime-job",
            ReceptionHandler => "reception-handler",
            SystemGraph => "system-graph",
            Treedata => "treedata",
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Rune(_) => ValueKind::Rune,
            Value::Byte(_) => ValueKind::Byte,
            Value::String(_) => ValueKind::String,
            Value::Path(_) => ValueKind::Path,
            Value::Url(_) => ValueKind::Url,
            Value::Host(_) => ValueKind::Host,
            Value::Scheme(_) => ValueKind::Scheme,
            Value::Identifier(_) => ValueKind::Identifier,
            Value::PropertyName(_) => ValueKind::PropertyName,
            Value::Quantity(_) => ValueKind::Quantity,
            Value::Rate(_) => ValueKind::Rate,
            Value::Duration(_) => ValueKind::Duration,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Year(_) => ValueKind::Year,
            Value::ByteSlice(_) => ValueKind::ByteSlice,
            Value::RuneSlice(_) => ValueKind::RuneSlice,
            Value::List(_) => ValueKind::List,
            Value::Tuple(_) => ValueKind::Tuple,
            Value::Object(_) => ValueKind::Object,
            Value::Record(_) => ValueKind::Record,
            Value::Dictionary(_) => ValueKind::Dictionary,
            Value::KeyList(_) => ValueKind::KeyList,
            Value::OptionValue(_) => ValueKind::Option,
            Value::Mapping(_) => ValueKind::Mapping,
            Value::IntRange(_) => ValueKind::IntRange,
            Value::FloatRange(_) => ValueKind::FloatRange,
            Value::RuneRange(_) => ValueKind::RuneRange,
            Value::QuantityRange(_) => ValueKind::QuantityRange,
            Value::Pattern(_) => ValueKind::Pattern,
            Value::InoxFunction(_) => ValueKind::InoxFunction,
            Value::GoFunction(_) => ValueKind::GoFunction,
            Value::Error(_) => ValueKind::Error,
            Value::LifetimeJob(_) => ValueKind::LifetimeJob,
            Value::ReceptionHandler(_) => ValueKind::ReceptionHandler,
            Value::SystemGraph(_) => ValueKind::SystemGraph,
            Value::Treedata(_) => ValueKind::Treedata,
        }
    }

    pub fn is_mutable(&self) -> bool {
        matches!(
            self.kind(),
            ValueKind::ByteSlice
                | ValueKind::RuneSlice
                | ValueKind::List
                | ValueKind::Object
                | ValueKind::Dictionary
                | ValueKind::Mapping
                | ValueKind::LifetimeJob
                | ValueKind::SystemGraph
        )
    }

    /// Whether this value implements the share protocol (§3 Invariants):
    /// currently only Objects explicitly marked shared.
    pub fn is_shareable(&self) -> bool {
        match self {
            Value::Object(o) => o.is_shared(),
            v => !v.is_mutable(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    fn raw_ptr(&self) -> Option<*const ()> {
        match self {
            Value::ByteSlice(a) => Some(Arc::as_ptr(a) as *const ()),
            Value::RuneSlice(a) => Some(Arc::as_ptr(a) as *const ()),
            Value::List(a) => Some(Arc::as_ptr(a) as *const ()),
            Value::Object(a) => Some(Arc::as_ptr(a) as *const ()),
            Value::Dictionary(a) => Some(Arc::as_ptr(a) as *const ()),
            Value::Mapping(a) => Some(Arc::as_ptr(a) as *const ()),
            _ => None,
        }
    }
}

/// Structural, cycle-safe equality with a recursion-depth cap (§4.1).
/// Exceeding `depth_cap` returns `false` conservatively rather than panicking
/// or looping forever, matching the spec's documented behavior.
pub fn equal(a: &Value, b: &Value, depth_cap: u32) -> bool {
    let mut seen = crate::arena::SeenSet::new();
    equal_inner(a, b, depth_cap, &mut seen)
}

fn equal_inner(a: &Value, b: &Value, depth_left: u32, seen: &mut crate::arena::SeenSet) -> bool {
    if depth_left == 0 {
        return false;
    }
    if let (Some(pa), Some(pb)) = (a.raw_ptr(), b.raw_ptr()) {
        if seen.mark(pa, pb) {
            return true; // already comparing this pair further up the call stack: cycle
        }
    }
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Rune(x), Value::Rune(y)) => x == y,
        (Value::Byte(x), Value::Byte(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Path(x), Value::Path(y)) => x == y,
        (Value::Url(x), Value::Url(y)) => x == y,
        (Value::Host(x), Value::Host(y)) => x == y,
        (Value::Scheme(x), Value::Scheme(y)) => x == y,
        (Value::Identifier(x), Value::Identifier(y)) => x == y,
        (Value::PropertyName(x), Value::PropertyName(y)) => x == y,
        (Value::Quantity(x), Value::Quantity(y)) => x == y,
        (Value::Duration(x), Value::Duration(y)) => x == y,
        (Value::Year(x), Value::Year(y)) => x == y,
        (Value::ByteSlice(x), Value::ByteSlice(y)) => {
            Arc::ptr_eq(x, y) || *x.lock().unwrap() == *y.lock().unwrap()
        }
        (Value::RuneSlice(x), Value::RuneSlice(y)) => {
            Arc::ptr_eq(x, y) || *x.lock().unwrap() == *y.lock().unwrap()
        }
        (Value::List(x), Value::List(y)) => {
            if Arc::ptr_eq(x, y) {
                return true;
            }
            let (xs, ys) = (x.lock().unwrap(), y.lock().unwrap());
            xs.elements.len() == ys.elements.len()
                && xs
                    .elements
                    .iter()
                    .zip(ys.elements.iter())
                    .all(|(ex, ey)| equal_inner(ex, ey, depth_left - 1, seen))
        }
        (Value::Tuple(x), Value::Tuple(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|(ex, ey)| equal_inner(ex, ey, depth_left - 1, seen))
        }
        (Value::Object(x), Value::Object(y)) => {
            if Arc::ptr_eq(x, y) {
                return true;
            }
            let (xi, yi) = (x.inner.lock().unwrap(), y.inner.lock().unwrap());
            xi.properties.len() == yi.properties.len()
                && xi.properties.iter().all(|px| {
                    yi.properties
                        .iter()
                        .find(|py| py.name == px.name)
                        .is_some_and(|py| equal_inner(&px.value, &py.value, depth_left - 1, seen))
                })
        }
        (Value::Record(x), Value::Record(y)) => {
            x.properties.len() == y.properties.len()
                && x.properties.iter().all(|px| {
                    y.properties
                        .iter()
                        .find(|py| py.name == px.name)
                        .is_some_and(|py| equal_inner(&px.value, &py.value, depth_left - 1, seen))
                })
        }
        (Value::Dictionary(x), Value::Dictionary(y)) => {
            if Arc::ptr_eq(x, y) {
                return true;
            }
            let (xs, ys) = (x.lock().unwrap(), y.lock().unwrap());
            xs.len() == ys.len()
                && xs.iter().all(|(k, v)| {
                    ys.get(k)
                        .is_some_and(|yv| equal_inner(v, yv, depth_left - 1, seen))
                })
        }
        (Value::KeyList(x), Value::KeyList(y)) => x == y,
        (Value::OptionValue(x), Value::OptionValue(y)) => {
            x.name == y.name && equal_inner(&x.value, &y.value, depth_left - 1, seen)
        }
        (Value::IntRange(x), Value::IntRange(y)) => x == y,
        (Value::FloatRange(x), Value::FloatRange(y)) => x == y,
        (Value::RuneRange(x), Value::RuneRange(y)) => x == y,
        (Value::QuantityRange(x), Value::QuantityRange(y)) => x == y,
        (Value::InoxFunction(x), Value::InoxFunction(y)) => x == y,
        (Value::GoFunction(x), Value::GoFunction(y)) => Arc::ptr_eq(x, y),
        (Value::Pattern(x), Value::Pattern(y)) => Arc::ptr_eq(x, y),
        (Value::Error(x), Value::Error(y)) => x == y,
        (Value::SystemGraph(x), Value::SystemGraph(y)) => Arc::ptr_eq(x, y),
        (Value::LifetimeJob(x), Value::LifetimeJob(y)) => Arc::ptr_eq(x, y),
        (Value::ReceptionHandler(x), Value::ReceptionHandler(y)) => Arc::ptr_eq(x, y),
        _ => false,
    }
}

/// Deep copy for serializable values; identity-preserving for shared ones
/// (§4.1). A value that is not serializable (InoxFunction, GoFunction,
/// Mapping, LifetimeJob, ReceptionHandler, SystemGraph) simply shares its
/// `Arc`, matching "identity-preserving for shared".
pub fn clone_value(v: &Value) -> Value {
    match v {
        Value::List(l) => {
            let data = l.lock().unwrap();
            Value::List(Arc::new(Mutex::new(ListData {
                typed_element: data.typed_element,
                elements: data.elements.iter().map(clone_value).collect(),
            })))
        }
        Value::ByteSlice(b) => Value::ByteSlice(Arc::new(Mutex::new(b.lock().unwrap().clone()))),
        Value::RuneSlice(r) => Value::RuneSlice(Arc::new(Mutex::new(r.lock().unwrap().clone()))),
        Value::Dictionary(d) => {
            let data = d.lock().unwrap();
            let mut clone = DictData::new();
            for (k, val) in data.iter() {
                clone.set(clone_value(k), clone_value(val));
            }
            Value::Dictionary(Arc::new(Mutex::new(clone)))
        }
        Value::Object(o) if o.is_shared() => Value::Object(Arc::clone(o)),
        Value::Object(o) => {
            let inner = o.inner.lock().unwrap();
            let properties = inner
                .properties
                .iter()
                .map(|p| crate::collections::Property {
                    name: p.name.clone(),
                    value: clone_value(&p.value),
                })
                .collect();
            Value::Object(Arc::new(ObjectData {
                url: o.url.clone(),
                shared: std::sync::atomic::AtomicBool::new(false),
                inner: Mutex::new(crate::collections::ObjectInner {
                    properties,
                    locked: false,
                }),
            }))
        }
        other => other.clone(),
    }
}

/// Convenience equality for uses that don't need a specific recursion-depth
/// cap (e.g. derived `PartialEq` on container structs that embed a `Value`).
/// Still cycle-safe; callers needing an explicit cap should call [`equal`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        equal(self, other, u32::MAX)
    }
}

/// Hashable projection of a value, for Dictionary/Mapping keys. Returns
/// `None` for kinds where equality is not structurally stable enough to hash
/// cheaply (Float's NaN, any mutable container) — callers fall back to
/// linear `equal` scans in that case, same policy as the teacher's `MapKey`.
pub fn hash_key(v: &Value) -> Option<u64> {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    match v {
        Value::Nil => 0u8.hash(&mut hasher),
        Value::Bool(b) => b.hash(&mut hasher),
        Value::Int(i) => i.hash(&mut hasher),
        Value::Rune(c) => c.hash(&mut hasher),
        Value::Byte(b) => b.hash(&mut hasher),
        Value::String(s) => s.as_str().hash(&mut hasher),
        Value::Path(s) | Value::Url(s) | Value::Host(s) | Value::Scheme(s) => {
            s.as_str().hash(&mut hasher)
        }
        Value::Identifier(s) | Value::PropertyName(s) => s.as_str().hash(&mut hasher),
        _ => return None,
    }
    Some(hasher.finish())
}

/// Bounded length, where defined (§4.1).
pub fn len(v: &Value) -> Option<usize> {
    match v {
        Value::String(s) => Some(s.len()),
        Value::ByteSlice(b) => Some(b.lock().unwrap().len()),
        Value::RuneSlice(r) => Some(r.lock().unwrap().len()),
        Value::List(l) => Some(l.lock().unwrap().elements.len()),
        Value::Tuple(t) => Some(t.len()),
        Value::KeyList(k) => Some(k.len()),
        Value::Dictionary(d) => Some(d.lock().unwrap().len()),
        _ => None,
    }
}

/// Indexable access (§4.1). `TypeMismatch` for non-indexable kinds,
/// `OutOfBounds` when the index falls outside the value's length.
pub fn at(v: &Value, index: i64) -> ValueResultValue {
    match v {
        Value::List(l) => l.lock().unwrap().get(index),
        Value::Tuple(t) => usize::try_from(index)
            .ok()
            .and_then(|i| t.get(i).cloned())
            .ok_or(crate::error::ValueError::OutOfBounds {
                len: t.len(),
                index,
            }),
        Value::String(s) => s
            .as_str()
            .chars()
            .nth(index.max(0) as usize)
            .map(Value::Rune)
            .ok_or(crate::error::ValueError::OutOfBounds {
                len: s.as_str().chars().count(),
                index,
            }),
        Value::ByteSlice(b) => {
            let data = b.lock().unwrap();
            usize::try_from(index)
                .ok()
                .and_then(|i| data.get(i).copied())
                .map(Value::Byte)
                .ok_or(crate::error::ValueError::OutOfBounds {
                    len: data.len(),
                    index,
                })
        }
        _ => Err(crate::error::ValueError::TypeMismatch {
            op: "at",
            value_kind: v.kind().name(),
        }),
    }
}

type ValueResultValue = crate::error::ValueResult<Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_is_reflexive_and_symmetric() {
        let a = Value::Int(3);
        let b = Value::Int(3);
        assert!(equal(&a, &b, 32));
        assert!(equal(&b, &a, 32));
    }

    #[test]
    fn equal_of_clone_is_true_for_serializable_values() {
        let list = Value::List(Arc::new(Mutex::new(ListData::new(vec![
            Value::Int(1),
            Value::String(InoxStr::new("hi")),
        ]))));
        let cloned = clone_value(&list);
        assert!(equal(&list, &cloned, 32));
    }

    #[test]
    fn equal_handles_cyclic_lists_without_looping() {
        let inner = Arc::new(Mutex::new(ListData::new(vec![Value::Int(1)])));
        let a = Value::List(Arc::clone(&inner));
        inner.lock().unwrap().elements.push(a.clone());
        // a now contains itself; comparing it to itself must terminate.
        assert!(equal(&a, &a, 32));
    }

    #[test]
    fn depth_cap_is_conservative() {
        // A list nested one level deeper than the cap allows must compare false.
        let innermost = Value::Int(1);
        let nested = Value::List(Arc::new(Mutex::new(ListData::new(vec![Value::List(
            Arc::new(Mutex::new(ListData::new(vec![innermost]))),
        )]))));
        assert!(!equal(&nested, &nested.clone(), 1));
    }

    #[test]
    fn out_of_bounds_index_is_reported() {
        let list = Value::List(Arc::new(Mutex::new(ListData::new(vec![Value::Int(1)]))));
        assert!(matches!(
            at(&list, 5),
            Err(crate::error::ValueError::OutOfBounds { len: 1, index: 5 })
        ));
    }
}
