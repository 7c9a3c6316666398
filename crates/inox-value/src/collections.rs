//! The mutable and composite value kinds: List, Tuple, Object, Record,
//! Dictionary, KeyList, Option, Mapping and the four range kinds (§3 Values).
//!
//! Mutable kinds are wrapped in `Arc<Mutex<..>>`. This both gives O(1) clone
//! (matching the teacher's `Arc<VariantData>` trick for recursive data) and
//! makes the VM's BLOCK_LOCK/BLOCK_UNLOCK opcodes (§4.5) a direct mapping onto
//! `Mutex::lock`/drop, rather than a hand-rolled lock bit. Unlike the teacher,
//! which marks the whole `Value` type `unsafe impl Send + Sync` to support a
//! C-ABI FFI boundary, every variant here is naturally `Send + Sync` because
//! there is no FFI boundary to cross — `Context`/VM-level bookkeeping (not the
//! type system) is what enforces "unshareable mutable value must not cross a
//! fiber boundary" (§3, §5).

use crate::error::{ValueError, ValueResult};
use crate::string::InoxStr;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct ListData {
    pub typed_element: bool,
    pub elements: Vec<Value>,
}

impl ListData {
    pub fn new(elements: Vec<Value>) -> Self {
        Self {
            typed_element: false,
            elements,
        }
    }

    pub fn get(&self, index: i64) -> ValueResult<Value> {
        self.at(index).cloned().ok_or(ValueError::OutOfBounds {
            len: self.elements.len(),
            index,
        })
    }

    fn at(&self, index: i64) -> Option<&Value> {
        usize::try_from(index).ok().and_then(|i| self.elements.get(i))
    }

    pub fn slice(&self, start: i64, end: i64) -> ValueResult<Vec<Value>> {
        let len = self.elements.len();
        let (s, e) = (start as i64, end as i64);
        if s < 0 || e < s || e as usize > len {
            return Err(ValueError::OutOfBounds { len, index: e });
        }
        Ok(self.elements[s as usize..e as usize].to_vec())
    }

    pub fn append(&mut self, v: Value) {
        self.elements.push(v);
    }

    pub fn set(&mut self, index: i64, v: Value) -> ValueResult<()> {
        let len = self.elements.len();
        let slot = usize::try_from(index)
            .ok()
            .filter(|i| *i < len)
            .ok_or(ValueError::OutOfBounds { len, index })?;
        self.elements[slot] = v;
        Ok(())
    }

    pub fn insert(&mut self, index: usize, v: Value) {
        self.elements.insert(index.min(self.elements.len()), v);
    }

    pub fn remove(&mut self, index: usize) -> Option<Value> {
        if index < self.elements.len() {
            Some(self.elements.remove(index))
        } else {
            None
        }
    }
}

/// A single property of an Object/Record: value plus whether it is
/// currently present (removed properties are tombstoned during migration,
/// never holes in the Vec, to keep ordering stable).
#[derive(Debug, Clone)]
pub struct Property {
    pub name: InoxStr,
    pub value: Value,
}

#[derive(Debug, Default)]
pub struct ObjectInner {
    pub properties: Vec<Property>,
    /// Per-value lock acquired by BLOCK_LOCK / released by BLOCK_UNLOCK (§4.5).
    pub locked: bool,
}

/// Object: ordered property map, optional URL identity, optional lock,
/// shareable across fibers once explicitly marked `shared` (§3, §5).
#[derive(Debug)]
pub struct ObjectData {
    pub url: Option<InoxStr>,
    pub shared: std::sync::atomic::AtomicBool,
    pub inner: Mutex<ObjectInner>,
}

impl ObjectData {
    pub fn new(properties: Vec<Property>) -> Arc<Self> {
        Arc::new(Self {
            url: None,
            shared: std::sync::atomic::AtomicBool::new(false),
            inner: Mutex::new(ObjectInner {
                properties,
                locked: false,
            }),
        })
    }

    pub fn is_shared(&self) -> bool {
        self.shared.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn mark_shared(&self) {
        self.shared.store(true, std::sync::atomic::Ordering::Release);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner
            .lock()
            .expect("object lock poisoned")
            .properties
            .iter()
            .find(|p| p.name.as_str() == name)
            .map(|p| p.value.clone())
    }

    pub fn set(&self, name: &str, value: Value) {
        let mut inner = self.inner.lock().expect("object lock poisoned");
        if let Some(p) = inner.properties.iter_mut().find(|p| p.name.as_str() == name) {
            p.value = value;
        } else {
            inner.properties.push(Property {
                name: InoxStr::new(name),
                value,
            });
        }
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        let mut inner = self.inner.lock().expect("object lock poisoned");
        let idx = inner.properties.iter().position(|p| p.name.as_str() == name)?;
        Some(inner.properties.remove(idx).value)
    }

    pub fn property_names(&self) -> Vec<InoxStr> {
        self.inner
            .lock()
            .expect("object lock poisoned")
            .properties
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }
}

/// Record: the immutable analogue of Object. No lock, no lifetime jobs.
#[derive(Debug, Clone)]
pub struct RecordData {
    pub properties: Arc<[Property]>,
}

impl RecordData {
    pub fn new(properties: Vec<Property>) -> Self {
        Self {
            properties: properties.into(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.properties
            .iter()
            .find(|p| p.name.as_str() == name)
            .map(|p| p.value.clone())
    }
}

/// Dictionary: arbitrary serializable keys, using the value's own
/// `equal`/`hash` for lookup rather than Rust's `Hash` trait (keys are
/// `Value`s, not `MapKey`-restricted like the teacher's `MapKey`), since
/// §3 allows "arbitrary serializable" keys rather than a hashable subset.
#[derive(Debug, Clone, Default)]
pub struct DictData {
    entries: Vec<(Value, Value)>,
}

impl DictData {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| crate::value::equal(k, key, 64))
            .map(|(_, v)| v)
    }

    pub fn set(&mut self, key: Value, value: Value) {
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|(k, _)| crate::value::equal(k, &key, 64))
        {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }
}

/// Mapping: key -> value lookup table driven by pattern/expression pairs.
/// Not serializable (§3): the compiled expressions behind each entry are
/// host/VM-internal, the same way `InoxFunction` is not serializable.
#[derive(Debug)]
pub struct MappingData {
    pub entries: Vec<(Value, Value)>,
}

/// An `Option(name, value)` CLI-style `--name=value` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionData {
    pub name: InoxStr,
    pub value: Box<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
    pub inclusive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRange {
    pub start: f64,
    pub end: f64,
    pub inclusive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuneRange {
    pub start: char,
    pub end: char,
    pub inclusive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuantityRange {
    pub start: crate::quantity::Quantity,
    pub end: crate::quantity::Quantity,
    pub inclusive: bool,
}

/// Ordered, immutable, serializable treedata literal (`{ a: 1, b: { c: 2 } }`
/// hierarchical-literal form distinct from Object/Record).
#[derive(Debug, Clone)]
pub struct TreedataNode {
    pub value: Box<Value>,
    pub children: BTreeMap<InoxStr, TreedataNode>,
}
