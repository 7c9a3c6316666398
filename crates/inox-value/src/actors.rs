//! Concurrent-actor value kinds: LifetimeJob, ReceptionHandler, SystemGraph.
//!
//! These travel as `Value`s but their behavior (scheduling a job, matching
//! and dispatching a message) belongs to `inox-vm`; this crate only owns
//! their data shape, the same split the teacher uses between
//! `runtime::value::Value` (data) and `runtime::scheduler`/`channel`
//! (behavior).

use crate::callable::PatternHandle;
use crate::value::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// A recurring or one-shot job attached to an Object's lifetime (§3).
/// Mutable (it tracks whether it has fired) but not shareable: a lifetime
/// job belongs to exactly one Object, which itself may or may not be shared.
#[derive(Debug)]
pub struct LifetimeJobData {
    pub bytecode_id: u32,
    pub fired: AtomicBool,
}

impl LifetimeJobData {
    pub fn new(bytecode_id: u32) -> Self {
        Self {
            bytecode_id,
            fired: AtomicBool::new(false),
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    pub fn mark_fired(&self) {
        self.fired.store(true, Ordering::Release);
    }
}

/// A handler registered to react to messages matching `pattern`, synchronous
/// rendezvous semantics per §5 ("send-value/receive-handler pairs").
#[derive(Debug)]
pub struct ReceptionHandlerData {
    pub pattern: PatternHandle,
    pub bytecode_id: u32,
}

/// A node in the observability graph (§3 SystemGraph). Shared by
/// construction: many fibers may append events to the same graph
/// concurrently, so every mutable field is behind a lock or an atomic.
#[derive(Debug, Default)]
pub struct SystemGraphData {
    pub name: String,
    pub events: Mutex<Vec<SystemGraphEvent>>,
    pub next_id: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct SystemGraphEvent {
    pub id: u64,
    pub text: String,
    pub value: Option<Value>,
}

impl SystemGraphData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn record(&self, text: impl Into<String>, value: Option<Value>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.events
            .lock()
            .expect("system graph lock poisoned")
            .push(SystemGraphEvent {
                id,
                text: text.into(),
                value,
            });
        id
    }
}
