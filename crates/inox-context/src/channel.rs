//! CSP-style message passing between fibers (§5 "send-value/receive-handler
//! pairs"). Built directly on `may::sync::mpsc`, the same channel primitive
//! the teacher's scheduler uses to shuttle strand results back to their
//! spawner, rather than reimplementing a queue over raw condvars.

use crate::error::{ContextError, ContextResult};
use crate::share::ensure_shareable;
use inox_value::Value;
use may::sync::mpsc;

pub struct Sender {
    inner: mpsc::Sender<Value>,
}

pub struct Receiver {
    inner: mpsc::Receiver<Value>,
}

/// A rendezvous channel: every value that crosses it must already satisfy
/// the sharing invariant enforced in `share.rs`.
pub fn channel() -> (Sender, Receiver) {
    let (tx, rx) = mpsc::channel();
    (Sender { inner: tx }, Receiver { inner: rx })
}

impl Sender {
    pub fn send(&self, value: Value) -> ContextResult<()> {
        ensure_shareable(&value)?;
        self.inner.send(value).map_err(|_| ContextError::Cancelled)
    }

    pub fn clone_handle(&self) -> Sender {
        Sender {
            inner: self.inner.clone(),
        }
    }
}

impl Receiver {
    /// Blocking receive; returns `Err(ContextError::Cancelled)` once every
    /// `Sender` for this channel has been dropped.
    pub fn recv(&self) -> ContextResult<Value> {
        self.inner.recv().map_err(|_| ContextError::Cancelled)
    }

    pub fn try_recv(&self) -> Option<Value> {
        self.inner.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_then_recv_roundtrips() {
        let (tx, rx) = channel();
        tx.send(Value::Int(42)).unwrap();
        let v = rx.recv().unwrap();
        assert!(matches!(v, Value::Int(42)));
    }

    #[test]
    fn send_rejects_unshared_mutable_values() {
        let (tx, _rx) = channel();
        let obj = Value::Object(inox_value::collections::ObjectData::new(vec![]));
        assert!(tx.send(obj).is_err());
    }

    #[test]
    fn recv_fails_once_sender_dropped() {
        let (tx, rx) = channel();
        drop(tx);
        assert!(rx.recv().is_err());
    }
}
