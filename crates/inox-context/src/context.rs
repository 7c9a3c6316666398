//! The per-fiber execution context (§5): cancellation, host-resource rate
//! limiters, and the observability graph a run reports into. One `Context`
//! is created per top-level run and cheaply cloned (it is an `Arc` handle)
//! into every fiber spawned beneath it.

use crate::cancel::CancellationToken;
use crate::channel::{self, Receiver, Sender};
use crate::limits::Limits;
use crate::permission::{Permission, PermissionSet};
use crate::ratelimit::TokenBucket;
use inox_value::actors::SystemGraphData;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct ContextInner {
    cancellation: CancellationToken,
    limiters: Mutex<HashMap<String, Arc<TokenBucket>>>,
    limits: Limits,
    permissions: PermissionSet,
    graph: Arc<SystemGraphData>,
    /// One mailbox per context/actor (§5). Spawning a fiber creates a new
    /// mailbox for it rather than inheriting the parent's — each fiber is
    /// its own addressable actor. Handing another fiber a `Sender` so it
    /// can deliver into this mailbox is left to the embedder/VM layer,
    /// which is free to pass a cloned `Sender` as a captured value.
    mailbox_tx: Sender,
    mailbox_rx: Mutex<Receiver>,
}

#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_permissions(name, PermissionSet::new())
    }

    pub fn with_permissions(name: impl Into<String>, permissions: PermissionSet) -> Self {
        Self::with_permissions_and_limits(name, permissions, Limits::new())
    }

    pub fn with_permissions_and_limits(
        name: impl Into<String>,
        permissions: PermissionSet,
        limits: Limits,
    ) -> Self {
        let (mailbox_tx, mailbox_rx) = channel::channel();
        Self {
            inner: Arc::new(ContextInner {
                cancellation: CancellationToken::new(),
                limiters: Mutex::new(HashMap::new()),
                limits,
                permissions,
                graph: Arc::new(SystemGraphData::new(name)),
                mailbox_tx,
                mailbox_rx: Mutex::new(mailbox_rx),
            }),
        }
    }

    /// §4.3 `has_permission`/`check_permission`: permission denial is never
    /// recovered locally (§7), so callers that need the VM to unwind should
    /// convert `ContextError::PermissionDenied` the same way any other
    /// `ContextError` becomes a `VmError`.
    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.inner.permissions.has_permission(permission)
    }

    pub fn check_permission(&self, permission: &Permission) -> crate::error::ContextResult<()> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(crate::error::ContextError::PermissionDenied {
                permission: permission.to_string(),
            })
        }
    }

    /// A cloneable handle other fibers can use to deliver messages into
    /// this context's mailbox.
    pub fn mailbox_sender(&self) -> Sender {
        self.inner.mailbox_tx.clone_handle()
    }

    /// Blocking receive from this context's own mailbox.
    pub fn receive(&self) -> crate::error::ContextResult<inox_value::Value> {
        self.inner
            .mailbox_rx
            .lock()
            .expect("mailbox lock poisoned")
            .recv()
    }

    pub fn try_receive(&self) -> Option<inox_value::Value> {
        self.inner
            .mailbox_rx
            .lock()
            .expect("mailbox lock poisoned")
            .try_recv()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancellation.is_cancelled()
    }

    pub fn graph(&self) -> &Arc<SystemGraphData> {
        &self.inner.graph
    }

    /// Get-or-create a named token bucket. Buckets are keyed by name rather
    /// than by `HostFunction` identity so unrelated host functions can
    /// intentionally share a budget (e.g. "network" for every socket kind).
    /// A configured `Limits` entry for `name` wins over the capacity/refill
    /// the call site passes, so a host function's hardcoded defaults can
    /// still be overridden by whatever `RunConfig` loaded for this run.
    pub fn limiter(&self, name: &str, capacity: u64, refill_per_second: u64) -> Arc<TokenBucket> {
        let (capacity, refill_per_second) = match self.inner.limits.get(name) {
            Some(configured) => (configured.capacity, configured.refill_per_second),
            None => (capacity, refill_per_second),
        };
        let mut limiters = self.inner.limiters.lock().expect("limiter map lock poisoned");
        limiters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(TokenBucket::new(capacity, refill_per_second)))
            .clone()
    }

    /// A child context for a spawned fiber: shares the limiter map and
    /// graph (so siblings observe the same budgets and emit into the same
    /// trace), but gets its own cancellation token chained to the parent's
    /// (§5 "cancel a context and everything transitively spawned from it").
    pub fn child(&self) -> Context {
        let (mailbox_tx, mailbox_rx) = channel::channel();
        Context {
            inner: Arc::new(ContextInner {
                cancellation: self.inner.cancellation.child(),
                limiters: Mutex::new(self.inner.limiters.lock().expect("limiter map lock poisoned").clone()),
                limits: self.inner.limits.clone(),
                permissions: self.inner.permissions.clone(),
                graph: Arc::clone(&self.inner.graph),
                mailbox_tx,
                mailbox_rx: Mutex::new(mailbox_rx),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_is_shared_across_lookups() {
        let ctx = Context::new("test");
        let a = ctx.limiter("net", 10, 5);
        let b = ctx.limiter("net", 999, 999);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.stats().capacity, 10);
    }

    #[test]
    fn child_inherits_cancellation_state() {
        let ctx = Context::new("test");
        ctx.cancellation().cancel();
        let child = ctx.child();
        assert!(child.is_cancelled());
    }

    #[test]
    fn mailbox_sender_delivers_to_receive() {
        let ctx = Context::new("test");
        let sender = ctx.mailbox_sender();
        sender.send(inox_value::Value::Int(5)).unwrap();
        let received = ctx.receive().unwrap();
        assert!(matches!(received, inox_value::Value::Int(5)));
    }

    #[test]
    fn child_gets_its_own_mailbox() {
        let ctx = Context::new("test");
        ctx.mailbox_sender().send(inox_value::Value::Int(1)).unwrap();
        let child = ctx.child();
        assert!(child.try_receive().is_none());
    }

    #[test]
    fn child_shares_the_same_graph() {
        let ctx = Context::new("test");
        let child = ctx.child();
        assert!(Arc::ptr_eq(ctx.graph(), child.graph()));
    }

    #[test]
    fn child_inherits_granted_permissions() {
        use crate::permission::{Permission, PermissionEntity, PermissionKind, PermissionSet};
        let perms = PermissionSet::new().grant(Permission::new(
            PermissionKind::Read,
            PermissionEntity::Path("/...".to_string()),
        ));
        let ctx = Context::with_permissions("test", perms);
        let child = ctx.child();
        let p = Permission::new(PermissionKind::Read, PermissionEntity::Path("/a".to_string()));
        assert!(child.has_permission(&p));
    }

    #[test]
    fn check_permission_denies_ungranted_kind() {
        use crate::permission::{Permission, PermissionEntity, PermissionKind};
        let ctx = Context::new("test");
        let p = Permission::new(PermissionKind::Write, PermissionEntity::Path("/a".to_string()));
        assert!(ctx.check_permission(&p).is_err());
    }

    #[test]
    fn configured_limit_overrides_call_site_defaults() {
        let limits = Limits::new().with_bucket("network", 3, 1);
        let ctx = Context::with_permissions_and_limits("test", PermissionSet::new(), limits);
        let bucket = ctx.limiter("network", 999, 999);
        assert_eq!(bucket.stats().capacity, 3);
    }
}
