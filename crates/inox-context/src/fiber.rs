//! Spawning cooperative fibers (§5). A thin wrapper over `may::go!`: the
//! teacher's scheduler spawns the same way, tracking each strand in a
//! registry so a cancelled parent can find and stop its children. Here the
//! parent/child relationship is carried by `Context::child` instead of a
//! separate registry, since cancellation already fans out through the
//! shared `CancellationToken` chain.

use crate::context::Context;
use crate::error::{ContextError, ContextResult};
use crate::share::ensure_all_shareable;
use inox_value::Value;
use may::sync::mpsc;

/// A running fiber's join point. Dropping it without joining leaves the
/// fiber running to completion in the background, matching `may`'s own
/// detached-by-default `JoinHandle` semantics.
pub struct FiberHandle {
    result_rx: mpsc::Receiver<Value>,
}

impl FiberHandle {
    pub fn join(self) -> ContextResult<Value> {
        self.result_rx.recv().map_err(|_| ContextError::Cancelled)
    }
}

/// Spawn `body` as a new fiber under `ctx`. `captured` are the values the
/// fiber closes over; every one of them must already satisfy the sharing
/// invariant (§3) since they are about to cross a fiber boundary.
pub fn spawn<F>(ctx: &Context, captured: &[Value], body: F) -> ContextResult<FiberHandle>
where
    F: FnOnce(Context) -> Value + Send + 'static,
{
    ensure_all_shareable(captured)?;
    let child_ctx = ctx.child();
    let (result_tx, result_rx) = mpsc::channel();
    may::go!(move || {
        let result = if child_ctx.is_cancelled() {
            Value::Nil
        } else {
            body(child_ctx)
        };
        let _ = result_tx.send(result);
    });
    Ok(FiberHandle { result_rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_fiber_result_is_joinable() {
        let ctx = Context::new("test");
        let handle = spawn(&ctx, &[], |_ctx| Value::Int(7)).unwrap();
        let result = handle.join().unwrap();
        assert!(matches!(result, Value::Int(7)));
    }

    #[test]
    fn spawn_rejects_unshareable_captures() {
        let ctx = Context::new("test");
        let obj = Value::Object(inox_value::collections::ObjectData::new(vec![]));
        assert!(spawn(&ctx, &[obj], |_ctx| Value::Nil).is_err());
    }

    #[test]
    fn cancelled_context_short_circuits_spawned_body() {
        let ctx = Context::new("test");
        ctx.cancellation().cancel();
        let handle = spawn(&ctx, &[], |_ctx| Value::Int(1)).unwrap();
        assert!(matches!(handle.join().unwrap(), Value::Nil));
    }
}
