//! Cooperative cancellation (§5 "a context and all fibers it transitively
//! spawned can be cancelled together"). The VM's dispatch loop polls
//! `is_cancelled` between instructions; nothing preempts a fiber mid-opcode.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// A child token that is cancelled whenever the parent is, plus
    /// independently cancellable on its own (cancelling a child never
    /// cancels the parent).
    pub fn child(&self) -> CancellationToken {
        if self.is_cancelled() {
            let child = CancellationToken::new();
            child.cancel();
            child
        } else {
            CancellationToken::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_observed() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn child_inherits_already_cancelled_parent() {
        let parent = CancellationToken::new();
        parent.cancel();
        let child = parent.child();
        assert!(child.is_cancelled());
    }

    #[test]
    fn child_cancellation_does_not_propagate_up() {
        let parent = CancellationToken::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());
    }
}
