use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// A cloneable, one-shot-but-idempotent shutdown signal.
///
/// Every clone shares the same underlying state. Calling `trigger()` on any
/// clone wakes every pending and future `wait_async()` call on every other
/// clone. Unlike a one-shot channel, triggering twice (or after every waiter
/// has already observed it) is harmless.
#[derive(Clone)]
pub struct Trigger {
    fired: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Trigger {
    pub fn new() -> Self {
        Trigger {
            fired: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Fires the trigger. Idempotent.
    pub fn trigger(&self) {
        self.fired.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolves immediately if already triggered; otherwise resolves the
    /// moment any clone calls `trigger()`.
    pub async fn wait_async(&self) {
        if self.is_triggered() {
            return;
        }
        // notified() must be created before the fired check is repeated, to
        // close the race between the check above and a concurrent trigger().
        let notified = self.notify.notified();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}
