use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Cloneable cancellation signal with interruptible waits.
///
/// Waiting parks the thread on a condition variable; `cancel` wakes every
/// waiter immediately. Once cancelled, a token stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        if !*cancelled {
            *cancelled = true;
            self.inner.wake.notify_all();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Block until `deadline` or cancellation. Returns `true` if cancelled.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if Instant::now() >= deadline {
                break;
            }
            // Spurious wakeups just loop back to the checks above.
            let _ = self.inner.wake.wait_until(&mut cancelled, deadline);
        }
        *cancelled
    }

    /// Block until cancelled.
    pub fn wait(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            self.inner.wake.wait(&mut cancelled);
        }
    }

    /// Block for `timeout` or until cancellation. Returns `true` if cancelled.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout)
    }
}
