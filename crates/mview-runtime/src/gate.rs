#![forbid(unsafe_code)]

//! Manual-reset gate for holding builds open.
//!
//! A [`LoadGate`] starts closed. Threads calling
//! [`wait_timeout`](LoadGate::wait_timeout) block until the gate is
//! [`set`](LoadGate::set) or the timeout elapses. The gate stays open until
//! [`reset`](LoadGate::reset). Scenes use one gate per model to decide
//! exactly when, and in which order, builds are allowed to finish.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Shareable manual-reset event.
#[derive(Clone, Default)]
pub struct LoadGate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl std::fmt::Debug for LoadGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadGate")
            .field("open", &self.is_set())
            .finish()
    }
}

impl LoadGate {
    /// Create a closed gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gate that is already open.
    #[must_use]
    pub fn opened() -> Self {
        let gate = Self::new();
        gate.set();
        gate
    }

    /// Open the gate, waking every waiter.
    pub fn set(&self) {
        let (lock, cvar) = &*self.inner;
        let mut open = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *open = true;
        cvar.notify_all();
    }

    /// Close the gate again.
    pub fn reset(&self) {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Whether the gate is open.
    #[must_use]
    pub fn is_set(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for the gate to open or for `duration` to pass.
    ///
    /// Returns `true` if the gate opened, `false` on timeout. Spurious
    /// wakeups are absorbed.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut open = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let deadline = Instant::now() + duration;
        while !*open {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = cvar
                .wait_timeout(open, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            open = guard;
        }
        true
    }
}
