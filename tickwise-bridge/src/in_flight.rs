//! Tracking of in-flight calls into callbacks and the engine.
//!
//! Teardown paths wait for running calls to return before they report
//! completion. A teardown issued from inside one of those calls, on the same
//! thread, does not wait; it would otherwise wait on itself.

use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

#[derive(Default)]
pub(crate) struct InFlight {
    /// Held shared by every running call.
    gate: RwLock<()>,
    threads: Mutex<Vec<ThreadId>>,
}

/// Marks one running call until dropped, including on unwind.
pub(crate) struct InFlightCall<'a> {
    owner: &'a InFlight,
    thread: ThreadId,
    _gate: RwLockReadGuard<'a, ()>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&self) -> InFlightCall<'_> {
        // Recursive so a nested call on the same thread never queues behind a waiting writer.
        let gate = self.gate.read_recursive();
        let thread = thread::current().id();
        self.threads.lock().push(thread);
        InFlightCall {
            owner: self,
            thread,
            _gate: gate,
        }
    }

    /// Blocks until no call is running, unless called from inside one.
    pub(crate) fn wait_idle(&self) {
        if self.threads.lock().contains(&thread::current().id()) {
            return;
        }
        drop(self.gate.write());
    }
}

impl Drop for InFlightCall<'_> {
    fn drop(&mut self) {
        let mut threads = self.owner.threads.lock();
        if let Some(pos) = threads.iter().position(|t| *t == self.thread) {
            threads.swap_remove(pos);
        }
    }
}
