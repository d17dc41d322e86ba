//! Once-per-step tick notification.
//!
//! Two strategies implement [`TickHook`]:
//!
//! - [`NativeEventTickHook`] subscribes to the host's tick-start event and fires
//!   exactly once per step, at the start of the step.
//! - [`SchedulerTickHook`] registers a task that the host scheduler runs every
//!   tick. It fires at the scheduler phase of the step instead of the start, and
//!   a host that coalesces or drops scheduler runs under load will under-count
//!   steps. That is a known degradation of this fallback, not a bug.
//!
//! Both hand each callback the hook's own tick counter, starting at 0.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{CallbackId, CallbackRegistry};
use crate::error::HostError;
use crate::host::{ListenerId, Scheduler, TaskId, TickEventSource, TickStartEvent};

pub type TickCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Registers callbacks invoked once per simulation step.
///
/// Callbacks may add or remove callbacks, including themselves, or close the
/// hook from inside a tick. A callback added during a tick first runs on the
/// next one.
pub trait TickHook: Send + Sync {
    fn add_callback(&self, callback: TickCallback) -> CallbackId;

    /// Returns `false` if the id was not registered. From another thread this
    /// blocks until an in-flight invocation has returned.
    fn remove_callback(&self, id: CallbackId) -> bool;

    /// Number of steps observed so far.
    fn current_tick(&self) -> u64;

    /// Detaches from the host and drops every callback. Idempotent.
    fn close(&self);
}

/// Counter and callbacks shared between a hook and the closure it hands to the host.
struct HookState {
    tick: AtomicU64,
    callbacks: CallbackRegistry<dyn Fn(u64) + Send + Sync>,
}

impl HookState {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            tick: AtomicU64::new(0),
            callbacks: CallbackRegistry::new(),
        })
    }

    fn on_tick(&self) {
        let tick = self.tick.fetch_add(1, Ordering::AcqRel);
        self.callbacks.dispatch(|cb| cb(tick));
    }
}

/// Tick hook driven by the host's native tick-start event.
pub struct NativeEventTickHook {
    events: Arc<dyn TickEventSource>,
    state: Arc<HookState>,
    listener: Mutex<Option<ListenerId>>,
}

impl NativeEventTickHook {
    /// Subscribes to tick-start events. Nothing is registered on failure.
    pub fn start(events: Arc<dyn TickEventSource>) -> Result<Self, HostError> {
        let state = HookState::new();
        let listener_state = state.clone();
        let listener = events.subscribe_start(Arc::new(move |_event: &TickStartEvent| listener_state.on_tick()))?;
        Ok(Self {
            events,
            state,
            listener: Mutex::new(Some(listener)),
        })
    }
}

impl TickHook for NativeEventTickHook {
    fn add_callback(&self, callback: TickCallback) -> CallbackId {
        self.state.callbacks.add(callback)
    }

    fn remove_callback(&self, id: CallbackId) -> bool {
        self.state.callbacks.remove(id)
    }

    fn current_tick(&self) -> u64 {
        self.state.tick.load(Ordering::Acquire)
    }

    fn close(&self) {
        if let Some(id) = self.listener.lock().take() {
            self.events.unsubscribe(id);
            debug!(listener = id, "Native tick hook unsubscribed");
        }
        self.state.callbacks.clear();
    }
}

impl Drop for NativeEventTickHook {
    fn drop(&mut self) {
        self.close();
    }
}

/// Tick hook approximated by a task the host scheduler runs every tick.
pub struct SchedulerTickHook {
    scheduler: Arc<dyn Scheduler>,
    state: Arc<HookState>,
    task: Mutex<Option<TaskId>>,
}

impl SchedulerTickHook {
    pub fn start(scheduler: Arc<dyn Scheduler>) -> Result<Self, HostError> {
        let state = HookState::new();
        let task_state = state.clone();
        let task = scheduler.run_repeating(1, Arc::new(move || task_state.on_tick()))?;
        Ok(Self {
            scheduler,
            state,
            task: Mutex::new(Some(task)),
        })
    }
}

impl TickHook for SchedulerTickHook {
    fn add_callback(&self, callback: TickCallback) -> CallbackId {
        self.state.callbacks.add(callback)
    }

    fn remove_callback(&self, id: CallbackId) -> bool {
        self.state.callbacks.remove(id)
    }

    fn current_tick(&self) -> u64 {
        self.state.tick.load(Ordering::Acquire)
    }

    fn close(&self) {
        if let Some(id) = self.task.lock().take() {
            self.scheduler.cancel(id);
            debug!(task = id, "Scheduler tick hook cancelled");
        }
        self.state.callbacks.clear();
    }
}

impl Drop for SchedulerTickHook {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalHost;
    use crate::host::Host;

    fn collecting_callback() -> (TickCallback, Arc<Mutex<Vec<u64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        (Arc::new(move |tick: u64| seen_clone.lock().push(tick)), seen)
    }

    #[test]
    fn test_native_hook_fires_once_per_step() {
        let host = LocalHost::builder().native_tick_events(true).build();
        let hook = NativeEventTickHook::start(host.tick_events().unwrap()).unwrap();
        let (callback, seen) = collecting_callback();
        hook.add_callback(callback);

        for _ in 0..5 {
            host.run_tick();
        }

        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(hook.current_tick(), 5);
    }

    #[test]
    fn test_scheduler_hook_fires_once_per_step() {
        let host = LocalHost::builder().build();
        let hook = SchedulerTickHook::start(host.scheduler()).unwrap();
        let (callback, seen) = collecting_callback();
        hook.add_callback(callback);

        for _ in 0..3 {
            host.run_tick();
        }
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_removed_callback_stops_firing() {
        let host = LocalHost::builder().build();
        let hook = SchedulerTickHook::start(host.scheduler()).unwrap();
        let (callback, seen) = collecting_callback();
        let id = hook.add_callback(callback);

        host.run_tick();
        assert!(hook.remove_callback(id));
        host.run_tick();

        assert_eq!(*seen.lock(), vec![0]);
        assert_eq!(hook.current_tick(), 2);
    }

    #[test]
    fn test_close_detaches_from_host_and_is_idempotent() {
        let host = LocalHost::builder().native_tick_events(true).build();
        let hook = NativeEventTickHook::start(host.tick_events().unwrap()).unwrap();
        assert_eq!(host.tick_listener_count(), 1);

        hook.close();
        hook.close();
        assert_eq!(host.tick_listener_count(), 0);

        let scheduler_hook = SchedulerTickHook::start(host.scheduler()).unwrap();
        assert_eq!(host.scheduled_task_count(), 1);
        drop(scheduler_hook);
        assert_eq!(host.scheduled_task_count(), 0);
    }

    #[test]
    fn test_callback_can_reregister_inside_a_tick() {
        use std::sync::mpsc;
        use std::time::Duration;

        let host = LocalHost::builder().build();
        let hook = Arc::new(SchedulerTickHook::start(host.scheduler()).unwrap());
        let (replacement, seen) = collecting_callback();

        let own_id = Arc::new(Mutex::new(None));
        let weak = Arc::downgrade(&hook);
        let own_id_clone = own_id.clone();
        let replacement = Mutex::new(Some(replacement));
        let id = hook.add_callback(Arc::new(move |tick: u64| {
            let Some(hook) = weak.upgrade() else { return };
            if tick == 0 {
                if let Some(callback) = replacement.lock().take() {
                    hook.add_callback(callback);
                }
                if let Some(id) = own_id_clone.lock().take() {
                    hook.remove_callback(id);
                }
            }
        }));
        *own_id.lock() = Some(id);

        let (done_tx, done_rx) = mpsc::channel();
        let worker_host = host.clone();
        std::thread::spawn(move || {
            worker_host.run_tick();
            worker_host.run_tick();
            let _ = done_tx.send(());
        });

        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok(), "tick thread deadlocked");
        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(hook.current_tick(), 2);
    }

    #[test]
    fn test_callback_can_close_hook_inside_a_tick() {
        let host = LocalHost::builder().native_tick_events(true).build();
        let hook = Arc::new(NativeEventTickHook::start(host.tick_events().unwrap()).unwrap());
        let weak = Arc::downgrade(&hook);
        hook.add_callback(Arc::new(move |_tick: u64| {
            if let Some(hook) = weak.upgrade() {
                hook.close();
            }
        }));

        host.run_tick();
        assert_eq!(host.tick_listener_count(), 0);
        host.run_tick();
        assert_eq!(hook.current_tick(), 1);
    }
}
