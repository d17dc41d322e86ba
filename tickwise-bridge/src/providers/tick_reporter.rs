//! Per-step duration reporting.
//!
//! Only the native tick-end event carries a trustworthy step duration, so
//! [`NativeTickReporter`] is the single strategy; hosts without the event get
//! no reporter at all.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use super::{CallbackId, CallbackRegistry};
use crate::error::HostError;
use crate::host::{ListenerId, TickEndEvent, TickEventSource};

/// Duration of one completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickDuration {
    pub tick: u64,
    pub duration: Duration,
}

impl TickDuration {
    pub fn as_millis_f64(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

pub type TickReportCallback = Arc<dyn Fn(&TickDuration) + Send + Sync>;

/// Delivers one duration per completed step, in completion order.
///
/// Callbacks may add or remove callbacks, or close the reporter, from inside
/// a delivery.
pub trait TickReporter: Send + Sync {
    fn add_callback(&self, callback: TickReportCallback) -> CallbackId;
    /// Returns `false` if the id was not registered. From another thread this
    /// blocks until an in-flight delivery has returned.
    fn remove_callback(&self, id: CallbackId) -> bool;
    /// Detaches from the host and drops every callback. Idempotent.
    fn close(&self);
}

struct ReporterState {
    /// Last delivered tick + 1; 0 means nothing delivered yet.
    next_expected: AtomicU64,
    callbacks: CallbackRegistry<dyn Fn(&TickDuration) + Send + Sync>,
}

impl ReporterState {
    fn on_tick_end(&self, event: &TickEndEvent) {
        let floor = self.next_expected.load(Ordering::Acquire);
        if floor != 0 && event.tick < floor {
            debug!(tick = event.tick, expected_at_least = floor, "Dropping out-of-order tick duration");
            return;
        }
        self.next_expected.store(event.tick.saturating_add(1), Ordering::Release);

        let report = TickDuration {
            tick: event.tick,
            duration: event.duration,
        };
        self.callbacks.dispatch(|cb| cb(&report));
    }
}

/// Reporter fed by the host's native tick-end event.
pub struct NativeTickReporter {
    events: Arc<dyn TickEventSource>,
    state: Arc<ReporterState>,
    listener: Mutex<Option<ListenerId>>,
}

impl NativeTickReporter {
    pub fn start(events: Arc<dyn TickEventSource>) -> Result<Self, HostError> {
        let state = Arc::new(ReporterState {
            next_expected: AtomicU64::new(0),
            callbacks: CallbackRegistry::new(),
        });
        let listener_state = state.clone();
        let listener = events.subscribe_end(Arc::new(move |event: &TickEndEvent| listener_state.on_tick_end(event)))?;
        Ok(Self {
            events,
            state,
            listener: Mutex::new(Some(listener)),
        })
    }
}

impl TickReporter for NativeTickReporter {
    fn add_callback(&self, callback: TickReportCallback) -> CallbackId {
        self.state.callbacks.add(callback)
    }

    fn remove_callback(&self, id: CallbackId) -> bool {
        self.state.callbacks.remove(id)
    }

    fn close(&self) {
        if let Some(id) = self.listener.lock().take() {
            self.events.unsubscribe(id);
            debug!(listener = id, "Native tick reporter unsubscribed");
        }
        self.state.callbacks.clear();
    }
}

impl Drop for NativeTickReporter {
    fn drop(&mut self) {
        self.close();
    }
}
