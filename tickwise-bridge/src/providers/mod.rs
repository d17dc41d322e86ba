//! Instrumentation provider contracts and their strategies.
//!
//! Each submodule defines one narrow contract the profiling engine depends on,
//! plus the concrete strategies that implement it:
//!
//! - [`tick_hook`]: once-per-step notification (native events or scheduler polling).
//! - [`tick_reporter`]: per-step duration delivery (native events only).
//! - [`thread_dumper`]: which threads a sample covers.
//! - [`class_source`]: class/module identifier → owning plugin.
//! - [`server_config`]: filtered server configuration snapshot.
//! - [`world_info`]: world/dimension metadata.
//! - [`player_ping`]: per-client latency (native API only).
//! - [`platform_info`]: static platform identity.
//!
//! The metadata contracts swallow host failures into empty snapshots; the
//! engine sees missing data, never an error.

pub mod class_source;
pub mod platform_info;
pub mod player_ping;
pub mod server_config;
pub mod thread_dumper;
pub mod tick_hook;
pub mod tick_reporter;
pub mod world_info;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::in_flight::InFlight;

/// Identifies a registered tick or report callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Callback storage shared by the tick strategies.
///
/// Dispatch runs over a snapshot, so callbacks may add or remove callbacks
/// (including themselves) and close their hook without deadlocking. A callback
/// removed mid-dispatch is not invoked afterwards. `remove` and `clear` called
/// from another thread return only after any in-flight dispatch has finished.
pub(crate) struct CallbackRegistry<F: ?Sized> {
    next_id: AtomicU64,
    entries: RwLock<Vec<(CallbackId, Arc<F>)>>,
    in_flight: InFlight,
}

impl<F: ?Sized> CallbackRegistry<F> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: RwLock::new(Vec::new()),
            in_flight: InFlight::new(),
        }
    }

    pub(crate) fn add(&self, callback: Arc<F>) -> CallbackId {
        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, callback));
        id
    }

    pub(crate) fn remove(&self, id: CallbackId) -> bool {
        let removed = {
            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|(existing, _)| *existing != id);
            entries.len() != before
        };
        if removed {
            self.in_flight.wait_idle();
        }
        removed
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
        self.in_flight.wait_idle();
    }

    pub(crate) fn dispatch(&self, mut invoke: impl FnMut(&F)) {
        let _call = self.in_flight.enter();
        let snapshot: Vec<(CallbackId, Arc<F>)> = self.entries.read().clone();
        for (id, callback) in snapshot {
            if self.contains(id) {
                invoke(&callback);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn contains(&self, id: CallbackId) -> bool {
        self.entries.read().iter().any(|(existing, _)| *existing == id)
    }
}
