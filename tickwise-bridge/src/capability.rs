//! Startup capability probing.
//!
//! Each optional host feature is probed once during enable. Probing is
//! side-effect free and total: a failed lookup, an error, or even a panic inside
//! the host binding all read as "not available".

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::host::Host;

/// Optional host features the bridge knows how to exploit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostFeature {
    /// Native tick start/end events carrying the step duration.
    TickEvents,
    /// Direct per-connection latency queries.
    PlayerPing,
}

impl HostFeature {
    pub const ALL: [HostFeature; 2] = [HostFeature::TickEvents, HostFeature::PlayerPing];

    pub fn identifier(&self) -> &'static str {
        match self {
            HostFeature::TickEvents => "tick-events",
            HostFeature::PlayerPing => "player-ping",
        }
    }
}

impl fmt::Display for HostFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Answers "is feature X available" without ever failing.
pub trait CapabilityProber {
    fn probe(&self, feature: HostFeature) -> bool;
}

/// Probes a live host through [`Host::detect_feature`].
pub struct HostProber {
    host: Arc<dyn Host>,
}

impl HostProber {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self { host }
    }
}

impl CapabilityProber for HostProber {
    fn probe(&self, feature: HostFeature) -> bool {
        match catch_unwind(AssertUnwindSafe(|| self.host.detect_feature(feature))) {
            Ok(Ok(present)) => present,
            Ok(Err(e)) => {
                debug!(%feature, error = %e, "Feature probe failed, treating as absent");
                false
            }
            Err(_) => {
                warn!(%feature, host = self.host.name(), "Feature probe panicked, treating as absent");
                false
            }
        }
    }
}

/// The immutable set of capability flags derived at startup.
///
/// Also implements [`CapabilityProber`], so a fixed set can stand in for a
/// live host when selection must be reproduced deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CapabilitySet {
    flags: BTreeMap<HostFeature, bool>,
}

impl CapabilitySet {
    /// Probes every known feature exactly once.
    pub fn probe_all(prober: &dyn CapabilityProber) -> Self {
        let flags = HostFeature::ALL
            .iter()
            .map(|feature| (*feature, prober.probe(*feature)))
            .collect();
        Self { flags }
    }

    /// Builds a set from explicit flags; features not listed are absent.
    pub fn from_flags(flags: impl IntoIterator<Item = (HostFeature, bool)>) -> Self {
        let mut set = Self::none();
        set.flags.extend(flags);
        set
    }

    pub fn none() -> Self {
        Self {
            flags: HostFeature::ALL.iter().map(|f| (*f, false)).collect(),
        }
    }

    pub fn has(&self, feature: HostFeature) -> bool {
        self.flags.get(&feature).copied().unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HostFeature, bool)> + '_ {
        self.flags.iter().map(|(f, v)| (*f, *v))
    }

    /// Every present/absent combination of the known features (2^k sets).
    pub fn all_combinations() -> Vec<CapabilitySet> {
        let k = HostFeature::ALL.len();
        (0..(1u32 << k))
            .map(|mask| {
                CapabilitySet::from_flags(
                    HostFeature::ALL
                        .iter()
                        .enumerate()
                        .map(|(bit, feature)| (*feature, mask & (1 << bit) != 0)),
                )
            })
            .collect()
    }
}

impl CapabilityProber for CapabilitySet {
    fn probe(&self, feature: HostFeature) -> bool {
        self.has(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CountingProber {
        calls: RefCell<Vec<HostFeature>>,
    }

    impl CapabilityProber for CountingProber {
        fn probe(&self, feature: HostFeature) -> bool {
            self.calls.borrow_mut().push(feature);
            feature == HostFeature::PlayerPing
        }
    }

    #[test]
    fn test_probe_all_probes_each_feature_once() {
        let prober = CountingProber { calls: RefCell::new(Vec::new()) };
        let set = CapabilitySet::probe_all(&prober);

        assert_eq!(prober.calls.borrow().len(), HostFeature::ALL.len());
        assert!(set.has(HostFeature::PlayerPing));
        assert!(!set.has(HostFeature::TickEvents));
    }

    #[test]
    fn test_from_flags_defaults_missing_to_absent() {
        let set = CapabilitySet::from_flags([(HostFeature::TickEvents, true)]);
        assert!(set.has(HostFeature::TickEvents));
        assert!(!set.has(HostFeature::PlayerPing));
        assert_eq!(set.iter().count(), HostFeature::ALL.len());
    }

    #[test]
    fn test_all_combinations_is_exhaustive_and_distinct() {
        let combos = CapabilitySet::all_combinations();
        assert_eq!(combos.len(), 1 << HostFeature::ALL.len());
        for (i, a) in combos.iter().enumerate() {
            for b in combos.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_capability_set_is_a_prober() {
        let set = CapabilitySet::from_flags([(HostFeature::PlayerPing, true)]);
        let reprobed = CapabilitySet::probe_all(&set);
        assert_eq!(set, reprobed);
    }

    #[test]
    fn test_feature_identifiers() {
        assert_eq!(HostFeature::TickEvents.to_string(), "tick-events");
        assert_eq!(HostFeature::PlayerPing.identifier(), "player-ping");
    }
}
