//! Civilian waiting-time ledger.

use std::collections::BTreeMap;

use crate::telemetry::TelemetrySnapshot;
use crate::VehicleId;

/// Maximum waiting time ever recorded per civilian vehicle in an episode.
///
/// Entries only grow within an episode. The mean over all vehicles is
/// computed once, from the final ledger, by [`WaitingTimeLedger::summary`].
#[derive(Debug, Clone, Default)]
pub struct WaitingTimeLedger {
    privileged_id: VehicleId,
    max_wait: BTreeMap<VehicleId, f64>,
}

impl WaitingTimeLedger {
    pub fn new(privileged_id: impl Into<VehicleId>) -> Self {
        Self {
            privileged_id: privileged_id.into(),
            max_wait: BTreeMap::new(),
        }
    }

    /// Records every active civilian vehicle's current waiting time.
    ///
    /// A vehicle listed without a waiting time (or with a negative or NaN
    /// one) is still counted, at 0 s.
    pub fn observe(&mut self, snapshot: &TelemetrySnapshot) {
        for id in snapshot.civilians(&self.privileged_id) {
            let wait = snapshot
                .waiting_time(id)
                .filter(|w| *w >= 0.0)
                .unwrap_or(0.0);
            let entry = self.max_wait.entry(id.clone()).or_insert(0.0);
            *entry = entry.max(wait);
        }
    }

    /// Highest waiting time seen for `id`.
    pub fn get(&self, id: &str) -> Option<f64> {
        self.max_wait.get(id).copied()
    }

    /// Number of distinct civilian vehicles observed.
    pub fn len(&self) -> usize {
        self.max_wait.len()
    }

    pub fn is_empty(&self) -> bool {
        self.max_wait.is_empty()
    }

    /// Mean of the per-vehicle maxima; 0 when no civilian was observed.
    pub fn summary(&self) -> f64 {
        if self.max_wait.is_empty() {
            return 0.0;
        }
        self.max_wait.values().sum::<f64>() / self.max_wait.len() as f64
    }

    pub fn clear(&mut self) {
        self.max_wait.clear();
    }
}
