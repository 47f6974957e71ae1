//! Firing counts broken down by [`FireType`].

use fern_core::{FireType, ReactionId, SimulatorId};
use fern_engine::{Observer, ObserverContext, SimulationState};
use tracing::info;

const KINDS: usize = FireType::ALL.len();

/// Counts reaction firings per [`FireType`].
///
/// Tracks both the number of `activate_reaction` callbacks (events) and
/// the summed `times` of those callbacks (firings). Also records the
/// largest number of critical firing events seen within one loop
/// iteration, which is at most one for a correct tau-leaper.
#[derive(Debug, Default)]
pub struct FireTypeObserver {
    bound: Option<SimulatorId>,
    events: [u64; KINDS],
    firings: [u64; KINDS],
    critical_this_step: u64,
    max_critical_per_step: u64,
}

impl FireTypeObserver {
    /// Unbound observer with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a simulator.
    pub fn bound_to(mut self, simulator: SimulatorId) -> Self {
        self.bound = Some(simulator);
        self
    }

    /// Number of `activate_reaction` callbacks with `fire_type`.
    pub fn events(&self, fire_type: FireType) -> u64 {
        self.events[fire_type.index()]
    }

    /// Total firings (summed multiplicities) with `fire_type`.
    pub fn firings(&self, fire_type: FireType) -> u64 {
        self.firings[fire_type.index()]
    }

    /// Total firings over all fire types.
    pub fn total_firings(&self) -> u64 {
        self.firings.iter().sum()
    }

    /// Largest number of critical firing events in one loop iteration.
    pub fn max_critical_per_step(&self) -> u64 {
        self.max_critical_per_step
    }
}

impl Observer for FireTypeObserver {
    fn name(&self) -> &str {
        "fire-type"
    }

    fn simulator(&self) -> Option<SimulatorId> {
        self.bound
    }

    fn started(&mut self, _ctx: &mut ObserverContext<'_>) {
        *self = Self {
            bound: self.bound,
            ..Self::default()
        };
    }

    fn step(&mut self, _ctx: &mut ObserverContext<'_>) {
        self.critical_this_step = 0;
    }

    fn activate_reaction(
        &mut self,
        _reaction: ReactionId,
        _time: f64,
        fire_type: FireType,
        times: u64,
        _ctx: &mut ObserverContext<'_>,
    ) {
        let i = fire_type.index();
        self.events[i] += 1;
        self.firings[i] = self.firings[i].saturating_add(times);
        if fire_type == FireType::TauLeapCritical {
            self.critical_this_step += 1;
            self.max_critical_per_step = self.max_critical_per_step.max(self.critical_this_step);
        }
    }

    fn print(&self, state: &SimulationState) {
        for ft in FireType::ALL {
            if self.events(ft) > 0 {
                info!(
                    network = state.net().name(),
                    fire_type = %ft,
                    events = self.events(ft),
                    firings = self.firings(ft),
                    "firings by type"
                );
            }
        }
    }
}
