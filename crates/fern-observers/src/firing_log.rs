//! Chronological log of reaction firings.

use fern_core::{FireType, ReactionId, SimulatorId};
use fern_engine::{Observer, ObserverContext, SimulationState};
use tracing::info;

/// One `activate_reaction` callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FiringRecord {
    /// The reaction that fired.
    pub reaction: ReactionId,
    /// Firing time.
    pub time: f64,
    /// Path that produced the firing.
    pub fire_type: FireType,
    /// Multiplicity.
    pub times: u64,
}

/// Records every firing of a run, optionally capped at `capacity`
/// records. Firings past the cap are counted but not stored.
#[derive(Debug, Default)]
pub struct FiringLogObserver {
    bound: Option<SimulatorId>,
    capacity: Option<usize>,
    records: Vec<FiringRecord>,
    dropped: u64,
}

impl FiringLogObserver {
    /// Unbounded log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log that keeps at most `capacity` records per run.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Bind to a simulator.
    pub fn bound_to(mut self, simulator: SimulatorId) -> Self {
        self.bound = Some(simulator);
        self
    }

    /// Recorded firings, in callback order.
    pub fn records(&self) -> &[FiringRecord] {
        &self.records
    }

    /// Firings not stored because the log was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Total number of firings of `reaction` (summed multiplicities)
    /// among the stored records.
    pub fn count(&self, reaction: ReactionId) -> u64 {
        self.records
            .iter()
            .filter(|r| r.reaction == reaction)
            .map(|r| r.times)
            .sum()
    }
}

impl Observer for FiringLogObserver {
    fn name(&self) -> &str {
        "firing-log"
    }

    fn simulator(&self) -> Option<SimulatorId> {
        self.bound
    }

    fn started(&mut self, _ctx: &mut ObserverContext<'_>) {
        self.records.clear();
        self.dropped = 0;
    }

    fn activate_reaction(
        &mut self,
        reaction: ReactionId,
        time: f64,
        fire_type: FireType,
        times: u64,
        _ctx: &mut ObserverContext<'_>,
    ) {
        if self.capacity.is_some_and(|cap| self.records.len() >= cap) {
            self.dropped += 1;
            return;
        }
        self.records.push(FiringRecord {
            reaction,
            time,
            fire_type,
            times,
        });
    }

    fn print(&self, state: &SimulationState) {
        let net = state.net();
        for r in 0..net.reaction_count() {
            let id = ReactionId(r as u32);
            info!(
                network = net.name(),
                reaction = %net.reaction_name(id),
                firings = self.count(id),
                "reaction firings"
            );
        }
        if self.dropped > 0 {
            info!(dropped = self.dropped, "firing log was full");
        }
    }
}
