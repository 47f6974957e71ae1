//! Exact stochastic simulation (Gillespie's direct method).

use smallvec::SmallVec;
use tracing::trace;

use fern_core::{net_change, FireType, Network, ReactionId, SimulationError};

use crate::controller::SimulationController;
use crate::engine::SimulationCore;
use crate::strategy::SteppingStrategy;

/// Steps between re-summations of the propensity vector in the
/// enhanced variant. Incremental updates accumulate rounding drift.
const SUM_REFRESH_INTERVAL: u32 = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Variant {
    Simple,
    Enhanced,
}

/// What a single exact step did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ExactOutcome {
    /// One reaction fired.
    Fired(ReactionId),
    /// The clock jumped to a theta, which was delivered.
    Theta,
    /// Nothing can fire; the clock is at `+inf`.
    Absorbed,
    /// Rounding left no reaction to select; the sum was refreshed.
    Stalled,
}

/// One-firing-per-call SSA stepper.
///
/// Draws the waiting time from `Exp(a_sum)` and the reaction with
/// probability `a_j / a_sum`. Two variants:
///
/// - [`enhanced`](Self::enhanced): after a firing, recomputes only the
///   propensities that depend on species the reaction changed, via a
///   dependency graph built at initialization.
/// - [`simple`](Self::simple): recomputes every propensity after each
///   firing.
///
/// When the next theta falls inside the waiting time the stepper either
/// jumps the clock to the theta and delivers it (the waiting time is
/// redrawn next call, which is exact by memorylessness), or, with theta
/// interpolation enabled, fires anyway and defers the notification.
#[derive(Clone, Debug)]
pub struct ExactStepper {
    variant: Variant,
    dependents: Vec<SmallVec<[ReactionId; 8]>>,
    since_refresh: u32,
}

impl ExactStepper {
    /// Full-recompute variant; tags firings [`FireType::ExactSimple`].
    pub fn simple() -> Self {
        Self {
            variant: Variant::Simple,
            dependents: Vec::new(),
            since_refresh: 0,
        }
    }

    /// Dependency-graph variant; tags firings [`FireType::ExactEnhanced`].
    pub fn enhanced() -> Self {
        Self {
            variant: Variant::Enhanced,
            ..Self::simple()
        }
    }

    /// The tag attached to every firing of this stepper.
    pub fn fire_type(&self) -> FireType {
        match self.variant {
            Variant::Simple => FireType::ExactSimple,
            Variant::Enhanced => FireType::ExactEnhanced,
        }
    }

    /// Reactions whose propensity must be recomputed after `reaction`
    /// fires. Empty before initialization and for the simple variant.
    pub fn dependents(&self, reaction: ReactionId) -> &[ReactionId] {
        self.dependents
            .get(reaction.index())
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    /// Perform one exact step.
    pub(crate) fn step(&mut self, core: &mut SimulationCore) -> Result<ExactOutcome, SimulationError> {
        let a_sum = core.propensity_sum();
        let tau = core.rng().exponential(a_sum);
        let t = core.time();
        let theta = core.next_theta();

        if t + tau > theta {
            if core.interpolate_theta() && tau.is_finite() {
                core.defer_theta_events();
            } else {
                core.advance_time_to(theta);
                core.theta_event();
                return Ok(ExactOutcome::Theta);
            }
        }

        if tau.is_infinite() {
            core.set_absorbed();
            return Ok(ExactOutcome::Absorbed);
        }

        let u = core.rng().unif();
        let Some(j) = select_weighted(core.propensities().iter().copied().enumerate(), a_sum, u)
        else {
            trace!(a_sum, "no reaction selectable; refreshing propensity sum");
            core.refresh_propensity_sum();
            return Ok(ExactOutcome::Stalled);
        };
        let reaction = ReactionId(j as u32);
        let when = t + tau;
        core.advance_time_to(when);
        core.fire_reaction(reaction, when, self.fire_type(), 1);
        self.update_propensities(core, reaction)?;
        Ok(ExactOutcome::Fired(reaction))
    }

    fn update_propensities(
        &mut self,
        core: &mut SimulationCore,
        fired: ReactionId,
    ) -> Result<(), SimulationError> {
        match self.variant {
            Variant::Simple => core.recompute_all_propensities(),
            Variant::Enhanced => {
                for &k in &self.dependents[fired.index()] {
                    core.recompute_propensity(k)?;
                }
                self.since_refresh += 1;
                if self.since_refresh >= SUM_REFRESH_INTERVAL {
                    self.since_refresh = 0;
                    core.refresh_propensity_sum();
                }
                Ok(())
            }
        }
    }
}

impl SteppingStrategy for ExactStepper {
    fn name(&self) -> &str {
        match self.variant {
            Variant::Simple => "exact-simple",
            Variant::Enhanced => "exact-enhanced",
        }
    }

    fn initialize(&mut self, core: &mut SimulationCore) -> Result<(), SimulationError> {
        self.since_refresh = 0;
        if self.variant == Variant::Enhanced {
            self.dependents = dependency_graph(core.state().net());
        }
        Ok(())
    }

    fn advance(
        &mut self,
        core: &mut SimulationCore,
        _controller: &mut dyn SimulationController,
    ) -> Result<(), SimulationError> {
        self.step(core).map(|_| ())
    }
}

/// For each reaction, the reactions whose propensity reads a species
/// the reaction changes.
pub(crate) fn dependency_graph(net: &dyn Network) -> Vec<SmallVec<[ReactionId; 8]>> {
    let mut readers: Vec<SmallVec<[ReactionId; 4]>> = vec![SmallVec::new(); net.species_count()];
    for k in 0..net.reaction_count() {
        let r = ReactionId(k as u32);
        for &s in net.propensity_dependencies(r) {
            let list = &mut readers[s.index()];
            if !list.contains(&r) {
                list.push(r);
            }
        }
    }
    (0..net.reaction_count())
        .map(|j| {
            let mut deps: SmallVec<[ReactionId; 8]> = SmallVec::new();
            for (s, _) in net_change(net, ReactionId(j as u32)) {
                for &k in &readers[s.index()] {
                    if !deps.contains(&k) {
                        deps.push(k);
                    }
                }
            }
            deps
        })
        .collect()
}

/// Pick an index with probability proportional to its weight.
///
/// `u` is uniform on `[0, 1)`. Falls back to the last positive weight
/// when rounding leaves the cumulative sum short of `u * total`; returns
/// `None` only if no weight is positive.
pub(crate) fn select_weighted(
    weights: impl Iterator<Item = (usize, f64)>,
    total: f64,
    u: f64,
) -> Option<usize> {
    let target = u * total;
    let mut acc = 0.0;
    let mut last_positive = None;
    for (j, w) in weights {
        if w > 0.0 {
            acc += w;
            last_positive = Some(j);
            if acc > target {
                return Some(j);
            }
        }
    }
    last_positive
}
