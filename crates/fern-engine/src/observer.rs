//! Observer protocol: lifecycle and firing callbacks, theta scheduling,
//! and the optional triggerable capability.
//!
//! Observers are registered with exactly one [`Simulator`](crate::Simulator)
//! and receive an [`ObserverContext`] with every callback. The context
//! gives read access to the [`SimulationState`] and lets the observer
//! request its next theta notification.

use std::any::Any;

use fern_core::{FireType, ObserverId, ReactionId, SimulationError, SimulatorId, SpeciesId};
use tracing::warn;

use crate::state::SimulationState;
use crate::theta::ThetaQueue;

// ── Observer ───────────────────────────────────────────────────────

/// Instrumentation hooks invoked by the simulation loop.
///
/// Every method except [`name`](Observer::name) has a no-op default, so
/// implementations override only what they need.
///
/// # Callback order
///
/// `started` once per run; then per loop iteration: trigger poll (if
/// [`as_triggerable`](Observer::as_triggerable) returns `Some`), `step`,
/// any `activate_reaction` and `theta` calls caused by the step; finally
/// `finished` then `print`.
pub trait Observer: Any + Send {
    /// Human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// The simulator this observer is bound to, if any.
    ///
    /// A bound observer can only be added to that simulator.
    fn simulator(&self) -> Option<SimulatorId> {
        None
    }

    /// Called at the start of every run, after amounts are reset.
    fn started(&mut self, _ctx: &mut ObserverContext<'_>) {}

    /// Called once per loop iteration, before the strategy advances.
    fn step(&mut self, _ctx: &mut ObserverContext<'_>) {}

    /// Called at the end of every run.
    fn finished(&mut self, _ctx: &mut ObserverContext<'_>) {}

    /// Report results; called after [`finished`](Observer::finished).
    fn print(&self, _state: &SimulationState) {}

    /// A theta requested by this observer was reached.
    ///
    /// With interpolation enabled, [`ObserverContext::theta_amount`]
    /// returns amounts interpolated at `theta`.
    fn theta(&mut self, _theta: f64, _ctx: &mut ObserverContext<'_>) {}

    /// `reaction` fires `times` times at `time`.
    ///
    /// Exact firings are announced before they are applied; a tau leap
    /// is announced after it commits.
    fn activate_reaction(
        &mut self,
        _reaction: ReactionId,
        _time: f64,
        _fire_type: FireType,
        _times: u64,
        _ctx: &mut ObserverContext<'_>,
    ) {
    }

    /// The triggerable capability, if this observer has it.
    fn as_triggerable(&mut self) -> Option<&mut dyn Triggerable> {
        None
    }
}

impl dyn Observer {
    /// Downcast to a concrete observer type.
    pub fn downcast_ref<T: Observer>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    /// Mutable downcast to a concrete observer type.
    pub fn downcast_mut<T: Observer>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}

// ── ObserverContext ────────────────────────────────────────────────

/// Per-callback view handed to an [`Observer`].
pub struct ObserverContext<'a> {
    state: &'a SimulationState,
    theta: &'a mut ThetaQueue,
    observer: ObserverId,
    interpolated: Option<&'a [f64]>,
}

impl<'a> ObserverContext<'a> {
    pub(crate) fn new(
        state: &'a SimulationState,
        theta: &'a mut ThetaQueue,
        observer: ObserverId,
        interpolated: Option<&'a [f64]>,
    ) -> Self {
        Self {
            state,
            theta,
            observer,
            interpolated,
        }
    }

    /// The simulation state.
    pub fn state(&self) -> &SimulationState {
        self.state
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.state.time()
    }

    /// Current amount of `species`.
    pub fn amount(&self, species: SpeciesId) -> i64 {
        self.state.amount(species)
    }

    /// ID of the observer receiving this callback.
    pub fn id(&self) -> ObserverId {
        self.observer
    }

    /// Request a theta notification at `time`.
    ///
    /// An outstanding request is replaced by the earlier of the two
    /// times; a later request never postpones an earlier one. Returns
    /// whether the pending request changed. Non-finite times are ignored.
    pub fn set_theta(&mut self, time: f64) -> bool {
        request_theta(self.theta, self.observer, time)
    }

    /// This observer's pending theta, if any.
    pub fn pending_theta(&self) -> Option<f64> {
        self.theta.pending(self.observer)
    }

    /// Whether amounts in this callback are interpolated.
    pub fn is_interpolated(&self) -> bool {
        self.interpolated.is_some()
    }

    /// Amount of `species` at the theta being delivered.
    ///
    /// Linearly interpolated when theta interpolation is enabled;
    /// otherwise the current amount.
    pub fn theta_amount(&self, species: SpeciesId) -> f64 {
        match self.interpolated {
            Some(values) => values[species.index()],
            None => self.state.amount(species) as f64,
        }
    }
}

fn request_theta(queue: &mut ThetaQueue, observer: ObserverId, time: f64) -> bool {
    if time.is_nan() {
        warn!(observer = %observer, "ignoring NaN theta request");
        return false;
    }
    queue.request(observer, time)
}

// ── Triggerable ────────────────────────────────────────────────────

/// Capability of observers that act on the simulation.
///
/// Polled once per loop iteration before [`Observer::step`]. Changes to
/// amounts made through the [`TriggerContext`] cause a full propensity
/// recompute before the strategy advances.
pub trait Triggerable {
    /// Apply any pending interventions.
    fn trigger(&mut self, ctx: &mut TriggerContext<'_>) -> Result<(), SimulationError>;
}

/// Mutable view handed to [`Triggerable::trigger`].
pub struct TriggerContext<'a> {
    state: &'a mut SimulationState,
    theta: &'a mut ThetaQueue,
    observer: ObserverId,
    changed: bool,
}

impl<'a> TriggerContext<'a> {
    pub(crate) fn new(
        state: &'a mut SimulationState,
        theta: &'a mut ThetaQueue,
        observer: ObserverId,
    ) -> Self {
        Self {
            state,
            theta,
            observer,
            changed: false,
        }
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.state.time
    }

    /// The simulation state.
    pub fn state(&self) -> &SimulationState {
        self.state
    }

    /// Current amount of `species`.
    pub fn amount(&self, species: SpeciesId) -> Result<i64, SimulationError> {
        self.check(species)?;
        Ok(self.state.amounts.get(species))
    }

    /// Overwrite the amount of `species`.
    pub fn set_amount(&mut self, species: SpeciesId, value: u64) -> Result<(), SimulationError> {
        self.check(species)?;
        let value = i64::try_from(value).unwrap_or(i64::MAX);
        if self.state.amounts.get(species) != value {
            self.state.amounts.set(species, value);
            self.changed = true;
        }
        Ok(())
    }

    /// Add `delta` to the amount of `species`, saturating at zero.
    pub fn add_amount(&mut self, species: SpeciesId, delta: i64) -> Result<(), SimulationError> {
        self.check(species)?;
        let current = self.state.amounts.get(species);
        let value = current.saturating_add(delta).max(0);
        if value != current {
            self.state.amounts.set(species, value);
            self.changed = true;
        }
        Ok(())
    }

    /// Request a theta notification; same rule as
    /// [`ObserverContext::set_theta`].
    pub fn set_theta(&mut self, time: f64) -> bool {
        request_theta(self.theta, self.observer, time)
    }

    pub(crate) fn changed(&self) -> bool {
        self.changed
    }

    fn check(&self, species: SpeciesId) -> Result<(), SimulationError> {
        if species.index() < self.state.amounts.len() {
            Ok(())
        } else {
            Err(SimulationError::SpeciesOutOfRange { species })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use fern_core::ReactionNetwork;

    struct Named(&'static str);

    impl Observer for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn state() -> SimulationState {
        let net = ReactionNetwork::builder("pair")
            .species("A", 4)
            .species("B", 0)
            .build()
            .unwrap();
        SimulationState::new(Arc::new(net))
    }

    #[test]
    fn downcast_to_concrete_type() {
        let boxed: Box<dyn Observer> = Box::new(Named("n"));
        assert_eq!(boxed.downcast_ref::<Named>().map(|n| n.0), Some("n"));
    }

    #[test]
    fn context_set_theta_min_merges() {
        let st = state();
        let mut q = ThetaQueue::new();
        let mut ctx = ObserverContext::new(&st, &mut q, ObserverId(0), None);
        assert!(ctx.set_theta(5.0));
        assert!(ctx.set_theta(3.0));
        assert!(!ctx.set_theta(4.0));
        assert!(!ctx.set_theta(f64::NAN));
        assert_eq!(ctx.pending_theta(), Some(3.0));
    }

    #[test]
    fn theta_amount_prefers_interpolated_values() {
        let st = state();
        let mut q = ThetaQueue::new();
        let values = [2.5, 1.5];
        let ctx = ObserverContext::new(&st, &mut q, ObserverId(0), Some(&values));
        assert!(ctx.is_interpolated());
        assert_eq!(ctx.theta_amount(SpeciesId(0)), 2.5);
        let ctx = ObserverContext::new(&st, &mut q, ObserverId(0), None);
        assert_eq!(ctx.theta_amount(SpeciesId(0)), 4.0);
    }

    #[test]
    fn trigger_context_tracks_changes_and_saturates() {
        let mut st = state();
        let mut q = ThetaQueue::new();
        let mut ctx = TriggerContext::new(&mut st, &mut q, ObserverId(1));
        ctx.set_amount(SpeciesId(0), 4).unwrap();
        assert!(!ctx.changed());
        ctx.add_amount(SpeciesId(0), -10).unwrap();
        assert!(ctx.changed());
        assert_eq!(ctx.amount(SpeciesId(0)), Ok(0));
        assert_eq!(
            ctx.set_amount(SpeciesId(9), 1),
            Err(SimulationError::SpeciesOutOfRange {
                species: SpeciesId(9)
            })
        );
    }
}
