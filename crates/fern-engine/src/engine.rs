//! The mutable heart of a simulator, as seen by stepping strategies.
//!
//! [`SimulationCore`] owns the [`SimulationState`], the [`ThetaQueue`],
//! the registered observers and the random stream. Stepping strategies
//! receive `&mut SimulationCore` and drive the clock, propensities and
//! firings exclusively through its methods, which keep observers
//! informed and enforce the firing and theta contracts.

use fern_core::{
    AmountManager, FireType, ObserverId, ReactionId, SimulationError, SimulatorId,
};

use crate::observer::{Observer, ObserverContext, TriggerContext};
use crate::state::SimulationState;
use crate::stochastic::StochasticSource;
use crate::theta::ThetaQueue;

/// Theta notifications postponed until the state after a firing is known.
///
/// Holds the amounts at the start of the interval so that notifications
/// falling inside it can be delivered with linearly interpolated amounts.
#[derive(Clone, Debug)]
struct PendingTheta {
    start_time: f64,
    start_amounts: Vec<i64>,
}

/// Simulation state plus everything a stepping strategy may touch.
pub struct SimulationCore {
    id: SimulatorId,
    pub(crate) state: SimulationState,
    pub(crate) theta: ThetaQueue,
    pub(crate) observers: Vec<Box<dyn Observer>>,
    rng: StochasticSource,
    pending: Option<PendingTheta>,
    interpolate_theta: bool,
}

#[inline]
fn checked(reaction: ReactionId, value: f64) -> Result<f64, SimulationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SimulationError::InvalidPropensity { reaction, value })
    }
}

impl SimulationCore {
    pub(crate) fn new(
        id: SimulatorId,
        state: SimulationState,
        seed: u64,
        interpolate_theta: bool,
    ) -> Self {
        Self {
            id,
            state,
            theta: ThetaQueue::new(),
            observers: Vec::new(),
            rng: StochasticSource::new(seed),
            pending: None,
            interpolate_theta,
        }
    }

    /// ID of the owning simulator.
    pub fn id(&self) -> SimulatorId {
        self.id
    }

    /// Read-only view of the simulation.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// The simulator's random stream.
    pub fn rng(&mut self) -> &mut StochasticSource {
        &mut self.rng
    }

    /// Whether theta notifications are interpolated.
    pub fn interpolate_theta(&self) -> bool {
        self.interpolate_theta
    }

    /// Number of reactions in the network.
    pub fn reaction_count(&self) -> usize {
        self.state.propensities.len()
    }

    // ── Clock ──────────────────────────────────────────────────────

    /// Current simulation time.
    #[inline]
    pub fn time(&self) -> f64 {
        self.state.time
    }

    /// Move the clock to `time`; never moves it backwards.
    pub fn advance_time_to(&mut self, time: f64) {
        if time > self.state.time {
            self.state.time = time;
        }
    }

    /// Mark the absorbing state: nothing can fire any more.
    pub fn set_absorbed(&mut self) {
        self.state.time = f64::INFINITY;
    }

    // ── Amounts ────────────────────────────────────────────────────

    /// The population store.
    pub fn amounts(&self) -> &AmountManager {
        &self.state.amounts
    }

    /// Mutable population store for speculative updates.
    ///
    /// Observers must never see the result of an uncommitted update:
    /// callers checkpoint with [`AmountManager::save`] and either roll
    /// back or announce the committed firings via
    /// [`announce_firing`](Self::announce_firing).
    pub fn amounts_mut(&mut self) -> &mut AmountManager {
        &mut self.state.amounts
    }

    // ── Propensities ───────────────────────────────────────────────

    /// Cached propensity of `reaction`.
    #[inline]
    pub fn propensity(&self, reaction: ReactionId) -> f64 {
        self.state.propensities[reaction.index()]
    }

    /// Cached propensities.
    pub fn propensities(&self) -> &[f64] {
        &self.state.propensities
    }

    /// Cached propensity sum.
    #[inline]
    pub fn propensity_sum(&self) -> f64 {
        self.state.propensity_sum
    }

    /// Recompute the propensity of one reaction and patch the sum.
    ///
    /// # Errors
    ///
    /// [`SimulationError::InvalidPropensity`] if the calculator returns a
    /// negative or non-finite value.
    pub fn recompute_propensity(&mut self, reaction: ReactionId) -> Result<f64, SimulationError> {
        let st = &mut self.state;
        let value = st.net.propensity_calculator().calculate(
            reaction,
            st.amounts.as_slice(),
            st.time,
        );
        let value = checked(reaction, value)?;
        let slot = &mut st.propensities[reaction.index()];
        st.propensity_sum += value - *slot;
        *slot = value;
        Ok(value)
    }

    /// Recompute every propensity and the sum from scratch.
    pub fn recompute_all_propensities(&mut self) -> Result<(), SimulationError> {
        let st = &mut self.state;
        let calc = st.net.propensity_calculator();
        let mut sum = 0.0;
        for (j, slot) in st.propensities.iter_mut().enumerate() {
            let r = ReactionId(j as u32);
            let value = checked(r, calc.calculate(r, st.amounts.as_slice(), st.time))?;
            *slot = value;
            sum += value;
        }
        st.propensity_sum = sum;
        Ok(())
    }

    /// Re-add the cached propensities to remove drift in the sum.
    pub fn refresh_propensity_sum(&mut self) {
        self.state.propensity_sum = self.state.propensities.iter().sum();
    }

    // ── Firing ─────────────────────────────────────────────────────

    /// Announce and apply `times` firings of `reaction` at `time`.
    ///
    /// Observers are notified before the amounts change. A firing at an
    /// infinite time means nothing can fire and is skipped entirely.
    pub fn fire_reaction(
        &mut self,
        reaction: ReactionId,
        time: f64,
        fire_type: FireType,
        times: u64,
    ) {
        if !time.is_finite() {
            return;
        }
        self.announce_firing(reaction, time, fire_type, times);
        self.state.amounts.perform_reaction(reaction, times);
    }

    /// Notify observers of a firing without applying it.
    ///
    /// Used after a speculative update has already been committed.
    pub fn announce_firing(
        &mut self,
        reaction: ReactionId,
        time: f64,
        fire_type: FireType,
        times: u64,
    ) {
        self.each_observer(|obs, ctx| obs.activate_reaction(reaction, time, fire_type, times, ctx));
    }

    // ── Thetas ─────────────────────────────────────────────────────

    /// Earliest pending theta, or `+inf`.
    #[inline]
    pub fn next_theta(&self) -> f64 {
        self.theta.peek_min()
    }

    /// Deliver the earliest theta bucket now, with current amounts.
    ///
    /// Returns `false` if no theta was pending.
    pub fn theta_event(&mut self) -> bool {
        match self.theta.pop_min_bucket() {
            Some((at, bucket)) => {
                self.deliver_theta(at, &bucket, None);
                true
            }
            None => false,
        }
    }

    /// Postpone thetas falling before the end of the coming firing.
    ///
    /// Snapshots the current amounts; the next
    /// [`dispatch_pending_theta`](Self::dispatch_pending_theta) delivers
    /// every theta up to the then-current time with amounts interpolated
    /// between the snapshot and the state at dispatch. An earlier pending
    /// snapshot is dispatched first.
    pub fn defer_theta_events(&mut self) {
        if self.pending.is_some() {
            self.dispatch_pending_theta();
        }
        self.pending = Some(PendingTheta {
            start_time: self.state.time,
            start_amounts: self.state.amounts.as_slice().to_vec(),
        });
    }

    /// Whether a deferred theta notification is waiting.
    pub fn has_pending_theta(&self) -> bool {
        self.pending.is_some()
    }

    /// Deliver deferred theta notifications, if any.
    pub fn dispatch_pending_theta(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let end_time = self.state.time;
        if !end_time.is_finite() {
            return;
        }
        let span = end_time - pending.start_time;
        let mut values = Vec::with_capacity(pending.start_amounts.len());
        for (at, bucket) in self.theta.pop_due(end_time) {
            let frac = if span > 0.0 {
                ((at - pending.start_time) / span).clamp(0.0, 1.0)
            } else {
                1.0
            };
            values.clear();
            values.extend(
                pending
                    .start_amounts
                    .iter()
                    .zip(self.state.amounts.as_slice())
                    .map(|(&from, &to)| from as f64 + (to - from) as f64 * frac),
            );
            self.deliver_theta(at, &bucket, Some(&values));
        }
    }

    /// Deliver every theta at or before the current time.
    ///
    /// A deferred notification is dispatched first. Thetas requested
    /// during delivery wait for the next call, even when already due.
    pub fn drain_due_thetas(&mut self) {
        self.dispatch_pending_theta();
        for (at, bucket) in self.theta.pop_due(self.state.time) {
            self.deliver_theta(at, &bucket, None);
        }
    }

    fn deliver_theta(&mut self, at: f64, bucket: &[ObserverId], interpolated: Option<&[f64]>) {
        let Self {
            state,
            theta,
            observers,
            ..
        } = self;
        for &id in bucket {
            if let Some(obs) = observers.get_mut(id.index()) {
                let mut ctx = ObserverContext::new(state, theta, id, interpolated);
                obs.theta(at, &mut ctx);
            }
        }
    }

    // ── Lifecycle (engine only) ────────────────────────────────────

    pub(crate) fn reset(&mut self) {
        let st = &mut self.state;
        st.time = 0.0;
        st.step_count = 0;
        st.amounts.reset();
        st.propensities.iter_mut().for_each(|a| *a = 0.0);
        st.propensity_sum = 0.0;
        self.theta.clear();
        self.pending = None;
    }

    pub(crate) fn reseed(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }

    fn each_observer(&mut self, mut f: impl FnMut(&mut dyn Observer, &mut ObserverContext<'_>)) {
        let Self {
            state,
            theta,
            observers,
            ..
        } = self;
        for (i, obs) in observers.iter_mut().enumerate() {
            let mut ctx = ObserverContext::new(state, theta, ObserverId(i as u32), None);
            f(obs.as_mut(), &mut ctx);
        }
    }

    pub(crate) fn notify_started(&mut self) {
        self.each_observer(|obs, ctx| obs.started(ctx));
    }

    pub(crate) fn notify_step(&mut self) {
        self.each_observer(|obs, ctx| obs.step(ctx));
    }

    pub(crate) fn notify_finished(&mut self) {
        self.each_observer(|obs, ctx| obs.finished(ctx));
    }

    pub(crate) fn print_all(&self) {
        for obs in &self.observers {
            obs.print(&self.state);
        }
    }

    /// Run triggerable observers; recompute propensities if any of them
    /// changed an amount.
    pub(crate) fn poll_triggers(&mut self) -> Result<(), SimulationError> {
        let mut changed = false;
        {
            let Self {
                state,
                theta,
                observers,
                ..
            } = self;
            for (i, obs) in observers.iter_mut().enumerate() {
                if let Some(trigger) = obs.as_triggerable() {
                    let mut ctx = TriggerContext::new(state, theta, ObserverId(i as u32));
                    trigger.trigger(&mut ctx)?;
                    changed |= ctx.changed();
                }
            }
        }
        if changed {
            self.recompute_all_propensities()?;
        }
        Ok(())
    }
}
