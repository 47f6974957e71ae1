//! Scheduled amount interventions: the triggerable observer.
//!
//! An [`InterventionObserver`] holds a time-ordered list of amount
//! changes. It requests a theta at each intervention time so the clock
//! stops there, and applies every intervention whose time has been
//! reached when the simulator polls it at the start of the next loop
//! iteration.

use fern_core::{SimulationError, SimulatorId, SpeciesId};
use fern_engine::{Observer, ObserverContext, SimulationState, TriggerContext, Triggerable};
use tracing::{debug, info};

/// What an [`Intervention`] does to its species.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterventionKind {
    /// Overwrite the amount.
    Set(u64),
    /// Add to the amount, saturating at zero.
    Add(i64),
}

/// One scheduled amount change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intervention {
    /// Time at or after which the change is applied.
    pub time: f64,
    /// Target species.
    pub species: SpeciesId,
    /// The change.
    pub kind: InterventionKind,
}

/// Applies scheduled [`Intervention`]s during a run.
///
/// Interventions with equal times are applied in insertion order. With
/// theta interpolation enabled the clock does not stop on intervention
/// times, so each change lands on the first loop iteration at or after
/// its time.
#[derive(Debug)]
pub struct InterventionObserver {
    schedule: Vec<Intervention>,
    bound: Option<SimulatorId>,
    next: usize,
    applied: Vec<(f64, Intervention)>,
}

/// Builder for [`InterventionObserver`].
pub struct InterventionObserverBuilder {
    schedule: Vec<Intervention>,
    bound: Option<SimulatorId>,
}

impl InterventionObserver {
    /// Create a new builder.
    pub fn builder() -> InterventionObserverBuilder {
        InterventionObserverBuilder {
            schedule: Vec::new(),
            bound: None,
        }
    }

    /// The schedule, sorted by time.
    pub fn schedule(&self) -> &[Intervention] {
        &self.schedule
    }

    /// Interventions applied in the current (or last) run, with the
    /// simulation time at which each was applied.
    pub fn applied(&self) -> &[(f64, Intervention)] {
        &self.applied
    }

    /// Number of interventions not yet applied this run.
    pub fn remaining(&self) -> usize {
        self.schedule.len() - self.next
    }

    fn next_time(&self) -> Option<f64> {
        self.schedule.get(self.next).map(|iv| iv.time)
    }
}

impl InterventionObserverBuilder {
    /// Set `species` to `value` at `time`.
    pub fn set(mut self, time: f64, species: SpeciesId, value: u64) -> Self {
        self.schedule.push(Intervention {
            time,
            species,
            kind: InterventionKind::Set(value),
        });
        self
    }

    /// Add `delta` to `species` at `time`.
    pub fn add(mut self, time: f64, species: SpeciesId, delta: i64) -> Self {
        self.schedule.push(Intervention {
            time,
            species,
            kind: InterventionKind::Add(delta),
        });
        self
    }

    /// Bind to a simulator.
    pub fn bound_to(mut self, simulator: SimulatorId) -> Self {
        self.bound = Some(simulator);
        self
    }

    /// Build the observer, validating all configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any intervention time is negative or not finite.
    pub fn build(mut self) -> Result<InterventionObserver, String> {
        if let Some(iv) = self
            .schedule
            .iter()
            .find(|iv| !iv.time.is_finite() || iv.time < 0.0)
        {
            return Err(format!(
                "intervention time must be finite and >= 0, got {}",
                iv.time
            ));
        }
        // Stable: equal times keep insertion order.
        self.schedule.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(InterventionObserver {
            schedule: self.schedule,
            bound: self.bound,
            next: 0,
            applied: Vec::new(),
        })
    }
}

impl Observer for InterventionObserver {
    fn name(&self) -> &str {
        "intervention"
    }

    fn simulator(&self) -> Option<SimulatorId> {
        self.bound
    }

    fn started(&mut self, ctx: &mut ObserverContext<'_>) {
        self.next = 0;
        self.applied.clear();
        if let Some(t) = self.next_time() {
            ctx.set_theta(t);
        }
    }

    fn theta(&mut self, _theta: f64, ctx: &mut ObserverContext<'_>) {
        // Due interventions are applied on the next trigger poll; keep
        // the clock stopping on the first one still ahead.
        let now = ctx.time();
        if let Some(t) = self.schedule[self.next..]
            .iter()
            .map(|iv| iv.time)
            .find(|&t| t > now)
        {
            ctx.set_theta(t);
        }
    }

    fn print(&self, state: &SimulationState) {
        info!(
            network = state.net().name(),
            applied = self.applied.len(),
            remaining = self.remaining(),
            "interventions"
        );
    }

    fn as_triggerable(&mut self) -> Option<&mut dyn Triggerable> {
        Some(self)
    }
}

impl Triggerable for InterventionObserver {
    fn trigger(&mut self, ctx: &mut TriggerContext<'_>) -> Result<(), SimulationError> {
        let now = ctx.time();
        while let Some(&iv) = self.schedule.get(self.next) {
            if iv.time > now {
                break;
            }
            match iv.kind {
                InterventionKind::Set(value) => ctx.set_amount(iv.species, value)?,
                InterventionKind::Add(delta) => ctx.add_amount(iv.species, delta)?,
            }
            debug!(
                species = %iv.species,
                scheduled = iv.time,
                time = now,
                amount = ctx.amount(iv.species)?,
                "intervention applied"
            );
            self.applied.push((now, iv));
            self.next += 1;
        }
        if let Some(t) = self.next_time() {
            ctx.set_theta(t);
        }
        Ok(())
    }
}
