//! The user-facing simulator and its run lifecycle.
//!
//! [`Simulator`] owns a [`SimulationCore`] and a stepping strategy and
//! drives the loop:
//!
//! ```text
//! pre_run   t = 0, reset amounts and thetas, compute propensities,
//!           initialize strategy, observers' started()
//! run       while controller.go_on():
//!               poll triggerable observers
//!               observers' step()
//!               strategy.advance()
//!               dispatch deferred theta, if any
//! post_run  observers' finished(), then print()
//! ```
//!
//! # Ownership model
//!
//! `Simulator` is [`Send`] (ensembles can move simulators to worker
//! threads) and every mutating method takes `&mut self`. A `run` ended by
//! its controller leaves the simulator resumable: call `run` again with
//! another controller before `post_run`.

use tracing::debug;

use fern_core::{FireType, ObserverId, ReactionId, SimulationError, SimulatorId};

use crate::config::{ConfigError, SimulatorConfig};
use crate::controller::{SimulationController, TimeController};
use crate::engine::SimulationCore;
use crate::observer::Observer;
use crate::state::SimulationState;
use crate::strategy::SteppingStrategy;

// Compile-time assertion: Simulator is Send.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Simulator>();
    }
};

/// Lifecycle phase of a [`Simulator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    /// Constructed, or between runs before `pre_run`.
    Unstarted,
    /// Between `pre_run` and `post_run`.
    Running,
    /// After `post_run`.
    Finished,
}

/// Stochastic simulator for one reaction network.
pub struct Simulator {
    core: SimulationCore,
    strategy: Box<dyn SteppingStrategy>,
    phase: RunPhase,
}

impl Simulator {
    /// Validate `config` and build a simulator.
    pub fn new(config: SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let id = SimulatorId::next();
        let state = SimulationState::new(config.network);
        let core = SimulationCore::new(id, state, config.seed, config.interpolate_theta);
        debug!(
            simulator = %id,
            network = core.state().net().name(),
            strategy = config.strategy.name(),
            seed = config.seed,
            "simulator created"
        );
        Ok(Self {
            core,
            strategy: config.strategy,
            phase: RunPhase::Unstarted,
        })
    }

    /// This simulator's unique ID.
    pub fn id(&self) -> SimulatorId {
        self.core.id()
    }

    /// Read-only view of the simulation.
    pub fn state(&self) -> &SimulationState {
        self.core.state()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// The stepping strategy.
    pub fn strategy(&self) -> &dyn SteppingStrategy {
        self.strategy.as_ref()
    }

    /// Restart the random stream from `seed`.
    ///
    /// Runs do not reseed on their own: consecutive runs continue the
    /// stream and therefore produce independent trajectories.
    pub fn reseed(&mut self, seed: u64) {
        self.core.reseed(seed);
    }

    // ── Observers ──────────────────────────────────────────────────

    /// Register an observer.
    ///
    /// # Errors
    ///
    /// [`SimulationError::ObserverBoundElsewhere`] if the observer is
    /// bound to a different simulator.
    pub fn add_observer(
        &mut self,
        observer: Box<dyn Observer>,
    ) -> Result<ObserverId, SimulationError> {
        let id = self.id();
        if let Some(bound_to) = observer.simulator() {
            if bound_to != id {
                return Err(SimulationError::ObserverBoundElsewhere {
                    simulator: id,
                    bound_to,
                });
            }
        }
        let observer_id = ObserverId(self.core.observers.len() as u32);
        debug!(simulator = %id, observer = observer.name(), id = %observer_id, "observer added");
        self.core.observers.push(observer);
        Ok(observer_id)
    }

    /// A registered observer.
    pub fn observer(&self, id: ObserverId) -> Option<&dyn Observer> {
        self.core.observers.get(id.index()).map(|o| o.as_ref())
    }

    /// A registered observer, downcast to its concrete type.
    pub fn observer_as<T: Observer>(&self, id: ObserverId) -> Option<&T> {
        self.observer(id).and_then(|o| o.downcast_ref::<T>())
    }

    /// Mutable access to a registered observer, downcast to its
    /// concrete type.
    pub fn observer_as_mut<T: Observer>(&mut self, id: ObserverId) -> Option<&mut T> {
        self.core
            .observers
            .get_mut(id.index())
            .and_then(|o| o.downcast_mut::<T>())
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.core.observers.len()
    }

    /// Request a theta notification for `observer` at `time`, under the
    /// min-merge rule of [`ObserverContext::set_theta`](crate::ObserverContext::set_theta).
    pub fn register_new_theta(&mut self, observer: ObserverId, time: f64) -> bool {
        if time.is_nan() {
            return false;
        }
        self.core.theta.request(observer, time)
    }

    // ── Firing ─────────────────────────────────────────────────────

    /// Fire `reaction` `times` times at `time` from outside the strategy,
    /// then recompute all propensities.
    ///
    /// The firing is first applied to checkpointed amounts; if any amount
    /// would go negative it is rolled back and rejected before observers
    /// hear of it. Otherwise observers are notified, then the amounts
    /// change. A firing at an infinite time is skipped.
    ///
    /// # Errors
    ///
    /// [`SimulationError::NotRunning`] outside `pre_run`/`post_run`,
    /// [`SimulationError::ReactionOutOfRange`] for an unknown reaction and
    /// [`SimulationError::InfeasibleFiring`] if the firing would make an
    /// amount negative.
    pub fn fire_reaction(
        &mut self,
        reaction: ReactionId,
        time: f64,
        fire_type: FireType,
        times: u64,
    ) -> Result<(), SimulationError> {
        if self.phase != RunPhase::Running {
            return Err(SimulationError::NotRunning);
        }
        if reaction.index() >= self.core.reaction_count() {
            return Err(SimulationError::ReactionOutOfRange { reaction });
        }
        if !time.is_finite() {
            return Ok(());
        }
        let amounts = self.core.amounts_mut();
        amounts.save();
        amounts.perform_reaction(reaction, times);
        let negative = amounts.first_negative();
        amounts.rollback();
        if let Some(species) = negative {
            return Err(SimulationError::InfeasibleFiring {
                reaction,
                times,
                species,
            });
        }
        self.core.fire_reaction(reaction, time, fire_type, times);
        self.core.recompute_all_propensities()
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Reset to `t = 0` and start observers.
    pub fn pre_run(&mut self) -> Result<(), SimulationError> {
        self.core.reset();
        self.core.recompute_all_propensities()?;
        self.strategy.initialize(&mut self.core)?;
        self.phase = RunPhase::Running;
        debug!(
            simulator = %self.id(),
            strategy = self.strategy.name(),
            propensity_sum = self.core.propensity_sum(),
            "run started"
        );
        self.core.notify_started();
        Ok(())
    }

    /// Loop while `controller` agrees.
    ///
    /// Also returns once the clock reaches `+inf` with no theta pending.
    ///
    /// # Errors
    ///
    /// [`SimulationError::NotRunning`] outside `pre_run`/`post_run`;
    /// otherwise any modeling or consistency error raised by the strategy.
    pub fn run(&mut self, controller: &mut dyn SimulationController) -> Result<(), SimulationError> {
        if self.phase != RunPhase::Running {
            return Err(SimulationError::NotRunning);
        }
        while controller.go_on(self.core.state()) {
            self.core.state.step_count += 1;
            self.core.poll_triggers()?;
            self.core.notify_step();
            self.strategy.advance(&mut self.core, controller)?;
            self.core.dispatch_pending_theta();
            if self.core.time().is_infinite() && self.core.theta.is_empty() {
                break;
            }
        }
        Ok(())
    }

    /// Finish observers and let them report.
    pub fn post_run(&mut self) -> Result<(), SimulationError> {
        if self.phase != RunPhase::Running {
            return Err(SimulationError::NotRunning);
        }
        self.core.notify_finished();
        self.core.print_all();
        self.phase = RunPhase::Finished;
        debug!(
            simulator = %self.id(),
            time = self.core.time(),
            steps = self.core.state().step_count(),
            "run finished"
        );
        Ok(())
    }

    /// Full cycle until `t >= end_time`.
    pub fn start(&mut self, end_time: f64) -> Result<(), SimulationError> {
        self.start_with(&mut TimeController::new(end_time))
    }

    /// Full cycle under `controller`.
    pub fn start_with(
        &mut self,
        controller: &mut dyn SimulationController,
    ) -> Result<(), SimulationError> {
        self.pre_run()?;
        self.run(controller)?;
        self.post_run()
    }
}
