//! Tau-leaping with critical-reaction isolation (Cao, Gillespie and
//! Petzold, 2006).
//!
//! Each call of [`TauLeapStepper::advance`] performs one leap:
//!
//! 1. Recompute every propensity; deliver due thetas. With a zero
//!    propensity sum the clock jumps to the next theta, or to `+inf`.
//! 2. Classify reactions as critical (few firings from exhausting a
//!    reactant) or noncritical.
//! 3. Choose `tau1` for the noncritical reactions with the configured
//!    [`TauSelector`](crate::TauSelector).
//! 4. If `tau1 < use_simple_factor / a_sum`, leaping does not pay: run
//!    up to `num_simple_calls` exact steps instead.
//! 5. Otherwise draw `tau2 ~ Exp(critical sum)` and leap by the smallest
//!    of `tau1`, `tau2` and the time to the next theta. A `tau2` leap
//!    also fires exactly one critical reaction.
//! 6. Leaps are applied to checkpointed amounts. If any amount goes
//!    negative the leap is rolled back, `tau1` is halved and step 4 is
//!    retried; otherwise the leap commits and observers are notified.

use tracing::{debug, trace};

use fern_core::{group_multiplicity, AmountManager, FireType, Network, ReactionId, SimulationError};

use crate::config::ConfigError;
use crate::controller::SimulationController;
use crate::engine::SimulationCore;
use crate::strategy::exact::{select_weighted, ExactOutcome, ExactStepper};
use crate::strategy::tau_bound::{TauBound, TauInput, TauSelector};
use crate::strategy::SteppingStrategy;

// ── TauLeapConfig ──────────────────────────────────────────────────

/// Parameters of a [`TauLeapStepper`].
#[derive(Clone, Debug, PartialEq)]
pub struct TauLeapConfig {
    /// Error-control parameter of the leap bound, in `(0, 1)`. Default: 0.03.
    pub epsilon: f64,
    /// A reaction that can fire fewer than this many times before
    /// exhausting a reactant is critical. Default: 10.
    pub n_critical: u64,
    /// Leap only while `tau1 >= use_simple_factor / a_sum`. Default: 10.
    pub use_simple_factor: f64,
    /// Exact steps per bailout. Default: 100.
    pub num_simple_calls: u32,
    /// Poisson means above this use the Normal approximation. Default: 1000.
    pub langevin_threshold: f64,
    /// Leap-size selector. Default: [`TauBound::SpeciesPopulation`].
    pub tau_bound: TauBound,
}

impl Default for TauLeapConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.03,
            n_critical: 10,
            use_simple_factor: 10.0,
            num_simple_calls: 100,
            langevin_threshold: 1000.0,
            tau_bound: TauBound::default(),
        }
    }
}

impl TauLeapConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.epsilon > 0.0 && self.epsilon < 1.0) {
            return Err(ConfigError::InvalidEpsilon {
                value: self.epsilon,
            });
        }
        if !self.use_simple_factor.is_finite() || self.use_simple_factor < 0.0 {
            return Err(ConfigError::InvalidSimpleFactor {
                value: self.use_simple_factor,
            });
        }
        if self.num_simple_calls == 0 {
            return Err(ConfigError::ZeroSimpleCalls);
        }
        if self.langevin_threshold.is_nan() || self.langevin_threshold <= 0.0 {
            return Err(ConfigError::InvalidLangevinThreshold {
                value: self.langevin_threshold,
            });
        }
        Ok(())
    }
}

// ── LeapStats ──────────────────────────────────────────────────────

/// Counters accumulated over one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeapStats {
    /// Committed leaps.
    pub leaps: u64,
    /// Leaps that fired a critical reaction.
    pub critical_firings: u64,
    /// Leap attempts rolled back for driving an amount negative.
    pub rollbacks: u64,
    /// Calls that fell back to exact stepping.
    pub bailouts: u64,
    /// Exact firings performed during bailouts.
    pub exact_steps: u64,
}

// ── Criticality ────────────────────────────────────────────────────

/// Firings of `reaction` possible before one of its reactants runs out.
///
/// `L_j = min over reactants s of floor(x_s / m_sj)`, where `m_sj` is the
/// multiplicity of `s` on the reactant side. Catalysts and autocatalysts
/// count like any other reactant. `None` for a reaction without
/// reactants, which can never exhaust one.
pub fn max_firings(
    net: &dyn Network,
    amounts: &AmountManager,
    reaction: ReactionId,
) -> Option<u64> {
    group_multiplicity(net.reactants(reaction))
        .iter()
        .map(|&(s, m)| amounts.get(s).max(0) as u64 / u64::from(m))
        .min()
}

/// Flag each reaction with positive propensity that can fire fewer than
/// `n_critical` times before exhausting a reactant.
pub fn classify_critical(
    net: &dyn Network,
    amounts: &AmountManager,
    propensities: &[f64],
    n_critical: u64,
    critical: &mut Vec<bool>,
) {
    critical.clear();
    critical.extend(propensities.iter().enumerate().map(|(j, &a)| {
        a > 0.0
            && max_firings(net, amounts, ReactionId(j as u32)).is_some_and(|l| l < n_critical)
    }));
}

// ── TauLeapStepper ─────────────────────────────────────────────────

/// Adaptive tau-leaping stepper.
pub struct TauLeapStepper {
    config: TauLeapConfig,
    selector: Box<dyn TauSelector>,
    exact: ExactStepper,
    critical: Vec<bool>,
    firings: Vec<(ReactionId, u64)>,
    stats: LeapStats,
}

impl TauLeapStepper {
    /// Validate `config` and build the stepper.
    pub fn new(config: TauLeapConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            selector: config.tau_bound.selector(),
            config,
            exact: ExactStepper::enhanced(),
            critical: Vec::new(),
            firings: Vec::new(),
            stats: LeapStats::default(),
        })
    }

    /// The configuration.
    pub fn config(&self) -> &TauLeapConfig {
        &self.config
    }

    /// Counters of the current (or last) run.
    pub fn stats(&self) -> &LeapStats {
        &self.stats
    }

    /// Criticality flags from the most recent leap.
    pub fn critical(&self) -> &[bool] {
        &self.critical
    }

    fn choose_tau1(&mut self, core: &SimulationCore) -> f64 {
        let st = core.state();
        let input = TauInput {
            net: st.net(),
            amounts: st.amount_manager(),
            propensities: st.propensities(),
            propensity_sum: st.propensity_sum(),
            critical: &self.critical,
            epsilon: self.config.epsilon,
            time: st.time(),
        };
        self.selector.choose_tau(&input)
    }

    /// Apply a leap of length `tau` to checkpointed amounts.
    ///
    /// Returns `false` (with amounts restored) if the leap drove any
    /// amount negative. Noncritical firing counts are left in
    /// `self.firings`.
    fn try_leap(
        &mut self,
        core: &mut SimulationCore,
        tau: f64,
        critical: Option<ReactionId>,
    ) -> bool {
        self.firings.clear();
        core.amounts_mut().save();
        if let Some(r) = critical {
            core.amounts_mut().perform_reaction(r, 1);
        }
        for j in 0..core.reaction_count() {
            if self.critical[j] {
                continue;
            }
            let r = ReactionId(j as u32);
            let mean = core.propensity(r) * tau;
            if mean <= 0.0 {
                continue;
            }
            let count = if mean > self.config.langevin_threshold {
                core.rng().normal(mean, mean.sqrt()).round().max(0.0) as u64
            } else {
                core.rng().poisson(mean)
            };
            if count > 0 {
                core.amounts_mut().perform_reaction(r, count);
                self.firings.push((r, count));
            }
        }
        if core.amounts().first_negative().is_some() {
            core.amounts_mut().rollback();
            return false;
        }
        true
    }

    fn bailout(
        &mut self,
        core: &mut SimulationCore,
        controller: &mut dyn SimulationController,
    ) -> Result<(), SimulationError> {
        self.stats.bailouts += 1;
        trace!(
            time = core.time(),
            calls = self.config.num_simple_calls,
            "leap too short; exact stepping"
        );
        for call in 0..self.config.num_simple_calls {
            if call > 0 && !controller.go_on(core.state()) {
                break;
            }
            let outcome = self.exact.step(core)?;
            core.dispatch_pending_theta();
            match outcome {
                ExactOutcome::Fired(_) => self.stats.exact_steps += 1,
                ExactOutcome::Absorbed => break,
                ExactOutcome::Theta | ExactOutcome::Stalled => {}
            }
        }
        Ok(())
    }
}

impl SteppingStrategy for TauLeapStepper {
    fn name(&self) -> &str {
        "tau-leap"
    }

    fn initialize(&mut self, core: &mut SimulationCore) -> Result<(), SimulationError> {
        self.stats = LeapStats::default();
        self.selector.initialize(core.state().net());
        debug!(
            epsilon = self.config.epsilon,
            n_critical = self.config.n_critical,
            bound = self.selector.name(),
            "tau-leap initialized"
        );
        self.exact.initialize(core)
    }

    fn advance(
        &mut self,
        core: &mut SimulationCore,
        controller: &mut dyn SimulationController,
    ) -> Result<(), SimulationError> {
        core.recompute_all_propensities()?;
        core.drain_due_thetas();

        let a_sum = core.propensity_sum();
        if a_sum <= 0.0 {
            let theta = core.next_theta();
            if theta.is_finite() {
                core.advance_time_to(theta);
                core.theta_event();
            } else {
                core.set_absorbed();
            }
            return Ok(());
        }

        let t = core.time();
        let theta = core.next_theta();
        let theta3 = theta - t;
        classify_critical(
            core.state().net(),
            core.amounts(),
            core.propensities(),
            self.config.n_critical,
            &mut self.critical,
        );
        let critical_sum: f64 = core
            .propensities()
            .iter()
            .zip(&self.critical)
            .filter(|&(_, &c)| c)
            .map(|(a, _)| a)
            .sum();
        let mut tau1 = self.choose_tau1(core);

        loop {
            if tau1 < self.config.use_simple_factor / a_sum {
                return self.bailout(core, controller);
            }
            let tau2 = core.rng().exponential(critical_sum);
            if tau1.is_infinite() && tau2.is_infinite() && theta3.is_infinite() {
                return self.bailout(core, controller);
            }

            let (tau, critical) = if theta3 <= tau1 && theta3 <= tau2 {
                (theta3, None)
            } else if tau1 < tau2 {
                (tau1, None)
            } else {
                let u = core.rng().unif();
                let weights = core
                    .propensities()
                    .iter()
                    .copied()
                    .enumerate()
                    .filter(|&(j, _)| self.critical[j]);
                let j = select_weighted(weights, critical_sum, u)
                    .ok_or(SimulationError::CriticalSelectionFailed { critical_sum })?;
                (tau2, Some(ReactionId(j as u32)))
            };

            if !self.try_leap(core, tau, critical) {
                self.stats.rollbacks += 1;
                tau1 = tau1.min(tau) / 2.0;
                trace!(time = t, tau, tau1, "leap infeasible; rolled back");
                continue;
            }

            let when = if critical.is_none() && tau == theta3 {
                theta
            } else {
                t + tau
            };
            core.advance_time_to(when);
            if let Some(r) = critical {
                self.stats.critical_firings += 1;
                core.announce_firing(r, when, FireType::TauLeapCritical, 1);
            }
            for &(r, count) in &self.firings {
                core.announce_firing(r, when, FireType::TauLeapNonCritical, count);
            }
            self.stats.leaps += 1;
            core.recompute_all_propensities()?;
            core.drain_due_thetas();
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use fern_core::{ReactionNetwork, SimulatorId, SpeciesId};
    use proptest::prelude::*;

    use crate::state::SimulationState;

    fn core_for(net: ReactionNetwork, seed: u64) -> SimulationCore {
        let state = SimulationState::new(Arc::new(net));
        let mut core = SimulationCore::new(SimulatorId::next(), state, seed, false);
        core.recompute_all_propensities().unwrap();
        core
    }

    fn reversible(a: i64, b: i64) -> ReactionNetwork {
        ReactionNetwork::builder("reversible")
            .species("A", a)
            .species("B", b)
            .reaction("forward", &["A"], &["B"], 1.0)
            .reaction("backward", &["B"], &["A"], 1.0)
            .build()
            .unwrap()
    }

    fn always(_: &crate::SimulationState) -> bool {
        true
    }

    #[test]
    fn config_validation() {
        assert!(TauLeapConfig::default().validate().is_ok());
        let bad = |f: fn(&mut TauLeapConfig)| {
            let mut c = TauLeapConfig::default();
            f(&mut c);
            c.validate().unwrap_err()
        };
        assert_eq!(
            bad(|c| c.epsilon = 0.0),
            ConfigError::InvalidEpsilon { value: 0.0 }
        );
        assert!(matches!(
            bad(|c| c.use_simple_factor = f64::INFINITY),
            ConfigError::InvalidSimpleFactor { .. }
        ));
        assert_eq!(bad(|c| c.num_simple_calls = 0), ConfigError::ZeroSimpleCalls);
        assert!(matches!(
            bad(|c| c.langevin_threshold = f64::NAN),
            ConfigError::InvalidLangevinThreshold { .. }
        ));
        assert!(TauLeapStepper::new(TauLeapConfig {
            epsilon: 1.5,
            ..TauLeapConfig::default()
        })
        .is_err());
    }

    #[test]
    fn criticality_classification() {
        let net = ReactionNetwork::builder("crit")
            .species("A", 5)
            .species("B", 100)
            .species("E", 1)
            .species("F", 50)
            .reaction("a_decay", &["A"], &[], 1.0)
            .reaction("dimer_b", &["B", "B"], &[], 1.0)
            .reaction("catalysed", &["E"], &["E", "B"], 1.0)
            .reaction("dead", &["A", "A", "A", "A", "A", "A"], &[], 0.0)
            .reaction("source", &[], &["F"], 1.0)
            .reaction("f_catalysed", &["F"], &["F", "B"], 1.0)
            .build()
            .unwrap();
        let am = AmountManager::new(&net);
        assert_eq!(max_firings(&net, &am, ReactionId(0)), Some(5));
        assert_eq!(max_firings(&net, &am, ReactionId(1)), Some(50));
        // A catalyst is a reactant; one copy allows one firing.
        assert_eq!(max_firings(&net, &am, ReactionId(2)), Some(1));
        assert_eq!(max_firings(&net, &am, ReactionId(3)), Some(0));
        assert_eq!(max_firings(&net, &am, ReactionId(4)), None);
        let mut critical = Vec::new();
        classify_critical(&net, &am, &[1.0, 1.0, 1.0, 0.0, 1.0, 1.0], 10, &mut critical);
        assert_eq!(critical, vec![true, false, true, false, false, false]);
        // Zero propensity is never critical, however scarce the reactant.
        classify_critical(&net, &am, &[0.0, 1.0, 0.0, 0.0, 1.0, 1.0], 10, &mut critical);
        assert!(!critical[0]);
        assert!(!critical[2]);
    }

    #[test]
    fn criticality_counts_reactant_multiplicity_not_net_loss() {
        // 2A -> A consumes one A net but needs two per firing.
        let net = ReactionNetwork::builder("halving")
            .species("A", 15)
            .species("B", 1)
            .reaction("halve", &["A", "A"], &["A"], 1.0)
            .reaction("autocatalysis", &["A", "B"], &["B", "B"], 1.0)
            .build()
            .unwrap();
        let am = AmountManager::new(&net);
        assert_eq!(max_firings(&net, &am, ReactionId(0)), Some(7));
        assert_eq!(max_firings(&net, &am, ReactionId(1)), Some(1));
        let mut critical = Vec::new();
        classify_critical(&net, &am, &[1.0, 1.0], 10, &mut critical);
        assert_eq!(critical, vec![true, true]);
    }

    #[test]
    fn forced_bailout_performs_exact_calls() {
        let mut stepper = TauLeapStepper::new(TauLeapConfig {
            use_simple_factor: 1e12,
            num_simple_calls: 100,
            ..TauLeapConfig::default()
        })
        .unwrap();
        let mut core = core_for(reversible(1000, 1000), 11);
        stepper.initialize(&mut core).unwrap();
        stepper.advance(&mut core, &mut always).unwrap();
        assert_eq!(stepper.stats().bailouts, 1);
        assert_eq!(stepper.stats().exact_steps, 100);
        assert_eq!(stepper.stats().leaps, 0);
    }

    #[test]
    fn bailout_stops_when_controller_says_so() {
        let mut stepper = TauLeapStepper::new(TauLeapConfig {
            use_simple_factor: 1e12,
            ..TauLeapConfig::default()
        })
        .unwrap();
        let mut core = core_for(reversible(1000, 1000), 11);
        stepper.initialize(&mut core).unwrap();
        let mut budget = 3;
        let mut controller = |_: &crate::SimulationState| {
            budget -= 1;
            budget > 0
        };
        stepper.advance(&mut core, &mut controller).unwrap();
        // First call is unconditional, then two more approvals.
        assert_eq!(stepper.stats().exact_steps, 3);
    }

    #[test]
    fn leap_stops_exactly_at_theta() {
        let mut stepper = TauLeapStepper::new(TauLeapConfig::default()).unwrap();
        let mut core = core_for(reversible(100_000, 100_000), 5);
        stepper.initialize(&mut core).unwrap();
        core.theta.request(fern_core::ObserverId(0), 1e-3);
        stepper.advance(&mut core, &mut always).unwrap();
        assert_eq!(core.time(), 1e-3);
        assert_eq!(stepper.stats().leaps, 1);
        assert_eq!(core.next_theta(), f64::INFINITY);
    }

    #[test]
    fn absorbing_state_reaches_infinity() {
        let net = ReactionNetwork::builder("empty")
            .species("A", 0)
            .reaction("decay", &["A"], &[], 1.0)
            .build()
            .unwrap();
        let mut stepper = TauLeapStepper::new(TauLeapConfig::default()).unwrap();
        let mut core = core_for(net, 1);
        stepper.initialize(&mut core).unwrap();
        core.theta.request(fern_core::ObserverId(0), 4.0);
        stepper.advance(&mut core, &mut always).unwrap();
        assert_eq!(core.time(), 4.0);
        stepper.advance(&mut core, &mut always).unwrap();
        assert!(core.time().is_infinite());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn leaps_conserve_and_stay_nonnegative(
            a in 0i64..2000,
            b in 0i64..2000,
            seed in any::<u64>(),
        ) {
            let mut stepper = TauLeapStepper::new(TauLeapConfig::default()).unwrap();
            let mut core = core_for(reversible(a, b), seed);
            stepper.initialize(&mut core).unwrap();
            for _ in 0..50 {
                stepper.advance(&mut core, &mut always).unwrap();
                let x = core.amounts().get(SpeciesId(0));
                let y = core.amounts().get(SpeciesId(1));
                prop_assert!(x >= 0 && y >= 0);
                prop_assert_eq!(x + y, a + b);
                if core.time().is_infinite() {
                    break;
                }
            }
        }
    }
}
