//! Integration test: simulator lifecycle, observer binding, theta
//! scheduling, controllers and reproducibility.

use fern_core::{FireType, ReactionId, SimulationError, SimulatorId, SpeciesId};
use fern_engine::{
    ExactStepper, Observer, ObserverContext, RunPhase, SimulationController, Simulator,
    StepLimitController, TauLeapConfig, TauLeapStepper, TimeController,
};
use fern_test_utils::fixtures::{self, FixedPropensityNetwork};
use fern_test_utils::{Event, MockController, RecordingObserver};

fn exact_sim(net: fern_core::ReactionNetwork, seed: u64) -> Simulator {
    Simulator::new(fixtures::config(net, ExactStepper::enhanced(), seed)).unwrap()
}

fn tau_sim(net: fern_core::ReactionNetwork, seed: u64) -> Simulator {
    let stepper = TauLeapStepper::new(TauLeapConfig::default()).unwrap();
    Simulator::new(fixtures::config(net, stepper, seed)).unwrap()
}

fn recorded_firings(sim: &mut Simulator, end: f64) -> Vec<(ReactionId, f64, FireType, u64)> {
    let id = sim.add_observer(Box::new(RecordingObserver::new("rec"))).unwrap();
    sim.start(end).unwrap();
    sim.observer_as::<RecordingObserver>(id).unwrap().firings()
}

// ── Phases ───────────────────────────────────────────────────────────

#[test]
fn run_outside_running_phase_is_rejected() {
    let mut sim = exact_sim(fixtures::decay(10, 1.0), 1);
    assert_eq!(sim.phase(), RunPhase::Unstarted);
    assert_eq!(
        sim.run(&mut TimeController::new(1.0)),
        Err(SimulationError::NotRunning)
    );
    assert_eq!(sim.post_run(), Err(SimulationError::NotRunning));

    sim.start(1.0).unwrap();
    assert_eq!(sim.phase(), RunPhase::Finished);
    assert_eq!(
        sim.run(&mut TimeController::new(2.0)),
        Err(SimulationError::NotRunning)
    );
}

#[test]
fn runs_resume_across_controllers() {
    let mut sim = exact_sim(fixtures::decay(1000, 0.1), 2);
    let id = sim.add_observer(Box::new(RecordingObserver::new("rec"))).unwrap();
    sim.pre_run().unwrap();
    sim.run(&mut TimeController::new(1.0)).unwrap();
    let t1 = sim.state().time();
    let fired1 = sim.observer_as::<RecordingObserver>(id).unwrap().firings().len();
    assert!(t1 >= 1.0);

    sim.run(&mut TimeController::new(2.0)).unwrap();
    assert!(sim.state().time() >= 2.0);
    sim.post_run().unwrap();

    let rec = sim.observer_as::<RecordingObserver>(id).unwrap();
    assert!(rec.firings().len() > fired1);
    let started = rec
        .events()
        .iter()
        .filter(|e| matches!(e, Event::Started { .. }))
        .count();
    assert_eq!(started, 1);
    assert!(matches!(rec.events().last(), Some(Event::Finished { .. })));
    assert_eq!(
        sim.state().amount(SpeciesId(0)),
        1000 - rec.firings().len() as i64
    );
}

#[test]
fn step_limit_bounds_loop_iterations() {
    let mut sim = exact_sim(fixtures::decay(1000, 1.0), 3);
    sim.start_with(&mut StepLimitController::new(25)).unwrap();
    assert_eq!(sim.state().step_count(), 25);
    assert_eq!(sim.state().amount(SpeciesId(0)), 975);
}

#[test]
fn absorbing_state_ends_the_run() {
    let mut sim = exact_sim(fixtures::decay(30, 2.0), 4);
    sim.start(f64::INFINITY).unwrap();
    assert!(sim.state().time().is_infinite());
    assert_eq!(sim.state().amount(SpeciesId(0)), 0);
    assert_eq!(sim.state().propensity_sum(), 0.0);
}

// ── Observer binding ─────────────────────────────────────────────────

#[test]
fn observer_bound_elsewhere_is_rejected() {
    let mut sim = exact_sim(fixtures::decay(10, 1.0), 1);
    let other = SimulatorId::next();
    let err = sim
        .add_observer(Box::new(RecordingObserver::new("r").bound_to(other)))
        .unwrap_err();
    assert_eq!(
        err,
        SimulationError::ObserverBoundElsewhere {
            simulator: sim.id(),
            bound_to: other,
        }
    );
    assert_eq!(sim.observer_count(), 0);

    let own = sim.id();
    sim.add_observer(Box::new(RecordingObserver::new("r").bound_to(own)))
        .unwrap();
    assert_eq!(sim.observer_count(), 1);
    assert_eq!(sim.observer(fern_core::ObserverId(0)).unwrap().name(), "r");
}

// ── Propensity validation ────────────────────────────────────────────

#[test]
fn negative_propensity_fails_fast() {
    let net = FixedPropensityNetwork::new(fixtures::decay(10, 1.0), -1.0);
    let config = fern_engine::SimulatorConfig::new(std::sync::Arc::new(net));
    let mut sim = Simulator::new(config).unwrap();
    assert_eq!(
        sim.pre_run(),
        Err(SimulationError::InvalidPropensity {
            reaction: ReactionId(0),
            value: -1.0,
        })
    );
}

#[test]
fn nan_propensity_fails_fast() {
    let net = FixedPropensityNetwork::new(fixtures::reversible(5, 5, 1.0, 1.0), f64::NAN);
    let stepper = TauLeapStepper::new(TauLeapConfig::default()).unwrap();
    let config = fern_engine::SimulatorConfig::new(std::sync::Arc::new(net)).with_strategy(stepper);
    let mut sim = Simulator::new(config).unwrap();
    let err = sim.start(1.0).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidPropensity { value, .. } if value.is_nan()));
}

// ── Thetas ───────────────────────────────────────────────────────────

#[test]
fn register_new_theta_min_merges() {
    let mut sim = exact_sim(fixtures::decay(1000, 0.01), 5);
    let id = sim.add_observer(Box::new(RecordingObserver::new("rec"))).unwrap();
    sim.pre_run().unwrap();
    assert!(sim.register_new_theta(id, 3.0));
    assert!(!sim.register_new_theta(id, 5.0));
    assert!(sim.register_new_theta(id, 1.0));
    assert!(!sim.register_new_theta(id, f64::NAN));
    sim.run(&mut TimeController::new(10.0)).unwrap();
    sim.post_run().unwrap();

    let rec = sim.observer_as::<RecordingObserver>(id).unwrap();
    assert_eq!(rec.theta_times(), vec![1.0]);
    assert!(rec
        .events()
        .contains(&Event::Theta { theta: 1.0, time: 1.0 }));
}

#[test]
fn each_observer_keeps_its_earliest_theta() {
    let mut sim = tau_sim(fixtures::isomerization(2000, 0.1), 6);
    let a = sim
        .add_observer(Box::new(RecordingObserver::new("a").with_thetas([2.0, 0.5])))
        .unwrap();
    let b = sim
        .add_observer(Box::new(RecordingObserver::new("b").with_thetas([2.0])))
        .unwrap();
    sim.start(3.0).unwrap();

    let a = sim.observer_as::<RecordingObserver>(a).unwrap();
    let b = sim.observer_as::<RecordingObserver>(b).unwrap();
    assert_eq!(a.theta_times(), vec![0.5]);
    assert_eq!(b.theta_times(), vec![2.0]);
    assert!(b.events().contains(&Event::Theta { theta: 2.0, time: 2.0 }));
}

#[test]
fn thetas_after_absorption_are_still_delivered() {
    let mut sim = exact_sim(fixtures::decay(3, 50.0), 7);
    let id = sim
        .add_observer(Box::new(RecordingObserver::new("rec").with_thetas([100.0])))
        .unwrap();
    sim.start(f64::INFINITY).unwrap();

    let rec = sim.observer_as::<RecordingObserver>(id).unwrap();
    assert_eq!(rec.theta_times(), vec![100.0]);
    assert!(sim.state().time().is_infinite());
}

/// Asks for the current time again from every theta callback.
///
/// Gives up after `limit` deliveries so a runaway drain ends the test
/// instead of hanging it.
struct Rerequester {
    deliveries: u64,
    limit: u64,
}

impl Rerequester {
    fn new() -> Self {
        Self {
            deliveries: 0,
            limit: 100_000,
        }
    }
}

impl Observer for Rerequester {
    fn name(&self) -> &str {
        "rerequester"
    }

    fn started(&mut self, ctx: &mut ObserverContext<'_>) {
        self.deliveries = 0;
        ctx.set_theta(0.0);
    }

    fn theta(&mut self, _theta: f64, ctx: &mut ObserverContext<'_>) {
        self.deliveries += 1;
        if self.deliveries < self.limit {
            ctx.set_theta(ctx.time());
        }
    }
}

#[test]
fn rerequested_due_theta_waits_for_the_next_iteration() {
    let configs = [
        fixtures::config(fixtures::isomerization(2000, 0.1), ExactStepper::enhanced(), 11),
        fixtures::config(
            fixtures::isomerization(2000, 0.1),
            TauLeapStepper::new(TauLeapConfig::default()).unwrap(),
            11,
        ),
        fixtures::config(fixtures::isomerization(2000, 0.1), ExactStepper::enhanced(), 11)
            .with_theta_interpolation(true),
    ];
    for config in configs {
        let mut sim = Simulator::new(config).unwrap();
        let id = sim.add_observer(Box::new(Rerequester::new())).unwrap();
        sim.start_with(&mut StepLimitController::new(20)).unwrap();
        assert_eq!(sim.state().step_count(), 20);
        let deliveries = sim.observer_as::<Rerequester>(id).unwrap().deliveries;
        // At most one delivery before and one after each leap or step.
        assert!(
            (1..=40).contains(&deliveries),
            "{} delivered {deliveries} thetas in 20 iterations",
            sim.strategy().name()
        );
    }
}

// ── External firings ─────────────────────────────────────────────────

#[test]
fn external_firing_requires_a_running_simulator() {
    let mut sim = exact_sim(fixtures::decay(5, 1.0), 12);
    assert_eq!(
        sim.fire_reaction(ReactionId(0), 0.0, FireType::ExactEnhanced, 1),
        Err(SimulationError::NotRunning)
    );
    sim.pre_run().unwrap();
    sim.fire_reaction(ReactionId(0), 0.0, FireType::ExactEnhanced, 1)
        .unwrap();
    sim.post_run().unwrap();
    assert_eq!(
        sim.fire_reaction(ReactionId(0), 0.0, FireType::ExactEnhanced, 1),
        Err(SimulationError::NotRunning)
    );
    assert_eq!(sim.state().amount(SpeciesId(0)), 4);
}

#[test]
fn infeasible_external_firing_is_rejected_unannounced() {
    let mut sim = exact_sim(fixtures::decay(2, 1.0), 13);
    let id = sim.add_observer(Box::new(RecordingObserver::new("rec"))).unwrap();
    sim.pre_run().unwrap();

    assert_eq!(
        sim.fire_reaction(ReactionId(0), 1.0, FireType::ExactEnhanced, 3),
        Err(SimulationError::InfeasibleFiring {
            reaction: ReactionId(0),
            times: 3,
            species: SpeciesId(0),
        })
    );
    assert_eq!(sim.state().amount(SpeciesId(0)), 2);
    assert!(sim.observer_as::<RecordingObserver>(id).unwrap().firings().is_empty());

    assert_eq!(
        sim.fire_reaction(ReactionId(7), 1.0, FireType::ExactEnhanced, 1),
        Err(SimulationError::ReactionOutOfRange {
            reaction: ReactionId(7)
        })
    );

    sim.fire_reaction(ReactionId(0), 1.0, FireType::ExactEnhanced, 2)
        .unwrap();
    assert_eq!(sim.state().amount(SpeciesId(0)), 0);
    assert_eq!(sim.state().propensity_sum(), 0.0);
    assert_eq!(
        sim.observer_as::<RecordingObserver>(id).unwrap().firings(),
        vec![(ReactionId(0), 1.0, FireType::ExactEnhanced, 2)]
    );
}

// ── Controllers ──────────────────────────────────────────────────────

#[test]
fn controller_composition_truth_table() {
    let sim = exact_sim(fixtures::decay(1, 1.0), 1);
    let state = sim.state();
    for a in [false, true] {
        for b in [false, true] {
            let mut and = MockController::constant(a).and(MockController::constant(b));
            let mut or = MockController::constant(a).or(MockController::constant(b));
            let mut not = MockController::constant(a).not();
            assert_eq!(and.go_on(state), a && b, "and({a}, {b})");
            assert_eq!(or.go_on(state), a || b, "or({a}, {b})");
            assert_eq!(not.go_on(state), !a, "not({a})");
        }
    }
}

#[test]
fn scripted_controller_drives_the_loop() {
    let mut sim = exact_sim(fixtures::decay(1000, 1.0), 8);
    let mut ctl = MockController::new([true, true, true], false);
    sim.start_with(&mut ctl).unwrap();
    assert_eq!(ctl.calls(), 4);
    assert_eq!(sim.state().step_count(), 3);
    assert_eq!(sim.state().amount(SpeciesId(0)), 997);
}

#[test]
fn closure_controller_stops_on_amount() {
    let mut sim = exact_sim(fixtures::decay(500, 1.0), 9);
    let mut ctl = |s: &fern_engine::SimulationState| s.amount(SpeciesId(0)) > 250;
    sim.start_with(&mut ctl).unwrap();
    assert_eq!(sim.state().amount(SpeciesId(0)), 250);
}

// ── Reproducibility ──────────────────────────────────────────────────

#[test]
fn same_seed_same_trajectory() {
    for seed in [0, 17, 12345] {
        let a = recorded_firings(&mut exact_sim(fixtures::dimerization(200, 0.01, 0.5), seed), 5.0);
        let b = recorded_firings(&mut exact_sim(fixtures::dimerization(200, 0.01, 0.5), seed), 5.0);
        assert!(!a.is_empty());
        assert_eq!(a, b);

        let a = recorded_firings(&mut tau_sim(fixtures::reversible(3000, 100, 1.0, 2.0), seed), 2.0);
        let b = recorded_firings(&mut tau_sim(fixtures::reversible(3000, 100, 1.0, 2.0), seed), 2.0);
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }
}

#[test]
fn different_seeds_diverge() {
    let a = recorded_firings(&mut exact_sim(fixtures::decay(100, 1.0), 1), 1.0);
    let b = recorded_firings(&mut exact_sim(fixtures::decay(100, 1.0), 2), 1.0);
    assert_ne!(a, b);
}

#[test]
fn consecutive_runs_are_independent_until_reseeded() {
    let mut sim = exact_sim(fixtures::birth_death(20, 10.0, 0.5), 42);
    let id = sim.add_observer(Box::new(RecordingObserver::new("rec"))).unwrap();
    let run = |sim: &mut Simulator| {
        sim.start(3.0).unwrap();
        sim.observer_as::<RecordingObserver>(id).unwrap().firings()
    };
    let first = run(&mut sim);
    let second = run(&mut sim);
    assert_ne!(first, second);
    sim.reseed(42);
    assert_eq!(run(&mut sim), first);
}

// ── Strategy access ──────────────────────────────────────────────────

#[test]
fn strategy_is_reachable_by_downcast() {
    let mut sim = tau_sim(fixtures::isomerization(5000, 0.1), 10);
    sim.start(2.0).unwrap();
    assert_eq!(sim.strategy().name(), "tau-leap");
    let stepper = sim.strategy().downcast_ref::<TauLeapStepper>().unwrap();
    assert!(stepper.stats().leaps > 0);
    assert!(sim.strategy().downcast_ref::<ExactStepper>().is_none());
}
