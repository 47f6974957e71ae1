//! Integration test: statistical agreement with known solutions.
//!
//! Linear decay `S1 -> 0` with rate `k` from `N0` molecules leaves
//! `S1(t) ~ Binomial(N0, exp(-k t))`. The exact stepper must reproduce the
//! mean; the tau-leaper must reproduce the distribution up to its
//! first-order bias of roughly `epsilon * k * t / 2` in the mean.

use fern_core::ReactionNetwork;
use fern_engine::{ExactStepper, Simulator, SteppingStrategy, TauLeapConfig, TauLeapStepper};
use fern_observers::AmountIntervalObserver;
use fern_test_utils::fixtures;

/// Amount of species 0 at `end` over `runs` independent runs of one
/// simulator.
fn final_amounts(
    net: ReactionNetwork,
    strategy: impl SteppingStrategy + 'static,
    seed: u64,
    end: f64,
    runs: usize,
) -> Vec<f64> {
    let mut sim = Simulator::new(fixtures::config(net, strategy, seed)).unwrap();
    let grid = AmountIntervalObserver::builder()
        .interval(end)
        .build()
        .unwrap();
    let id = sim.add_observer(Box::new(grid)).unwrap();
    (0..runs)
        .map(|_| {
            sim.start(end).unwrap();
            let obs = sim.observer_as::<AmountIntervalObserver>(id).unwrap();
            obs.sample_at(end).unwrap().values[0]
        })
        .collect()
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Total variation distance between two samples binned by `width`.
fn total_variation(a: &[f64], b: &[f64], width: f64) -> f64 {
    let bin = |x: f64| (x / width).floor() as usize;
    let bins = a.iter().chain(b).map(|&x| bin(x)).max().unwrap_or(0) + 1;
    let mut ha = vec![0.0; bins];
    let mut hb = vec![0.0; bins];
    for &x in a {
        ha[bin(x)] += 1.0 / a.len() as f64;
    }
    for &x in b {
        hb[bin(x)] += 1.0 / b.len() as f64;
    }
    0.5 * ha.iter().zip(&hb).map(|(p, q)| (p - q).abs()).sum::<f64>()
}

fn tau_leaper() -> TauLeapStepper {
    TauLeapStepper::new(TauLeapConfig::default()).unwrap()
}

#[test]
fn exact_decay_mean_matches_solution() {
    let (n0, k, end) = (10_000, 0.02, 10.0);
    let xs = final_amounts(fixtures::decay(n0, k), ExactStepper::enhanced(), 1, end, 1000);
    let expected = n0 as f64 * (-k * end).exp();
    let rel = (mean(&xs) - expected).abs() / expected;
    assert!(rel < 0.05, "mean {} vs {expected}", mean(&xs));
    // The standard error of the mean is ~1.3 molecules here.
    assert!((mean(&xs) - expected).abs() < 10.0);
}

#[test]
fn simple_and_enhanced_exact_agree() {
    let (n0, k, end) = (500, 0.5, 1.0);
    let enhanced = final_amounts(fixtures::decay(n0, k), ExactStepper::enhanced(), 2, end, 2000);
    let simple = final_amounts(fixtures::decay(n0, k), ExactStepper::simple(), 3, end, 2000);
    let expected = n0 as f64 * (-k * end).exp();
    assert!((mean(&enhanced) - expected).abs() < 1.5);
    assert!((mean(&simple) - expected).abs() < 1.5);
}

#[test]
fn tau_leap_matches_exact_distribution_over_short_horizon() {
    // Two leaps of 0.3; expected binned distance ~0.03.
    let (n0, k, end, runs) = (400, 0.1, 0.6, 10_000);
    let exact = final_amounts(fixtures::isomerization(n0, k), ExactStepper::enhanced(), 4, end, runs);
    let leap = final_amounts(fixtures::isomerization(n0, k), tau_leaper(), 5, end, runs);
    let tv = total_variation(&exact, &leap, 5.0);
    assert!(tv < 0.05, "total variation {tv}");
}

#[test]
fn tau_leap_tracks_exact_distribution_over_long_horizon() {
    // Seventeen leaps; the accumulated bias moves the mean by ~0.3 sd,
    // which alone accounts for a binned distance of ~0.11.
    let (n0, k, end, runs) = (1000, 0.1, 5.0, 10_000);
    let exact = final_amounts(fixtures::isomerization(n0, k), ExactStepper::enhanced(), 6, end, runs);
    let leap = final_amounts(fixtures::isomerization(n0, k), tau_leaper(), 7, end, runs);
    let expected = n0 as f64 * (-k * end).exp();
    assert!((mean(&exact) - expected).abs() / expected < 0.01);
    assert!((mean(&leap) - expected).abs() / expected < 0.02);
    let tv = total_variation(&exact, &leap, 10.0);
    assert!(tv < 0.2, "total variation {tv}");
}
