//! Benchmark profiles for the fern stochastic simulator.
//!
//! Provides pre-built [`SimulatorConfig`] profiles for benchmarking:
//!
//! - [`decay_profile`]: `S -> 0`, one reaction, the exact-stepper baseline
//! - [`dimerization_profile`]: `2 A <-> A2`, second-order kinetics near
//!   equilibrium
//! - [`chain_profile`]: a long isomerization chain `S0 -> S1 -> ... -> Sn`,
//!   where the dependency graph keeps exact steps cheap
//! - [`Stepping`]: which strategy a profile runs with

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use fern_core::ReactionNetwork;
use fern_engine::{ExactStepper, SimulatorConfig, TauLeapConfig, TauLeapStepper};

/// Stepping strategy of a benchmark profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stepping {
    /// [`ExactStepper::simple`].
    ExactSimple,
    /// [`ExactStepper::enhanced`].
    ExactEnhanced,
    /// [`TauLeapStepper`] with default parameters.
    TauLeap,
}

impl Stepping {
    /// All strategies, for parameterized benchmark groups.
    pub const ALL: [Stepping; 3] = [
        Stepping::ExactSimple,
        Stepping::ExactEnhanced,
        Stepping::TauLeap,
    ];

    /// Short label used as the benchmark parameter.
    pub fn label(self) -> &'static str {
        match self {
            Stepping::ExactSimple => "exact-simple",
            Stepping::ExactEnhanced => "exact-enhanced",
            Stepping::TauLeap => "tau-leap",
        }
    }
}

fn configure(net: ReactionNetwork, stepping: Stepping, seed: u64) -> SimulatorConfig {
    let config = SimulatorConfig::new(Arc::new(net)).with_seed(seed);
    match stepping {
        Stepping::ExactSimple => config.with_strategy(ExactStepper::simple()),
        Stepping::ExactEnhanced => config.with_strategy(ExactStepper::enhanced()),
        Stepping::TauLeap => config.with_strategy(
            TauLeapStepper::new(TauLeapConfig::default()).expect("default tau-leap config is valid"),
        ),
    }
}

/// Decay of `n0` molecules at rate 0.1.
pub fn decay_profile(n0: i64, stepping: Stepping, seed: u64) -> SimulatorConfig {
    let net = ReactionNetwork::builder("decay")
        .species("S", n0)
        .reaction("decay", &["S"], &[], 0.1)
        .build()
        .expect("decay profile is valid");
    configure(net, stepping, seed)
}

/// Dimerization starting from `a` monomers.
///
/// Rates are scaled so the equilibrium holds roughly a third of the mass
/// as monomers for `a` in the thousands.
pub fn dimerization_profile(a: i64, stepping: Stepping, seed: u64) -> SimulatorConfig {
    let kf = 2.0 / a.max(1) as f64;
    let net = ReactionNetwork::builder("dimerization")
        .species("A", a)
        .species("A2", 0)
        .reaction("bind", &["A", "A"], &["A2"], kf)
        .reaction("unbind", &["A2"], &["A", "A"], 0.5)
        .build()
        .expect("dimerization profile is valid");
    configure(net, stepping, seed)
}

/// Isomerization chain of `len` species with `n0` molecules in the first.
pub fn chain_profile(len: usize, n0: i64, stepping: Stepping, seed: u64) -> SimulatorConfig {
    let names: Vec<String> = (0..len.max(2)).map(|i| format!("S{i}")).collect();
    let mut builder = ReactionNetwork::builder("chain");
    for (i, name) in names.iter().enumerate() {
        builder = builder.species(name.as_str(), if i == 0 { n0 } else { 0 });
    }
    for pair in names.windows(2) {
        builder = builder.reaction(
            format!("{}->{}", pair[0], pair[1]),
            &[pair[0].as_str()],
            &[pair[1].as_str()],
            1.0,
        );
    }
    let net = builder.build().expect("chain profile is valid");
    configure(net, stepping, seed)
}
