//! Reference reaction networks.
//!
//! - [`decay`]: `S1 -> 0`
//! - [`isomerization`]: `S1 -> S2`
//! - [`reversible`]: `A <-> B`
//! - [`dimerization`]: `2 A <-> A2`
//! - [`birth_death`]: `0 -> X -> 0`
//! - [`FixedPropensityNetwork`]: wraps a network and overrides every
//!   propensity with a constant, for error-path tests.

use std::sync::Arc;

use fern_core::{
    Network, PropensityCalculator, ReactionId, ReactionNetwork, SpeciesId,
};
use fern_engine::{SimulatorConfig, SteppingStrategy};

pub fn decay(n0: i64, k: f64) -> ReactionNetwork {
    ReactionNetwork::builder("decay")
        .species("S1", n0)
        .reaction("decay", &["S1"], &[], k)
        .build()
        .expect("decay fixture is valid")
}

pub fn isomerization(n0: i64, k: f64) -> ReactionNetwork {
    ReactionNetwork::builder("isomerization")
        .species("S1", n0)
        .species("S2", 0)
        .reaction("isomerize", &["S1"], &["S2"], k)
        .build()
        .expect("isomerization fixture is valid")
}

pub fn reversible(a: i64, b: i64, kf: f64, kr: f64) -> ReactionNetwork {
    ReactionNetwork::builder("reversible")
        .species("A", a)
        .species("B", b)
        .reaction("forward", &["A"], &["B"], kf)
        .reaction("backward", &["B"], &["A"], kr)
        .build()
        .expect("reversible fixture is valid")
}

pub fn dimerization(a: i64, kf: f64, kr: f64) -> ReactionNetwork {
    ReactionNetwork::builder("dimerization")
        .species("A", a)
        .species("A2", 0)
        .reaction("bind", &["A", "A"], &["A2"], kf)
        .reaction("unbind", &["A2"], &["A", "A"], kr)
        .build()
        .expect("dimerization fixture is valid")
}

pub fn birth_death(x0: i64, birth: f64, death: f64) -> ReactionNetwork {
    ReactionNetwork::builder("birth-death")
        .species("X", x0)
        .reaction("birth", &[], &["X"], birth)
        .reaction("death", &["X"], &[], death)
        .build()
        .expect("birth-death fixture is valid")
}

/// Simulator configuration for `net` with the given strategy and seed.
pub fn config(
    net: ReactionNetwork,
    strategy: impl SteppingStrategy + 'static,
    seed: u64,
) -> SimulatorConfig {
    SimulatorConfig::new(Arc::new(net))
        .with_strategy(strategy)
        .with_seed(seed)
}

/// Network whose calculator returns `value` for every reaction.
pub struct FixedPropensityNetwork {
    inner: ReactionNetwork,
    calc: Fixed,
}

struct Fixed(f64);

impl PropensityCalculator for Fixed {
    fn calculate(&self, _reaction: ReactionId, _amounts: &[i64], _time: f64) -> f64 {
        self.0
    }
}

impl FixedPropensityNetwork {
    pub fn new(inner: ReactionNetwork, value: f64) -> Self {
        Self {
            inner,
            calc: Fixed(value),
        }
    }
}

impl Network for FixedPropensityNetwork {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn species_count(&self) -> usize {
        self.inner.species_count()
    }

    fn reaction_count(&self) -> usize {
        self.inner.reaction_count()
    }

    fn reactants(&self, reaction: ReactionId) -> &[SpeciesId] {
        self.inner.reactants(reaction)
    }

    fn products(&self, reaction: ReactionId) -> &[SpeciesId] {
        self.inner.products(reaction)
    }

    fn species_name(&self, species: SpeciesId) -> &str {
        self.inner.species_name(species)
    }

    fn species_by_name(&self, name: &str) -> Option<SpeciesId> {
        self.inner.species_by_name(name)
    }

    fn initial_amount(&self, species: SpeciesId) -> i64 {
        self.inner.initial_amount(species)
    }

    fn propensity_calculator(&self) -> &dyn PropensityCalculator {
        &self.calc
    }
}
