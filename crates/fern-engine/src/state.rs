//! Read-only view of a running simulation.

use std::fmt;
use std::sync::Arc;

use fern_core::{AmountManager, Network, ReactionId, SpeciesId};

/// Clock, populations and propensities of one simulator.
///
/// Observers and controllers see the simulation exclusively through
/// `&SimulationState`; only the engine and stepping strategies mutate it.
pub struct SimulationState {
    pub(crate) net: Arc<dyn Network>,
    pub(crate) amounts: AmountManager,
    pub(crate) propensities: Vec<f64>,
    pub(crate) propensity_sum: f64,
    pub(crate) time: f64,
    pub(crate) step_count: u64,
}

impl SimulationState {
    pub(crate) fn new(net: Arc<dyn Network>) -> Self {
        let amounts = AmountManager::new(net.as_ref());
        let propensities = vec![0.0; net.reaction_count()];
        Self {
            net,
            amounts,
            propensities,
            propensity_sum: 0.0,
            time: 0.0,
            step_count: 0,
        }
    }

    /// Current simulation time. `+inf` once nothing can fire any more.
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Current amount of `species`.
    #[inline]
    pub fn amount(&self, species: SpeciesId) -> i64 {
        self.amounts.get(species)
    }

    /// All current amounts, indexed by [`SpeciesId::index`].
    #[inline]
    pub fn amounts(&self) -> &[i64] {
        self.amounts.as_slice()
    }

    /// The population store itself.
    pub fn amount_manager(&self) -> &AmountManager {
        &self.amounts
    }

    /// Cached propensity of `reaction`.
    #[inline]
    pub fn propensity(&self, reaction: ReactionId) -> f64 {
        self.propensities[reaction.index()]
    }

    /// All cached propensities, indexed by [`ReactionId::index`].
    pub fn propensities(&self) -> &[f64] {
        &self.propensities
    }

    /// Cached sum of all propensities.
    #[inline]
    pub fn propensity_sum(&self) -> f64 {
        self.propensity_sum
    }

    /// The network being simulated.
    pub fn net(&self) -> &dyn Network {
        self.net.as_ref()
    }

    /// Loop iterations completed in the current run.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }
}

impl fmt::Debug for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationState")
            .field("net", &self.net.name())
            .field("time", &self.time)
            .field("amounts", &self.amounts.as_slice())
            .field("propensity_sum", &self.propensity_sum)
            .field("step_count", &self.step_count)
            .finish()
    }
}
