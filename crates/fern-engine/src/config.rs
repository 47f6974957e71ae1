//! Simulator configuration, validation, and error types.
//!
//! [`SimulatorConfig`] is the builder-input for constructing a
//! [`Simulator`](crate::Simulator). [`validate()`](SimulatorConfig::validate)
//! checks the network for structural problems an external loader could
//! introduce; the in-memory [`ReactionNetwork`](fern_core::ReactionNetwork)
//! builder already rejects them at build time.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use fern_core::{Network, ReactionId, SpeciesId};

use crate::strategy::{ExactStepper, SteppingStrategy};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating simulator or strategy configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The network has no species.
    EmptyNetwork,
    /// A reaction references a species index outside the network.
    InvalidStoichiometry {
        /// The offending reaction.
        reaction: ReactionId,
        /// The out-of-range species.
        species: SpeciesId,
    },
    /// The network reports a negative initial amount.
    NegativeInitialAmount {
        /// The offending species.
        species: SpeciesId,
        /// The reported amount.
        amount: i64,
    },
    /// Tau-leap `epsilon` is not in `(0, 1)`.
    InvalidEpsilon {
        /// The invalid value.
        value: f64,
    },
    /// `use_simple_factor` is negative, NaN or infinite.
    InvalidSimpleFactor {
        /// The invalid value.
        value: f64,
    },
    /// `num_simple_calls` is zero.
    ZeroSimpleCalls,
    /// `langevin_threshold` is NaN or not positive.
    InvalidLangevinThreshold {
        /// The invalid value.
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyNetwork => write!(f, "network has no species"),
            Self::InvalidStoichiometry { reaction, species } => write!(
                f,
                "reaction {reaction} references species {species} outside the network"
            ),
            Self::NegativeInitialAmount { species, amount } => {
                write!(f, "species {species} has negative initial amount {amount}")
            }
            Self::InvalidEpsilon { value } => {
                write!(f, "epsilon must be in (0, 1), got {value}")
            }
            Self::InvalidSimpleFactor { value } => {
                write!(f, "use_simple_factor must be finite and >= 0, got {value}")
            }
            Self::ZeroSimpleCalls => write!(f, "num_simple_calls must be at least 1"),
            Self::InvalidLangevinThreshold { value } => {
                write!(f, "langevin_threshold must be positive, got {value}")
            }
        }
    }
}

impl Error for ConfigError {}

// ── SimulatorConfig ────────────────────────────────────────────────

/// Everything needed to construct a [`Simulator`](crate::Simulator).
///
/// Defaults: enhanced exact stepping, seed 0, no theta interpolation.
pub struct SimulatorConfig {
    /// Network to simulate. Shared, never mutated.
    pub network: Arc<dyn Network>,
    /// Stepping strategy driving each loop iteration.
    pub strategy: Box<dyn SteppingStrategy>,
    /// Seed of the simulator's random stream.
    pub seed: u64,
    /// Deliver theta notifications with amounts linearly interpolated
    /// between the states bracketing the theta, instead of jumping the
    /// clock to the theta.
    pub interpolate_theta: bool,
}

impl SimulatorConfig {
    /// Configuration with the default strategy and seed.
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self {
            network,
            strategy: Box::new(ExactStepper::enhanced()),
            seed: 0,
            interpolate_theta: false,
        }
    }

    /// Replace the stepping strategy.
    pub fn with_strategy(mut self, strategy: impl SteppingStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    /// Replace the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable theta interpolation.
    pub fn with_theta_interpolation(mut self, enabled: bool) -> Self {
        self.interpolate_theta = enabled;
        self
    }

    /// Check structural invariants of the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let net = self.network.as_ref();
        let species = net.species_count();
        if species == 0 {
            return Err(ConfigError::EmptyNetwork);
        }
        for i in 0..species {
            let id = SpeciesId(i as u32);
            let amount = net.initial_amount(id);
            if amount < 0 {
                return Err(ConfigError::NegativeInitialAmount {
                    species: id,
                    amount,
                });
            }
        }
        for j in 0..net.reaction_count() {
            let r = ReactionId(j as u32);
            let lists = [
                net.reactants(r),
                net.products(r),
                net.propensity_dependencies(r),
            ];
            if let Some(&bad) = lists
                .iter()
                .flat_map(|l| l.iter())
                .find(|s| s.index() >= species)
            {
                return Err(ConfigError::InvalidStoichiometry {
                    reaction: r,
                    species: bad,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SimulatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatorConfig")
            .field("network", &self.network.name())
            .field("strategy", &self.strategy.name())
            .field("seed", &self.seed)
            .field("interpolate_theta", &self.interpolate_theta)
            .finish()
    }
}
