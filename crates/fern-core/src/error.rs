//! Error types for the fern simulation workspace.
//!
//! Split by subsystem: network construction ([`NetworkError`]) and the
//! running simulation ([`SimulationError`]). Numerical retries inside a
//! tau leap never surface here; only usage errors, modeling errors and
//! internal-consistency violations do.

use std::error::Error;
use std::fmt;

use crate::id::{ReactionId, SimulatorId, SpeciesId};

/// Errors detected while building a reaction network.
#[derive(Clone, Debug, PartialEq)]
pub enum NetworkError {
    /// Two species were registered with the same name.
    DuplicateSpecies {
        /// The repeated name.
        name: String,
    },
    /// A reaction referenced a species name that was never registered.
    UnknownSpecies {
        /// The unresolved name.
        name: String,
    },
    /// A species was given a negative initial amount.
    NegativeInitialAmount {
        /// Species name.
        name: String,
        /// The rejected amount.
        amount: i64,
    },
    /// A rate constant was negative, NaN or infinite.
    InvalidRateConstant {
        /// Reaction name.
        reaction: String,
        /// The rejected value.
        value: f64,
    },
    /// The network has no species.
    NoSpecies,
    /// Species or reaction count exceeds `u32::MAX`.
    TooLarge {
        /// The count that overflowed.
        count: usize,
    },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSpecies { name } => write!(f, "species '{name}' registered twice"),
            Self::UnknownSpecies { name } => write!(f, "unknown species '{name}'"),
            Self::NegativeInitialAmount { name, amount } => {
                write!(f, "species '{name}' has negative initial amount {amount}")
            }
            Self::InvalidRateConstant { reaction, value } => {
                write!(
                    f,
                    "reaction '{reaction}' rate constant must be finite and >= 0, got {value}"
                )
            }
            Self::NoSpecies => write!(f, "network has no species"),
            Self::TooLarge { count } => write!(f, "count {count} exceeds u32::MAX"),
        }
    }
}

impl Error for NetworkError {}

/// Errors surfaced by a running simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum SimulationError {
    /// An observer bound to one simulator was added to another.
    ObserverBoundElsewhere {
        /// The simulator the observer was added to.
        simulator: SimulatorId,
        /// The simulator the observer is bound to.
        bound_to: SimulatorId,
    },
    /// The propensity calculator returned a negative or NaN value.
    ///
    /// This is a modeling error; values are never clamped.
    InvalidPropensity {
        /// The offending reaction.
        reaction: ReactionId,
        /// The value returned by the calculator.
        value: f64,
    },
    /// Selecting a critical reaction proportional to propensity found
    /// none, although the critical propensity sum was positive.
    ///
    /// Indicates that the propensity bookkeeping is out of sync.
    CriticalSelectionFailed {
        /// Sum of critical propensities used for the draw.
        critical_sum: f64,
    },
    /// A species index was outside the network.
    SpeciesOutOfRange {
        /// The offending species.
        species: SpeciesId,
    },
    /// A reaction index was outside the network.
    ReactionOutOfRange {
        /// The offending reaction.
        reaction: ReactionId,
    },
    /// An externally requested firing would drive an amount negative.
    ///
    /// Nothing was applied and no observer was notified.
    InfeasibleFiring {
        /// The reaction asked to fire.
        reaction: ReactionId,
        /// Requested number of firings.
        times: u64,
        /// First species that would go negative.
        species: SpeciesId,
    },
    /// The operation needs a running simulator: `run()` or a firing was
    /// requested before `pre_run()` or after `post_run()`.
    NotRunning,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObserverBoundElsewhere {
                simulator,
                bound_to,
            } => write!(
                f,
                "observer is bound to {bound_to} and cannot be added to {simulator}"
            ),
            Self::InvalidPropensity { reaction, value } => {
                write!(f, "reaction {reaction} has invalid propensity {value}")
            }
            Self::CriticalSelectionFailed { critical_sum } => write!(
                f,
                "no critical reaction selected although critical propensity sum is {critical_sum}"
            ),
            Self::SpeciesOutOfRange { species } => {
                write!(f, "species {species} is out of range")
            }
            Self::ReactionOutOfRange { reaction } => {
                write!(f, "reaction {reaction} is out of range")
            }
            Self::InfeasibleFiring {
                reaction,
                times,
                species,
            } => write!(
                f,
                "firing reaction {reaction} {times} times would make species {species} negative"
            ),
            Self::NotRunning => write!(f, "simulator is not running; call pre_run() first"),
        }
    }
}

impl Error for SimulationError {}
