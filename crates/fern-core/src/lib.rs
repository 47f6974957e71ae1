//! Core types and traits for the fern stochastic simulator.
//!
//! This is the leaf crate of the workspace. It defines typed IDs, the
//! [`FireType`] provenance tag, error types, the [`Network`] and
//! [`PropensityCalculator`] seams, an in-memory mass-action
//! [`ReactionNetwork`], and the [`AmountManager`] population store.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod amount;
pub mod error;
pub mod fire;
pub mod id;
pub mod network;
pub mod propensity;

pub use amount::AmountManager;
pub use error::{NetworkError, SimulationError};
pub use fire::FireType;
pub use id::{ObserverId, ReactionId, SimulatorId, SpeciesId};
pub use network::{
    group_multiplicity, net_change, Network, ReactionNetwork, ReactionNetworkBuilder,
};
pub use propensity::{falling_factorial, MassActionCalculator, PropensityCalculator};
