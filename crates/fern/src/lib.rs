//! Fern: stochastic simulation of chemical reaction networks.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all fern sub-crates. For most users, adding `fern` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use fern::prelude::*;
//!
//! // Reversible isomerization A <-> B.
//! let net = ReactionNetwork::builder("isomerization")
//!     .species("A", 2000)
//!     .species("B", 0)
//!     .reaction("forward", &["A"], &["B"], 1.0)
//!     .reaction("backward", &["B"], &["A"], 0.5)
//!     .build()
//!     .unwrap();
//! let a = net.species_by_name("A").unwrap();
//! let b = net.species_by_name("B").unwrap();
//!
//! let config = SimulatorConfig::new(Arc::new(net))
//!     .with_strategy(TauLeapStepper::new(TauLeapConfig::default()).unwrap())
//!     .with_seed(42);
//! let mut sim = Simulator::new(config).unwrap();
//! let grid = AmountIntervalObserver::builder().interval(1.0).build().unwrap();
//! let grid = sim.add_observer(Box::new(grid)).unwrap();
//!
//! sim.start(10.0).unwrap();
//!
//! let samples = sim.observer_as::<AmountIntervalObserver>(grid).unwrap().samples();
//! assert_eq!(samples.len(), 11);
//! assert_eq!(sim.state().amount(a) + sim.state().amount(b), 2000);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `fern-core` | IDs, fire types, errors, networks, propensities, amounts |
//! | [`engine`] | `fern-engine` | Simulator, controllers, observers protocol, stepping strategies |
//! | [`observers`] | `fern-observers` | Reference observers (sampling, counting, interventions) |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`fern-core`).
///
/// Contains the [`types::Network`] and [`types::PropensityCalculator`]
/// seams, the in-memory [`types::ReactionNetwork`], and the
/// [`types::AmountManager`] population store.
pub use fern_core as types;

/// Simulation engine (`fern-engine`).
///
/// [`engine::Simulator`] drives the run loop; [`engine::ExactStepper`]
/// and [`engine::TauLeapStepper`] are the stepping strategies.
pub use fern_engine as engine;

/// Reference observers (`fern-observers`).
pub use fern_observers as observers;

/// Common imports for typical fern usage.
///
/// ```rust
/// use fern::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use fern_core::{
        FireType, Network, ObserverId, PropensityCalculator, ReactionId, ReactionNetwork,
        SimulatorId, SpeciesId,
    };

    // Errors
    pub use fern_core::{NetworkError, SimulationError};
    pub use fern_engine::ConfigError;

    // Engine
    pub use fern_engine::{
        ExactStepper, Observer, ObserverContext, SimulationController, SimulationState,
        Simulator, SimulatorConfig, StepLimitController, SteppingStrategy, TauBound,
        TauLeapConfig, TauLeapStepper, TimeController, TriggerContext, Triggerable,
    };

    // Observers
    pub use fern_observers::{
        AmountIntervalObserver, FireTypeObserver, FiringLogObserver, InterventionObserver,
    };
}
