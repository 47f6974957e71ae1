//! Stochastic simulation engine for fern reaction networks.
//!
//! Provides the [`Simulator`] that owns the clock, populations,
//! propensities, observers and theta schedule of one network, and the
//! stepping strategies it delegates each loop iteration to: exact SSA
//! ([`ExactStepper`]) and adaptive tau-leaping ([`TauLeapStepper`]).
//!
//! ```
//! use std::sync::Arc;
//! use fern_core::ReactionNetwork;
//! use fern_engine::{Simulator, SimulatorConfig, TauLeapConfig, TauLeapStepper};
//!
//! let net = ReactionNetwork::builder("decay")
//!     .species("A", 1000)
//!     .reaction("decay", &["A"], &[], 0.1)
//!     .build()
//!     .unwrap();
//! let config = SimulatorConfig::new(Arc::new(net))
//!     .with_strategy(TauLeapStepper::new(TauLeapConfig::default()).unwrap())
//!     .with_seed(7);
//! let mut sim = Simulator::new(config).unwrap();
//! sim.start(5.0).unwrap();
//! assert!(sim.state().time() >= 5.0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod engine;
pub mod observer;
pub mod simulator;
pub mod state;
pub mod stochastic;
pub mod strategy;
pub mod theta;

pub use config::{ConfigError, SimulatorConfig};
pub use controller::{
    AndController, NotController, OrController, SimulationController, StepLimitController,
    TimeController,
};
pub use engine::SimulationCore;
pub use observer::{Observer, ObserverContext, TriggerContext, Triggerable};
pub use simulator::{RunPhase, Simulator};
pub use state::SimulationState;
pub use stochastic::StochasticSource;
pub use strategy::{
    classify_critical, max_firings, AbsoluteBound, ExactStepper, LeapStats, RelativeBound,
    SpeciesPopulationBound, SteppingStrategy, TauBound, TauInput, TauLeapConfig, TauLeapStepper,
    TauSelector,
};
pub use theta::ThetaQueue;
