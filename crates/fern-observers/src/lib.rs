//! Reference observers for the fern stochastic simulator.
//!
//! - [`AmountIntervalObserver`]: samples amounts on a regular time grid
//!   through theta notifications
//! - [`FireTypeObserver`]: counts firings per [`FireType`](fern_core::FireType)
//!   and the most critical firings seen in one step
//! - [`FiringLogObserver`]: records every firing
//! - [`InterventionObserver`]: triggerable; sets or shifts amounts at
//!   scheduled times

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod amount_interval;
pub mod fire_type;
pub mod firing_log;
pub mod intervention;

pub use amount_interval::{AmountIntervalObserver, AmountIntervalObserverBuilder, Sample};
pub use fire_type::FireTypeObserver;
pub use firing_log::{FiringLogObserver, FiringRecord};
pub use intervention::{Intervention, InterventionKind, InterventionObserver, InterventionObserverBuilder};
