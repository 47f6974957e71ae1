//! Stepping strategies: the per-iteration `advance` operation of the
//! simulation loop.
//!
//! - [`ExactStepper`]: one firing per call (SSA direct method)
//! - [`TauLeapStepper`]: multi-firing leaps with critical-reaction
//!   isolation and rollback, bailing out to exact steps when leaps
//!   become too short
//! - [`TauSelector`]: the pluggable leap-size bound of the tau-leaper

pub mod exact;
pub mod tau_bound;
pub mod tau_leap;

use std::any::Any;

use fern_core::SimulationError;

use crate::controller::SimulationController;
use crate::engine::SimulationCore;

pub use exact::ExactStepper;
pub use tau_bound::{
    AbsoluteBound, RelativeBound, SpeciesPopulationBound, TauBound, TauInput, TauSelector,
};
pub use tau_leap::{classify_critical, max_firings, LeapStats, TauLeapConfig, TauLeapStepper};

/// Advances a simulation by one loop iteration.
///
/// # Contract
///
/// - Every firing goes through [`SimulationCore::fire_reaction`] or, for
///   committed speculative updates, [`SimulationCore::announce_firing`],
///   tagged with the [`FireType`](fern_core::FireType) of the path that
///   produced it.
/// - A call that fires more than once checks `controller.go_on()`
///   between firings; a single tau leap counts as one atomic firing.
/// - Amounts visible to observers are never negative.
/// - When nothing can fire any more and no theta is pending, the clock
///   is set to `+inf` via [`SimulationCore::set_absorbed`].
///
/// # Examples
///
/// ```
/// use fern_core::SimulationError;
/// use fern_engine::{SimulationController, SimulationCore, SteppingStrategy};
///
/// /// Never fires; jumps straight to the absorbing state.
/// struct Frozen;
///
/// impl SteppingStrategy for Frozen {
///     fn name(&self) -> &str { "frozen" }
///
///     fn advance(
///         &mut self,
///         core: &mut SimulationCore,
///         _controller: &mut dyn SimulationController,
///     ) -> Result<(), SimulationError> {
///         core.set_absorbed();
///         Ok(())
///     }
/// }
///
/// assert_eq!(Frozen.name(), "frozen");
/// ```
pub trait SteppingStrategy: Any + Send {
    /// Human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Prepare for a run. Called by `pre_run` after propensities are
    /// computed and before observers are started.
    fn initialize(&mut self, _core: &mut SimulationCore) -> Result<(), SimulationError> {
        Ok(())
    }

    /// Perform one iteration's worth of stepping.
    fn advance(
        &mut self,
        core: &mut SimulationCore,
        controller: &mut dyn SimulationController,
    ) -> Result<(), SimulationError>;
}

impl dyn SteppingStrategy {
    /// Downcast to a concrete strategy type.
    pub fn downcast_ref<T: SteppingStrategy>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}
