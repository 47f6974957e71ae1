//! Provenance tags attached to every reaction firing.

use std::fmt;

/// Names the algorithmic path that produced a reaction firing.
///
/// Observers receive one tag per firing through
/// `Observer::activate_reaction`. The tag is purely diagnostic; it never
/// changes how a firing is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FireType {
    /// Exact SSA step with a full propensity recompute.
    ExactSimple,
    /// Exact SSA step with dependency-graph propensity updates.
    ExactEnhanced,
    /// Firing produced by a hybrid stochastic/deterministic stepper.
    Hybrid,
    /// The single critical reaction fired during a tau leap.
    TauLeapCritical,
    /// A Poisson (or Langevin) batch of a noncritical reaction in a tau leap.
    TauLeapNonCritical,
}

impl FireType {
    /// All variants, in declaration order.
    pub const ALL: [FireType; 5] = [
        FireType::ExactSimple,
        FireType::ExactEnhanced,
        FireType::Hybrid,
        FireType::TauLeapCritical,
        FireType::TauLeapNonCritical,
    ];

    /// Dense index in `0..FireType::ALL.len()`, for counter arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            FireType::ExactSimple => 0,
            FireType::ExactEnhanced => 1,
            FireType::Hybrid => 2,
            FireType::TauLeapCritical => 3,
            FireType::TauLeapNonCritical => 4,
        }
    }

    /// Whether the firing came from an approximate leap.
    pub fn is_tau_leap(self) -> bool {
        matches!(
            self,
            FireType::TauLeapCritical | FireType::TauLeapNonCritical
        )
    }
}

impl fmt::Display for FireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FireType::ExactSimple => "exact-simple",
            FireType::ExactEnhanced => "exact-enhanced",
            FireType::Hybrid => "hybrid",
            FireType::TauLeapCritical => "tau-leap-critical",
            FireType::TauLeapNonCritical => "tau-leap-noncritical",
        };
        f.write_str(s)
    }
}
