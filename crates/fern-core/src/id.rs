//! Strongly-typed identifiers for species, reactions, observers and simulators.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a species within a reaction network.
///
/// `SpeciesId(n)` is the n-th species of the network and indexes the
/// amount vector directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesId(pub u32);

impl SpeciesId {
    /// Position of this species in the amount vector.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SpeciesId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a reaction within a reaction network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReactionId(pub u32);

impl ReactionId {
    /// Position of this reaction in the propensity vector.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ReactionId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies an observer registered with a simulator.
///
/// Assigned sequentially by the simulator in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u32);

impl ObserverId {
    /// Position of this observer in the simulator's registration list.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Counter for unique [`SimulatorId`] allocation.
static SIMULATOR_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a simulator.
///
/// Allocated from a monotonic atomic counter via [`SimulatorId::next`].
/// Observers that are bound to a simulator carry its ID, which lets the
/// simulator reject observers built for a different instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimulatorId(u64);

impl SimulatorId {
    /// Allocate a fresh, unique simulator ID. Thread-safe.
    pub fn next() -> Self {
        Self(SIMULATOR_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SimulatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sim#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulator_ids_are_unique() {
        let a = SimulatorId::next();
        let b = SimulatorId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn index_matches_inner_value() {
        assert_eq!(SpeciesId(7).index(), 7);
        assert_eq!(ReactionId::from(3).index(), 3);
        assert_eq!(ObserverId(0).index(), 0);
    }

    #[test]
    fn display_formats() {
        assert_eq!(SpeciesId(4).to_string(), "4");
        assert_eq!(ReactionId(9).to_string(), "9");
        assert!(SimulatorId::next().to_string().starts_with("sim#"));
    }
}
