//! Mutable species populations with a single-slot checkpoint.

use smallvec::SmallVec;

use crate::id::{ReactionId, SpeciesId};
use crate::network::{net_change, Network};

/// Owner of the integer population vector of a running simulation.
///
/// Net stoichiometric deltas are precomputed per reaction at
/// construction, so [`perform_reaction`](Self::perform_reaction) touches
/// only the species a reaction actually changes.
///
/// # Checkpointing
///
/// [`save`](Self::save) stores one snapshot, overwriting any earlier one;
/// [`rollback`](Self::rollback) restores it. There is no stack: nested
/// speculative updates are not supported.
#[derive(Clone, Debug)]
pub struct AmountManager {
    amounts: Vec<i64>,
    initial: Vec<i64>,
    saved: Vec<i64>,
    has_checkpoint: bool,
    deltas: Vec<SmallVec<[(SpeciesId, i64); 4]>>,
}

impl AmountManager {
    /// Build from a network's initial amounts and stoichiometry.
    pub fn new(net: &dyn Network) -> Self {
        let initial: Vec<i64> = (0..net.species_count())
            .map(|i| net.initial_amount(SpeciesId(i as u32)))
            .collect();
        let deltas = (0..net.reaction_count())
            .map(|j| net_change(net, ReactionId(j as u32)))
            .collect();
        Self {
            amounts: initial.clone(),
            saved: vec![0; initial.len()],
            initial,
            has_checkpoint: false,
            deltas,
        }
    }

    /// Current amount of a species.
    #[inline]
    pub fn get(&self, species: SpeciesId) -> i64 {
        self.amounts[species.index()]
    }

    /// Overwrite the amount of a species.
    pub fn set(&mut self, species: SpeciesId, value: i64) {
        self.amounts[species.index()] = value;
    }

    /// Add `delta` (possibly negative) to the amount of a species.
    pub fn add(&mut self, species: SpeciesId, delta: i64) {
        let slot = &mut self.amounts[species.index()];
        *slot = slot.saturating_add(delta);
    }

    /// Apply the net stoichiometric change of `reaction`, `times` times.
    ///
    /// No feasibility check is made: the result may be negative. Callers
    /// that speculate checkpoint first and probe with
    /// [`first_negative`](Self::first_negative).
    pub fn perform_reaction(&mut self, reaction: ReactionId, times: u64) {
        let times = i64::try_from(times).unwrap_or(i64::MAX);
        for &(species, delta) in &self.deltas[reaction.index()] {
            let slot = &mut self.amounts[species.index()];
            *slot = slot.saturating_add(delta.saturating_mul(times));
        }
    }

    /// Net change of one firing of `reaction`.
    pub fn net_change(&self, reaction: ReactionId) -> &[(SpeciesId, i64)] {
        &self.deltas[reaction.index()]
    }

    /// Restore the initial amounts and discard any checkpoint.
    pub fn reset(&mut self) {
        self.amounts.copy_from_slice(&self.initial);
        self.has_checkpoint = false;
    }

    /// Snapshot the current amounts, replacing any earlier snapshot.
    pub fn save(&mut self) {
        self.saved.copy_from_slice(&self.amounts);
        self.has_checkpoint = true;
    }

    /// Restore the last snapshot taken by [`save`](Self::save).
    ///
    /// Returns `false` (and changes nothing) if no snapshot exists. The
    /// snapshot is kept, so rolling back twice restores the same state.
    pub fn rollback(&mut self) -> bool {
        if !self.has_checkpoint {
            return false;
        }
        self.amounts.copy_from_slice(&self.saved);
        true
    }

    /// Whether a snapshot is available for [`rollback`](Self::rollback).
    pub fn has_checkpoint(&self) -> bool {
        self.has_checkpoint
    }

    /// First species with a negative amount, if any.
    pub fn first_negative(&self) -> Option<SpeciesId> {
        self.amounts
            .iter()
            .position(|&x| x < 0)
            .map(|i| SpeciesId(i as u32))
    }

    /// The full population vector, indexed by [`SpeciesId::index`].
    #[inline]
    pub fn as_slice(&self) -> &[i64] {
        &self.amounts
    }

    /// Number of species.
    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    /// Whether the network has no species.
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }
}
