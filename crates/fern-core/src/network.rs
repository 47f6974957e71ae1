//! Reaction network topology: the [`Network`] trait and the in-memory
//! [`ReactionNetwork`] with its builder.
//!
//! A network is immutable for the duration of a run. Stoichiometry is
//! encoded by repetition: a reactant list `[A, A, B]` means `2A + B`.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::error::NetworkError;
use crate::id::{ReactionId, SpeciesId};
use crate::propensity::{MassActionCalculator, PropensityCalculator};

/// Immutable reaction topology consumed by the simulator.
///
/// Network loaders (SBML, FernML, ...) implement this trait; the
/// simulator never mutates a network and shares it as `Arc<dyn Network>`.
pub trait Network: Send + Sync {
    /// Human-readable network name, used in diagnostics.
    fn name(&self) -> &str;

    /// Number of species.
    fn species_count(&self) -> usize;

    /// Number of reactions.
    fn reaction_count(&self) -> usize;

    /// Reactant species of `reaction`, repeated by multiplicity.
    fn reactants(&self, reaction: ReactionId) -> &[SpeciesId];

    /// Product species of `reaction`, repeated by multiplicity.
    fn products(&self, reaction: ReactionId) -> &[SpeciesId];

    /// Name of a species.
    fn species_name(&self, species: SpeciesId) -> &str;

    /// Look up a species by name.
    fn species_by_name(&self, name: &str) -> Option<SpeciesId>;

    /// Initial population of a species, restored on every reset.
    fn initial_amount(&self, species: SpeciesId) -> i64;

    /// Kinetics used to compute propensities.
    fn propensity_calculator(&self) -> &dyn PropensityCalculator;

    /// Species whose amounts the propensity of `reaction` depends on.
    ///
    /// Drives the dependency graph of the enhanced exact stepper.
    /// Default: the reactants. Kinetics with modifiers must override.
    fn propensity_dependencies(&self, reaction: ReactionId) -> &[SpeciesId] {
        self.reactants(reaction)
    }

    /// Formatted reaction equation such as `2 A + B -> C`.
    fn reaction_name(&self, reaction: ReactionId) -> String {
        let side = |list: &[SpeciesId]| -> String {
            if list.is_empty() {
                return "0".to_string();
            }
            group_multiplicity(list)
                .iter()
                .map(|&(s, m)| {
                    if m == 1 {
                        self.species_name(s).to_string()
                    } else {
                        format!("{m} {}", self.species_name(s))
                    }
                })
                .collect::<Vec<_>>()
                .join(" + ")
        };
        format!(
            "{} -> {}",
            side(self.reactants(reaction)),
            side(self.products(reaction))
        )
    }
}

/// Collapse a repeated species list into `(species, multiplicity)` pairs,
/// preserving first-appearance order.
pub fn group_multiplicity(list: &[SpeciesId]) -> SmallVec<[(SpeciesId, u32); 4]> {
    let mut grouped: SmallVec<[(SpeciesId, u32); 4]> = SmallVec::new();
    for &s in list {
        match grouped.iter_mut().find(|(id, _)| *id == s) {
            Some((_, m)) => *m += 1,
            None => grouped.push((s, 1)),
        }
    }
    grouped
}

/// Net population change caused by one firing of `reaction`.
///
/// Species whose reactant and product multiplicities cancel (catalysts)
/// are omitted.
pub fn net_change(net: &dyn Network, reaction: ReactionId) -> SmallVec<[(SpeciesId, i64); 4]> {
    let mut delta: SmallVec<[(SpeciesId, i64); 4]> = SmallVec::new();
    let mut bump = |s: SpeciesId, d: i64| match delta.iter_mut().find(|(id, _)| *id == s) {
        Some((_, v)) => *v += d,
        None => delta.push((s, d)),
    };
    for &s in net.reactants(reaction) {
        bump(s, -1);
    }
    for &s in net.products(reaction) {
        bump(s, 1);
    }
    delta.retain(|(_, d)| *d != 0);
    delta
}

// ── ReactionNetwork ─────────────────────────────────────────────

#[derive(Clone, Debug)]
struct ReactionDef {
    name: String,
    reactants: Vec<SpeciesId>,
    products: Vec<SpeciesId>,
}

/// In-memory network with mass-action kinetics.
///
/// Constructed via [`ReactionNetwork::builder`].
#[derive(Clone, Debug)]
pub struct ReactionNetwork {
    name: String,
    species_names: Vec<String>,
    species_index: HashMap<String, SpeciesId>,
    initial_amounts: Vec<i64>,
    reactions: Vec<ReactionDef>,
    calculator: MassActionCalculator,
}

impl ReactionNetwork {
    /// Start building a network with the given name.
    pub fn builder(name: impl Into<String>) -> ReactionNetworkBuilder {
        ReactionNetworkBuilder {
            name: name.into(),
            species: Vec::new(),
            reactions: Vec::new(),
        }
    }

    /// User-supplied label of a reaction (as passed to the builder).
    pub fn reaction_label(&self, reaction: ReactionId) -> &str {
        &self.reactions[reaction.index()].name
    }

    /// Look up a reaction by its builder label.
    pub fn reaction_by_label(&self, label: &str) -> Option<ReactionId> {
        self.reactions
            .iter()
            .position(|r| r.name == label)
            .map(|i| ReactionId(i as u32))
    }
}

impl Network for ReactionNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    fn species_count(&self) -> usize {
        self.species_names.len()
    }

    fn reaction_count(&self) -> usize {
        self.reactions.len()
    }

    fn reactants(&self, reaction: ReactionId) -> &[SpeciesId] {
        &self.reactions[reaction.index()].reactants
    }

    fn products(&self, reaction: ReactionId) -> &[SpeciesId] {
        &self.reactions[reaction.index()].products
    }

    fn species_name(&self, species: SpeciesId) -> &str {
        &self.species_names[species.index()]
    }

    fn species_by_name(&self, name: &str) -> Option<SpeciesId> {
        self.species_index.get(name).copied()
    }

    fn initial_amount(&self, species: SpeciesId) -> i64 {
        self.initial_amounts[species.index()]
    }

    fn propensity_calculator(&self) -> &dyn PropensityCalculator {
        &self.calculator
    }
}

/// Builder for [`ReactionNetwork`].
///
/// Species must be declared before reactions reference them. Errors are
/// reported by [`build`](ReactionNetworkBuilder::build).
pub struct ReactionNetworkBuilder {
    name: String,
    species: Vec<(String, i64)>,
    reactions: Vec<(String, Vec<String>, Vec<String>, f64)>,
}

impl ReactionNetworkBuilder {
    /// Declare a species with its initial amount.
    pub fn species(mut self, name: impl Into<String>, initial_amount: i64) -> Self {
        self.species.push((name.into(), initial_amount));
        self
    }

    /// Declare a mass-action reaction.
    ///
    /// `reactants` and `products` list species names, repeated by
    /// multiplicity. An empty side denotes the source/sink `0`.
    pub fn reaction(
        mut self,
        name: impl Into<String>,
        reactants: &[&str],
        products: &[&str],
        rate_constant: f64,
    ) -> Self {
        self.reactions.push((
            name.into(),
            reactants.iter().map(|s| s.to_string()).collect(),
            products.iter().map(|s| s.to_string()).collect(),
            rate_constant,
        ));
        self
    }

    /// Validate and build the network.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a species name is duplicated or unknown, an
    /// initial amount is negative, a rate constant is negative or not
    /// finite, or the network has no species.
    pub fn build(self) -> Result<ReactionNetwork, NetworkError> {
        if self.species.is_empty() {
            return Err(NetworkError::NoSpecies);
        }
        if self.species.len() > u32::MAX as usize {
            return Err(NetworkError::TooLarge {
                count: self.species.len(),
            });
        }
        if self.reactions.len() > u32::MAX as usize {
            return Err(NetworkError::TooLarge {
                count: self.reactions.len(),
            });
        }

        let mut species_index = HashMap::with_capacity(self.species.len());
        let mut species_names = Vec::with_capacity(self.species.len());
        let mut initial_amounts = Vec::with_capacity(self.species.len());
        for (i, (name, amount)) in self.species.into_iter().enumerate() {
            if amount < 0 {
                return Err(NetworkError::NegativeInitialAmount { name, amount });
            }
            if species_index.insert(name.clone(), SpeciesId(i as u32)).is_some() {
                return Err(NetworkError::DuplicateSpecies { name });
            }
            species_names.push(name);
            initial_amounts.push(amount);
        }

        let resolve = |names: &[String]| -> Result<Vec<SpeciesId>, NetworkError> {
            names
                .iter()
                .map(|n| {
                    species_index
                        .get(n)
                        .copied()
                        .ok_or_else(|| NetworkError::UnknownSpecies { name: n.clone() })
                })
                .collect()
        };

        let mut reactions = Vec::with_capacity(self.reactions.len());
        let mut rate_constants = Vec::with_capacity(self.reactions.len());
        for (name, reactants, products, rate) in &self.reactions {
            if !rate.is_finite() || *rate < 0.0 {
                return Err(NetworkError::InvalidRateConstant {
                    reaction: name.clone(),
                    value: *rate,
                });
            }
            reactions.push(ReactionDef {
                name: name.clone(),
                reactants: resolve(reactants)?,
                products: resolve(products)?,
            });
            rate_constants.push(*rate);
        }

        let reactant_lists: Vec<Vec<SpeciesId>> =
            reactions.iter().map(|r| r.reactants.clone()).collect();
        let calculator = MassActionCalculator::new(rate_constants, &reactant_lists);

        Ok(ReactionNetwork {
            name: self.name,
            species_names,
            species_index,
            initial_amounts,
            reactions,
            calculator,
        })
    }
}
