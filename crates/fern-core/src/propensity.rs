//! Propensity calculation: the [`PropensityCalculator`] trait and the
//! mass-action reference implementation.

use smallvec::SmallVec;

use crate::id::{ReactionId, SpeciesId};

/// Computes the instantaneous firing rate of a reaction.
///
/// # Contract
///
/// - `calculate()` must return a finite value `>= 0`. Negative or NaN
///   values are treated as modeling errors by the simulator and abort
///   the run; they are never clamped.
/// - The result may only depend on `amounts`, `time` and immutable
///   calculator state, so that identical inputs give identical rates.
pub trait PropensityCalculator: Send + Sync {
    /// Propensity of `reaction` given the current population vector.
    fn calculate(&self, reaction: ReactionId, amounts: &[i64], time: f64) -> f64;

    /// Stochastic rate constant of `reaction`, when the kinetics have one.
    ///
    /// Used by the relative tau bound as a floor for the allowed change
    /// of a small propensity. Default: unknown.
    fn rate_constant(&self, _reaction: ReactionId) -> Option<f64> {
        None
    }
}

/// Falling factorial `x (x-1) ... (x-n+1)`, zero when `x < n`.
#[inline]
pub fn falling_factorial(x: i64, n: u32) -> f64 {
    match n {
        0 => 1.0,
        1 => x.max(0) as f64,
        _ if x < i64::from(n) => 0.0,
        _ => {
            let mut acc = 1.0;
            for i in 0..i64::from(n) {
                acc *= (x - i) as f64;
            }
            acc
        }
    }
}

/// Mass-action kinetics: `a_j = c_j * prod_i x_i (x_i - 1) ... (x_i - m_ij + 1)`.
///
/// `m_ij` is the multiplicity of species `i` among the reactants of
/// reaction `j`. A zero-order reaction (no reactants) has constant
/// propensity `c_j`.
#[derive(Clone, Debug)]
pub struct MassActionCalculator {
    rate_constants: Vec<f64>,
    reactants: Vec<SmallVec<[(SpeciesId, u32); 2]>>,
}

impl MassActionCalculator {
    /// Build from per-reaction rate constants and reactant lists.
    ///
    /// Reactant lists use repetition to encode multiplicity, exactly as
    /// the network does: `[A, A, B]` means `2A + B`.
    pub fn new(rate_constants: Vec<f64>, reactants: &[Vec<SpeciesId>]) -> Self {
        let reactants = reactants
            .iter()
            .map(|list| {
                let mut grouped: SmallVec<[(SpeciesId, u32); 2]> = SmallVec::new();
                for &s in list {
                    match grouped.iter_mut().find(|(id, _)| *id == s) {
                        Some((_, m)) => *m += 1,
                        None => grouped.push((s, 1)),
                    }
                }
                grouped
            })
            .collect();
        Self {
            rate_constants,
            reactants,
        }
    }
}

impl PropensityCalculator for MassActionCalculator {
    fn calculate(&self, reaction: ReactionId, amounts: &[i64], _time: f64) -> f64 {
        let j = reaction.index();
        let mut a = self.rate_constants[j];
        for &(species, multiplicity) in &self.reactants[j] {
            let x = amounts[species.index()];
            if x < i64::from(multiplicity) {
                return 0.0;
            }
            a *= falling_factorial(x, multiplicity);
        }
        a
    }

    fn rate_constant(&self, reaction: ReactionId) -> Option<f64> {
        self.rate_constants.get(reaction.index()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falling_factorial_values() {
        assert_eq!(falling_factorial(5, 0), 1.0);
        assert_eq!(falling_factorial(5, 1), 5.0);
        assert_eq!(falling_factorial(5, 2), 20.0);
        assert_eq!(falling_factorial(5, 3), 60.0);
        assert_eq!(falling_factorial(1, 2), 0.0);
        assert_eq!(falling_factorial(-3, 1), 0.0);
    }

    #[test]
    fn mass_action_first_and_second_order() {
        let s0 = SpeciesId(0);
        let s1 = SpeciesId(1);
        let calc = MassActionCalculator::new(
            vec![0.5, 2.0, 3.0, 1.0],
            &[vec![s0], vec![s0, s0], vec![s0, s1], vec![]],
        );
        let amounts = [10, 4];
        assert_eq!(calc.calculate(ReactionId(0), &amounts, 0.0), 5.0);
        assert_eq!(calc.calculate(ReactionId(1), &amounts, 0.0), 2.0 * 90.0);
        assert_eq!(calc.calculate(ReactionId(2), &amounts, 0.0), 3.0 * 40.0);
        assert_eq!(calc.calculate(ReactionId(3), &amounts, 0.0), 1.0);
    }

    #[test]
    fn mass_action_zero_when_reactant_insufficient() {
        let s0 = SpeciesId(0);
        let calc = MassActionCalculator::new(vec![1.0], &[vec![s0, s0]]);
        assert_eq!(calc.calculate(ReactionId(0), &[1], 0.0), 0.0);
        assert_eq!(calc.calculate(ReactionId(0), &[0], 0.0), 0.0);
    }

    #[test]
    fn rate_constant_is_exposed() {
        let calc = MassActionCalculator::new(vec![0.25], &[vec![]]);
        assert_eq!(calc.rate_constant(ReactionId(0)), Some(0.25));
        assert_eq!(calc.rate_constant(ReactionId(1)), None);
    }
}
