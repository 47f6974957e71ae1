//! Leap-size selection for tau-leaping.
//!
//! A [`TauSelector`] returns the largest leap `tau1` for which the
//! noncritical propensities are expected to change by no more than a
//! bound derived from `epsilon`. Three bounds are provided:
//!
//! | Selector | Bound on the change of ... |
//! |---|---|
//! | [`AbsoluteBound`] | every noncritical `a_j`, by `epsilon * a_sum` |
//! | [`RelativeBound`] | each noncritical `a_j`, by `max(epsilon * a_j, c_j)` |
//! | [`SpeciesPopulationBound`] | each reactant population `x_i`, by `max(epsilon * x_i / g_i, 1)` |
//!
//! The first two estimate propensity sensitivities by finite differences
//! through the network's calculator, so they work for arbitrary
//! kinetics; the third uses the reaction orders only.

use fern_core::{group_multiplicity, AmountManager, Network, ReactionId};

/// Inputs to one leap-size selection.
pub struct TauInput<'a> {
    /// The network being simulated.
    pub net: &'a dyn Network,
    /// Current populations and per-reaction net changes.
    pub amounts: &'a AmountManager,
    /// Current propensities.
    pub propensities: &'a [f64],
    /// Sum of `propensities`.
    pub propensity_sum: f64,
    /// Criticality flag per reaction.
    pub critical: &'a [bool],
    /// Error-control parameter.
    pub epsilon: f64,
    /// Current simulation time.
    pub time: f64,
}

impl TauInput<'_> {
    fn noncritical(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.propensities
            .iter()
            .copied()
            .enumerate()
            .filter(|&(j, a)| a > 0.0 && !self.critical[j])
    }
}

/// Chooses the noncritical leap bound `tau1`.
pub trait TauSelector: Send {
    /// Human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Precompute network-dependent data. Called once per run.
    fn initialize(&mut self, _net: &dyn Network) {}

    /// The leap bound, or `+inf` if nothing constrains it.
    fn choose_tau(&mut self, input: &TauInput<'_>) -> f64;
}

/// Which [`TauSelector`] a tau-leaper uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TauBound {
    /// [`AbsoluteBound`].
    Absolute,
    /// [`RelativeBound`].
    Relative,
    /// [`SpeciesPopulationBound`].
    #[default]
    SpeciesPopulation,
}

impl TauBound {
    /// Construct the selector.
    pub fn selector(self) -> Box<dyn TauSelector> {
        match self {
            Self::Absolute => Box::new(AbsoluteBound::default()),
            Self::Relative => Box::new(RelativeBound::default()),
            Self::SpeciesPopulation => Box::new(SpeciesPopulationBound::default()),
        }
    }
}

/// Smaller of the mean and variance constraints for one bound.
#[inline]
fn constrain(bound: f64, mu: f64, sigma2: f64) -> f64 {
    let mut tau = f64::INFINITY;
    if mu != 0.0 {
        tau = tau.min(bound / mu.abs());
    }
    if sigma2 > 0.0 {
        tau = tau.min(bound * bound / sigma2);
    }
    tau
}

// ── Propensity sensitivities ───────────────────────────────────────

/// Expected drift `mu_j` and variance `sigma2_j` of each propensity per
/// unit time, from finite differences `a_j(x + nu_k) - a_j(x)` over the
/// noncritical reactions `k`.
#[derive(Clone, Debug, Default)]
struct Sensitivity {
    scratch: Vec<i64>,
    mu: Vec<f64>,
    sigma2: Vec<f64>,
}

impl Sensitivity {
    fn compute(&mut self, input: &TauInput<'_>) {
        let m = input.propensities.len();
        self.mu.clear();
        self.mu.resize(m, 0.0);
        self.sigma2.clear();
        self.sigma2.resize(m, 0.0);
        self.scratch.clear();
        self.scratch.extend_from_slice(input.amounts.as_slice());
        let calc = input.net.propensity_calculator();

        for (k, a_k) in input.noncritical() {
            let delta = input.amounts.net_change(ReactionId(k as u32));
            if delta.is_empty() {
                continue;
            }
            for &(s, d) in delta {
                self.scratch[s.index()] += d;
            }
            for (j, &a_j) in input.propensities.iter().enumerate() {
                if input.critical[j] {
                    continue;
                }
                let shifted = calc.calculate(ReactionId(j as u32), &self.scratch, input.time);
                let f = shifted - a_j;
                if f != 0.0 && f.is_finite() {
                    self.mu[j] += f * a_k;
                    self.sigma2[j] += f * f * a_k;
                }
            }
            for &(s, d) in delta {
                self.scratch[s.index()] -= d;
            }
        }
    }
}

// ── AbsoluteBound ──────────────────────────────────────────────────

/// Bounds every noncritical propensity change by `epsilon * a_sum`.
#[derive(Clone, Debug, Default)]
pub struct AbsoluteBound {
    sens: Sensitivity,
}

impl TauSelector for AbsoluteBound {
    fn name(&self) -> &str {
        "absolute"
    }

    fn choose_tau(&mut self, input: &TauInput<'_>) -> f64 {
        self.sens.compute(input);
        let bound = input.epsilon * input.propensity_sum;
        (0..input.propensities.len())
            .filter(|&j| !input.critical[j])
            .map(|j| constrain(bound, self.sens.mu[j], self.sens.sigma2[j]))
            .fold(f64::INFINITY, f64::min)
    }
}

// ── RelativeBound ──────────────────────────────────────────────────

/// Bounds each noncritical propensity change by `max(epsilon * a_j, c_j)`,
/// where `c_j` is the reaction's rate constant when the calculator
/// exposes one.
#[derive(Clone, Debug, Default)]
pub struct RelativeBound {
    sens: Sensitivity,
}

impl TauSelector for RelativeBound {
    fn name(&self) -> &str {
        "relative"
    }

    fn choose_tau(&mut self, input: &TauInput<'_>) -> f64 {
        self.sens.compute(input);
        let calc = input.net.propensity_calculator();
        let mut tau = f64::INFINITY;
        for (j, &a_j) in input.propensities.iter().enumerate() {
            if input.critical[j] {
                continue;
            }
            let c_j = calc.rate_constant(ReactionId(j as u32)).unwrap_or(0.0);
            let bound = (input.epsilon * a_j).max(c_j);
            if bound <= 0.0 {
                continue;
            }
            tau = tau.min(constrain(bound, self.sens.mu[j], self.sens.sigma2[j]));
        }
        tau
    }
}

// ── SpeciesPopulationBound ─────────────────────────────────────────

/// Highest reaction order in which a species is a reactant, and its
/// largest multiplicity among reactions of that order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct HighestOrder {
    order: u32,
    multiplicity: u32,
}

impl HighestOrder {
    /// `g_i`: the factor relating relative population change to the
    /// relative change of the fastest-changing propensity it feeds.
    fn g(self, x: i64) -> f64 {
        let x = x as f64;
        let inv = |k: f64| 1.0 / (x - k).max(1.0);
        match (self.order, self.multiplicity) {
            (0, _) | (1, _) => 1.0,
            (2, 1) => 2.0,
            (2, _) => 2.0 + inv(1.0),
            (3, 1) => 3.0,
            (3, 2) => 1.5 * (2.0 + inv(1.0)),
            (3, _) => 3.0 + inv(1.0) + 2.0 * inv(2.0),
            (n, _) => n as f64,
        }
    }
}

/// Bounds the relative change of each reactant population by
/// `max(epsilon * x_i / g_i, 1)`.
#[derive(Clone, Debug, Default)]
pub struct SpeciesPopulationBound {
    orders: Vec<HighestOrder>,
    mu: Vec<f64>,
    sigma2: Vec<f64>,
    reactant: Vec<bool>,
}

impl SpeciesPopulationBound {
    fn ensure_orders(&mut self, net: &dyn Network) {
        if self.orders.len() != net.species_count() {
            self.initialize(net);
        }
    }
}

impl TauSelector for SpeciesPopulationBound {
    fn name(&self) -> &str {
        "species-population"
    }

    fn initialize(&mut self, net: &dyn Network) {
        self.orders = vec![HighestOrder::default(); net.species_count()];
        for j in 0..net.reaction_count() {
            let reactants = net.reactants(ReactionId(j as u32));
            let order = reactants.len() as u32;
            for (s, m) in group_multiplicity(reactants) {
                let slot = &mut self.orders[s.index()];
                if order > slot.order || (order == slot.order && m > slot.multiplicity) {
                    *slot = HighestOrder {
                        order,
                        multiplicity: m,
                    };
                }
            }
        }
    }

    fn choose_tau(&mut self, input: &TauInput<'_>) -> f64 {
        self.ensure_orders(input.net);
        let n = input.amounts.len();
        self.mu.clear();
        self.mu.resize(n, 0.0);
        self.sigma2.clear();
        self.sigma2.resize(n, 0.0);
        self.reactant.clear();
        self.reactant.resize(n, false);

        for (j, a_j) in input.noncritical() {
            let r = ReactionId(j as u32);
            for &s in input.net.reactants(r) {
                self.reactant[s.index()] = true;
            }
            for &(s, d) in input.amounts.net_change(r) {
                let d = d as f64;
                self.mu[s.index()] += d * a_j;
                self.sigma2[s.index()] += d * d * a_j;
            }
        }

        let mut tau = f64::INFINITY;
        for i in (0..n).filter(|&i| self.reactant[i]) {
            let x = input.amounts.as_slice()[i];
            let bound = (input.epsilon * x as f64 / self.orders[i].g(x)).max(1.0);
            tau = tau.min(constrain(bound, self.mu[i], self.sigma2[i]));
        }
        tau
    }
}
