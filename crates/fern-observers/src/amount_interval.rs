//! Amount sampling on a regular time grid.

use fern_core::{SimulatorId, SpeciesId};
use fern_engine::{Observer, ObserverContext, SimulationState};
use tracing::info;

/// Amounts of the tracked species at one grid time.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// Grid time of the sample.
    pub time: f64,
    /// One value per tracked species, in tracking order.
    pub values: Vec<f64>,
}

/// Samples amounts at `start, start + interval, start + 2 * interval, ...`.
///
/// Each grid time is requested as a theta, so the simulator stops (or,
/// with interpolation, interpolates) exactly on the grid. Values are
/// `f64` because interpolated samples are fractional.
#[derive(Debug)]
pub struct AmountIntervalObserver {
    interval: f64,
    start: f64,
    species: Option<Vec<SpeciesId>>,
    bound: Option<SimulatorId>,
    next_index: u64,
    samples: Vec<Sample>,
}

/// Builder for [`AmountIntervalObserver`].
///
/// Required field: `interval`.
pub struct AmountIntervalObserverBuilder {
    interval: Option<f64>,
    start: f64,
    species: Option<Vec<SpeciesId>>,
    bound: Option<SimulatorId>,
}

impl AmountIntervalObserver {
    /// Create a new builder.
    pub fn builder() -> AmountIntervalObserverBuilder {
        AmountIntervalObserverBuilder {
            interval: None,
            start: 0.0,
            species: None,
            bound: None,
        }
    }

    /// Samples of the current (or last) run.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// The sample taken at grid time `time`, if any.
    pub fn sample_at(&self, time: f64) -> Option<&Sample> {
        self.samples.iter().find(|s| s.time == time)
    }

    fn grid_time(&self, index: u64) -> f64 {
        self.start + index as f64 * self.interval
    }

    fn record(&mut self, time: f64, ctx: &ObserverContext<'_>) {
        let values = match &self.species {
            Some(list) => list.iter().map(|&s| ctx.theta_amount(s)).collect(),
            None => (0..ctx.state().amounts().len())
                .map(|i| ctx.theta_amount(SpeciesId(i as u32)))
                .collect(),
        };
        self.samples.push(Sample { time, values });
    }
}

impl AmountIntervalObserverBuilder {
    /// Sampling interval; must be finite and positive.
    pub fn interval(mut self, interval: f64) -> Self {
        self.interval = Some(interval);
        self
    }

    /// First grid time (default: 0). Must be finite and >= 0.
    pub fn start(mut self, start: f64) -> Self {
        self.start = start;
        self
    }

    /// Track only these species (default: all, in index order).
    pub fn species(mut self, species: &[SpeciesId]) -> Self {
        self.species = Some(species.to_vec());
        self
    }

    /// Bind to a simulator.
    pub fn bound_to(mut self, simulator: SimulatorId) -> Self {
        self.bound = Some(simulator);
        self
    }

    /// Build the observer, validating all configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `interval` is missing, not finite or not positive,
    /// or if `start` is negative or not finite.
    pub fn build(self) -> Result<AmountIntervalObserver, String> {
        let interval = self
            .interval
            .ok_or_else(|| "interval is required".to_string())?;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(format!("interval must be finite and > 0, got {interval}"));
        }
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(format!("start must be finite and >= 0, got {}", self.start));
        }
        Ok(AmountIntervalObserver {
            interval,
            start: self.start,
            species: self.species,
            bound: self.bound,
            next_index: 0,
            samples: Vec::new(),
        })
    }
}

impl Observer for AmountIntervalObserver {
    fn name(&self) -> &str {
        "amount-interval"
    }

    fn simulator(&self) -> Option<SimulatorId> {
        self.bound
    }

    fn started(&mut self, ctx: &mut ObserverContext<'_>) {
        self.samples.clear();
        self.next_index = 0;
        ctx.set_theta(self.grid_time(0));
    }

    fn theta(&mut self, theta: f64, ctx: &mut ObserverContext<'_>) {
        self.record(theta, ctx);
        self.next_index += 1;
        ctx.set_theta(self.grid_time(self.next_index));
    }

    fn print(&self, state: &SimulationState) {
        info!(
            network = state.net().name(),
            samples = self.samples.len(),
            last_time = self.samples.last().map(|s| s.time),
            "amount samples collected"
        );
    }
}
