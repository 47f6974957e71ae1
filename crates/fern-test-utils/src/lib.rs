//! Test utilities and mock types for fern development.
//!
//! Provides a scripted [`MockController`], a [`RecordingObserver`] that
//! logs every callback, and reference networks in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::VecDeque;

use fern_core::{FireType, ReactionId, SimulatorId};
use fern_engine::{Observer, ObserverContext, SimulationController, SimulationState};

/// Controller that replays a fixed sequence of answers.
///
/// Once the script is exhausted every further query returns `fallback`.
#[derive(Clone, Debug)]
pub struct MockController {
    script: VecDeque<bool>,
    fallback: bool,
    calls: usize,
}

impl MockController {
    pub fn new(script: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback,
            calls: 0,
        }
    }

    /// Always answers `value`.
    pub fn constant(value: bool) -> Self {
        Self::new([], value)
    }

    /// Number of `go_on` queries so far.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl SimulationController for MockController {
    fn go_on(&mut self, _state: &SimulationState) -> bool {
        self.calls += 1;
        self.script.pop_front().unwrap_or(self.fallback)
    }
}

/// One observer callback, as seen by [`RecordingObserver`].
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Started { time: f64 },
    Step { time: f64 },
    Theta { theta: f64, time: f64 },
    Fired {
        reaction: ReactionId,
        time: f64,
        fire_type: FireType,
        times: u64,
    },
    Finished { time: f64 },
}

/// Observer that records every callback it receives.
///
/// Also tracks the smallest amount of any species seen in a callback,
/// and can request a list of thetas at the start of each run.
#[derive(Clone, Debug)]
pub struct RecordingObserver {
    name: String,
    bound: Option<SimulatorId>,
    thetas: Vec<f64>,
    events: Vec<Event>,
    min_amount: i64,
}

impl RecordingObserver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bound: None,
            thetas: Vec::new(),
            events: Vec::new(),
            min_amount: i64::MAX,
        }
    }

    /// Bind to a simulator; adding it to any other is rejected.
    pub fn bound_to(mut self, simulator: SimulatorId) -> Self {
        self.bound = Some(simulator);
        self
    }

    /// Request these thetas whenever a run starts.
    pub fn with_thetas(mut self, thetas: impl IntoIterator<Item = f64>) -> Self {
        self.thetas = thetas.into_iter().collect();
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// `(reaction, time, fire_type, times)` of every firing.
    pub fn firings(&self) -> Vec<(ReactionId, f64, FireType, u64)> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                Event::Fired {
                    reaction,
                    time,
                    fire_type,
                    times,
                } => Some((reaction, time, fire_type, times)),
                _ => None,
            })
            .collect()
    }

    /// Theta values delivered, in order.
    pub fn theta_times(&self) -> Vec<f64> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                Event::Theta { theta, .. } => Some(theta),
                _ => None,
            })
            .collect()
    }

    /// Smallest species amount seen in any callback.
    pub fn min_amount(&self) -> i64 {
        self.min_amount
    }

    fn observe(&mut self, ctx: &ObserverContext<'_>) {
        if let Some(&m) = ctx.state().amounts().iter().min() {
            self.min_amount = self.min_amount.min(m);
        }
    }
}

impl Observer for RecordingObserver {
    fn name(&self) -> &str {
        &self.name
    }

    fn simulator(&self) -> Option<SimulatorId> {
        self.bound
    }

    fn started(&mut self, ctx: &mut ObserverContext<'_>) {
        self.events.clear();
        self.min_amount = i64::MAX;
        for &t in &self.thetas {
            ctx.set_theta(t);
        }
        self.observe(ctx);
        self.events.push(Event::Started { time: ctx.time() });
    }

    fn step(&mut self, ctx: &mut ObserverContext<'_>) {
        self.observe(ctx);
        self.events.push(Event::Step { time: ctx.time() });
    }

    fn finished(&mut self, ctx: &mut ObserverContext<'_>) {
        self.observe(ctx);
        self.events.push(Event::Finished { time: ctx.time() });
    }

    fn theta(&mut self, theta: f64, ctx: &mut ObserverContext<'_>) {
        self.observe(ctx);
        self.events.push(Event::Theta {
            theta,
            time: ctx.time(),
        });
    }

    fn activate_reaction(
        &mut self,
        reaction: ReactionId,
        time: f64,
        fire_type: FireType,
        times: u64,
        ctx: &mut ObserverContext<'_>,
    ) {
        self.observe(ctx);
        self.events.push(Event::Fired {
            reaction,
            time,
            fire_type,
            times,
        });
    }
}
