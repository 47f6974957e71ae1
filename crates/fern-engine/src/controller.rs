//! Run-continuation predicates.
//!
//! A [`SimulationController`] is asked once per loop iteration (and
//! between the firings of a multi-firing exact bailout) whether the run
//! should go on. Controllers compose with [`and`](SimulationController::and),
//! [`or`](SimulationController::or) and [`not`](SimulationController::not);
//! any `FnMut(&SimulationState) -> bool` closure is a controller too.

use crate::state::SimulationState;

/// Decides whether a simulation run continues.
pub trait SimulationController {
    /// `true` to keep running.
    fn go_on(&mut self, state: &SimulationState) -> bool;

    /// Continue while both `self` and `other` agree.
    fn and<C: SimulationController>(self, other: C) -> AndController<Self, C>
    where
        Self: Sized,
    {
        AndController(self, other)
    }

    /// Continue while either `self` or `other` wants to.
    fn or<C: SimulationController>(self, other: C) -> OrController<Self, C>
    where
        Self: Sized,
    {
        OrController(self, other)
    }

    /// Continue while `self` wants to stop.
    fn not(self) -> NotController<Self>
    where
        Self: Sized,
    {
        NotController(self)
    }
}

impl<F> SimulationController for F
where
    F: FnMut(&SimulationState) -> bool,
{
    fn go_on(&mut self, state: &SimulationState) -> bool {
        self(state)
    }
}

/// Continue while simulation time is below an end time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeController {
    end: f64,
}

impl TimeController {
    /// Run until `t >= end`.
    pub fn new(end: f64) -> Self {
        Self { end }
    }

    /// The end time.
    pub fn end(&self) -> f64 {
        self.end
    }
}

impl SimulationController for TimeController {
    fn go_on(&mut self, state: &SimulationState) -> bool {
        state.time() < self.end
    }
}

/// Continue for a fixed number of `go_on` queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepLimitController {
    remaining: u64,
}

impl StepLimitController {
    /// Allow `steps` positive answers.
    pub fn new(steps: u64) -> Self {
        Self { remaining: steps }
    }

    /// Positive answers left.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl SimulationController for StepLimitController {
    fn go_on(&mut self, _state: &SimulationState) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Conjunction of two controllers; short-circuits.
#[derive(Clone, Debug)]
pub struct AndController<A, B>(pub A, pub B);

impl<A: SimulationController, B: SimulationController> SimulationController
    for AndController<A, B>
{
    fn go_on(&mut self, state: &SimulationState) -> bool {
        self.0.go_on(state) && self.1.go_on(state)
    }
}

/// Disjunction of two controllers; short-circuits.
#[derive(Clone, Debug)]
pub struct OrController<A, B>(pub A, pub B);

impl<A: SimulationController, B: SimulationController> SimulationController
    for OrController<A, B>
{
    fn go_on(&mut self, state: &SimulationState) -> bool {
        self.0.go_on(state) || self.1.go_on(state)
    }
}

/// Negation of a controller.
#[derive(Clone, Debug)]
pub struct NotController<A>(pub A);

impl<A: SimulationController> SimulationController for NotController<A> {
    fn go_on(&mut self, state: &SimulationState) -> bool {
        !self.0.go_on(state)
    }
}
