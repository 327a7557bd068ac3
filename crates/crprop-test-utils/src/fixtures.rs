//! Reusable module fixtures.
//!
//! - [`StepBidder`]: bids a fixed next step.
//! - [`StepLimit`]: deactivates a candidate after N passes.
//! - [`CountingModule`]: counts how often it runs.
//! - [`FailingModule`]: fails deterministically after N calls.
//! - [`Deactivator`]: deactivates immediately with a reason property.
//! - [`Spawner`]: adds secondaries on its first pass over a primary.

use std::sync::atomic::{AtomicUsize, Ordering};

use crprop_core::{Candidate, ModuleError, Secondary};
use crprop_module::{Module, ProcessContext};

/// Bids `step` for the next pass.
pub struct StepBidder {
    pub step: f64,
}

impl StepBidder {
    pub fn new(step: f64) -> Self {
        Self { step }
    }
}

impl Module for StepBidder {
    fn name(&self) -> &str {
        "StepBidder"
    }

    fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        c.limit_next_step(self.step);
        Ok(())
    }
}

/// Moves the candidate by its committed next step along +x and
/// deactivates it once `passes` steps were taken.
pub struct StepLimit {
    pub passes: usize,
}

impl Module for StepLimit {
    fn name(&self) -> &str {
        "StepLimit"
    }

    fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let step = c.next_step().max(1.0);
        c.previous = c.current.clone();
        let position = c.current.position() + c.current.direction() * step;
        c.current.set_position(position);
        c.set_current_step(step);
        let taken = c
            .property("steps")
            .and_then(|v| v.as_uint().ok())
            .unwrap_or(0)
            + 1;
        c.set_property("steps", taken);
        if taken as usize >= self.passes {
            c.set_active(false);
        }
        Ok(())
    }
}

/// Counts its invocations; does nothing else.
#[derive(Default)]
pub struct CountingModule {
    calls: AtomicUsize,
    begins: AtomicUsize,
    ends: AtomicUsize,
}

impl CountingModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::Relaxed)
    }

    pub fn ends(&self) -> usize {
        self.ends.load(Ordering::Relaxed)
    }
}

impl Module for CountingModule {
    fn name(&self) -> &str {
        "CountingModule"
    }

    fn process(&self, _c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn begin_run(&self) {
        self.begins.fetch_add(1, Ordering::Relaxed);
    }

    fn end_run(&self) {
        self.ends.fetch_add(1, Ordering::Relaxed);
    }
}

/// Succeeds `succeed_count` times, then fails every call.
pub struct FailingModule {
    pub succeed_count: usize,
    calls: AtomicUsize,
}

impl FailingModule {
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Module for FailingModule {
    fn name(&self) -> &str {
        "FailingModule"
    }

    fn process(&self, _c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            Err(ModuleError::Failed {
                reason: format!("deliberate failure on call {n}"),
            })
        } else {
            Ok(())
        }
    }
}

/// Deactivates every candidate and records `reason` under "Stopped".
pub struct Deactivator {
    pub reason: String,
}

impl Deactivator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl Module for Deactivator {
    fn name(&self) -> &str {
        "Deactivator"
    }

    fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        c.set_property("Stopped", self.reason.as_str());
        c.set_active(false);
        Ok(())
    }
}

/// Adds `count` photon secondaries with half the parent's energy the first
/// time it sees a primary. Secondaries are left alone.
pub struct Spawner {
    pub count: usize,
}

impl Module for Spawner {
    fn name(&self) -> &str {
        "Spawner"
    }

    fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        if c.parent().is_some() || c.has_property("Spawned") {
            return Ok(());
        }
        let energy = c.current.energy() / 2.0;
        for _ in 0..self.count {
            c.add_secondary(Secondary::new(crprop_core::particle_id::PHOTON, energy), ctx.serials());
        }
        c.set_property("Spawned", true);
        Ok(())
    }
}
