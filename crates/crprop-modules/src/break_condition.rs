//! Break conditions: scalar predicates that end a candidate's propagation.
//!
//! Each condition owns a [`Condition`] holding its reject (and, for
//! [`DetectionLength`], accept) settings. By default a rejected candidate is
//! deactivated with `"Rejected"` set to the module name.

use crprop_core::particle_id::charge_number;
use crprop_core::units::{EEV, MPC};
use crprop_core::{Candidate, ModuleError, Vector3d};
use crprop_module::{Condition, Module, ProcessContext};

fn describe_condition(head: String, condition: &Condition) -> String {
    match condition.reject_flag() {
        Some((key, value)) => format!("{head}, flag '{key}' -> '{value}'"),
        None => head,
    }
}

// ── MaximumTrajectoryLength ────────────────────────────────────────

/// Rejects candidates whose trajectory length reaches a maximum.
///
/// With observer positions registered, a candidate is also rejected as soon
/// as no observer is reachable within the remaining length. Bids the
/// remaining length as the next step.
#[derive(Debug)]
pub struct MaximumTrajectoryLength {
    max_length: f64,
    observers: Vec<Vector3d>,
    condition: Condition,
}

impl MaximumTrajectoryLength {
    /// Condition at `max_length`.
    pub fn new(max_length: f64) -> Self {
        Self {
            max_length,
            observers: Vec::new(),
            condition: Condition::new("MaximumTrajectoryLength"),
        }
    }

    /// The maximum trajectory length.
    pub fn max_length(&self) -> f64 {
        self.max_length
    }

    /// Reject candidates that can no longer reach `position`.
    pub fn add_observer_position(&mut self, position: Vector3d) {
        self.observers.push(position);
    }

    /// Registered observer positions.
    pub fn observer_positions(&self) -> &[Vector3d] {
        &self.observers
    }

    /// Reject/accept settings.
    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }
}

impl Module for MaximumTrajectoryLength {
    fn name(&self) -> &str {
        "MaximumTrajectoryLength"
    }

    fn describe(&self) -> String {
        describe_condition(
            format!(
                "Maximum trajectory length: {} Mpc, {} observer positions",
                self.max_length / MPC,
                self.observers.len()
            ),
            &self.condition,
        )
    }

    fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let length = c.trajectory_length();
        if !self.observers.is_empty() {
            let position = *c.current.position();
            let reachable = self
                .observers
                .iter()
                .any(|o| (position - o).norm() + length < self.max_length);
            if !reachable {
                return self.condition.reject(c, ctx);
            }
        }
        if length >= self.max_length {
            self.condition.reject(c, ctx)
        } else {
            c.limit_next_step(self.max_length - length);
            Ok(())
        }
    }
}

// ── scalar thresholds ──────────────────────────────────────────────

/// Rejects candidates with energy at or below a minimum.
#[derive(Debug)]
pub struct MinimumEnergy {
    min_energy: f64,
    condition: Condition,
}

impl MinimumEnergy {
    /// Condition at `min_energy`.
    pub fn new(min_energy: f64) -> Self {
        Self {
            min_energy,
            condition: Condition::new("MinimumEnergy"),
        }
    }

    /// The energy threshold.
    pub fn min_energy(&self) -> f64 {
        self.min_energy
    }

    /// Reject/accept settings.
    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }
}

impl Module for MinimumEnergy {
    fn name(&self) -> &str {
        "MinimumEnergy"
    }

    fn describe(&self) -> String {
        describe_condition(
            format!("Minimum energy: {} EeV", self.min_energy / EEV),
            &self.condition,
        )
    }

    fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        if c.current.energy() > self.min_energy {
            Ok(())
        } else {
            self.condition.reject(c, ctx)
        }
    }
}

/// Rejects candidates with rigidity `E / (Z e)` below a minimum, in volts.
/// Neutral particles have infinite rigidity and always pass.
#[derive(Debug)]
pub struct MinimumRigidity {
    min_rigidity: f64,
    condition: Condition,
}

impl MinimumRigidity {
    /// Condition at `min_rigidity`.
    pub fn new(min_rigidity: f64) -> Self {
        Self {
            min_rigidity,
            condition: Condition::new("MinimumRigidity"),
        }
    }

    /// Reject/accept settings.
    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }
}

impl Module for MinimumRigidity {
    fn name(&self) -> &str {
        "MinimumRigidity"
    }

    fn describe(&self) -> String {
        describe_condition(
            format!("Minimum rigidity: {} EV", self.min_rigidity / 1e18),
            &self.condition,
        )
    }

    fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        if c.current.rigidity() < self.min_rigidity {
            self.condition.reject(c, ctx)
        } else {
            Ok(())
        }
    }
}

/// Rejects candidates at or below a redshift.
#[derive(Debug)]
pub struct MinimumRedshift {
    min_redshift: f64,
    condition: Condition,
}

impl MinimumRedshift {
    /// Condition at `min_redshift`.
    pub fn new(min_redshift: f64) -> Self {
        Self {
            min_redshift,
            condition: Condition::new("MinimumRedshift"),
        }
    }

    /// Reject/accept settings.
    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }
}

impl Module for MinimumRedshift {
    fn name(&self) -> &str {
        "MinimumRedshift"
    }

    fn describe(&self) -> String {
        describe_condition(format!("Minimum redshift: {}", self.min_redshift), &self.condition)
    }

    fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        if c.redshift() > self.min_redshift {
            Ok(())
        } else {
            self.condition.reject(c, ctx)
        }
    }
}

/// Rejects particles with a nuclear charge number below a minimum.
/// Non-nuclei count as Z = 0.
#[derive(Debug)]
pub struct MinimumChargeNumber {
    min_charge: i32,
    condition: Condition,
}

impl MinimumChargeNumber {
    /// Condition at charge number `min_charge`.
    pub fn new(min_charge: i32) -> Self {
        Self {
            min_charge,
            condition: Condition::new("MinimumChargeNumber"),
        }
    }

    /// Reject/accept settings.
    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }
}

impl Module for MinimumChargeNumber {
    fn name(&self) -> &str {
        "MinimumChargeNumber"
    }

    fn describe(&self) -> String {
        describe_condition(format!("Minimum charge number: {}", self.min_charge), &self.condition)
    }

    fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        if charge_number(c.current.id()) < self.min_charge {
            self.condition.reject(c, ctx)
        } else {
            Ok(())
        }
    }
}

// ── DetectionLength ────────────────────────────────────────────────

/// Accepts a candidate once, in the step that carries its trajectory length
/// across a given value.
///
/// Acceptance runs the configured accept action (typically an output) and
/// by default leaves the candidate active. Bids the remaining distance to
/// the detection length.
#[derive(Debug)]
pub struct DetectionLength {
    length: f64,
    condition: Condition,
}

impl DetectionLength {
    /// Detection at trajectory length `length`.
    pub fn new(length: f64) -> Self {
        Self {
            length,
            condition: Condition::new("DetectionLength"),
        }
    }

    /// Reject/accept settings.
    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }
}

impl Module for DetectionLength {
    fn name(&self) -> &str {
        "DetectionLength"
    }

    fn describe(&self) -> String {
        format!("Detection length: {} Mpc", self.length / MPC)
    }

    fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let length = c.trajectory_length();
        if length >= self.length && length - c.current_step() < self.length {
            self.condition.accept(c, ctx)
        } else {
            if length < self.length {
                c.limit_next_step(self.length - length);
            }
            Ok(())
        }
    }
}
