//! Rectilinear propagation.

use crprop_core::units::KPC;
use crprop_core::{Candidate, ConfigError, ModuleError};
use crprop_module::{Module, ProcessContext};

use super::validate_step_bounds;

/// Straight-line propagation without fields.
///
/// Each pass advances the candidate by its committed next step, clipped to
/// `[min_step, max_step]`, and bids `max_step` for the next pass.
#[derive(Clone, Debug, PartialEq)]
pub struct SimplePropagation {
    min_step: f64,
    max_step: f64,
}

impl SimplePropagation {
    /// Propagation with steps in `[min_step, max_step]`.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if either bound is not finite and positive, or
    /// `min_step > max_step`.
    pub fn new(min_step: f64, max_step: f64) -> Result<Self, ConfigError> {
        validate_step_bounds("SimplePropagation", min_step, max_step)?;
        Ok(Self { min_step, max_step })
    }

    /// Smallest step taken.
    pub fn min_step(&self) -> f64 {
        self.min_step
    }

    /// Largest step taken.
    pub fn max_step(&self) -> f64 {
        self.max_step
    }
}

impl Default for SimplePropagation {
    fn default() -> Self {
        Self {
            min_step: 0.1 * KPC,
            max_step: 1.0 * crprop_core::units::GPC,
        }
    }
}

impl Module for SimplePropagation {
    fn name(&self) -> &str {
        "SimplePropagation"
    }

    fn describe(&self) -> String {
        format!(
            "SimplePropagation: step size {} - {} kpc",
            self.min_step / KPC,
            self.max_step / KPC
        )
    }

    fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        straight_step(c, self.min_step, self.max_step)
    }
}

/// Advance `c` along its direction by `clip(next_step, min, max)` and bid
/// `max` for the next pass.
pub(crate) fn straight_step(c: &mut Candidate, min_step: f64, max_step: f64) -> Result<(), ModuleError> {
    c.previous = c.current.clone();
    let step = c.next_step().clamp(min_step, max_step);
    let position = c.current.position() + c.current.direction() * step;
    if !crprop_core::vector::is_finite(&position) {
        return Err(ModuleError::NonFinite { quantity: "position" });
    }
    c.current.set_position(position);
    c.set_current_step(step);
    c.limit_next_step(max_step);
    Ok(())
}
