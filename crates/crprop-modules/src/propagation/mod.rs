//! Propagation modules: advance the candidate by one step.
//!
//! A propagation module consumes the committed `next_step`, moves
//! `current`, saves the pre-step state in `previous`, records the step
//! length and bids for the next step.

pub mod cash_karp;
pub mod simple;

pub use cash_karp::{ErrorNorm, FloorPolicy, PropagationCK, PropagationCKBuilder};
pub use simple::SimplePropagation;

use crprop_core::ConfigError;

pub(crate) fn validate_step_bounds(module: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    for value in [min, max] {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigError::InvalidStep { module, value });
        }
    }
    if min > max {
        return Err(ConfigError::MinStepExceedsMax { module, min, max });
    }
    Ok(())
}
