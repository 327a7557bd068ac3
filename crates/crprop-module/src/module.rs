//! The [`Module`] trait.
//!
//! Modules are the processing stages of the pipeline. Each one sees the
//! candidate once per pass, may mutate it, add secondaries, deactivate it,
//! and bid for the next step via
//! [`Candidate::limit_next_step`](crprop_core::Candidate::limit_next_step).

use crprop_core::{Candidate, ModuleError};

use crate::context::ProcessContext;

/// A processing stage applied to a candidate once per pass.
///
/// # Contract
///
/// - `&self`: modules are shared across worker threads, so any mutable
///   state (writer buffers, collectors) must be synchronized internally.
/// - `process()` may be called on a candidate that an earlier module in the
///   same pass already deactivated; modules that should only act on active
///   candidates check [`Candidate::is_active`] themselves.
/// - An `Err` from `process()` fails only this candidate: the scheduler
///   records the error on it and deactivates it.
///
/// # Examples
///
/// ```
/// use crprop_core::{Candidate, ModuleError};
/// use crprop_module::{Module, ProcessContext};
///
/// struct StepCap(f64);
///
/// impl Module for StepCap {
///     fn name(&self) -> &str { "StepCap" }
///
///     fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
///         c.limit_next_step(self.0);
///         Ok(())
///     }
/// }
///
/// assert_eq!(StepCap(1.0).describe(), "StepCap");
/// ```
pub trait Module: Send + Sync {
    /// Short name used in diagnostics and failure properties.
    fn name(&self) -> &str;

    /// One-line description including configuration.
    fn describe(&self) -> String {
        self.name().to_owned()
    }

    /// Apply this stage to `candidate`.
    fn process(&self, candidate: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError>;

    /// Called once before a bulk run starts.
    fn begin_run(&self) {}

    /// Called once after a bulk run ends, including interrupted runs.
    fn end_run(&self) {}
}
