//! Error types for the crprop framework.
//!
//! Organized by when the failure is detected:
//!
//! - [`ConfigError`]: invalid module or run parameters, raised at
//!   construction time before any candidate is processed.
//! - [`ModuleError`]: a failure inside one candidate's step. The scheduler
//!   turns it into a deactivation plus a diagnostic property, so it never
//!   aborts the batch.
//! - [`ParticleIdError`] and [`VariantError`]: fallible lookups and
//!   conversions on the core value types.

use thiserror::Error;

/// Invalid configuration detected while building a module or a run.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A step bound is zero, negative, NaN or infinite.
    #[error("{module}: step bound must be finite and > 0, got {value}")]
    InvalidStep {
        /// Module being configured.
        module: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The minimum step exceeds the maximum step.
    #[error("{module}: minimum step {min} exceeds maximum step {max}")]
    MinStepExceedsMax {
        /// Module being configured.
        module: &'static str,
        /// Configured minimum step.
        min: f64,
        /// Configured maximum step.
        max: f64,
    },

    /// A tolerance lies outside its valid range.
    #[error("{module}: tolerance must lie in (0, 1], got {value}")]
    InvalidTolerance {
        /// Module being configured.
        module: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A parameter is outside its valid range.
    #[error("{module}: invalid {parameter}: {reason}")]
    InvalidParameter {
        /// Module being configured.
        module: &'static str,
        /// Name of the parameter.
        parameter: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A rate or spectrum table is malformed.
    #[error("invalid table: {reason}")]
    InvalidTable {
        /// What is wrong with the table.
        reason: String,
    },

    /// A required builder field was not supplied.
    #[error("{module}: {parameter} is required")]
    Missing {
        /// Module being configured.
        module: &'static str,
        /// Name of the missing parameter.
        parameter: &'static str,
    },
}

/// A failure while processing one candidate.
///
/// Returned by `Module::process`. The scheduler records the error on the
/// candidate and deactivates it; other candidates are unaffected.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ModuleError {
    /// The adaptive integrator reached its minimum step while the error
    /// estimate still exceeded the tolerance.
    #[error("step floor reached at {step} m with error ratio {error_ratio:.3e}")]
    StepFloorReached {
        /// The minimum step that was attempted.
        step: f64,
        /// Error norm divided by tolerance at the floor.
        error_ratio: f64,
    },

    /// The adaptive integrator exhausted its retry budget.
    #[error("step rejected {retries} times without meeting tolerance")]
    RetryBudgetExhausted {
        /// Number of rejected attempts.
        retries: u32,
    },

    /// A derived quantity became NaN or infinite.
    #[error("non-finite {quantity}")]
    NonFinite {
        /// Which quantity was not finite.
        quantity: &'static str,
    },

    /// An interaction produced a particle that cannot exist.
    #[error("invalid particle: {0}")]
    Particle(#[from] ParticleIdError),

    /// Writing output failed.
    #[error("output failed: {reason}")]
    Output {
        /// Description of the I/O failure.
        reason: String,
    },

    /// Any other module-specific failure.
    #[error("{reason}")]
    Failed {
        /// Human-readable description.
        reason: String,
    },
}

/// Failure to build or decode a particle identifier.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParticleIdError {
    /// Charge number below zero.
    #[error("no nucleus with Z < 0 (A={a}, Z={z})")]
    NegativeCharge {
        /// Mass number.
        a: i32,
        /// Charge number.
        z: i32,
    },
    /// Mass number below one.
    #[error("no nucleus with A < 1 (A={a}, Z={z})")]
    NoNucleons {
        /// Mass number.
        a: i32,
        /// Charge number.
        z: i32,
    },
    /// More protons than nucleons.
    #[error("no nucleus with A < Z (A={a}, Z={z})")]
    ChargeExceedsMass {
        /// Mass number.
        a: i32,
        /// Charge number.
        z: i32,
    },
    /// Mass number beyond the three digits the id reserves for it.
    #[error("no nucleus with A > 999 (A={a}, Z={z})")]
    TooManyNucleons {
        /// Mass number.
        a: i32,
        /// Charge number.
        z: i32,
    },
}

/// A typed accessor was called on a [`Variant`](crate::Variant) holding a
/// different type.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("variant holds {actual}, requested {requested}")]
pub struct VariantError {
    /// Type name the caller asked for.
    pub requested: &'static str,
    /// Type name actually stored.
    pub actual: &'static str,
}
