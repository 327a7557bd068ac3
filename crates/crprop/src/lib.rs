//! crprop: cosmic-ray propagation through a pipeline of processing modules.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all crprop sub-crates. For most users, adding `crprop` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use crprop::prelude::*;
//! use crprop::units::{KPC, GPC, MPC};
//!
//! let mut list = ModuleList::new();
//! list.add(SimplePropagation::new(10.0 * KPC, GPC).unwrap())
//!     .add(MaximumTrajectoryLength::new(50.0 * MPC));
//!
//! let state = ParticleState::new(PHOTON, 1.0, Vector3d::zeros(), Vector3d::x());
//! let mut candidate = Candidate::new(state, list.serials());
//! let mut ctx = list.context(42, 0);
//! list.run(&mut candidate, true, false, &mut ctx);
//!
//! assert!(!candidate.is_active());
//! assert!((candidate.current.position().x - 50.0 * MPC).abs() <= 10.0 * KPC);
//! assert!(candidate.has_property(REJECTED_KEY));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `crprop-core` | particle state, candidate, variant, random, errors |
//! | [`pipeline`] | `crprop-module` | module trait, scheduler, bulk runner |
//! | [`modules`] | `crprop-modules` | propagation, interactions, conditions, observers, output |
//! | [`source`] | `crprop-source` | composable particle sources |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core value types (`crprop-core`).
pub use crprop_core as types;

/// SI units and named constants.
pub use crprop_core::units;

/// Particle identifiers.
pub use crprop_core::particle_id;

/// Module trait, scheduler and bulk runner (`crprop-module`).
pub use crprop_module as pipeline;

/// Concrete processing modules (`crprop-modules`).
pub use crprop_modules as modules;

/// Composable particle sources (`crprop-source`).
pub use crprop_source as source;

/// Common imports for typical crprop usage.
///
/// ```rust
/// use crprop::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crprop_core::particle_id::{nucleus_id, PHOTON, PROTON_PDG};
    pub use crprop_core::{
        Candidate, Cosmology, ParticleState, Random, Secondary, SerialCounter, Source, Variant,
        Vector3d,
    };

    // Errors
    pub use crprop_core::{ConfigError, ModuleError};
    pub use crprop_module::RunError;

    // Pipeline
    pub use crprop_module::{
        Completion, Condition, Module, ModuleList, ProcessContext, RunConfig, RunReport,
        FAILED_KEY, REJECTED_KEY,
    };

    // Modules
    pub use crprop_modules::{
        CandidateSplitting, CubicBoundary, ElectronPairProduction, Field, MaximumTrajectoryLength,
        MinimumEnergy, MinimumRedshift, MinimumRigidity, Observer, ObserverFeature,
        ParticleCollector, PeriodicBox, PropagationCK, Redshift, ReflectiveBox, SimplePropagation,
        SphericalBoundary, StochasticInteraction, TextOutput, UniformField, ZeroField,
    };

    // Sources
    pub use crprop_source::{CompositeSource, SourceFeature, SourceList};
}
