//! Concrete processing modules for the crprop pipeline.
//!
//! Every type here implements [`crprop_module::Module`] and can be added to
//! a [`ModuleList`](crprop_module::ModuleList):
//!
//! - [`propagation`]: rectilinear and Cash–Karp deflection propagation
//!   through a [`Field`].
//! - [`interaction`]: the stochastic sampler and its interaction models.
//! - [`pair_production`] and [`redshift`]: continuous energy losses.
//! - [`break_condition`] and [`boundary`]: termination and wrapping.
//! - [`observer`]: detection surfaces and vetoes.
//! - [`output`]: collectors and text writers.
//! - [`splitting`]: weight splitting on energy-bin crossings.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod break_condition;
pub mod field;
pub mod interaction;
pub mod observer;
pub mod output;
pub mod pair_production;
pub mod propagation;
pub mod redshift;
pub mod splitting;

pub use boundary::{CubicBoundary, PeriodicBox, ReflectiveBox, SphericalBoundary};
pub use break_condition::{
    DetectionLength, MaximumTrajectoryLength, MinimumChargeNumber, MinimumEnergy, MinimumRedshift,
    MinimumRigidity,
};
pub use field::{Field, UniformField, ZeroField};
pub use interaction::{InteractionModel, StochasticInteraction};
pub use observer::{DetectionState, Observer, ObserverFeature};
pub use output::{Column, Columns, OutputType, ParticleCollector, TextOutput};
pub use pair_production::ElectronPairProduction;
pub use propagation::{PropagationCK, SimplePropagation};
pub use redshift::Redshift;
pub use splitting::CandidateSplitting;
