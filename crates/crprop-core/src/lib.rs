//! Core types for the crprop cosmic-ray propagation framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! per-particle value types and the mutable simulation record that every
//! processing module operates on:
//!
//! - [`ParticleState`]: identity, energy, position and direction of one particle.
//! - [`Candidate`]: four state snapshots, step bookkeeping, a property bag
//!   and the owned tree of secondaries.
//! - [`Variant`]: the tagged value stored in the property bag.
//! - [`Random`]: the per-stream random-number capability.
//! - [`SerialCounter`]: explicit source of candidate serial numbers.
//! - [`Source`]: the capability that produces initial particle states.
//!
//! Units follow SI throughout; see [`units`] for the named constants.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod candidate;
pub mod cosmology;
pub mod error;
pub mod particle_id;
pub mod particle_state;
pub mod random;
pub mod serial;
pub mod source;
pub mod units;
pub mod variant;
pub mod vector;

pub use candidate::{Candidate, Secondary, PRIMARY_TAG};
pub use cosmology::Cosmology;
pub use error::{ConfigError, ModuleError, ParticleIdError, VariantError};
pub use particle_state::ParticleState;
pub use random::Random;
pub use serial::SerialCounter;
pub use source::Source;
pub use variant::Variant;
pub use vector::Vector3d;
