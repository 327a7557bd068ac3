//! Benchmark profiles for the crprop propagation framework.
//!
//! - [`rectilinear_profile`]: straight-line propagation to a fixed
//!   distance with an energy cutoff.
//! - [`deflection_profile`]: Cash–Karp propagation through a uniform
//!   field.
//! - [`disintegration_profile`]: iron nuclei with a flat
//!   photodisintegration table.
//! - [`iron_source`]: the matching particle source.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use crprop_core::particle_id::nucleus_id;
use crprop_core::units::{EEV, KPC, MPC, NANOGAUSS};
use crprop_core::{ConfigError, Vector3d};
use crprop_module::ModuleList;
use crprop_modules::interaction::{Channel, ChannelTable, PhotoDisintegration, RateCurve};
use crprop_modules::{
    MaximumTrajectoryLength, MinimumEnergy, PropagationCK, SimplePropagation, StochasticInteraction,
    UniformField,
};
use crprop_source::{
    CompositeSource, SourceEnergy, SourceIsotropicEmission, SourceParticleType, SourcePosition,
};

/// Straight-line propagation of up to `distance`, stopping below 1 EeV.
pub fn rectilinear_profile(distance: f64) -> Result<ModuleList, ConfigError> {
    let mut list = ModuleList::new();
    list.add(SimplePropagation::new(10.0 * KPC, MPC)?)
        .add(MaximumTrajectoryLength::new(distance))
        .add(MinimumEnergy::new(EEV));
    Ok(list)
}

/// Deflection in a 1 nG field along z, up to `distance`.
pub fn deflection_profile(distance: f64) -> Result<ModuleList, ConfigError> {
    let field = Arc::new(UniformField::new(Vector3d::new(0.0, 0.0, NANOGAUSS)));
    let propagation = PropagationCK::builder()
        .field(field)
        .tolerance(1e-4)
        .min_step(KPC)
        .max_step(MPC)
        .build()?;
    let mut list = ModuleList::new();
    list.add(propagation).add(MaximumTrajectoryLength::new(distance));
    Ok(list)
}

/// Photodisintegration table for iron with a flat `rate` per metre in
/// single-neutron and alpha emission, and the same for every lighter
/// nucleus down the neutron chain to iron-50.
pub fn flat_disintegration_table(rate: f64) -> Result<ChannelTable, ConfigError> {
    let mut table = ChannelTable::new();
    for a in 50..=56 {
        let id = nucleus_id(a, 26).map_err(|e| ConfigError::InvalidTable { reason: e.to_string() })?;
        table.insert(id, Channel::new(100_000, RateCurve::new(vec![1.0, 1e14], vec![rate, rate])?));
        table.insert(id, Channel::new(1, RateCurve::new(vec![1.0, 1e14], vec![rate / 4.0, rate / 4.0])?));
    }
    Ok(table)
}

/// Rectilinear propagation with photodisintegration at `rate` per metre.
pub fn disintegration_profile(distance: f64, rate: f64) -> Result<ModuleList, ConfigError> {
    let interaction = StochasticInteraction::builder(PhotoDisintegration::new(flat_disintegration_table(rate)?))
        .limit(0.1)
        .build()?;
    let mut list = rectilinear_profile(distance)?;
    list.add(interaction);
    Ok(list)
}

/// Isotropic iron source at the origin with fixed `energy`.
pub fn iron_source(energy: f64) -> Result<CompositeSource, ConfigError> {
    let iron = nucleus_id(56, 26).map_err(|e| ConfigError::InvalidTable { reason: e.to_string() })?;
    Ok(CompositeSource::new()
        .with(SourceParticleType::new(iron))
        .with(SourceEnergy::new(energy))
        .with(SourcePosition::new(Vector3d::zeros()))
        .with(SourceIsotropicEmission))
}
