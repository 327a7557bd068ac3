//! Source features.

use crprop_core::units::EEV;
use crprop_core::{Candidate, ConfigError, ParticleState, Random, Vector3d};

use crate::SourceFeature;

fn invalid(module: &'static str, parameter: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidParameter { module, parameter, reason }
}

// ── particle type ──────────────────────────────────────────────────

/// Fixed particle type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceParticleType {
    id: i32,
}

impl SourceParticleType {
    /// Emit particles of `id`.
    pub fn new(id: i32) -> Self {
        Self { id }
    }
}

impl SourceFeature for SourceParticleType {
    fn prepare_particle(&self, state: &mut ParticleState, _random: &mut Random) {
        state.set_id(self.id);
    }

    fn describe(&self) -> String {
        format!("SourceParticleType: {}", self.id)
    }
}

/// Particle type drawn from a weighted list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceMultipleParticleTypes {
    ids: Vec<i32>,
    cumulative: Vec<f64>,
}

impl SourceMultipleParticleTypes {
    /// Empty list. Leaves the particle type unchanged until a type is added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` with relative abundance `weight`.
    pub fn add(&mut self, id: i32, weight: f64) -> Result<&mut Self, ConfigError> {
        if !(weight.is_finite() && weight > 0.0) {
            return Err(invalid(
                "SourceMultipleParticleTypes",
                "weight",
                format!("must be finite and > 0, got {weight}"),
            ));
        }
        let total = self.cumulative.last().copied().unwrap_or(0.0) + weight;
        self.ids.push(id);
        self.cumulative.push(total);
        Ok(self)
    }
}

impl SourceFeature for SourceMultipleParticleTypes {
    fn prepare_particle(&self, state: &mut ParticleState, random: &mut Random) {
        let Some(&total) = self.cumulative.last() else {
            return;
        };
        let pick = random.uniform() * total;
        let index = self.cumulative.iter().position(|&c| pick < c).unwrap_or(self.ids.len() - 1);
        state.set_id(self.ids[index]);
    }

    fn describe(&self) -> String {
        format!("SourceMultipleParticleTypes: {:?}", self.ids)
    }
}

// ── energy ─────────────────────────────────────────────────────────

/// Fixed energy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceEnergy {
    energy: f64,
}

impl SourceEnergy {
    /// Emit particles with `energy` (joules).
    pub fn new(energy: f64) -> Self {
        Self { energy }
    }
}

impl SourceFeature for SourceEnergy {
    fn prepare_particle(&self, state: &mut ParticleState, _random: &mut Random) {
        state.set_energy(self.energy);
    }

    fn describe(&self) -> String {
        format!("SourceEnergy: {} EeV", self.energy / EEV)
    }
}

/// Power-law spectrum dN/dE ∝ E^index on `[e_min, e_max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourcePowerLawSpectrum {
    e_min: f64,
    e_max: f64,
    index: f64,
}

impl SourcePowerLawSpectrum {
    /// Spectrum between `e_min` and `e_max` (joules).
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] unless `0 < e_min <= e_max` and all
    /// values are finite.
    pub fn new(e_min: f64, e_max: f64, index: f64) -> Result<Self, ConfigError> {
        if !(e_min.is_finite() && e_max.is_finite() && e_min > 0.0 && e_min <= e_max) {
            return Err(invalid(
                "SourcePowerLawSpectrum",
                "energy range",
                format!("need 0 < e_min <= e_max, got {e_min} and {e_max}"),
            ));
        }
        if !index.is_finite() {
            return Err(invalid("SourcePowerLawSpectrum", "index", format!("must be finite, got {index}")));
        }
        Ok(Self { e_min, e_max, index })
    }
}

impl SourceFeature for SourcePowerLawSpectrum {
    fn prepare_particle(&self, state: &mut ParticleState, random: &mut Random) {
        state.set_energy(random.power_law(self.index, self.e_min, self.e_max));
    }

    fn describe(&self) -> String {
        format!(
            "SourcePowerLawSpectrum: {} - {} EeV, index {}",
            self.e_min / EEV,
            self.e_max / EEV,
            self.index
        )
    }
}

// ── position ───────────────────────────────────────────────────────

/// Fixed position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourcePosition {
    position: Vector3d,
}

impl SourcePosition {
    /// Emit from `position`.
    pub fn new(position: Vector3d) -> Self {
        Self { position }
    }
}

impl SourceFeature for SourcePosition {
    fn prepare_particle(&self, state: &mut ParticleState, _random: &mut Random) {
        state.set_position(self.position);
    }

    fn describe(&self) -> String {
        format!("SourcePosition: {:?}", self.position.as_slice())
    }
}

/// Position uniformly distributed within a sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceUniformSphere {
    center: Vector3d,
    radius: f64,
}

impl SourceUniformSphere {
    /// Sphere of `radius` around `center`.
    pub fn new(center: Vector3d, radius: f64) -> Result<Self, ConfigError> {
        if !(radius.is_finite() && radius >= 0.0) {
            return Err(invalid("SourceUniformSphere", "radius", format!("must be finite and >= 0, got {radius}")));
        }
        Ok(Self { center, radius })
    }
}

impl SourceFeature for SourceUniformSphere {
    fn prepare_particle(&self, state: &mut ParticleState, random: &mut Random) {
        let r = self.radius * random.uniform().cbrt();
        let position = self.center + random.isotropic_vector() * r;
        state.set_position(position);
    }

    fn describe(&self) -> String {
        format!("SourceUniformSphere: radius {} m", self.radius)
    }
}

// ── direction ──────────────────────────────────────────────────────

/// Fixed emission direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceDirection {
    direction: Vector3d,
}

impl SourceDirection {
    /// Emit along `direction`; normalized on use.
    pub fn new(direction: Vector3d) -> Self {
        Self { direction }
    }
}

impl SourceFeature for SourceDirection {
    fn prepare_particle(&self, state: &mut ParticleState, _random: &mut Random) {
        state.set_direction(self.direction);
    }

    fn describe(&self) -> String {
        format!("SourceDirection: {:?}", self.direction.as_slice())
    }
}

/// Isotropic emission.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SourceIsotropicEmission;

impl SourceFeature for SourceIsotropicEmission {
    fn prepare_particle(&self, state: &mut ParticleState, random: &mut Random) {
        state.set_direction(random.isotropic_vector());
    }

    fn describe(&self) -> String {
        "SourceIsotropicEmission".to_owned()
    }
}

/// Emission uniformly distributed within a cone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceEmissionCone {
    direction: Vector3d,
    aperture: f64,
}

impl SourceEmissionCone {
    /// Cone of half-opening `aperture` radians around `direction`.
    pub fn new(direction: Vector3d, aperture: f64) -> Result<Self, ConfigError> {
        if !(aperture.is_finite() && (0.0..=std::f64::consts::PI).contains(&aperture)) {
            return Err(invalid(
                "SourceEmissionCone",
                "aperture",
                format!("must lie in [0, pi], got {aperture}"),
            ));
        }
        Ok(Self { direction, aperture })
    }
}

impl SourceFeature for SourceEmissionCone {
    fn prepare_particle(&self, state: &mut ParticleState, random: &mut Random) {
        state.set_direction(random.cone_vector(&self.direction, self.aperture));
    }

    fn describe(&self) -> String {
        format!("SourceEmissionCone: aperture {} rad around {:?}", self.aperture, self.direction.as_slice())
    }
}

// ── candidate attributes ───────────────────────────────────────────

/// Fixed source redshift.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceRedshift {
    z: f64,
}

impl SourceRedshift {
    /// Emit at redshift `z`.
    pub fn new(z: f64) -> Self {
        Self { z }
    }
}

impl SourceFeature for SourceRedshift {
    fn prepare_candidate(&self, candidate: &mut Candidate, _random: &mut Random) {
        candidate.set_redshift(self.z);
    }

    fn describe(&self) -> String {
        format!("SourceRedshift: {}", self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crprop_core::particle_id::{PHOTON, PROTON_PDG};
    use crprop_core::units::MPC;
    use proptest::prelude::*;

    #[test]
    fn multiple_types_follow_weights() {
        let mut types = SourceMultipleParticleTypes::new();
        types.add(PHOTON, 1.0).unwrap().add(PROTON_PDG, 1.0).unwrap();
        assert!(types.add(PHOTON, -1.0).is_err());

        let mut rng = Random::seeded(5);
        let mut state = ParticleState::default();
        let n = 2000;
        let mut photons = 0;
        for _ in 0..n {
            types.prepare_particle(&mut state, &mut rng);
            if state.id() == PHOTON {
                photons += 1;
            }
        }
        assert!((photons as f64 / n as f64 - 0.5).abs() < 0.05);
    }

    #[test]
    fn empty_type_list_keeps_id() {
        let mut state = ParticleState::default();
        state.set_id(PROTON_PDG);
        SourceMultipleParticleTypes::new().prepare_particle(&mut state, &mut Random::seeded(0));
        assert_eq!(state.id(), PROTON_PDG);
    }

    #[test]
    fn invalid_parameters_rejected() {
        assert!(SourcePowerLawSpectrum::new(0.0, 1.0, -2.0).is_err());
        assert!(SourcePowerLawSpectrum::new(2.0, 1.0, -2.0).is_err());
        assert!(SourceUniformSphere::new(Vector3d::zeros(), -1.0).is_err());
        assert!(SourceEmissionCone::new(Vector3d::x(), 4.0).is_err());
    }

    #[test]
    fn redshift_is_candidate_level() {
        let mut c = Candidate::new(ParticleState::default(), &crprop_core::SerialCounter::default());
        SourceRedshift::new(1.5).prepare_candidate(&mut c, &mut Random::seeded(0));
        assert_eq!(c.redshift(), 1.5);
    }

    proptest! {
        #[test]
        fn power_law_stays_in_range(seed in any::<u64>(), index in -3.0f64..-1.5) {
            let spectrum = SourcePowerLawSpectrum::new(EEV, 100.0 * EEV, index).unwrap();
            let mut state = ParticleState::default();
            spectrum.prepare_particle(&mut state, &mut Random::seeded(seed));
            prop_assert!(state.energy() >= EEV * (1.0 - 1e-9));
            prop_assert!(state.energy() <= 100.0 * EEV * (1.0 + 1e-9));
        }

        #[test]
        fn uniform_sphere_stays_inside(seed in any::<u64>()) {
            let center = Vector3d::new(MPC, -MPC, 0.0);
            let sphere = SourceUniformSphere::new(center, 2.0 * MPC).unwrap();
            let mut state = ParticleState::default();
            sphere.prepare_particle(&mut state, &mut Random::seeded(seed));
            prop_assert!((state.position() - center).norm() <= 2.0 * MPC * (1.0 + 1e-12));
        }

        #[test]
        fn cone_stays_within_aperture(seed in any::<u64>(), aperture in 0.01f64..3.0) {
            let axis = Vector3d::new(0.0, 1.0, 1.0);
            let cone = SourceEmissionCone::new(axis, aperture).unwrap();
            let mut state = ParticleState::default();
            cone.prepare_particle(&mut state, &mut Random::seeded(seed));
            let cos = state.direction().dot(&axis.normalize());
            prop_assert!(cos >= aperture.cos() - 1e-9);
        }
    }
}
