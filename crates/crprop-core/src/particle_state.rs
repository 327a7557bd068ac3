//! [`ParticleState`]: identity, energy, position and direction of one particle.

use crate::particle_id::{self, charge_in_units, is_nucleus};
use crate::units::{C_LIGHT, C_SQUARED, EPLUS, MASS_ELECTRON, MASS_MUON};
use crate::vector::{unit_vector, Vector3d};

/// Kinematic state of a single particle at one point along its trajectory.
///
/// Charge and mass are derived from the particle id whenever it is set and
/// cannot be written independently. The direction is always a unit vector.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleState {
    id: i32,
    energy: f64,
    position: Vector3d,
    direction: Vector3d,
    charge: f64,
    mass: f64,
}

impl Default for ParticleState {
    fn default() -> Self {
        Self {
            id: 0,
            energy: 0.0,
            position: Vector3d::zeros(),
            direction: Vector3d::new(-1.0, 0.0, 0.0),
            charge: 0.0,
            mass: 0.0,
        }
    }
}

impl ParticleState {
    /// Create a state. `direction` is normalized; a zero vector keeps the
    /// default direction.
    pub fn new(id: i32, energy: f64, position: Vector3d, direction: Vector3d) -> Self {
        let mut state = Self::default();
        state.set_id(id);
        state.set_energy(energy);
        state.set_position(position);
        state.set_direction(direction);
        state
    }

    /// Particle id (PDG numbering).
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Set the particle id and re-derive charge and mass.
    pub fn set_id(&mut self, id: i32) {
        self.id = id;
        self.charge = f64::from(charge_in_units(id)) * EPLUS;
        self.mass = if is_nucleus(id) {
            particle_id::nuclear_mass(particle_id::mass_number(id), particle_id::charge_number(id))
        } else {
            match id.abs() {
                11 => MASS_ELECTRON,
                13 => MASS_MUON,
                _ => 0.0,
            }
        };
    }

    /// Total energy in joules.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Set the total energy. Negative values are clamped to zero.
    pub fn set_energy(&mut self, energy: f64) {
        self.energy = energy.max(0.0);
    }

    /// Position in metres.
    pub fn position(&self) -> &Vector3d {
        &self.position
    }

    /// Set the position.
    pub fn set_position(&mut self, position: Vector3d) {
        self.position = position;
    }

    /// Unit direction of motion.
    pub fn direction(&self) -> &Vector3d {
        &self.direction
    }

    /// Set the direction of motion, normalizing `direction`.
    ///
    /// A zero or non-finite vector carries no direction and leaves the
    /// current direction unchanged.
    pub fn set_direction(&mut self, direction: Vector3d) {
        if let Some(unit) = unit_vector(&direction) {
            self.direction = unit;
        }
    }

    /// Electric charge in coulombs.
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Rest mass in kilograms.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Lorentz factor E / (m c²). Infinite for massless particles.
    pub fn lorentz_factor(&self) -> f64 {
        self.energy / (self.mass * C_SQUARED)
    }

    /// Set the energy through the Lorentz factor. No effect on massless
    /// particles.
    pub fn set_lorentz_factor(&mut self, gamma: f64) {
        if self.mass > 0.0 {
            self.set_energy(gamma.max(1.0) * self.mass * C_SQUARED);
        }
    }

    /// Velocity vector, β·c along the direction.
    pub fn velocity(&self) -> Vector3d {
        let beta = if self.mass > 0.0 {
            let gamma = self.lorentz_factor();
            if gamma > 1.0 {
                (1.0 - 1.0 / (gamma * gamma)).sqrt()
            } else {
                0.0
            }
        } else {
            1.0
        };
        self.direction * (beta * C_LIGHT)
    }

    /// Momentum vector in the ultra-relativistic approximation, E/c along
    /// the direction.
    pub fn momentum(&self) -> Vector3d {
        self.direction * (self.energy / C_LIGHT)
    }

    /// Rigidity E / (Z e) in volts. Infinite for neutral particles.
    pub fn rigidity(&self) -> f64 {
        (self.energy / self.charge).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle_id::{nucleus_id, ELECTRON, NEUTRON_PDG, NU_MUON, PHOTON, PROTON_PDG};
    use crate::units::{EEV, MASS_PROTON, VOLT};
    use proptest::prelude::*;

    #[test]
    fn direction_is_normalized() {
        let mut s = ParticleState::default();
        s.set_direction(Vector3d::new(0.0, 3.0, 4.0));
        assert!((s.direction().norm() - 1.0).abs() < 1e-15);
        assert!((s.direction().y - 0.6).abs() < 1e-15);
    }

    #[test]
    fn zero_direction_is_ignored() {
        let mut s = ParticleState::default();
        s.set_direction(Vector3d::new(0.0, 0.0, 1.0));
        s.set_direction(Vector3d::zeros());
        assert_eq!(*s.direction(), Vector3d::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn energy_clamped_at_zero() {
        let mut s = ParticleState::default();
        s.set_energy(-1.0);
        assert_eq!(s.energy(), 0.0);
    }

    #[test]
    fn charge_and_mass_follow_id() {
        let mut s = ParticleState::default();
        s.set_id(PROTON_PDG);
        assert_eq!(s.charge(), EPLUS);
        assert!((s.mass() / MASS_PROTON - 1.0).abs() < 1e-12);

        s.set_id(nucleus_id(56, 26).unwrap());
        assert_eq!(s.charge(), 26.0 * EPLUS);

        s.set_id(ELECTRON);
        assert_eq!(s.charge(), -EPLUS);
        assert_eq!(s.mass(), MASS_ELECTRON);

        for neutral in [PHOTON, NU_MUON] {
            s.set_id(neutral);
            assert_eq!(s.charge(), 0.0);
            assert_eq!(s.mass(), 0.0);
        }

        s.set_id(NEUTRON_PDG);
        assert_eq!(s.charge(), 0.0);
        assert!(s.mass() > 0.0);
    }

    #[test]
    fn lorentz_factor_roundtrip() {
        let mut s = ParticleState::new(PROTON_PDG, EEV, Vector3d::zeros(), Vector3d::x());
        s.set_lorentz_factor(1e9);
        assert!((s.lorentz_factor() / 1e9 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn photon_moves_at_light_speed() {
        let s = ParticleState::new(PHOTON, EEV, Vector3d::zeros(), Vector3d::y());
        assert_eq!(s.velocity(), Vector3d::new(0.0, C_LIGHT, 0.0));
    }

    #[test]
    fn proton_rigidity_in_volts() {
        let s = ParticleState::new(PROTON_PDG, EEV, Vector3d::zeros(), Vector3d::x());
        assert!((s.rigidity() / (1e18 * VOLT) - 1.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn set_direction_always_yields_unit_vector(
            x in -1e12f64..1e12,
            y in -1e12f64..1e12,
            z in -1e12f64..1e12,
        ) {
            let v = Vector3d::new(x, y, z);
            prop_assume!(v.norm() > 1e-100);
            let mut s = ParticleState::default();
            s.set_direction(v);
            prop_assert!((s.direction().norm() - 1.0).abs() < 1e-12);
        }
    }
}
