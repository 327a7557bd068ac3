//! Continuous energy loss of nuclei by electron-positron pair production.

use crprop_core::particle_id::{charge_number, is_nucleus, mass_number};
use crprop_core::units::EV;
use crprop_core::{Candidate, ConfigError, ModuleError};
use crprop_module::{Module, ProcessContext};

use crate::interaction::interpolate;

/// Spectral index of the loss rate above the tabulated range.
const EXTRAPOLATION_INDEX: f64 = 0.4;

/// Pair-production energy loss of protons and nuclei.
///
/// The loss rate of a proton is tabulated over energy. A nucleus of mass
/// number A and charge Z at energy E and redshift z loses
/// `b(E (1 + z) / A) · Z² / A` per metre, where `b` is interpolated
/// linearly inside the table, zero below it, and continued as a power law
/// of index 0.4 above it. The loss over a step is taken in the local frame,
/// `b · step / (1 + z)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ElectronPairProduction {
    energies: Vec<f64>,
    loss_rates: Vec<f64>,
}

impl ElectronPairProduction {
    /// Loss module over the proton table `(energies[i], loss_rates[i])`,
    /// with loss rates in energy per metre.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidTable`] if the table is empty or ragged,
    /// energies are not positive and strictly increasing, or a loss rate is
    /// negative or non-finite.
    pub fn new(energies: Vec<f64>, loss_rates: Vec<f64>) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidTable {
            reason: format!("pair production: {reason}"),
        };
        if energies.is_empty() || energies.len() != loss_rates.len() {
            return Err(invalid("table must be non-empty with one loss rate per energy"));
        }
        if !energies.iter().all(|e| e.is_finite() && *e > 0.0) || energies.windows(2).any(|w| w[1] <= w[0]) {
            return Err(invalid("energies must be positive and strictly increasing"));
        }
        if !loss_rates.iter().all(|b| b.is_finite() && *b >= 0.0) {
            return Err(invalid("loss rates must be finite and >= 0"));
        }
        Ok(Self { energies, loss_rates })
    }

    /// Energy loss per metre of nucleus `id` at energy `energy` and
    /// redshift `z`.
    pub fn loss_rate(&self, id: i32, energy: f64, z: f64) -> f64 {
        let charge = charge_number(id);
        if charge < 1 {
            return 0.0;
        }
        let a = f64::from(mass_number(id));
        let effective = energy / a * (1.0 + z);
        let first = self.energies[0];
        let last = self.energies[self.energies.len() - 1];
        if effective < first {
            return 0.0;
        }
        let rate = if effective < last {
            interpolate(effective, &self.energies, &self.loss_rates)
        } else {
            self.loss_rates[self.loss_rates.len() - 1] * (effective / last).powf(EXTRAPOLATION_INDEX)
        };
        rate * f64::from(charge * charge) / a * (1.0 + z).powi(2)
    }
}

impl Module for ElectronPairProduction {
    fn name(&self) -> &str {
        "ElectronPairProduction"
    }

    fn describe(&self) -> String {
        format!(
            "ElectronPairProduction: {} points from {} eV",
            self.energies.len(),
            self.energies[0] / EV
        )
    }

    fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let id = c.current.id();
        if !is_nucleus(id) {
            return Ok(());
        }
        let energy = c.current.energy();
        let z = c.redshift();
        let loss = self.loss_rate(id, energy, z) * c.current_step() / (1.0 + z);
        if !loss.is_finite() {
            return Err(ModuleError::NonFinite { quantity: "pair production loss" });
        }
        c.current.set_energy(energy - loss);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crprop_core::particle_id::{nucleus_id, PHOTON};
    use crprop_core::units::{EEV, MPC};
    use crprop_core::{ParticleState, SerialCounter, Vector3d};

    /// Loss rate unit: 1 EeV per 1000 Mpc.
    const B: f64 = 1e-3 * EEV / MPC;

    fn module() -> ElectronPairProduction {
        ElectronPairProduction::new(vec![1.0 * EEV, 10.0 * EEV], vec![1.0 * B, 2.0 * B]).unwrap()
    }

    fn candidate(id: i32, energy: f64) -> Candidate {
        Candidate::new(
            ParticleState::new(id, energy, Vector3d::zeros(), Vector3d::x()),
            &SerialCounter::default(),
        )
    }

    #[test]
    fn validation() {
        assert!(ElectronPairProduction::new(vec![], vec![]).is_err());
        assert!(ElectronPairProduction::new(vec![2.0, 1.0], vec![1.0, 1.0]).is_err());
        assert!(ElectronPairProduction::new(vec![1.0, 2.0], vec![1.0, -1.0]).is_err());
    }

    #[test]
    fn rate_regimes() {
        let m = module();
        let p = nucleus_id(1, 1).unwrap();
        assert_eq!(m.loss_rate(p, 0.5 * EEV, 0.0), 0.0);
        assert!((m.loss_rate(p, 5.5 * EEV, 0.0) / B - 1.5).abs() < 1e-12);
        let above = m.loss_rate(p, 100.0 * EEV, 0.0);
        assert!((above / B - 2.0 * 10f64.powf(0.4)).abs() < 1e-9);
        assert_eq!(m.loss_rate(nucleus_id(1, 0).unwrap(), 5.0 * EEV, 0.0), 0.0);
    }

    #[test]
    fn nuclei_scale_with_charge_squared_over_mass() {
        let m = module();
        let p = m.loss_rate(nucleus_id(1, 1).unwrap(), 5.0 * EEV, 0.0);
        let fe = m.loss_rate(nucleus_id(56, 26).unwrap(), 56.0 * 5.0 * EEV, 0.0);
        assert!((fe / p - 26.0 * 26.0 / 56.0).abs() < 1e-9);
    }

    #[test]
    fn process_reduces_energy_by_loss_times_step() {
        let m = module();
        let mut c = candidate(nucleus_id(1, 1).unwrap(), 5.5 * EEV);
        c.set_current_step(1.0 * MPC);
        m.process(&mut c, &mut ProcessContext::seeded(0)).unwrap();
        let expected = 5.5 * EEV - 1.5 * B * MPC;
        assert!((c.current.energy() - expected).abs() < 1e-6 * EEV);
    }

    #[test]
    fn photons_are_untouched() {
        let m = module();
        let mut c = candidate(PHOTON, 5.0 * EEV);
        c.set_current_step(1.0 * MPC);
        m.process(&mut c, &mut ProcessContext::seeded(0)).unwrap();
        assert_eq!(c.current.energy(), 5.0 * EEV);
    }
}
