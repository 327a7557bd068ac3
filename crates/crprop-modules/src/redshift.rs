//! Cosmological redshift and adiabatic energy loss.

use crprop_core::{Candidate, Cosmology, ModuleError};
use crprop_module::{Module, ProcessContext};

/// Decreases the redshift along the path and applies the adiabatic loss
/// `dE / dz = E / (1 + z)`.
///
/// Uses the small-step approximation `dz = H(z) / c · step`, never letting
/// the redshift drop below zero. Candidates already at zero redshift are
/// left alone.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Redshift {
    cosmology: Cosmology,
}

impl Redshift {
    /// Redshift module for `cosmology`.
    pub fn new(cosmology: Cosmology) -> Self {
        Self { cosmology }
    }

    /// The cosmology in use.
    pub fn cosmology(&self) -> &Cosmology {
        &self.cosmology
    }
}

impl Module for Redshift {
    fn name(&self) -> &str {
        "Redshift"
    }

    fn describe(&self) -> String {
        format!(
            "Redshift: h = {}, omegaM = {}, omegaL = {}",
            self.cosmology.h, self.cosmology.omega_m, self.cosmology.omega_l
        )
    }

    fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let z = c.redshift();
        if z <= f64::MIN_POSITIVE {
            return Ok(());
        }
        let dz = self.cosmology.redshift_change(z, c.current_step()).min(z);
        c.set_redshift(z - dz);
        let energy = c.current.energy();
        c.current.set_energy(energy * (1.0 - dz / (1.0 + z)));
        Ok(())
    }
}
