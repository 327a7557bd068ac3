//! Flat ΛCDM cosmology.

use crate::units::{C_LIGHT, KILOMETER, MPC, SECOND};

/// Cosmological parameters of a flat ΛCDM universe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cosmology {
    /// Dimensionless Hubble parameter h, H0 = h · 100 km/s/Mpc.
    pub h: f64,
    /// Matter density parameter.
    pub omega_m: f64,
    /// Dark-energy density parameter.
    pub omega_l: f64,
}

impl Default for Cosmology {
    /// Planck 2013 values.
    fn default() -> Self {
        Self {
            h: 0.673,
            omega_m: 0.315,
            omega_l: 1.0 - 0.315,
        }
    }
}

impl Cosmology {
    /// Hubble constant H0 in 1/s.
    pub fn hubble_constant(&self) -> f64 {
        self.h * 100.0 * KILOMETER / SECOND / MPC
    }

    /// Hubble rate H(z) in 1/s.
    pub fn hubble_rate(&self, z: f64) -> f64 {
        let zp1 = 1.0 + z;
        self.hubble_constant() * (self.omega_m * zp1 * zp1 * zp1 + self.omega_l).sqrt()
    }

    /// Redshift decrease over a comoving path of length `step` starting at
    /// redshift `z`, to first order.
    pub fn redshift_change(&self, z: f64, step: f64) -> f64 {
        self.hubble_rate(z) / C_LIGHT * step
    }

    /// Hubble distance c / H0 in metres.
    pub fn hubble_distance(&self) -> f64 {
        C_LIGHT / self.hubble_constant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hubble_rate_at_zero_is_h0() {
        let c = Cosmology::default();
        assert!((c.hubble_rate(0.0) / c.hubble_constant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn hubble_distance_about_4450_mpc() {
        let d = Cosmology::default().hubble_distance() / MPC;
        assert!((d - 4454.0).abs() < 5.0, "{d}");
    }

    #[test]
    fn hubble_rate_grows_with_redshift() {
        let c = Cosmology::default();
        assert!(c.hubble_rate(1.0) > c.hubble_rate(0.5));
    }
}
