//! Particle identifiers in the PDG Monte Carlo numbering scheme.
//!
//! Nuclei are encoded as `±10LZZZAAAI` with `L = I = 0`, i.e.
//! `1_000_000_000 + Z * 10_000 + A * 10`. The free neutron (2112) and
//! proton (2212) are treated as nuclei with A = 1.

use crate::error::ParticleIdError;
use crate::units::{C_SQUARED, MASS_NEUTRON, MASS_PROTON, MEV};

/// Photon.
pub const PHOTON: i32 = 22;
/// Electron.
pub const ELECTRON: i32 = 11;
/// Positron.
pub const POSITRON: i32 = -11;
/// Electron neutrino.
pub const NU_ELECTRON: i32 = 12;
/// Muon.
pub const MUON: i32 = 13;
/// Muon neutrino.
pub const NU_MUON: i32 = 14;
/// PDG code of the free neutron.
pub const NEUTRON_PDG: i32 = 2112;
/// PDG code of the free proton.
pub const PROTON_PDG: i32 = 2212;

const NUCLEUS_BASE: i32 = 1_000_000_000;

/// Encode a nucleus with mass number `a` and charge number `z`.
///
/// # Errors
///
/// Returns [`ParticleIdError`] if `z < 0`, `a < 1`, `a > 999` or `a < z`.
pub fn nucleus_id(a: i32, z: i32) -> Result<i32, ParticleIdError> {
    if z < 0 {
        return Err(ParticleIdError::NegativeCharge { a, z });
    }
    if a < 1 {
        return Err(ParticleIdError::NoNucleons { a, z });
    }
    if a > 999 {
        return Err(ParticleIdError::TooManyNucleons { a, z });
    }
    if a < z {
        return Err(ParticleIdError::ChargeExceedsMass { a, z });
    }
    Ok(NUCLEUS_BASE + z * 10_000 + a * 10)
}

/// Whether `id` denotes a nucleus or a free nucleon (either sign).
pub fn is_nucleus(id: i32) -> bool {
    let abs = id.unsigned_abs();
    matches!(abs, 2112 | 2212) || (1_000_000_000..2_000_000_000).contains(&abs)
}

/// Nuclear charge number Z of a nucleus; 0 for anything else.
///
/// Antinuclei report the same Z as their partner; the sign lives in the id.
pub fn charge_number(id: i32) -> i32 {
    match id.unsigned_abs() {
        2212 => 1,
        2112 => 0,
        abs @ 1_000_000_000..=1_999_999_999 => ((abs / 10_000) % 1000) as i32,
        _ => 0,
    }
}

/// Mass number A of a nucleus; 0 for anything else.
pub fn mass_number(id: i32) -> i32 {
    match id.unsigned_abs() {
        2212 | 2112 => 1,
        abs @ 1_000_000_000..=1_999_999_999 => ((abs / 10) % 1000) as i32,
        _ => 0,
    }
}

/// Electric charge in units of the elementary charge, including leptons.
pub fn charge_in_units(id: i32) -> i32 {
    if is_nucleus(id) {
        return charge_number(id) * id.signum();
    }
    match id {
        ELECTRON | MUON => -1,
        POSITRON => 1,
        -13 => 1,
        211 => 1,
        -211 => -1,
        _ => 0,
    }
}

/// Rest mass of a nucleus with mass number `a` and charge number `z`.
///
/// Free nucleons use their measured masses; heavier nuclei subtract the
/// semi-empirical (Bethe–Weizsäcker) binding energy from the nucleon sum.
pub fn nuclear_mass(a: i32, z: i32) -> f64 {
    let n = a - z;
    let nucleons = f64::from(z) * MASS_PROTON + f64::from(n) * MASS_NEUTRON;
    if a <= 1 {
        return nucleons;
    }
    nucleons - binding_energy(a, z) / C_SQUARED
}

fn binding_energy(a: i32, z: i32) -> f64 {
    let af = f64::from(a);
    let zf = f64::from(z);
    let nf = af - zf;
    let volume = 15.8 * af;
    let surface = 18.3 * af.powf(2.0 / 3.0);
    let coulomb = 0.714 * zf * (zf - 1.0) / af.powf(1.0 / 3.0);
    let asymmetry = 23.2 * (nf - zf).powi(2) / af;
    let pairing = match (z % 2, (a - z) % 2) {
        (0, 0) => 12.0 / af.sqrt(),
        (1, 1) => -12.0 / af.sqrt(),
        _ => 0.0,
    };
    ((volume - surface - coulomb - asymmetry + pairing) * MEV).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::AMU;

    #[test]
    fn iron_roundtrips_through_id() {
        let id = nucleus_id(56, 26).unwrap();
        assert_eq!(id, 1_000_260_560);
        assert!(is_nucleus(id));
        assert_eq!(mass_number(id), 56);
        assert_eq!(charge_number(id), 26);
    }

    #[test]
    fn invalid_nuclei_are_rejected() {
        assert_eq!(
            nucleus_id(4, -1),
            Err(ParticleIdError::NegativeCharge { a: 4, z: -1 })
        );
        assert_eq!(nucleus_id(0, 0), Err(ParticleIdError::NoNucleons { a: 0, z: 0 }));
        assert_eq!(
            nucleus_id(2, 3),
            Err(ParticleIdError::ChargeExceedsMass { a: 2, z: 3 })
        );
        assert_eq!(
            nucleus_id(1000, 26),
            Err(ParticleIdError::TooManyNucleons { a: 1000, z: 26 })
        );
        assert!(nucleus_id(999, 26).is_ok());
    }

    #[test]
    fn extreme_ids_do_not_overflow() {
        assert_eq!(charge_number(i32::MIN), 0);
        assert_eq!(mass_number(i32::MIN), 0);
        assert_eq!(charge_number(i32::MAX), 0);
        assert!(!is_nucleus(i32::MIN));
    }

    #[test]
    fn free_nucleons_count_as_nuclei() {
        assert!(is_nucleus(NEUTRON_PDG));
        assert!(is_nucleus(PROTON_PDG));
        assert_eq!(mass_number(PROTON_PDG), 1);
        assert_eq!(charge_number(PROTON_PDG), 1);
        assert!(!is_nucleus(PHOTON));
        assert!(!is_nucleus(ELECTRON));
    }

    #[test]
    fn lepton_charges() {
        assert_eq!(charge_in_units(ELECTRON), -1);
        assert_eq!(charge_in_units(POSITRON), 1);
        assert_eq!(charge_in_units(PHOTON), 0);
        assert_eq!(charge_in_units(NU_ELECTRON), 0);
    }

    #[test]
    fn antinucleus_charge_is_negative() {
        let anti_helium = -nucleus_id(4, 2).unwrap();
        assert_eq!(charge_number(anti_helium), 2);
        assert_eq!(charge_in_units(anti_helium), -2);
    }

    #[test]
    fn iron_mass_close_to_56_amu() {
        let m = nuclear_mass(56, 26);
        assert!((m / (56.0 * AMU) - 1.0).abs() < 0.01);
    }
}
