//! Photo-pion production on background photons.
//!
//! Rates for free protons and neutrons are tabulated over `γ(1 + z)` and
//! scaled by `(1 + z)²`. Nucleons bound in a nucleus interact with a
//! reduced effective multiplicity. Channel 1 is an interaction on a
//! proton, channel 0 on a neutron.
//!
//! Kinematics follow the Δ-resonance picture: the outgoing nucleon keeps
//! `m_p / m_Δ` of the interacting nucleon's energy and the pion takes the
//! rest. A third of the interactions flip the nucleon isospin and produce a
//! charged pion; the others produce a π⁰. A π⁰ decays into two photons of
//! equal energy; a charged pion decays into a muon neutrino and a muon,
//! which in turn gives an electron and two neutrinos, each of the four
//! leptons carrying a quarter of the pion energy.

use crprop_core::particle_id::{
    charge_number, is_nucleus, mass_number, nucleus_id, ELECTRON, NU_ELECTRON, NU_MUON, PHOTON, POSITRON,
};
use crprop_core::{Candidate, ModuleError, Secondary};
use crprop_module::ProcessContext;

use super::table::{ChannelRates, RateCurve};
use super::InteractionModel;

/// Tag set on secondaries produced here.
pub const TAG: &str = "PPP";

/// Channel code of an interaction on a proton.
pub const ON_PROTON: i32 = 1;
/// Channel code of an interaction on a neutron.
pub const ON_NEUTRON: i32 = 0;

const NUCLEON_ENERGY_FRACTION: f64 = 938.0 / 1232.0;
const ISOSPIN_FLIP_PROBABILITY: f64 = 1.0 / 3.0;

/// Photo-pion production model.
#[derive(Clone, Debug)]
pub struct PhotoPionProduction {
    proton_rate: RateCurve,
    neutron_rate: RateCurve,
    have_photons: bool,
    have_neutrinos: bool,
}

impl PhotoPionProduction {
    /// Model from free-proton and free-neutron rate curves. Secondary
    /// photons, electrons and neutrinos are off by default.
    pub fn new(proton_rate: RateCurve, neutron_rate: RateCurve) -> Self {
        Self {
            proton_rate,
            neutron_rate,
            have_photons: false,
            have_neutrinos: false,
        }
    }

    /// Emit photons and electrons from pion decays.
    pub fn set_have_photons(&mut self, have: bool) {
        self.have_photons = have;
    }

    /// Emit neutrinos from pion decays.
    pub fn set_have_neutrinos(&mut self, have: bool) {
        self.have_neutrinos = have;
    }

    /// Effective number of interacting nucleons of one kind when `x` of
    /// them are bound in a nucleus of mass number `a`.
    pub fn nuclei_modification(a: i32, x: i32) -> f64 {
        let x = f64::from(x);
        match a {
            1 => 1.0,
            2..=8 => 0.85 * x.powf(2.0 / 3.0),
            _ => 0.85 * x,
        }
    }

    fn emit_pion_products(&self, c: &mut Candidate, charge: i32, energy: f64, sign: i32, ctx: &ProcessContext) {
        let serials = ctx.serials();
        let emit = |c: &mut Candidate, id: i32, e: f64| {
            c.add_secondary(Secondary::new(id, e).tagged(TAG), serials);
        };
        match charge {
            0 => {
                if self.have_photons {
                    emit(c, PHOTON, energy / 2.0);
                    emit(c, PHOTON, energy / 2.0);
                }
            }
            q => {
                // π⁺ → μ⁺ ν_μ → e⁺ ν_e ν̄_μ ν_μ, and the conjugate for π⁻.
                let q = q * sign;
                let quarter = energy / 4.0;
                if self.have_photons {
                    emit(c, if q > 0 { POSITRON } else { ELECTRON }, quarter);
                }
                if self.have_neutrinos {
                    emit(c, q * NU_MUON, quarter);
                    emit(c, q * NU_ELECTRON, quarter);
                    emit(c, -q * NU_MUON, quarter);
                }
            }
        }
    }
}

impl InteractionModel for PhotoPionProduction {
    fn name(&self) -> &str {
        "PhotoPionProduction"
    }

    fn channel_rates(&self, c: &Candidate, out: &mut ChannelRates) {
        let id = c.current.id();
        if !is_nucleus(id) {
            return;
        }
        let a = mass_number(id);
        let z = charge_number(id);
        let n = a - z;
        let redshift = c.redshift();
        let x = c.current.lorentz_factor() * (1.0 + redshift);
        let scaling = (1.0 + redshift).powi(2);
        if z > 0 {
            out.push((ON_PROTON, self.proton_rate.value(x) * Self::nuclei_modification(a, z) * scaling));
        }
        if n > 0 {
            out.push((ON_NEUTRON, self.neutron_rate.value(x) * Self::nuclei_modification(a, n) * scaling));
        }
    }

    fn interact(&self, c: &mut Candidate, channel: i32, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let id = c.current.id();
        let sign = id.signum();
        let a = mass_number(id);
        let z = charge_number(id);
        let energy = c.current.energy();
        let energy_per_nucleon = energy / f64::from(a);

        let hit_proton = channel == ON_PROTON;
        let flip = ctx.random().uniform() < ISOSPIN_FLIP_PROBABILITY;
        // Charge of the outgoing nucleon, and of the pion that balances it.
        let nucleon_charge = match (hit_proton, flip) {
            (true, false) | (false, true) => 1,
            (true, true) | (false, false) => 0,
        };
        let pion_charge = i32::from(hit_proton) - nucleon_charge;

        let nucleon_energy = energy_per_nucleon * NUCLEON_ENERGY_FRACTION;
        let pion_energy = energy_per_nucleon - nucleon_energy;
        let nucleon = sign * nucleus_id(1, nucleon_charge)?;

        if a == 1 {
            c.current.set_id(nucleon);
            c.current.set_energy(nucleon_energy);
        } else {
            c.current.set_id(sign * nucleus_id(a - 1, z - i32::from(hit_proton))?);
            c.current.set_energy(energy - energy_per_nucleon);
            c.add_secondary(Secondary::new(nucleon, nucleon_energy).tagged(TAG), ctx.serials());
        }
        self.emit_pion_products(c, pion_charge, pion_energy, sign, ctx);
        Ok(())
    }
}
