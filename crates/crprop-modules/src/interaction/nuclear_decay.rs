//! Radioactive decay of unstable nuclei.
//!
//! Decay channels are encoded as five decimal digits counting β⁻ decays,
//! β⁺ decays, α emissions, proton emissions and neutron emissions from the
//! most to the least significant digit: `10000` is a single β⁻
//! decay, `1` a single neutron emission.
//!
//! The rest-frame rate `1 / (τ c)` is dilated by the Lorentz factor and
//! converted to a rate per comoving distance with `1 / (1 + z)`.

use indexmap::IndexMap;

use crprop_core::particle_id::{
    charge_number, is_nucleus, mass_number, nuclear_mass, nucleus_id, ELECTRON, NU_ELECTRON, PHOTON, POSITRON,
};
use crprop_core::units::{C_LIGHT, C_SQUARED, MASS_ELECTRON};
use crprop_core::{Candidate, ConfigError, ModuleError, Random, Secondary, Vector3d};
use crprop_module::ProcessContext;

use super::table::{interpolate, ChannelRates};
use super::InteractionModel;

/// Tag set on secondaries produced here.
pub const TAG: &str = "ND";

/// Points of the tabulated β-spectrum CDF.
const BETA_SPECTRUM_POINTS: usize = 51;

/// One decay mode of a nucleus.
#[derive(Clone, Debug, PartialEq)]
pub struct DecayChannel {
    code: i32,
    lifetime: f64,
    gamma_lines: Vec<(f64, f64)>,
}

impl DecayChannel {
    /// Decay mode `code` with rest-frame `lifetime` in seconds and gamma
    /// lines given as `(energy, emission probability)`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidTable`] if the lifetime is not finite and
    /// positive, a line energy is not positive, or a probability lies
    /// outside `[0, 1]`.
    pub fn new(code: i32, lifetime: f64, gamma_lines: Vec<(f64, f64)>) -> Result<Self, ConfigError> {
        if !(lifetime > 0.0 && lifetime.is_finite()) {
            return Err(ConfigError::InvalidTable {
                reason: format!("decay channel {code}: lifetime must be finite and > 0, got {lifetime}"),
            });
        }
        if let Some(&(e, p)) = gamma_lines
            .iter()
            .find(|(e, p)| !(*e > 0.0 && e.is_finite()) || !(0.0..=1.0).contains(p))
        {
            return Err(ConfigError::InvalidTable {
                reason: format!("decay channel {code}: invalid gamma line ({e}, {p})"),
            });
        }
        Ok(Self {
            code,
            lifetime,
            gamma_lines,
        })
    }

    /// Channel code.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Rest-frame decay rate per metre of light travel.
    pub fn rest_rate(&self) -> f64 {
        1.0 / (self.lifetime * C_LIGHT)
    }
}

/// Nuclear decay model.
#[derive(Clone, Debug, Default)]
pub struct NuclearDecay {
    table: IndexMap<i32, Vec<DecayChannel>>,
    have_electrons: bool,
    have_photons: bool,
    have_neutrinos: bool,
}

impl NuclearDecay {
    /// Model with no decay data and all secondary emission disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a decay mode for nucleus `id`.
    pub fn insert(&mut self, id: i32, channel: DecayChannel) -> &mut Self {
        self.table.entry(id).or_default().push(channel);
        self
    }

    /// Emit electrons and positrons.
    pub fn set_have_electrons(&mut self, have: bool) {
        self.have_electrons = have;
    }

    /// Emit de-excitation photons.
    pub fn set_have_photons(&mut self, have: bool) {
        self.have_photons = have;
    }

    /// Emit neutrinos.
    pub fn set_have_neutrinos(&mut self, have: bool) {
        self.have_neutrinos = have;
    }

    /// Mean free path of nucleus `id` at Lorentz factor `gamma` and zero
    /// redshift; infinite for stable particles.
    pub fn mean_free_path(&self, id: i32, gamma: f64) -> f64 {
        let rate: f64 = self.channels(id).iter().map(|d| d.rest_rate() / gamma).sum();
        if rate > 0.0 {
            1.0 / rate
        } else {
            f64::INFINITY
        }
    }

    fn channels(&self, id: i32) -> &[DecayChannel] {
        self.table.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn emission_point(random: &mut Random, c: &Candidate) -> Vector3d {
        random.interpolated_position(c.previous.position(), c.current.position())
    }

    fn gamma_emission(&self, c: &mut Candidate, lines: &[(f64, f64)], ctx: &mut ProcessContext) {
        if lines.is_empty() {
            return;
        }
        let (random, serials) = ctx.split();
        let gamma = c.current.lorentz_factor();
        let at = Self::emission_point(random, c);
        for &(energy, intensity) in lines {
            if random.uniform() > intensity {
                continue;
            }
            let cos_theta = 2.0 * random.uniform() - 1.0;
            let lab = energy * gamma * (1.0 - cos_theta);
            c.add_secondary(Secondary::new(PHOTON, lab).at(at).tagged(TAG), serials);
        }
    }

    fn beta_decay(&self, c: &mut Candidate, beta_plus: bool, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let gamma = c.current.lorentz_factor();
        let id = c.current.id();
        let a = mass_number(id);
        let z = charge_number(id);
        let (lepton, neutrino, dz) = if beta_plus {
            (POSITRON, NU_ELECTRON, -1)
        } else {
            (ELECTRON, -NU_ELECTRON, 1)
        };

        // Nuclear recoil is neglected: the daughter keeps the Lorentz factor.
        c.current.set_id(nucleus_id(a, z + dz)?);
        c.current.set_lorentz_factor(gamma);

        if !(self.have_electrons || self.have_neutrinos) {
            return Ok(());
        }
        let q = (nuclear_mass(a, z) - nuclear_mass(a, z + dz) - MASS_ELECTRON) * C_SQUARED;
        if !(q > 0.0) {
            return Ok(());
        }

        // Electron energy spectrum without Coulomb correction.
        let me = MASS_ELECTRON * C_SQUARED;
        let mut energies = [0.0; BETA_SPECTRUM_POINTS];
        let mut cdf = [0.0; BETA_SPECTRUM_POINTS];
        let mut sum = 0.0;
        for i in 0..BETA_SPECTRUM_POINTS {
            let e = me + i as f64 / (BETA_SPECTRUM_POINTS - 1) as f64 * q;
            sum += e * (e * e - me * me).sqrt() * (q + me - e).powi(2);
            energies[i] = e;
            cdf[i] = sum;
        }

        let (random, serials) = ctx.split();
        let e = interpolate(random.uniform() * sum, &cdf, &energies);
        let p = (e * e - me * me).max(0.0).sqrt();
        let cos_theta = 2.0 * random.uniform() - 1.0;
        let e_lepton = gamma * (e - p * cos_theta);
        let e_neutrino = gamma * (q + me - e) * (1.0 + cos_theta);
        let at = Self::emission_point(random, c);

        if self.have_electrons {
            c.add_secondary(Secondary::new(lepton, e_lepton).at(at).tagged(TAG), serials);
        }
        if self.have_neutrinos {
            c.add_secondary(Secondary::new(neutrino, e_neutrino).at(at).tagged(TAG), serials);
        }
        Ok(())
    }

    fn nucleon_emission(c: &mut Candidate, da: i32, dz: i32, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let id = c.current.id();
        let a = mass_number(id);
        let z = charge_number(id);
        let energy_per_nucleon = c.current.energy() / f64::from(a);
        c.current.set_id(nucleus_id(a - da, z - dz)?);
        c.current.set_energy(energy_per_nucleon * f64::from(a - da));

        let (random, serials) = ctx.split();
        let at = Self::emission_point(random, c);
        let fragment = nucleus_id(da, dz)?;
        c.add_secondary(
            Secondary::new(fragment, energy_per_nucleon * f64::from(da)).at(at).tagged(TAG),
            serials,
        );
        Ok(())
    }
}

impl InteractionModel for NuclearDecay {
    fn name(&self) -> &str {
        "NuclearDecay"
    }

    fn describe(&self) -> String {
        format!(
            "NuclearDecay: {} nuclides, electrons {}, photons {}, neutrinos {}",
            self.table.len(),
            self.have_electrons,
            self.have_photons,
            self.have_neutrinos
        )
    }

    fn channel_rates(&self, c: &Candidate, out: &mut ChannelRates) {
        let id = c.current.id();
        if !is_nucleus(id) {
            return;
        }
        let dilation = c.current.lorentz_factor() * (1.0 + c.redshift());
        out.extend(self.channels(id).iter().map(|d| (d.code, d.rest_rate() / dilation)));
    }

    fn interact(&self, c: &mut Candidate, channel: i32, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let digit = |place: i32| (channel / place) % 10;
        let beta_minus = digit(10_000);
        let beta_plus = digit(1_000);
        let alpha = digit(100);
        let protons = digit(10);
        let neutrons = digit(1);

        if self.have_photons {
            let lines = self
                .channels(c.current.id())
                .iter()
                .find(|d| d.code == channel)
                .map(|d| d.gamma_lines.clone())
                .unwrap_or_default();
            self.gamma_emission(c, &lines, ctx);
        }
        for _ in 0..beta_minus {
            self.beta_decay(c, false, ctx)?;
        }
        for _ in 0..beta_plus {
            self.beta_decay(c, true, ctx)?;
        }
        for _ in 0..alpha {
            Self::nucleon_emission(c, 4, 2, ctx)?;
        }
        for _ in 0..protons {
            Self::nucleon_emission(c, 1, 1, ctx)?;
        }
        for _ in 0..neutrons {
            Self::nucleon_emission(c, 1, 0, ctx)?;
        }
        Ok(())
    }
}
