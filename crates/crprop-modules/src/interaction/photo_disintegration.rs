//! Photodisintegration of nuclei on background photons.
//!
//! Channels are keyed by nucleus id and encoded as six decimal digits
//! counting emitted neutrons, protons, deuterons, tritons, helium-3 and
//! helium-4 nuclei, from the most to the least significant digit.
//! Channel `100000` is single-neutron emission, `000001` is alpha
//! emission.
//!
//! Rates are tabulated per metre over the Lorentz factor at redshift zero;
//! at redshift `z` the curve is read at `γ(1 + z)` and scaled by `(1 + z)²`.

use crprop_core::particle_id::{charge_number, is_nucleus, mass_number, nucleus_id, PHOTON};
use crprop_core::{Candidate, ModuleError, Secondary};
use crprop_module::ProcessContext;

use super::table::{ChannelRates, ChannelTable};
use super::InteractionModel;

/// Tag set on secondaries produced here.
pub const TAG: &str = "PD";

/// Emitted fragment (A, Z) for each channel digit, most significant first.
const FRAGMENTS: [(i32, i32); 6] = [(1, 0), (1, 1), (2, 1), (3, 1), (3, 2), (4, 2)];

/// Photodisintegration model.
#[derive(Clone, Debug)]
pub struct PhotoDisintegration {
    table: ChannelTable,
    have_photons: bool,
}

impl PhotoDisintegration {
    /// Model over `table`. Photon emission listed in the table is off until
    /// enabled with [`PhotoDisintegration::set_have_photons`].
    pub fn new(table: ChannelTable) -> Self {
        Self {
            table,
            have_photons: false,
        }
    }

    /// Create the photons attached to channels.
    pub fn set_have_photons(&mut self, have: bool) {
        self.have_photons = have;
    }

    /// The rate table.
    pub fn table(&self) -> &ChannelTable {
        &self.table
    }

    /// Fragment counts `[n, p, H2, H3, He3, He4]` of `channel`.
    pub fn fragments(channel: i32) -> [i32; 6] {
        let mut counts = [0; 6];
        let mut rest = channel;
        for slot in counts.iter_mut().rev() {
            *slot = rest % 10;
            rest /= 10;
        }
        counts
    }
}

impl InteractionModel for PhotoDisintegration {
    fn name(&self) -> &str {
        "PhotoDisintegration"
    }

    fn describe(&self) -> String {
        format!("PhotoDisintegration: {} nuclei tabulated", self.table.len())
    }

    fn channel_rates(&self, c: &Candidate, out: &mut ChannelRates) {
        let id = c.current.id();
        if !is_nucleus(id) {
            return;
        }
        let z = c.redshift();
        let x = c.current.lorentz_factor() * (1.0 + z);
        self.table.rates_into(id, x, (1.0 + z).powi(2), out);
    }

    fn interact(&self, c: &mut Candidate, channel: i32, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let id = c.current.id();
        let a = mass_number(id);
        let z = charge_number(id);
        let energy_per_nucleon = c.current.energy() / f64::from(a);
        let gamma = c.current.lorentz_factor();

        let counts = Self::fragments(channel);
        let (mut da, mut dz) = (0, 0);
        for (&n, &(fa, fz)) in counts.iter().zip(FRAGMENTS.iter()) {
            da -= n * fa;
            dz -= n * fz;
        }

        if a + da > 0 {
            c.current.set_id(nucleus_id(a + da, z + dz)?);
            c.current.set_energy(energy_per_nucleon * f64::from(a + da));
        } else {
            c.set_active(false);
        }

        for (&n, &(fa, fz)) in counts.iter().zip(FRAGMENTS.iter()) {
            let fragment = nucleus_id(fa, fz)?;
            for _ in 0..n {
                c.add_secondary(
                    Secondary::new(fragment, energy_per_nucleon * f64::from(fa)).tagged(TAG),
                    ctx.serials(),
                );
            }
        }

        if self.have_photons {
            if let Some(spectrum) = self.table.channel(id, channel).and_then(|ch| ch.photons.as_ref()) {
                let (random, serials) = ctx.split();
                let energy = spectrum.sample(random) * gamma;
                c.add_secondary(Secondary::new(PHOTON, energy).tagged(TAG), serials);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::table::{Channel, EmissionSpectrum, RateCurve};
    use crate::interaction::StochasticInteraction;
    use crprop_core::units::{EEV, MEV};
    use crprop_core::{ParticleState, SerialCounter, Vector3d};
    use crprop_module::Module;

    fn flat(rate: f64) -> RateCurve {
        RateCurve::new(vec![1.0, 1e12], vec![rate, rate]).unwrap()
    }

    fn nucleus(a: i32, z: i32, energy: f64) -> Candidate {
        let state = ParticleState::new(nucleus_id(a, z).unwrap(), energy, Vector3d::zeros(), Vector3d::x());
        Candidate::new(state, &SerialCounter::default())
    }

    #[test]
    fn channel_digits_decode() {
        assert_eq!(PhotoDisintegration::fragments(100_000), [1, 0, 0, 0, 0, 0]);
        assert_eq!(PhotoDisintegration::fragments(1), [0, 0, 0, 0, 0, 1]);
        assert_eq!(PhotoDisintegration::fragments(210_001), [2, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn neutron_emission_keeps_energy_per_nucleon() {
        let pd = PhotoDisintegration::new(ChannelTable::new());
        let mut c = nucleus(56, 26, 56.0 * EEV);
        let mut ctx = ProcessContext::seeded(0);
        pd.interact(&mut c, 100_000, &mut ctx).unwrap();

        assert_eq!(c.current.id(), nucleus_id(55, 26).unwrap());
        assert!((c.current.energy() - 55.0 * EEV).abs() < 1e-6 * EEV);
        assert_eq!(c.secondaries().len(), 1);
        let n = &c.secondaries()[0];
        assert_eq!(n.current.id(), nucleus_id(1, 0).unwrap());
        assert!((n.current.energy() - EEV).abs() < 1e-6 * EEV);
        assert_eq!(n.tag(), TAG);
    }

    #[test]
    fn alpha_and_proton_emission_conserve_nucleons() {
        let pd = PhotoDisintegration::new(ChannelTable::new());
        let mut c = nucleus(16, 8, 16.0 * EEV);
        let mut ctx = ProcessContext::seeded(0);
        pd.interact(&mut c, 10_001, &mut ctx).unwrap();
        assert_eq!(c.current.id(), nucleus_id(11, 5).unwrap());
        let emitted: i32 = c.secondaries().iter().map(|s| mass_number(s.current.id())).sum();
        assert_eq!(emitted + 11, 16);
    }

    #[test]
    fn full_breakup_deactivates() {
        let pd = PhotoDisintegration::new(ChannelTable::new());
        let mut c = nucleus(4, 2, 4.0 * EEV);
        pd.interact(&mut c, 1, &mut ProcessContext::seeded(0)).unwrap();
        assert!(!c.is_active());
        assert_eq!(c.secondaries().len(), 1);
        assert_eq!(c.secondaries()[0].current.id(), nucleus_id(4, 2).unwrap());
    }

    #[test]
    fn rates_scale_with_redshift() {
        let iron = nucleus_id(56, 26).unwrap();
        let mut table = ChannelTable::new();
        table.insert(iron, Channel::new(100_000, flat(2.0)));
        let pd = PhotoDisintegration::new(table);

        let mut c = nucleus(56, 26, 100.0 * EEV);
        let mut rates = ChannelRates::new();
        pd.channel_rates(&c, &mut rates);
        assert_eq!(rates.as_slice(), &[(100_000, 2.0)]);

        c.set_redshift(1.0);
        rates.clear();
        pd.channel_rates(&c, &mut rates);
        assert_eq!(rates.as_slice(), &[(100_000, 8.0)]);
    }

    #[test]
    fn untabulated_nucleus_has_zero_rate() {
        let pd = StochasticInteraction::new(PhotoDisintegration::new(ChannelTable::new()));
        let mut c = nucleus(56, 26, 100.0 * EEV);
        c.set_current_step(1e30);
        pd.process(&mut c, &mut ProcessContext::seeded(0)).unwrap();
        assert!(c.secondaries().is_empty());
        assert_eq!(c.current.id(), nucleus_id(56, 26).unwrap());
    }

    #[test]
    fn photons_follow_channel_spectrum() {
        let iron = nucleus_id(56, 26).unwrap();
        let spectrum = EmissionSpectrum::new(vec![1.0 * MEV, 2.0 * MEV], &[1.0]).unwrap();
        let mut table = ChannelTable::new();
        table.insert(iron, Channel::new(100_000, flat(1.0)).with_photons(spectrum));
        let mut pd = PhotoDisintegration::new(table);
        pd.set_have_photons(true);

        let mut c = nucleus(56, 26, 100.0 * EEV);
        let gamma = c.current.lorentz_factor();
        pd.interact(&mut c, 100_000, &mut ProcessContext::seeded(5)).unwrap();
        let photon = c
            .secondaries()
            .iter()
            .find(|s| s.current.id() == PHOTON)
            .expect("photon emitted");
        let rest = photon.current.energy() / gamma;
        assert!((1.0 * MEV..=2.0 * MEV).contains(&rest));
    }
}
