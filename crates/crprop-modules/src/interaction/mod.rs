//! Stochastic interactions.
//!
//! [`StochasticInteraction`] is the sampling loop shared by every discrete
//! interaction. It asks an [`InteractionModel`] for per-channel rates,
//! bids a fraction of the mean free path as the next step, draws an
//! exponential interaction distance and, if that falls inside the step just
//! taken, picks a channel by its share of the total rate and lets the model
//! apply it. Secondaries the model creates are filtered through a
//! [`SecondaryCutoff`].

pub mod nuclear_decay;
pub mod photo_disintegration;
pub mod photo_pion;
pub mod table;

pub use nuclear_decay::{DecayChannel, NuclearDecay};
pub use photo_disintegration::PhotoDisintegration;
pub use photo_pion::PhotoPionProduction;
pub use table::{interpolate, Channel, ChannelRates, ChannelTable, EmissionSpectrum, RateCurve, SecondaryCutoff};

use crprop_core::{Candidate, ConfigError, ModuleError};
use crprop_module::{Module, ProcessContext};

/// The physics of one discrete interaction.
pub trait InteractionModel: Send + Sync {
    /// Short name used in logs and descriptions.
    fn name(&self) -> &str;

    /// Push `(channel, rate per metre)` for every open channel of `c` into
    /// `out`. Particles without tabulated data push nothing.
    fn channel_rates(&self, c: &Candidate, out: &mut ChannelRates);

    /// Apply `channel` to `c`, creating secondaries through `ctx`.
    fn interact(&self, c: &mut Candidate, channel: i32, ctx: &mut ProcessContext) -> Result<(), ModuleError>;

    /// One-line description.
    fn describe(&self) -> String {
        self.name().to_owned()
    }
}

/// Module that samples an [`InteractionModel`] once per pass.
#[derive(Debug)]
pub struct StochasticInteraction<M> {
    model: M,
    limit: f64,
    cutoff: SecondaryCutoff,
}

/// Builder for [`StochasticInteraction`].
#[derive(Debug)]
pub struct StochasticInteractionBuilder<M> {
    model: M,
    limit: f64,
    cutoff: SecondaryCutoff,
}

impl<M: InteractionModel> StochasticInteraction<M> {
    /// Sampler with the default limit (0.1) and no cutoff.
    pub fn new(model: M) -> Self {
        Self {
            model,
            limit: 0.1,
            cutoff: SecondaryCutoff::default(),
        }
    }

    /// Builder starting from the defaults of [`StochasticInteraction::new`].
    pub fn builder(model: M) -> StochasticInteractionBuilder<M> {
        StochasticInteractionBuilder {
            model,
            limit: 0.1,
            cutoff: SecondaryCutoff::default(),
        }
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Fraction of the mean free path bid as the next step.
    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// Cutoff applied to created secondaries.
    pub fn cutoff(&self) -> SecondaryCutoff {
        self.cutoff
    }

    fn total_rate(&self, c: &Candidate, rates: &mut ChannelRates) -> Result<f64, ModuleError> {
        rates.clear();
        self.model.channel_rates(c, rates);
        let total: f64 = rates.iter().map(|(_, r)| *r).sum();
        if !total.is_finite() {
            return Err(ModuleError::NonFinite {
                quantity: "interaction rate",
            });
        }
        Ok(total)
    }
}

impl<M: InteractionModel> StochasticInteractionBuilder<M> {
    /// Fraction of the mean free path bid as the next step (default: 0.1).
    pub fn limit(mut self, limit: f64) -> Self {
        self.limit = limit;
        self
    }

    /// Discard created secondaries below `min_energy` (default: 0).
    pub fn min_secondary_energy(mut self, min_energy: f64) -> Self {
        self.cutoff.min_energy = min_energy;
        self
    }

    /// Discard created secondaries below `min_weight` (default: 0).
    pub fn min_secondary_weight(mut self, min_weight: f64) -> Self {
        self.cutoff.min_weight = min_weight;
        self
    }

    /// Build the module.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] if the limit is not finite and
    /// positive, or a cutoff is negative or NaN.
    pub fn build(self) -> Result<StochasticInteraction<M>, ConfigError> {
        const MODULE: &str = "StochasticInteraction";
        if !(self.limit > 0.0 && self.limit.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                module: MODULE,
                parameter: "limit",
                reason: format!("must be finite and > 0, got {}", self.limit),
            });
        }
        for (parameter, value) in [
            ("min_secondary_energy", self.cutoff.min_energy),
            ("min_secondary_weight", self.cutoff.min_weight),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::InvalidParameter {
                    module: MODULE,
                    parameter,
                    reason: format!("must be >= 0, got {value}"),
                });
            }
        }
        Ok(StochasticInteraction {
            model: self.model,
            limit: self.limit,
            cutoff: self.cutoff,
        })
    }
}

impl<M: InteractionModel> Module for StochasticInteraction<M> {
    fn name(&self) -> &str {
        self.model.name()
    }

    fn describe(&self) -> String {
        format!("{} (step limit {} of mean free path)", self.model.describe(), self.limit)
    }

    fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        if !c.is_active() {
            return Ok(());
        }
        let mut rates = ChannelRates::new();
        let total = self.total_rate(c, &mut rates)?;
        if total <= 0.0 {
            return Ok(());
        }
        c.limit_next_step(self.limit / total);

        let distance = -ctx.random().uniform_open().ln() / total;
        if distance > c.current_step() {
            return Ok(());
        }

        let pick = ctx.random().uniform() * total;
        let channel = select_channel(&rates, pick);
        let before = c.secondaries().len();
        self.model.interact(c, channel, ctx)?;
        c.retain_secondaries_from(before, |s| self.cutoff.keeps(s));

        // The interaction changed the particle; bid for its new state.
        if c.is_active() {
            let total = self.total_rate(c, &mut rates)?;
            if total > 0.0 {
                c.limit_next_step(self.limit / total);
            }
        }
        Ok(())
    }
}

/// First channel whose cumulative rate exceeds `pick`; the last channel
/// absorbs rounding at the top end.
fn select_channel(rates: &ChannelRates, pick: f64) -> i32 {
    let mut cumulative = 0.0;
    for &(channel, rate) in rates {
        cumulative += rate;
        if pick < cumulative {
            return channel;
        }
    }
    rates.last().map_or(0, |&(channel, _)| channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crprop_core::particle_id::PHOTON;
    use crprop_core::{ParticleState, Secondary, SerialCounter, Variant, Vector3d};

    /// Fixed rates; interaction stamps the channel and emits a photon with
    /// energy equal to the channel code.
    struct Toy {
        rates: Vec<(i32, f64)>,
    }

    impl InteractionModel for Toy {
        fn name(&self) -> &str {
            "Toy"
        }

        fn channel_rates(&self, _c: &Candidate, out: &mut ChannelRates) {
            out.extend(self.rates.iter().copied());
        }

        fn interact(&self, c: &mut Candidate, channel: i32, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
            c.set_property("channel", i64::from(channel));
            c.add_secondary(Secondary::new(PHOTON, f64::from(channel)), ctx.serials());
            Ok(())
        }
    }

    fn stepped(step: f64) -> Candidate {
        let mut c = Candidate::new(
            ParticleState::new(2212, 1.0, Vector3d::zeros(), Vector3d::x()),
            &SerialCounter::default(),
        );
        c.set_current_step(step);
        c
    }

    fn pass(m: &impl Module, c: &mut Candidate, ctx: &mut ProcessContext) {
        c.reset_step_bid();
        m.process(c, ctx).unwrap();
        c.commit_step_bid();
    }

    #[test]
    fn zero_rate_never_interacts_or_bids() {
        let m = StochasticInteraction::new(Toy { rates: vec![(1, 0.0)] });
        let mut c = stepped(1e30);
        c.set_next_step(5.0);
        pass(&m, &mut c, &mut ProcessContext::seeded(1));
        assert!(!c.has_property("channel"));
        assert_eq!(c.next_step(), 5.0);
    }

    #[test]
    fn bids_fraction_of_mean_free_path() {
        let m = StochasticInteraction::builder(Toy { rates: vec![(1, 1e-3)] })
            .limit(0.2)
            .build()
            .unwrap();
        let mut c = stepped(0.0);
        pass(&m, &mut c, &mut ProcessContext::seeded(1));
        assert!((c.next_step() - 200.0).abs() < 1e-9);
        assert!(!c.has_property("channel"));
    }

    #[test]
    fn channels_follow_branching_ratios() {
        let m = StochasticInteraction::new(Toy {
            rates: vec![(1, 1.0), (2, 3.0)],
        });
        let mut ctx = ProcessContext::seeded(42);
        let trials = 4000;
        let mut first = 0;
        for _ in 0..trials {
            let mut c = stepped(1e6);
            pass(&m, &mut c, &mut ctx);
            match c.property("channel") {
                Some(Variant::Int(1)) => first += 1,
                Some(Variant::Int(2)) => {}
                other => panic!("unexpected {other:?}"),
            }
        }
        let share = f64::from(first) / f64::from(trials);
        assert!((share - 0.25).abs() < 0.03, "share {share}");
    }

    #[test]
    fn interaction_probability_matches_exponential() {
        let m = StochasticInteraction::new(Toy { rates: vec![(1, 1.0)] });
        let mut ctx = ProcessContext::seeded(7);
        let trials = 4000;
        let mut hits = 0;
        for _ in 0..trials {
            let mut c = stepped(1.0);
            pass(&m, &mut c, &mut ctx);
            if c.has_property("channel") {
                hits += 1;
            }
        }
        let p = f64::from(hits) / f64::from(trials);
        let expected = 1.0 - (-1.0f64).exp();
        assert!((p - expected).abs() < 0.03, "p {p}");
    }

    #[test]
    fn same_seed_same_outcome() {
        let m = StochasticInteraction::new(Toy {
            rates: vec![(3, 0.5), (5, 0.5)],
        });
        let run = |seed| {
            let mut ctx = ProcessContext::seeded(seed);
            (0..64)
                .map(|_| {
                    let mut c = stepped(1.0);
                    pass(&m, &mut c, &mut ctx);
                    c.property("channel").cloned()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn cutoff_discards_only_new_low_energy_secondaries() {
        let m = StochasticInteraction::builder(Toy { rates: vec![(1, 1e6)] })
            .min_secondary_energy(2.0)
            .build()
            .unwrap();
        let serials = SerialCounter::default();
        let mut c = stepped(1.0);
        c.add_secondary(Secondary::new(PHOTON, 0.5), &serials);
        pass(&m, &mut c, &mut ProcessContext::seeded(3));
        assert!(c.has_property("channel"));
        assert_eq!(c.secondaries().len(), 1);
        assert_eq!(c.secondaries()[0].current.energy(), 0.5);
    }

    #[test]
    fn non_finite_rate_is_an_error() {
        let m = StochasticInteraction::new(Toy {
            rates: vec![(1, f64::NAN)],
        });
        let mut c = stepped(1.0);
        assert!(matches!(
            m.process(&mut c, &mut ProcessContext::seeded(0)),
            Err(ModuleError::NonFinite { .. })
        ));
    }

    #[test]
    fn inactive_candidates_are_skipped() {
        let m = StochasticInteraction::new(Toy { rates: vec![(1, 1e9)] });
        let mut c = stepped(1.0);
        c.set_active(false);
        pass(&m, &mut c, &mut ProcessContext::seeded(0));
        assert!(!c.has_property("channel"));
    }

    #[test]
    fn builder_validation() {
        let toy = || Toy { rates: vec![] };
        assert!(StochasticInteraction::builder(toy()).limit(0.0).build().is_err());
        assert!(StochasticInteraction::builder(toy()).limit(f64::INFINITY).build().is_err());
        assert!(StochasticInteraction::builder(toy())
            .min_secondary_weight(-1.0)
            .build()
            .is_err());
        assert!(StochasticInteraction::builder(toy()).build().is_ok());
    }

    #[test]
    fn selection_falls_back_to_last_channel() {
        let rates: ChannelRates = [(1, 1.0), (2, 1.0)].into_iter().collect();
        assert_eq!(select_channel(&rates, 0.5), 1);
        assert_eq!(select_channel(&rates, 1.5), 2);
        assert_eq!(select_channel(&rates, 2.0), 2);
    }
}
