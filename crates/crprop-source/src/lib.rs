//! Composable particle sources.
//!
//! A [`CompositeSource`] applies an ordered list of [`SourceFeature`]s to a
//! fresh candidate: each feature sets one aspect of the source state
//! (particle type, energy, position, direction) or a candidate attribute
//! such as redshift. Later features override earlier ones. A
//! [`SourceList`] picks one of several sources by weight for every draw.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod features;

use std::fmt;

use crprop_core::{Candidate, ConfigError, ParticleState, Random, Source};

pub use features::{
    SourceDirection, SourceEmissionCone, SourceEnergy, SourceIsotropicEmission,
    SourceMultipleParticleTypes, SourceParticleType, SourcePosition, SourcePowerLawSpectrum,
    SourceRedshift, SourceUniformSphere,
};

/// One aspect of a source.
pub trait SourceFeature: Send + Sync {
    /// Modify the source particle state.
    fn prepare_particle(&self, state: &mut ParticleState, random: &mut Random) {
        let _ = (state, random);
    }

    /// Modify the candidate. The default forwards to
    /// [`prepare_particle`](Self::prepare_particle) on `candidate.source`.
    fn prepare_candidate(&self, candidate: &mut Candidate, random: &mut Random) {
        self.prepare_particle(&mut candidate.source, random);
    }

    /// One-line description.
    fn describe(&self) -> String;
}

/// Source assembled from features, applied in insertion order.
#[derive(Default)]
pub struct CompositeSource {
    features: Vec<Box<dyn SourceFeature>>,
}

impl fmt::Debug for CompositeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.features.iter().map(|x| x.describe()))
            .finish()
    }
}

impl CompositeSource {
    /// Source without features. It emits the default particle state until
    /// features are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a feature.
    pub fn add(&mut self, feature: impl SourceFeature + 'static) -> &mut Self {
        self.features.push(Box::new(feature));
        self
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, feature: impl SourceFeature + 'static) -> Self {
        self.features.push(Box::new(feature));
        self
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether no feature was added.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Source for CompositeSource {
    fn prepare(&self, candidate: &mut Candidate, random: &mut Random) {
        for feature in &self.features {
            feature.prepare_candidate(candidate, random);
        }
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.features.iter().map(|f| f.describe()).collect();
        format!("CompositeSource: [{}]", parts.join(", "))
    }
}

/// Weighted choice among sources.
#[derive(Default)]
pub struct SourceList {
    sources: Vec<Box<dyn Source>>,
    cumulative: Vec<f64>,
}

impl fmt::Debug for SourceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceList")
            .field("sources", &self.sources.iter().map(|s| s.describe()).collect::<Vec<_>>())
            .field("cumulative", &self.cumulative)
            .finish()
    }
}

impl SourceList {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `source`, chosen with probability proportional to `weight`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] unless `weight` is finite and > 0.
    pub fn add(&mut self, source: impl Source + 'static, weight: f64) -> Result<&mut Self, ConfigError> {
        if !(weight.is_finite() && weight > 0.0) {
            return Err(ConfigError::InvalidParameter {
                module: "SourceList",
                parameter: "weight",
                reason: format!("must be finite and > 0, got {weight}"),
            });
        }
        let total = self.cumulative.last().copied().unwrap_or(0.0) + weight;
        self.sources.push(Box::new(source));
        self.cumulative.push(total);
        Ok(self)
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Source for SourceList {
    /// An empty list leaves the candidate untouched.
    fn prepare(&self, candidate: &mut Candidate, random: &mut Random) {
        let Some(&total) = self.cumulative.last() else {
            return;
        };
        let pick = random.uniform() * total;
        let index = self
            .cumulative
            .iter()
            .position(|&c| pick < c)
            .unwrap_or(self.sources.len() - 1);
        self.sources[index].prepare(candidate, random);
    }

    fn describe(&self) -> String {
        format!("SourceList: {} sources", self.sources.len())
    }
}
