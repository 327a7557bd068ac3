//! Test utilities and module fixtures for crprop development.
//!
//! Provides a deterministic [`FixedSource`], candidate constructors with
//! sensible defaults, and the module fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use crprop_core::{Candidate, ParticleState, Random, SerialCounter, Source, Vector3d};

/// Source that always emits the same particle.
///
/// Optionally sets the redshift and weight of every candidate.
#[derive(Clone, Debug)]
pub struct FixedSource {
    pub state: ParticleState,
    pub redshift: f64,
    pub weight: f64,
}

impl FixedSource {
    /// Emits particle `id` with `energy` at the origin, heading along +x.
    pub fn new(id: i32, energy: f64) -> Self {
        Self {
            state: ParticleState::new(id, energy, Vector3d::zeros(), Vector3d::x()),
            redshift: 0.0,
            weight: 1.0,
        }
    }

    pub fn at(mut self, position: Vector3d) -> Self {
        self.state.set_position(position);
        self
    }

    pub fn heading(mut self, direction: Vector3d) -> Self {
        self.state.set_direction(direction);
        self
    }

    pub fn with_redshift(mut self, z: f64) -> Self {
        self.redshift = z;
        self
    }
}

impl Source for FixedSource {
    fn prepare(&self, candidate: &mut Candidate, _random: &mut Random) {
        candidate.source = self.state.clone();
        candidate.set_redshift(self.redshift);
        candidate.set_weight(self.weight);
    }

    fn describe(&self) -> String {
        format!("FixedSource: id {} energy {} J", self.state.id(), self.state.energy())
    }
}

/// Candidate with particle `id` and `energy` at the origin heading along +x.
pub fn candidate(id: i32, energy: f64) -> Candidate {
    candidate_with(id, energy, &SerialCounter::default())
}

/// Like [`candidate`], drawing the serial number from `serials`.
pub fn candidate_with(id: i32, energy: f64, serials: &SerialCounter) -> Candidate {
    Candidate::new(ParticleState::new(id, energy, Vector3d::zeros(), Vector3d::x()), serials)
}

/// `n` identical candidates with consecutive serial numbers.
pub fn batch(id: i32, energy: f64, n: usize) -> Vec<Candidate> {
    let serials = SerialCounter::default();
    (0..n).map(|_| candidate_with(id, energy, &serials)).collect()
}
