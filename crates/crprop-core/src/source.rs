//! The [`Source`] capability: produces initial candidates for a bulk run.

use crate::candidate::Candidate;
use crate::particle_state::ParticleState;
use crate::random::Random;
use crate::serial::SerialCounter;

/// Produces initial particle states.
///
/// Shared by reference across worker threads, so implementations must be
/// `Sync`; per-draw randomness comes from the caller's [`Random`].
pub trait Source: Send + Sync {
    /// Fill in `candidate.source` and any candidate-level attributes such as
    /// redshift or weight. Called on a fresh candidate before its other
    /// snapshots are synchronized to the source state.
    fn prepare(&self, candidate: &mut Candidate, random: &mut Random);

    /// Build one fresh candidate.
    fn candidate(&self, random: &mut Random, serials: &SerialCounter) -> Candidate {
        let mut candidate = Candidate::new(ParticleState::default(), serials);
        self.prepare(&mut candidate, random);
        candidate.restart_from_source();
        candidate
    }

    /// Draw a single particle state.
    fn state(&self, random: &mut Random) -> ParticleState {
        self.candidate(random, &SerialCounter::default()).current
    }

    /// Short human-readable description.
    fn describe(&self) -> String {
        String::from("Source")
    }
}
