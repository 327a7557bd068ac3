//! [`ProcessContext`]: per-candidate execution context handed to modules.

use std::sync::Arc;

use crprop_core::{Random, SerialCounter};

/// Resources a module may use while processing one candidate.
///
/// Each candidate tree in a bulk run gets its own context with an
/// independent random stream; the serial counter is shared by the whole run.
#[derive(Debug)]
pub struct ProcessContext {
    random: Random,
    serials: Arc<SerialCounter>,
}

impl ProcessContext {
    /// Context over the given random stream and serial counter.
    pub fn new(random: Random, serials: Arc<SerialCounter>) -> Self {
        Self { random, serials }
    }

    /// Context with a fresh serial counter and stream 0 of `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::new(Random::seeded(seed), Arc::new(SerialCounter::default()))
    }

    /// The random stream for this candidate.
    pub fn random(&mut self) -> &mut Random {
        &mut self.random
    }

    /// The run's serial counter, for creating secondaries.
    pub fn serials(&self) -> &SerialCounter {
        &self.serials
    }

    /// Random stream and serial counter at once, for modules that draw and
    /// create secondaries in the same expression.
    pub fn split(&mut self) -> (&mut Random, &SerialCounter) {
        (&mut self.random, &self.serials)
    }
}
