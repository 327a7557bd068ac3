//! Bulk-run configuration.

use crprop_core::ConfigError;

/// Configuration for [`ModuleList::run_source`](crate::ModuleList::run_source)
/// and [`ModuleList::run_candidates`](crate::ModuleList::run_candidates).
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// Master seed. Candidate `i` draws from stream `i` of this seed.
    /// Default: 0.
    pub seed: u64,
    /// Number of worker threads. `None` = auto-detect
    /// (`available_parallelism`, clamped to `[1, 256]`).
    pub worker_count: Option<usize>,
    /// Propagate secondaries after their parent. Default: true.
    pub recursive: bool,
    /// Run each secondary as soon as it appears instead of after the
    /// parent terminates. Default: false.
    pub secondaries_first: bool,
    /// Log progress every this many finished candidates. `None` disables
    /// progress logging.
    pub progress_interval: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            worker_count: None,
            recursive: true,
            secondaries_first: false,
            progress_interval: None,
        }
    }
}

impl RunConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == Some(0) {
            return Err(ConfigError::InvalidParameter {
                module: "RunConfig",
                parameter: "worker_count",
                reason: "must be at least 1".into(),
            });
        }
        if self.progress_interval == Some(0) {
            return Err(ConfigError::InvalidParameter {
                module: "RunConfig",
                parameter: "progress_interval",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Resolve the worker count, applying auto-detection if `None`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 256),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, 256),
        }
    }
}
