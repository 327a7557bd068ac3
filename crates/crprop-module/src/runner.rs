//! Bulk runs: many independent candidates across worker threads.
//!
//! Work is distributed over a crossbeam channel to scoped worker threads.
//! Each candidate tree is owned by exactly one worker for its whole run and
//! draws from its own random stream `(seed, index)`, so results do not
//! depend on how work lands on threads. On interrupt, workers stop taking
//! new work, unfinished trees are drained through the interrupt action and
//! their indices are reported so the run can be resumed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use crprop_core::{Candidate, ConfigError, Source, Variant};
use log::{debug, info, warn};
use thiserror::Error;

use crate::config::RunConfig;
use crate::list::{Completion, ModuleList, FAILED_KEY};
use crate::module::Module;

/// A bulk run could not be carried out.
#[derive(Debug, Error)]
pub enum RunError {
    /// The run configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A worker thread panicked; the run's results are incomplete.
    #[error("worker {worker} panicked")]
    WorkerPanicked {
        /// Index of the worker.
        worker: usize,
    },
}

/// A candidate that a module failed during the run.
#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    /// Index of the primary in the batch.
    pub index: usize,
    /// Serial number of the failed candidate (primary or secondary).
    pub serial_number: u64,
    /// The recorded failure.
    pub reason: String,
}

/// Outcome of a bulk run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    /// Number of primaries requested.
    pub count: usize,
    /// Number of primary trees that finished.
    pub finished: usize,
    /// Indices of primaries whose trees did not finish, including those
    /// never started. Sorted ascending.
    pub interrupted: Vec<usize>,
    /// Every candidate that a module failed.
    pub failed: Vec<Failure>,
    /// Number of candidates the interrupt action was applied to.
    pub drained: usize,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

impl RunReport {
    /// Whether every primary tree finished.
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_empty() && self.finished == self.count
    }
}

#[derive(Default)]
struct WorkerTally {
    finished: usize,
    interrupted: Vec<usize>,
    failed: Vec<Failure>,
    drained: usize,
}

impl WorkerTally {
    fn merge(&mut self, other: WorkerTally) {
        self.finished += other.finished;
        self.interrupted.extend(other.interrupted);
        self.failed.extend(other.failed);
        self.drained += other.drained;
    }
}

impl ModuleList {
    /// Run every candidate in `candidates` to completion in parallel.
    ///
    /// Candidate `i` uses random stream `i` of `config.seed`. The trees stay
    /// in `candidates` afterwards for inspection.
    pub fn run_candidates(
        &self,
        candidates: &mut [Candidate],
        config: &RunConfig,
    ) -> Result<RunReport, RunError> {
        config.validate()?;
        let count = candidates.len();
        let (tx, rx) = crossbeam_channel::unbounded();
        for item in candidates.iter_mut().enumerate() {
            // The receiver is alive, so sending cannot fail.
            let _ = tx.send(item);
        }
        drop(tx);

        self.bulk(
            count,
            config,
            rx,
            |index, candidate, tally| self.run_one(index, candidate, config, tally),
            |index, candidate, tally| {
                let mut ctx = self.context(config.seed, index as u64);
                tally.drained += self.drain_interrupted(candidate, &mut ctx);
                tally.interrupted.push(index);
            },
        )
    }

    /// Draw `count` primaries from `source` and run each to completion in
    /// parallel.
    ///
    /// Primary `i` is built and propagated from random stream `i` of
    /// `config.seed`, so re-running only the reported interrupted indices
    /// with the same seed reproduces exactly the missing part of the run.
    pub fn run_source(
        &self,
        source: &dyn Source,
        count: usize,
        config: &RunConfig,
    ) -> Result<RunReport, RunError> {
        self.run_source_indices(source, 0..count, config)
    }

    /// Like [`run_source`](Self::run_source), for an explicit set of
    /// primary indices, e.g. those left over from an interrupted run.
    pub fn run_source_indices(
        &self,
        source: &dyn Source,
        indices: impl IntoIterator<Item = usize>,
        config: &RunConfig,
    ) -> Result<RunReport, RunError> {
        config.validate()?;
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut count = 0;
        for index in indices {
            let _ = tx.send((index, ()));
            count += 1;
        }
        drop(tx);

        self.bulk(
            count,
            config,
            rx,
            |index, _, tally| {
                let mut ctx = self.context(config.seed, index as u64);
                let mut candidate = source.candidate(ctx.random(), self.serials());
                self.run_tree(index, &mut candidate, config, &mut ctx, tally);
            },
            |index, _, tally| tally.interrupted.push(index),
        )
    }

    /// Shared driver: spawns workers over `rx`, calls `work` for each item
    /// taken and `leftover` for each item still queued once the workers
    /// stopped.
    fn bulk<T, W, L>(
        &self,
        count: usize,
        config: &RunConfig,
        rx: Receiver<(usize, T)>,
        work: W,
        leftover: L,
    ) -> Result<RunReport, RunError>
    where
        T: Send,
        W: Fn(usize, &mut T, &mut WorkerTally) + Sync,
        L: Fn(usize, &mut T, &mut WorkerTally),
    {
        let workers = config.resolved_worker_count().min(count.max(1));
        info!(
            "starting run of {count} candidates on {workers} workers (seed {}, recursive {}, secondaries first {})",
            config.seed, config.recursive, config.secondaries_first
        );
        let start = Instant::now();
        self.begin_run();
        if let Some(action) = &self.interrupt_action {
            action.begin_run();
        }

        let done = AtomicUsize::new(0);
        let results: Vec<thread::Result<WorkerTally>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let rx = rx.clone();
                    let work = &work;
                    let done = &done;
                    scope.spawn(move || {
                        let mut tally = WorkerTally::default();
                        while !self.interrupt.is_raised() {
                            let Ok((index, mut item)) = rx.recv() else {
                                break;
                            };
                            work(index, &mut item, &mut tally);
                            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                            if let Some(every) = config.progress_interval {
                                if n % every == 0 {
                                    info!("{n} / {count} candidates done");
                                }
                            }
                        }
                        tally
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });

        let mut tally = WorkerTally::default();
        let mut panicked = None;
        for (worker, result) in results.into_iter().enumerate() {
            match result {
                Ok(t) => tally.merge(t),
                Err(_) => panicked = panicked.or(Some(worker)),
            }
        }

        for (index, mut item) in rx.try_iter() {
            leftover(index, &mut item, &mut tally);
        }

        if let Some(action) = &self.interrupt_action {
            action.end_run();
        }
        self.end_run();

        if let Some(worker) = panicked {
            return Err(RunError::WorkerPanicked { worker });
        }

        tally.interrupted.sort_unstable();
        let report = RunReport {
            count,
            finished: tally.finished,
            interrupted: tally.interrupted,
            failed: tally.failed,
            drained: tally.drained,
            elapsed: start.elapsed(),
        };
        if report.interrupted.is_empty() {
            info!(
                "run finished: {} candidates in {:.3}s, {} failed",
                report.finished,
                report.elapsed.as_secs_f64(),
                report.failed.len()
            );
        } else {
            warn!(
                "run interrupted: {} of {} candidates unfinished, {} drained through interrupt action",
                report.interrupted.len(),
                report.count,
                report.drained
            );
        }
        Ok(report)
    }

    fn run_one(&self, index: usize, candidate: &mut Candidate, config: &RunConfig, tally: &mut WorkerTally) {
        let mut ctx = self.context(config.seed, index as u64);
        self.run_tree(index, candidate, config, &mut ctx, tally);
    }

    fn run_tree(
        &self,
        index: usize,
        candidate: &mut Candidate,
        config: &RunConfig,
        ctx: &mut crate::ProcessContext,
        tally: &mut WorkerTally,
    ) {
        match self.run(candidate, config.recursive, config.secondaries_first, ctx) {
            Completion::Finished => tally.finished += 1,
            Completion::Interrupted => {
                let drained = self.drain_interrupted(candidate, ctx);
                debug!("candidate {index} interrupted, {drained} drained");
                tally.drained += drained;
                tally.interrupted.push(index);
            }
        }
        collect_failures(index, candidate, &mut tally.failed);
    }
}

fn collect_failures(index: usize, root: &Candidate, out: &mut Vec<Failure>) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(reason) = node.property(FAILED_KEY) {
            out.push(Failure {
                index,
                serial_number: node.serial_number(),
                reason: match reason {
                    Variant::String(s) => s.clone(),
                    other => other.to_string(),
                },
            });
        }
        stack.extend(node.secondaries());
    }
}
