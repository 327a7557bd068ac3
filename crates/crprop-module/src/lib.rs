//! The module capability and the [`ModuleList`] scheduler.
//!
//! A simulation is an ordered list of [`Module`]s. Each pass applies every
//! module once to a [`Candidate`](crprop_core::Candidate); passes repeat
//! until some module deactivates it, after which its secondaries are run
//! the same way. Modules share one scalar resource, the next step length,
//! through the lowest-bid protocol on the candidate.
//!
//! Bulk runs ([`ModuleList::run_source`], [`ModuleList::run_candidates`])
//! spread independent primaries over worker threads and support a
//! cooperative interrupt with a checkpoint action.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod condition;
pub mod config;
pub mod context;
pub mod list;
pub mod module;
pub mod runner;

pub use condition::{Condition, REJECTED_KEY};
pub use config::RunConfig;
pub use context::ProcessContext;
pub use list::{Completion, InterruptHandle, ModuleList, FAILED_KEY};
pub use module::Module;
pub use runner::{Failure, RunError, RunReport};
