//! [`ModuleList`]: the ordered pipeline and single-candidate scheduler.
//!
//! One *pass* applies every module once, in insertion order. One *step* is
//! a pass bracketed by the next-step bidding round: the bid is reset before
//! the pass and the lowest bid is committed after it. [`ModuleList::run`]
//! steps a candidate until it is inactive and then walks its secondaries
//! with an explicit stack, so deep interaction chains never grow the call
//! stack.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crprop_core::{Candidate, ModuleError, SerialCounter};
use log::warn;

use crate::context::ProcessContext;
use crate::module::Module;

/// Property key set when a module fails a candidate.
pub const FAILED_KEY: &str = "Failed";

// ── InterruptHandle ────────────────────────────────────────────────

/// Shared stop signal for a module list.
///
/// Raising it makes running candidates stop before their next step; bulk
/// runs then drain every unfinished candidate through the interrupt
/// action.
#[derive(Clone, Debug, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    /// Request a stop.
    pub fn raise(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether a stop was requested.
    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Withdraw the stop request.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// How a single-candidate run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The candidate and (if recursive) its whole subtree are inactive.
    Finished,
    /// The interrupt was raised before the tree finished.
    Interrupted,
}

// ── ModuleList ─────────────────────────────────────────────────────

/// Ordered sequence of modules applied to candidates.
#[derive(Default)]
pub struct ModuleList {
    pub(crate) modules: Vec<Arc<dyn Module>>,
    pub(crate) interrupt_action: Option<Arc<dyn Module>>,
    pub(crate) interrupt: InterruptHandle,
    pub(crate) serials: Arc<SerialCounter>,
}

impl std::fmt::Debug for ModuleList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleList")
            .field("modules", &self.modules.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("interrupt_action", &self.interrupt_action.as_ref().map(|m| m.name()))
            .finish()
    }
}

impl ModuleList {
    /// Empty list with its own serial counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty list drawing serial numbers from `serials`.
    pub fn with_serials(serials: Arc<SerialCounter>) -> Self {
        Self {
            serials,
            ..Self::default()
        }
    }

    /// Append a module. Insertion order is execution order.
    pub fn add(&mut self, module: impl Module + 'static) -> &mut Self {
        self.modules.push(Arc::new(module));
        self
    }

    /// Append a module that is also referenced elsewhere (e.g. a collector
    /// the caller reads after the run).
    pub fn add_shared(&mut self, module: Arc<dyn Module>) -> &mut Self {
        self.modules.push(module);
        self
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the list has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules in execution order.
    pub fn modules(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    /// Register the module run once on every still-active candidate when a
    /// bulk run is interrupted.
    pub fn set_interrupt_action(&mut self, action: Arc<dyn Module>) {
        self.interrupt_action = Some(action);
    }

    /// Handle to the stop signal of this list.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Serial counter used for candidates and secondaries of bulk runs.
    pub fn serials(&self) -> &Arc<SerialCounter> {
        &self.serials
    }

    /// A context over stream `stream` of `seed` sharing this list's serial
    /// counter.
    pub fn context(&self, seed: u64, stream: u64) -> ProcessContext {
        ProcessContext::new(crprop_core::Random::for_stream(seed, stream), Arc::clone(&self.serials))
    }

    // ── single candidate ───────────────────────────────────────

    /// One pass: every module once, in order.
    ///
    /// Deactivation is not checked between modules. A module error is
    /// recorded under [`FAILED_KEY`] and deactivates the candidate; the
    /// remaining modules of the pass still run.
    pub fn process(&self, candidate: &mut Candidate, ctx: &mut ProcessContext) {
        for module in &self.modules {
            if let Err(err) = module.process(candidate, ctx) {
                fail(candidate, module.name(), &err);
            }
        }
    }

    /// One step: reset the next-step bid, run a pass, commit the lowest bid.
    pub fn step(&self, candidate: &mut Candidate, ctx: &mut ProcessContext) {
        candidate.reset_step_bid();
        self.process(candidate, ctx);
        candidate.commit_step_bid();
    }

    /// Step `candidate` until it is inactive; then, if `recursive`, run its
    /// secondaries the same way.
    ///
    /// With `secondaries_first`, each secondary is run to completion as soon
    /// as it appears, before the parent takes its next step. Otherwise the
    /// parent finishes first and its secondaries are visited afterwards in
    /// creation order, depth first.
    ///
    /// The interrupt is checked before every step.
    pub fn run(
        &self,
        candidate: &mut Candidate,
        recursive: bool,
        secondaries_first: bool,
        ctx: &mut ProcessContext,
    ) -> Completion {
        // path[i] is the secondary index taken at depth i; visited[d] counts
        // the children already entered at depth d.
        let mut path: Vec<usize> = Vec::new();
        let mut visited: Vec<usize> = vec![0];

        loop {
            let depth = path.len();
            let Some(node) = candidate.descendant_mut(&path) else {
                // A module dropped this subtree.
                path.pop();
                visited.pop();
                continue;
            };
            let active = node.is_active();
            let next_child = visited[depth];

            if recursive
                && next_child < node.secondaries().len()
                && (secondaries_first || !active)
            {
                visited[depth] += 1;
                path.push(next_child);
                visited.push(0);
            } else if active {
                if self.interrupt.is_raised() {
                    return Completion::Interrupted;
                }
                self.step(node, ctx);
            } else if path.pop().is_some() {
                visited.pop();
            } else {
                return Completion::Finished;
            }
        }
    }

    /// Run the interrupt action once on every active candidate in the tree
    /// rooted at `candidate`. Returns how many candidates it was applied to.
    pub(crate) fn drain_interrupted(&self, candidate: &mut Candidate, ctx: &mut ProcessContext) -> usize {
        let Some(action) = &self.interrupt_action else {
            return 0;
        };
        let mut drained = 0;
        let mut stack: Vec<&mut Candidate> = vec![candidate];
        while let Some(node) = stack.pop() {
            if node.is_active() {
                if let Err(err) = action.process(node, ctx) {
                    warn!(
                        "interrupt action {} failed on candidate {}: {err}",
                        action.name(),
                        node.serial_number()
                    );
                }
                drained += 1;
            }
            stack.extend(node.secondaries_mut().iter_mut());
        }
        drained
    }

    /// Multi-line description of the pipeline.
    pub fn describe(&self) -> String {
        let mut out = String::from("ModuleList");
        for (i, module) in self.modules.iter().enumerate() {
            let _ = write!(out, "\n  {i}: {}", module.describe());
        }
        if let Some(action) = &self.interrupt_action {
            let _ = write!(out, "\n  on interrupt: {}", action.describe());
        }
        out
    }
}

impl Module for ModuleList {
    fn name(&self) -> &str {
        "ModuleList"
    }

    fn describe(&self) -> String {
        ModuleList::describe(self)
    }

    fn process(&self, candidate: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        ModuleList::process(self, candidate, ctx);
        Ok(())
    }

    fn begin_run(&self) {
        for module in &self.modules {
            module.begin_run();
        }
    }

    fn end_run(&self) {
        for module in &self.modules {
            module.end_run();
        }
    }
}

fn fail(candidate: &mut Candidate, module: &str, err: &ModuleError) {
    warn!("candidate {} failed in {module}: {err}", candidate.serial_number());
    candidate.set_property(FAILED_KEY, format!("{module}: {err}"));
    candidate.set_active(false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crprop_core::{ParticleState, Secondary, Variant};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    // ── fixtures ───────────────────────────────────────────────

    struct Bid(f64);

    impl Module for Bid {
        fn name(&self) -> &str {
            "Bid"
        }

        fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
            c.limit_next_step(self.0);
            Ok(())
        }
    }

    /// Advances by the committed next step; deactivates after `passes`.
    struct Walk {
        passes: usize,
    }

    impl Module for Walk {
        fn name(&self) -> &str {
            "Walk"
        }

        fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
            c.set_current_step(1.0);
            if c.trajectory_length() >= self.passes as f64 {
                c.set_active(false);
            }
            Ok(())
        }
    }

    /// Primaries (tag PRIM) emit one secondary per pass while active.
    struct Emit {
        per_primary: usize,
    }

    impl Module for Emit {
        fn name(&self) -> &str {
            "Emit"
        }

        fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
            if c.is_active() && c.tag() == "PRIM" && c.secondaries().len() < self.per_primary {
                c.add_secondary(Secondary::new(22, 1.0), ctx.serials());
            }
            Ok(())
        }
    }

    /// Records the serial number of every candidate it processes.
    #[derive(Default)]
    struct Trace(Mutex<Vec<u64>>);

    impl Module for Trace {
        fn name(&self) -> &str {
            "Trace"
        }

        fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
            self.0.lock().unwrap().push(c.serial_number());
            Ok(())
        }
    }

    struct Deactivate;

    impl Module for Deactivate {
        fn name(&self) -> &str {
            "Deactivate"
        }

        fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
            c.set_active(false);
            Ok(())
        }
    }

    struct Fail;

    impl Module for Fail {
        fn name(&self) -> &str {
            "Fail"
        }

        fn process(&self, _c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
            Err(ModuleError::NonFinite { quantity: "position" })
        }
    }

    struct CountCalls(AtomicUsize);

    impl Module for CountCalls {
        fn name(&self) -> &str {
            "CountCalls"
        }

        fn process(&self, _c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn candidate(ctx: &ProcessContext) -> Candidate {
        Candidate::new(ParticleState::default(), ctx.serials())
    }

    // ── pass semantics ─────────────────────────────────────────

    #[test]
    fn lowest_bid_becomes_next_step() {
        let mut list = ModuleList::new();
        list.add(Bid(30.0)).add(Bid(10.0)).add(Bid(20.0));
        let mut ctx = ProcessContext::seeded(0);
        let mut c = candidate(&ctx);
        list.step(&mut c, &mut ctx);
        assert_eq!(c.next_step(), 10.0);
        assert_eq!(c.step_bid(), f64::MAX);
    }

    #[test]
    fn modules_after_deactivation_still_run() {
        let counter = Arc::new(CountCalls(AtomicUsize::new(0)));
        let mut list = ModuleList::new();
        list.add(Deactivate);
        list.add_shared(counter.clone());
        let mut ctx = ProcessContext::seeded(0);
        let mut c = candidate(&ctx);
        list.process(&mut c, &mut ctx);
        assert!(!c.is_active());
        assert_eq!(counter.0.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn module_error_fails_candidate_only() {
        let counter = Arc::new(CountCalls(AtomicUsize::new(0)));
        let mut list = ModuleList::new();
        list.add(Fail);
        list.add_shared(counter.clone());
        let mut ctx = ProcessContext::seeded(0);
        let mut c = candidate(&ctx);
        assert_eq!(list.run(&mut c, false, false, &mut ctx), Completion::Finished);
        assert!(!c.is_active());
        assert_eq!(
            c.property(FAILED_KEY),
            Some(&Variant::from("Fail: non-finite position"))
        );
        assert_eq!(counter.0.load(Ordering::Relaxed), 1);
    }

    // ── run ────────────────────────────────────────────────────

    #[test]
    fn run_steps_until_inactive() {
        let mut list = ModuleList::new();
        list.add(Walk { passes: 5 });
        let mut ctx = ProcessContext::seeded(0);
        let mut c = candidate(&ctx);
        assert_eq!(list.run(&mut c, true, false, &mut ctx), Completion::Finished);
        assert_eq!(c.trajectory_length(), 5.0);
    }

    #[test]
    fn run_on_inactive_candidate_is_noop() {
        let counter = Arc::new(CountCalls(AtomicUsize::new(0)));
        let mut list = ModuleList::new();
        list.add_shared(counter.clone());
        let mut ctx = ProcessContext::seeded(0);
        let mut c = candidate(&ctx);
        c.set_active(false);
        list.run(&mut c, true, false, &mut ctx);
        assert_eq!(counter.0.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn recursive_run_finishes_every_secondary() {
        let mut list = ModuleList::new();
        list.add(Emit { per_primary: 3 }).add(Walk { passes: 4 });
        let mut ctx = ProcessContext::seeded(0);
        let mut c = candidate(&ctx);
        list.run(&mut c, true, false, &mut ctx);
        assert_eq!(c.secondaries().len(), 3);
        assert!(c.secondaries().iter().all(|s| !s.is_active()));
    }

    #[test]
    fn non_recursive_run_leaves_secondaries() {
        let mut list = ModuleList::new();
        list.add(Emit { per_primary: 2 }).add(Walk { passes: 4 });
        let mut ctx = ProcessContext::seeded(0);
        let mut c = candidate(&ctx);
        list.run(&mut c, false, false, &mut ctx);
        assert!(!c.is_active());
        assert!(c.secondaries().iter().all(|s| s.is_active()));
    }

    #[test]
    fn visitation_order_depends_on_secondaries_first() {
        for secondaries_first in [false, true] {
            let trace = Arc::new(Trace::default());
            let mut list = ModuleList::new();
            list.add(Emit { per_primary: 2 }).add(Walk { passes: 2 });
            list.add_shared(trace.clone());
            let mut ctx = ProcessContext::seeded(0);
            let mut c = candidate(&ctx);
            let root = c.serial_number();
            list.run(&mut c, true, secondaries_first, &mut ctx);

            let seen = trace.0.lock().unwrap().clone();
            let first = c.secondaries()[0].serial_number();
            let root_passes: Vec<usize> = seen
                .iter()
                .enumerate()
                .filter(|(_, s)| **s == root)
                .map(|(i, _)| i)
                .collect();
            let first_seen = seen.iter().position(|s| *s == first).unwrap();
            if secondaries_first {
                // The first secondary runs between the parent's two passes.
                assert!(first_seen > root_passes[0] && first_seen < root_passes[1]);
            } else {
                assert!(first_seen > *root_passes.last().unwrap());
            }
        }
    }

    #[test]
    fn interrupt_stops_before_next_step() {
        let mut list = ModuleList::new();
        list.add(Walk { passes: 100 });
        list.interrupt_handle().raise();
        let mut ctx = ProcessContext::seeded(0);
        let mut c = candidate(&ctx);
        assert_eq!(list.run(&mut c, true, false, &mut ctx), Completion::Interrupted);
        assert_eq!(c.trajectory_length(), 0.0);
        assert!(c.is_active());
    }

    #[test]
    fn drain_applies_action_to_active_tree_members() {
        let counter = Arc::new(CountCalls(AtomicUsize::new(0)));
        let mut list = ModuleList::new();
        list.set_interrupt_action(counter.clone());
        let mut ctx = ProcessContext::seeded(0);
        let mut c = candidate(&ctx);
        c.add_secondary(Secondary::new(22, 1.0), ctx.serials());
        c.add_secondary(Secondary::new(22, 1.0), ctx.serials()).set_active(false);
        assert_eq!(list.drain_interrupted(&mut c, &mut ctx), 2);
        assert_eq!(counter.0.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn describe_lists_modules_in_order() {
        let mut list = ModuleList::new();
        list.add(Bid(1.0)).add(Deactivate);
        assert_eq!(list.describe(), "ModuleList\n  0: Bid\n  1: Deactivate");
    }
}
