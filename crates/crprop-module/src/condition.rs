//! Reject/accept plumbing shared by break conditions, boundaries and
//! observers.
//!
//! A [`Condition`] decides nothing by itself. The owning module evaluates
//! its predicate and calls [`Condition::reject`] or [`Condition::accept`],
//! which run the configured action, set the flag property and optionally
//! deactivate the candidate.

use std::fmt;
use std::sync::Arc;

use crprop_core::{Candidate, ModuleError};

use crate::context::ProcessContext;
use crate::module::Module;

/// Default property key set on rejection.
pub const REJECTED_KEY: &str = "Rejected";

/// Flag, action and deactivation settings for one outcome.
#[derive(Clone)]
struct Outcome {
    flag: Option<(String, String)>,
    action: Option<Arc<dyn Module>>,
    make_inactive: bool,
}

impl Outcome {
    fn apply(&self, candidate: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        if let Some(action) = &self.action {
            action.process(candidate, ctx)?;
        }
        if let Some((key, value)) = &self.flag {
            candidate.set_property(key.clone(), value.clone());
        }
        if self.make_inactive {
            candidate.set_active(false);
        }
        Ok(())
    }
}

/// Reject/accept outcome configuration.
///
/// Defaults: rejection sets `"Rejected"` to the owning module's name and
/// deactivates the candidate; acceptance sets no flag and keeps it active.
#[derive(Clone)]
pub struct Condition {
    reject: Outcome,
    accept: Outcome,
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("reject_flag", &self.reject.flag)
            .field("reject_action", &self.reject.action.as_ref().map(|a| a.name().to_owned()))
            .field("make_rejected_inactive", &self.reject.make_inactive)
            .field("accept_flag", &self.accept.flag)
            .field("accept_action", &self.accept.action.as_ref().map(|a| a.name().to_owned()))
            .field("make_accepted_inactive", &self.accept.make_inactive)
            .finish()
    }
}

impl Condition {
    /// Default settings for a module called `module_name`.
    pub fn new(module_name: &str) -> Self {
        Self {
            reject: Outcome {
                flag: Some((REJECTED_KEY.to_owned(), module_name.to_owned())),
                action: None,
                make_inactive: true,
            },
            accept: Outcome {
                flag: None,
                action: None,
                make_inactive: false,
            },
        }
    }

    /// Property set on rejection. An empty key disables the flag.
    pub fn set_reject_flag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.reject.flag = flag(key.into(), value.into());
    }

    /// Property set on acceptance. An empty key disables the flag.
    pub fn set_accept_flag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.accept.flag = flag(key.into(), value.into());
    }

    /// Module run on every rejected candidate before it is flagged.
    pub fn on_reject(&mut self, action: Arc<dyn Module>) {
        self.reject.action = Some(action);
    }

    /// Module run on every accepted candidate before it is flagged.
    pub fn on_accept(&mut self, action: Arc<dyn Module>) {
        self.accept.action = Some(action);
    }

    /// Whether rejection deactivates the candidate. Default: true.
    pub fn set_make_rejected_inactive(&mut self, inactive: bool) {
        self.reject.make_inactive = inactive;
    }

    /// Whether acceptance deactivates the candidate. Default: false.
    pub fn set_make_accepted_inactive(&mut self, inactive: bool) {
        self.accept.make_inactive = inactive;
    }

    /// Key and value of the rejection flag, if any.
    pub fn reject_flag(&self) -> Option<(&str, &str)> {
        self.reject.flag.as_ref().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Key and value of the acceptance flag, if any.
    pub fn accept_flag(&self) -> Option<(&str, &str)> {
        self.accept.flag.as_ref().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Apply the rejection outcome.
    pub fn reject(&self, candidate: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        self.reject.apply(candidate, ctx)
    }

    /// Apply the acceptance outcome.
    pub fn accept(&self, candidate: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        self.accept.apply(candidate, ctx)
    }
}

fn flag(key: String, value: String) -> Option<(String, String)> {
    if key.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crprop_core::{ParticleState, SerialCounter, Variant};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Count(AtomicUsize);

    impl Module for Count {
        fn name(&self) -> &str {
            "Count"
        }

        fn process(&self, _c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn candidate() -> Candidate {
        Candidate::new(ParticleState::default(), &SerialCounter::default())
    }

    #[test]
    fn default_reject_flags_and_deactivates() {
        let cond = Condition::new("MinimumEnergy");
        let mut c = candidate();
        let mut ctx = ProcessContext::seeded(0);
        cond.reject(&mut c, &mut ctx).unwrap();
        assert!(!c.is_active());
        assert_eq!(c.property(REJECTED_KEY), Some(&Variant::from("MinimumEnergy")));
    }

    #[test]
    fn default_accept_is_noop() {
        let cond = Condition::new("X");
        let mut c = candidate();
        let mut ctx = ProcessContext::seeded(0);
        cond.accept(&mut c, &mut ctx).unwrap();
        assert!(c.is_active());
        assert!(c.properties().is_empty());
    }

    #[test]
    fn actions_run_once_per_outcome() {
        let counter = Arc::new(Count(AtomicUsize::new(0)));
        let mut cond = Condition::new("X");
        cond.on_reject(counter.clone());
        cond.set_make_rejected_inactive(false);
        cond.set_reject_flag("", "");
        let mut c = candidate();
        let mut ctx = ProcessContext::seeded(0);
        cond.reject(&mut c, &mut ctx).unwrap();
        assert_eq!(counter.0.load(Ordering::Relaxed), 1);
        assert!(c.is_active());
        assert!(!c.has_property(REJECTED_KEY));
    }

    #[test]
    fn accept_flag_and_inactive() {
        let mut cond = Condition::new("X");
        cond.set_accept_flag("Detected", "yes");
        cond.set_make_accepted_inactive(true);
        let mut c = candidate();
        let mut ctx = ProcessContext::seeded(0);
        cond.accept(&mut c, &mut ctx).unwrap();
        assert!(!c.is_active());
        assert_eq!(c.property("Detected"), Some(&Variant::from("yes")));
    }
}
