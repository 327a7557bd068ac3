//! Observers: detect candidates crossing a surface or meeting a criterion.
//!
//! An [`Observer`] asks each of its [`ObserverFeature`]s for a verdict.
//! The candidate is detected if at least one feature reports
//! [`DetectionState::Detected`] and none reports [`DetectionState::Veto`].
//! Every feature is consulted on every pass, so all of them get to bid for
//! the next step.
//!
//! On detection the observer runs its action (on the candidate or a
//! clone), sets its flag property and, by default, deactivates the
//! candidate.

use std::fmt;
use std::sync::Arc;

use crprop_core::particle_id::is_nucleus;
use crprop_core::units::MPC;
use crprop_core::{Candidate, ModuleError, Vector3d};
use crprop_module::{Module, ProcessContext};

/// Default property key set on detection.
pub const DETECTED_KEY: &str = "Detected";

/// Verdict of one feature about one candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionState {
    /// The feature detects the candidate.
    Detected,
    /// The feature forbids detection.
    Veto,
    /// The feature has no opinion.
    Nothing,
}

/// One detection criterion of an [`Observer`].
pub trait ObserverFeature: Send + Sync {
    /// Verdict for `c`. May bid for the next step.
    fn check(&self, c: &mut Candidate) -> DetectionState;

    /// One-line description.
    fn describe(&self) -> String;
}

// ── Observer ───────────────────────────────────────────────────────

/// Module combining observer features.
pub struct Observer {
    features: Vec<Box<dyn ObserverFeature>>,
    action: Option<Arc<dyn Module>>,
    clone: bool,
    make_inactive: bool,
    flag: Option<(String, String)>,
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("features", &self.features.iter().map(|x| x.describe()).collect::<Vec<_>>())
            .field("action", &self.action.as_ref().map(|a| a.name().to_owned()))
            .field("clone", &self.clone)
            .field("make_inactive", &self.make_inactive)
            .field("flag", &self.flag)
            .finish()
    }
}

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer {
    /// Observer without features. It detects nothing until a feature is
    /// added.
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
            action: None,
            clone: false,
            make_inactive: true,
            flag: Some((DETECTED_KEY.to_owned(), "Observer".to_owned())),
        }
    }

    /// Add a feature.
    pub fn add(&mut self, feature: impl ObserverFeature + 'static) -> &mut Self {
        self.features.push(Box::new(feature));
        self
    }

    /// Module run on every detected candidate.
    pub fn on_detection(&mut self, action: Arc<dyn Module>) {
        self.action = Some(action);
    }

    /// Run the action on a copy without secondaries and under a new serial
    /// number, leaving the candidate itself untouched. Default: false.
    pub fn set_clone(&mut self, clone: bool) {
        self.clone = clone;
    }

    /// Whether detection deactivates the candidate. Default: true.
    pub fn set_make_inactive(&mut self, inactive: bool) {
        self.make_inactive = inactive;
    }

    /// Property set on detection. An empty key disables the flag.
    pub fn set_flag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.flag = if key.is_empty() { None } else { Some((key, value.into())) };
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

impl Module for Observer {
    fn name(&self) -> &str {
        "Observer"
    }

    fn describe(&self) -> String {
        let features: Vec<String> = self.features.iter().map(|f| f.describe()).collect();
        format!("Observer: [{}]", features.join(", "))
    }

    fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let mut state = DetectionState::Nothing;
        for feature in &self.features {
            match feature.check(c) {
                DetectionState::Veto => state = DetectionState::Veto,
                DetectionState::Detected if state != DetectionState::Veto => state = DetectionState::Detected,
                _ => {}
            }
        }
        if state != DetectionState::Detected {
            return Ok(());
        }

        if let Some(action) = &self.action {
            if self.clone {
                let mut copy = c.clone_with_new_serials(false, ctx.serials());
                action.process(&mut copy, ctx)?;
            } else {
                action.process(c, ctx)?;
            }
        }
        if let Some((key, value)) = &self.flag {
            c.set_property(key.clone(), value.clone());
        }
        if self.make_inactive {
            c.set_active(false);
        }
        Ok(())
    }

    fn begin_run(&self) {
        if let Some(action) = &self.action {
            action.begin_run();
        }
    }

    fn end_run(&self) {
        if let Some(action) = &self.action {
            action.end_run();
        }
    }
}

// ── features ───────────────────────────────────────────────────────

/// Detects everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetectAll;

impl ObserverFeature for DetectAll {
    fn check(&self, _c: &mut Candidate) -> DetectionState {
        DetectionState::Detected
    }

    fn describe(&self) -> String {
        "DetectAll".to_owned()
    }
}

/// Detects candidates entering a sphere from outside.
#[derive(Clone, Debug, PartialEq)]
pub struct SmallSphere {
    center: Vector3d,
    radius: f64,
}

impl SmallSphere {
    /// Sphere of `radius` around `center`.
    pub fn new(center: Vector3d, radius: f64) -> Self {
        Self { center, radius }
    }
}

impl ObserverFeature for SmallSphere {
    fn check(&self, c: &mut Candidate) -> DetectionState {
        let d = (c.current.position() - self.center).norm();
        c.limit_next_step((d - self.radius).abs());
        if d > self.radius {
            return DetectionState::Nothing;
        }
        let d_prev = (c.previous.position() - self.center).norm();
        if d_prev <= self.radius {
            // Inside already on the previous step.
            return DetectionState::Nothing;
        }
        DetectionState::Detected
    }

    fn describe(&self) -> String {
        format!(
            "SmallSphere: {} Mpc around {:?} Mpc",
            self.radius / MPC,
            (self.center / MPC).as_slice()
        )
    }
}

/// Detects candidates leaving a sphere from inside.
#[derive(Clone, Debug, PartialEq)]
pub struct LargeSphere {
    center: Vector3d,
    radius: f64,
}

impl LargeSphere {
    /// Sphere of `radius` around `center`.
    pub fn new(center: Vector3d, radius: f64) -> Self {
        Self { center, radius }
    }
}

impl ObserverFeature for LargeSphere {
    fn check(&self, c: &mut Candidate) -> DetectionState {
        let d = (c.current.position() - self.center).norm();
        c.limit_next_step((self.radius - d).abs());
        if d < self.radius {
            return DetectionState::Nothing;
        }
        let d_prev = (c.previous.position() - self.center).norm();
        if d_prev >= self.radius {
            return DetectionState::Nothing;
        }
        DetectionState::Detected
    }

    fn describe(&self) -> String {
        format!(
            "LargeSphere: {} Mpc around {:?} Mpc",
            self.radius / MPC,
            (self.center / MPC).as_slice()
        )
    }
}

/// One-dimensional observer at the origin: detects candidates at `x <= 0`
/// and otherwise bids the remaining distance `x`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Point;

impl ObserverFeature for Point {
    fn check(&self, c: &mut Candidate) -> DetectionState {
        let x = c.current.position().x;
        if x > 0.0 {
            c.limit_next_step(x);
            DetectionState::Nothing
        } else {
            DetectionState::Detected
        }
    }

    fn describe(&self) -> String {
        "Point".to_owned()
    }
}

/// Detects candidates with redshift in `[z_min, z_max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RedshiftWindow {
    z_min: f64,
    z_max: f64,
}

impl RedshiftWindow {
    /// Window `[z_min, z_max]`.
    pub fn new(z_min: f64, z_max: f64) -> Self {
        Self { z_min, z_max }
    }
}

impl ObserverFeature for RedshiftWindow {
    fn check(&self, c: &mut Candidate) -> DetectionState {
        let z = c.redshift();
        if (self.z_min..=self.z_max).contains(&z) {
            DetectionState::Detected
        } else {
            DetectionState::Nothing
        }
    }

    fn describe(&self) -> String {
        format!("RedshiftWindow: {} - {}", self.z_min, self.z_max)
    }
}

/// Vetoes inactive candidates.
#[derive(Clone, Copy, Debug, Default)]
pub struct InactiveVeto;

impl ObserverFeature for InactiveVeto {
    fn check(&self, c: &mut Candidate) -> DetectionState {
        if c.is_active() {
            DetectionState::Nothing
        } else {
            DetectionState::Veto
        }
    }

    fn describe(&self) -> String {
        "InactiveVeto".to_owned()
    }
}

/// Vetoes nuclei and nucleons.
#[derive(Clone, Copy, Debug, Default)]
pub struct NucleusVeto;

impl ObserverFeature for NucleusVeto {
    fn check(&self, c: &mut Candidate) -> DetectionState {
        if is_nucleus(c.current.id()) {
            DetectionState::Veto
        } else {
            DetectionState::Nothing
        }
    }

    fn describe(&self) -> String {
        "NucleusVeto".to_owned()
    }
}

/// Vetoes one particle id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParticleIdVeto {
    id: i32,
}

impl ParticleIdVeto {
    /// Veto particles with `id`.
    pub fn new(id: i32) -> Self {
        Self { id }
    }
}

impl ObserverFeature for ParticleIdVeto {
    fn check(&self, c: &mut Candidate) -> DetectionState {
        if c.current.id() == self.id {
            DetectionState::Veto
        } else {
            DetectionState::Nothing
        }
    }

    fn describe(&self) -> String {
        format!("ParticleIdVeto: {}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ParticleCollector;
    use crprop_core::particle_id::{nucleus_id, PHOTON, PROTON_PDG};
    use crprop_core::{ParticleState, SerialCounter, Variant};

    fn moved(id: i32, from: Vector3d, to: Vector3d) -> Candidate {
        let mut c = Candidate::new(
            ParticleState::new(id, 1.0, to, Vector3d::x()),
            &SerialCounter::default(),
        );
        c.previous.set_position(from);
        c
    }

    fn pass(m: &Observer, c: &mut Candidate) {
        c.reset_step_bid();
        m.process(c, &mut ProcessContext::seeded(0)).unwrap();
        c.commit_step_bid();
    }

    #[test]
    fn small_sphere_detects_entry_once() {
        let mut obs = Observer::new();
        obs.add(SmallSphere::new(Vector3d::zeros(), 1.0));

        let mut entering = moved(PHOTON, Vector3d::new(2.0, 0.0, 0.0), Vector3d::new(0.5, 0.0, 0.0));
        pass(&obs, &mut entering);
        assert!(!entering.is_active());
        assert_eq!(entering.property(DETECTED_KEY), Some(&Variant::from("Observer")));

        let mut inside = moved(PHOTON, Vector3d::new(0.2, 0.0, 0.0), Vector3d::new(0.5, 0.0, 0.0));
        pass(&obs, &mut inside);
        assert!(inside.is_active());

        let mut outside = moved(PHOTON, Vector3d::new(5.0, 0.0, 0.0), Vector3d::new(3.0, 0.0, 0.0));
        pass(&obs, &mut outside);
        assert!(outside.is_active());
        assert_eq!(outside.next_step(), 2.0);
    }

    #[test]
    fn large_sphere_detects_exit() {
        let mut obs = Observer::new();
        obs.add(LargeSphere::new(Vector3d::zeros(), 10.0));
        let mut leaving = moved(PHOTON, Vector3d::new(9.0, 0.0, 0.0), Vector3d::new(11.0, 0.0, 0.0));
        pass(&obs, &mut leaving);
        assert!(!leaving.is_active());

        let mut staying = moved(PHOTON, Vector3d::zeros(), Vector3d::new(4.0, 0.0, 0.0));
        pass(&obs, &mut staying);
        assert!(staying.is_active());
        assert_eq!(staying.next_step(), 6.0);
    }

    #[test]
    fn point_observer_in_one_dimension() {
        let mut obs = Observer::new();
        obs.add(Point);
        let mut c = moved(PHOTON, Vector3d::new(8.0, 0.0, 0.0), Vector3d::new(5.0, 0.0, 0.0));
        pass(&obs, &mut c);
        assert!(c.is_active());
        assert_eq!(c.next_step(), 5.0);

        let mut arrived = moved(PHOTON, Vector3d::new(1.0, 0.0, 0.0), Vector3d::new(0.0, 0.0, 0.0));
        pass(&obs, &mut arrived);
        assert!(!arrived.is_active());
    }

    #[test]
    fn vetoes_override_detection() {
        let mut obs = Observer::new();
        obs.add(DetectAll).add(NucleusVeto);
        let mut proton = moved(PROTON_PDG, Vector3d::zeros(), Vector3d::zeros());
        pass(&obs, &mut proton);
        assert!(proton.is_active());
        let mut photon = moved(PHOTON, Vector3d::zeros(), Vector3d::zeros());
        pass(&obs, &mut photon);
        assert!(!photon.is_active());

        let mut by_id = Observer::new();
        by_id.add(ParticleIdVeto::new(PHOTON)).add(DetectAll);
        let mut photon = moved(PHOTON, Vector3d::zeros(), Vector3d::zeros());
        pass(&by_id, &mut photon);
        assert!(photon.is_active());

        let mut live = Observer::new();
        live.add(DetectAll).add(InactiveVeto);
        let mut dead = moved(PHOTON, Vector3d::zeros(), Vector3d::zeros());
        dead.set_active(false);
        pass(&live, &mut dead);
        assert!(!dead.has_property(DETECTED_KEY));
    }

    #[test]
    fn redshift_window() {
        let mut obs = Observer::new();
        obs.add(RedshiftWindow::new(0.0, 0.1));
        let mut c = moved(nucleus_id(4, 2).unwrap(), Vector3d::zeros(), Vector3d::zeros());
        c.set_redshift(0.5);
        pass(&obs, &mut c);
        assert!(c.is_active());
        c.set_redshift(0.05);
        pass(&obs, &mut c);
        assert!(!c.is_active());
    }

    #[test]
    fn clone_on_detection_keeps_candidate() {
        let collector = Arc::new(ParticleCollector::new(16));
        let mut obs = Observer::new();
        obs.add(DetectAll);
        obs.on_detection(collector.clone());
        obs.set_clone(true);
        obs.set_make_inactive(false);
        obs.set_flag("", "");

        let mut c = moved(PHOTON, Vector3d::zeros(), Vector3d::zeros());
        let mut ctx = ProcessContext::seeded(0);
        ctx.serials().reset(100);
        obs.process(&mut c, &mut ctx).unwrap();
        assert!(c.is_active());
        assert!(c.properties().is_empty());
        let stored = collector.candidates();
        assert_eq!(stored.len(), 1);
        assert_ne!(stored[0].serial_number(), c.serial_number());
    }

    #[test]
    fn empty_observer_detects_nothing() {
        let obs = Observer::new();
        let mut c = moved(PHOTON, Vector3d::zeros(), Vector3d::zeros());
        pass(&obs, &mut c);
        assert!(c.is_active());
        assert!(obs.is_empty());
    }
}
