//! [`Candidate`]: the mutable per-particle simulation record.
//!
//! A candidate carries four [`ParticleState`] snapshots:
//!
//! | Snapshot   | Meaning                                              |
//! |------------|------------------------------------------------------|
//! | `source`   | state at the originating source                      |
//! | `created`  | state when this candidate came into existence        |
//! | `previous` | state at the end of the prior propagation step       |
//! | `current`  | live state, mutated by modules                       |
//!
//! plus step bookkeeping, a property bag and the owned tree of secondaries.
//! A secondary records its parent's serial number, which is a lookup key
//! only and never keeps the parent alive.

use indexmap::IndexMap;

use crate::particle_state::ParticleState;
use crate::serial::SerialCounter;
use crate::variant::Variant;
use crate::vector::Vector3d;

/// Interaction tag of a candidate that was not produced by an interaction.
pub const PRIMARY_TAG: &str = "PRIM";

/// Sentinel the next-step bid is reset to before each pass.
const OPEN_BID: f64 = f64::MAX;

/// Description of a secondary particle emitted by an interaction.
///
/// Everything not given here is inherited from the parent; see
/// [`Candidate::add_secondary`].
#[derive(Clone, Debug, PartialEq)]
pub struct Secondary {
    /// Particle id.
    pub id: i32,
    /// Total energy.
    pub energy: f64,
    /// Emission point; defaults to the parent's current position.
    pub position: Option<Vector3d>,
    /// Weight multiplier applied to the parent's weight.
    pub weight: f64,
    /// Interaction tag; defaults to `"SEC"`.
    pub tag: Option<String>,
}

impl Secondary {
    /// Secondary with the given id and energy emitted at the parent's position.
    pub fn new(id: i32, energy: f64) -> Self {
        Self {
            id,
            energy,
            position: None,
            weight: 1.0,
            tag: None,
        }
    }

    /// Emit at `position` instead of the parent's current position.
    pub fn at(mut self, position: Vector3d) -> Self {
        self.position = Some(position);
        self
    }

    /// Multiply the inherited weight by `weight`.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Label the secondary with the producing interaction.
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// The mutable simulation record tracked through the module pipeline.
#[derive(Clone, Debug)]
pub struct Candidate {
    /// State at the originating source.
    pub source: ParticleState,
    /// State when this candidate was created.
    pub created: ParticleState,
    /// State at the end of the prior step.
    pub previous: ParticleState,
    /// Live state.
    pub current: ParticleState,

    active: bool,
    weight: f64,
    redshift: f64,
    trajectory_length: f64,
    current_step: f64,
    next_step: f64,
    step_bid: f64,

    serial_number: u64,
    source_serial_number: u64,
    created_serial_number: u64,
    parent: Option<u64>,
    tag: String,

    properties: IndexMap<String, Variant>,
    secondaries: Vec<Candidate>,
}

impl Candidate {
    /// New primary candidate with all four snapshots set to `state`.
    pub fn new(state: ParticleState, serials: &SerialCounter) -> Self {
        let serial = serials.next_serial();
        Self {
            source: state.clone(),
            created: state.clone(),
            previous: state.clone(),
            current: state,
            active: true,
            weight: 1.0,
            redshift: 0.0,
            trajectory_length: 0.0,
            current_step: 0.0,
            next_step: 0.0,
            step_bid: OPEN_BID,
            serial_number: serial,
            source_serial_number: serial,
            created_serial_number: serial,
            parent: None,
            tag: PRIMARY_TAG.to_owned(),
            properties: IndexMap::new(),
            secondaries: Vec::new(),
        }
    }

    /// Overwrite `created`, `previous` and `current` with `source`.
    ///
    /// Used by sources after their features have filled in the source state.
    pub fn restart_from_source(&mut self) {
        self.created = self.source.clone();
        self.previous = self.source.clone();
        self.current = self.source.clone();
    }

    // ── lifecycle ──────────────────────────────────────────────

    /// Whether the candidate is still being propagated.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Activate or deactivate the candidate.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Statistical weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Set the statistical weight, clamped at zero.
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight.max(0.0);
    }

    /// Multiply the weight by `factor`.
    pub fn update_weight(&mut self, factor: f64) {
        self.set_weight(self.weight * factor);
    }

    /// Current redshift.
    pub fn redshift(&self) -> f64 {
        self.redshift
    }

    /// Set the redshift.
    pub fn set_redshift(&mut self, z: f64) {
        self.redshift = z;
    }

    /// Comoving distance travelled so far.
    pub fn trajectory_length(&self) -> f64 {
        self.trajectory_length
    }

    /// Overwrite the trajectory length. Intended for sources and restarts.
    pub fn set_trajectory_length(&mut self, length: f64) {
        self.trajectory_length = length.max(0.0);
    }

    // ── step bookkeeping ───────────────────────────────────────

    /// Length of the step taken in the current pass.
    pub fn current_step(&self) -> f64 {
        self.current_step
    }

    /// Record the step taken in this pass and advance the trajectory
    /// length by it. Negative steps are clamped to zero.
    pub fn set_current_step(&mut self, step: f64) {
        let step = step.max(0.0);
        self.current_step = step;
        self.trajectory_length += step;
    }

    /// Step proposed for the next pass.
    pub fn next_step(&self) -> f64 {
        self.next_step
    }

    /// Set the proposed next step directly.
    pub fn set_next_step(&mut self, step: f64) {
        self.next_step = step.max(0.0);
    }

    /// Bid for the next step: the bid becomes the minimum of itself and
    /// `step`.
    pub fn limit_next_step(&mut self, step: f64) {
        self.step_bid = self.step_bid.min(step.max(0.0));
    }

    /// The bid collected so far in this pass.
    pub fn step_bid(&self) -> f64 {
        self.step_bid
    }

    /// Open a new bidding round.
    pub fn reset_step_bid(&mut self) {
        self.step_bid = OPEN_BID;
    }

    /// Close the bidding round: the lowest bid becomes `next_step`. If no
    /// module bid, `next_step` is left unchanged.
    pub fn commit_step_bid(&mut self) {
        if self.step_bid < OPEN_BID {
            self.next_step = self.step_bid;
        }
        self.step_bid = OPEN_BID;
    }

    // ── identity ───────────────────────────────────────────────

    /// Unique serial number of this candidate.
    pub fn serial_number(&self) -> u64 {
        self.serial_number
    }

    /// Serial number of the primary this candidate descends from.
    pub fn source_serial_number(&self) -> u64 {
        self.source_serial_number
    }

    /// Serial number of the candidate whose interaction created this one.
    pub fn created_serial_number(&self) -> u64 {
        self.created_serial_number
    }

    /// Serial number of the parent, if this is a secondary.
    pub fn parent(&self) -> Option<u64> {
        self.parent
    }

    /// Interaction tag, `"PRIM"` for primaries.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Set the interaction tag.
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
    }

    // ── properties ─────────────────────────────────────────────

    /// Set property `key` to `value`, replacing any earlier value.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Variant>) {
        self.properties.insert(key.into(), value.into());
    }

    /// The value of property `key`.
    pub fn property(&self, key: &str) -> Option<&Variant> {
        self.properties.get(key)
    }

    /// Whether property `key` is set.
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Remove property `key`, returning its value.
    pub fn remove_property(&mut self, key: &str) -> Option<Variant> {
        self.properties.shift_remove(key)
    }

    /// All properties in insertion order.
    pub fn properties(&self) -> &IndexMap<String, Variant> {
        &self.properties
    }

    // ── secondaries ────────────────────────────────────────────

    /// Create a secondary from this candidate's current state.
    ///
    /// The secondary inherits `source` and `previous` from this candidate,
    /// takes `created` and `current` from this candidate's current state
    /// with the new id, energy and position applied, and copies the
    /// trajectory length, redshift and weight (times `secondary.weight`).
    /// Returns a reference to the stored secondary.
    pub fn add_secondary(&mut self, secondary: Secondary, serials: &SerialCounter) -> &mut Candidate {
        let mut state = self.current.clone();
        state.set_id(secondary.id);
        state.set_energy(secondary.energy);
        if let Some(position) = secondary.position {
            state.set_position(position);
        }

        let child = Candidate {
            source: self.source.clone(),
            created: state.clone(),
            previous: self.previous.clone(),
            current: state,
            active: true,
            weight: (self.weight * secondary.weight).max(0.0),
            redshift: self.redshift,
            trajectory_length: self.trajectory_length,
            current_step: 0.0,
            next_step: 0.0,
            step_bid: OPEN_BID,
            serial_number: serials.next_serial(),
            source_serial_number: self.source_serial_number,
            created_serial_number: self.serial_number,
            parent: Some(self.serial_number),
            tag: secondary.tag.unwrap_or_else(|| "SEC".to_owned()),
            properties: IndexMap::new(),
            secondaries: Vec::new(),
        };
        self.secondaries.push(child);
        let last = self.secondaries.len() - 1;
        &mut self.secondaries[last]
    }

    /// Adopt an already-built candidate as a secondary of this one.
    pub fn add_secondary_candidate(&mut self, mut child: Candidate) {
        child.parent = Some(self.serial_number);
        self.secondaries.push(child);
    }

    /// Direct secondaries.
    pub fn secondaries(&self) -> &[Candidate] {
        &self.secondaries
    }

    /// Mutable access to the direct secondaries.
    pub fn secondaries_mut(&mut self) -> &mut [Candidate] {
        &mut self.secondaries
    }

    /// Drop all secondaries and their subtrees.
    pub fn clear_secondaries(&mut self) {
        self.secondaries.clear();
    }

    /// Take ownership of all secondaries, leaving the list empty.
    pub fn take_secondaries(&mut self) -> Vec<Candidate> {
        std::mem::take(&mut self.secondaries)
    }

    /// Keep only the direct secondaries at index `from` or later for which
    /// `keep` returns true. Earlier secondaries are left untouched.
    pub fn retain_secondaries_from(&mut self, from: usize, mut keep: impl FnMut(&Candidate) -> bool) {
        let mut index = 0;
        self.secondaries.retain(|child| {
            let kept = index < from || keep(child);
            index += 1;
            kept
        });
    }

    /// Descendant reached by following `path` of secondary indices; the
    /// empty path is `self`.
    pub fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut Candidate> {
        let mut node = self;
        for &i in path {
            node = node.secondaries.get_mut(i)?;
        }
        Some(node)
    }

    /// Number of candidates in the subtree rooted here, including `self`.
    pub fn tree_size(&self) -> usize {
        1 + self.secondaries.iter().map(Candidate::tree_size).sum::<usize>()
    }

    /// Copy of this candidate without its secondaries.
    pub fn snapshot(&self) -> Candidate {
        Candidate {
            source: self.source.clone(),
            created: self.created.clone(),
            previous: self.previous.clone(),
            current: self.current.clone(),
            active: self.active,
            weight: self.weight,
            redshift: self.redshift,
            trajectory_length: self.trajectory_length,
            current_step: self.current_step,
            next_step: self.next_step,
            step_bid: self.step_bid,
            serial_number: self.serial_number,
            source_serial_number: self.source_serial_number,
            created_serial_number: self.created_serial_number,
            parent: self.parent,
            tag: self.tag.clone(),
            properties: self.properties.clone(),
            secondaries: Vec::new(),
        }
    }

    /// Copy of this candidate (and, if `recursive`, its subtree) under new
    /// serial numbers. Parent links inside the copied subtree point at the
    /// copies.
    pub fn clone_with_new_serials(&self, recursive: bool, serials: &SerialCounter) -> Candidate {
        let mut copy = self.snapshot();
        copy.serial_number = serials.next_serial();
        if recursive {
            for child in &self.secondaries {
                let mut c = child.clone_with_new_serials(true, serials);
                c.parent = Some(copy.serial_number);
                copy.secondaries.push(c);
            }
        }
        copy
    }
}
