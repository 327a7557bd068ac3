//! Spatial boundaries: periodic and reflective boxes, and cubic and
//! spherical regions that reject candidates leaving them.

use crprop_core::units::{KPC, MPC};
use crprop_core::vector::{floor, is_finite};
use crprop_core::{Candidate, ConfigError, ModuleError, Vector3d};
use crprop_module::{Condition, Module, ProcessContext};

fn validate_size(module: &'static str, size: &Vector3d) -> Result<(), ConfigError> {
    if size.iter().all(|s| s.is_finite() && *s > 0.0) {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            module,
            parameter: "size",
            reason: format!("every component must be finite and > 0, got {size:?}"),
        })
    }
}

fn validate_length(module: &'static str, parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            module,
            parameter,
            reason: format!("must be finite and > 0, got {value}"),
        })
    }
}

/// Cell index of `position` in a lattice of boxes, or an error if it is
/// not finite.
fn cell(position: &Vector3d, origin: &Vector3d, size: &Vector3d) -> Result<Vector3d, ModuleError> {
    let n = floor(&(position - origin).component_div(size));
    if is_finite(&n) {
        Ok(n)
    } else {
        Err(ModuleError::NonFinite { quantity: "position" })
    }
}

// ── PeriodicBox ────────────────────────────────────────────────────

/// Wraps candidates leaving a box back in on the opposite side.
///
/// All four snapshots are shifted by the same lattice vector, so relative
/// positions (source to current, for instance) are preserved.
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodicBox {
    origin: Vector3d,
    size: Vector3d,
}

impl PeriodicBox {
    /// Box spanning `origin` to `origin + size`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] unless every size component is
    /// finite and positive.
    pub fn new(origin: Vector3d, size: Vector3d) -> Result<Self, ConfigError> {
        validate_size("PeriodicBox", &size)?;
        Ok(Self { origin, size })
    }
}

impl Module for PeriodicBox {
    fn name(&self) -> &str {
        "PeriodicBox"
    }

    fn describe(&self) -> String {
        format!(
            "Periodic box: origin {:?} Mpc, size {:?} Mpc",
            (self.origin / MPC).as_slice(),
            (self.size / MPC).as_slice()
        )
    }

    fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let n = cell(c.current.position(), &self.origin, &self.size)?;
        if n == Vector3d::zeros() {
            return Ok(());
        }
        let shift = n.component_mul(&self.size);
        for state in [&mut c.current, &mut c.previous, &mut c.source, &mut c.created] {
            let shifted = state.position() - shift;
            state.set_position(shifted);
        }
        Ok(())
    }
}

// ── ReflectiveBox ──────────────────────────────────────────────────

/// Mirrors candidates leaving a box back into it.
///
/// The box walls act as mirrors: positions are folded into the box and the
/// direction component normal to every crossed wall is flipped. The same
/// map is applied to all four snapshots.
#[derive(Clone, Debug, PartialEq)]
pub struct ReflectiveBox {
    origin: Vector3d,
    size: Vector3d,
}

impl ReflectiveBox {
    /// Box spanning `origin` to `origin + size`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] unless every size component is
    /// finite and positive.
    pub fn new(origin: Vector3d, size: Vector3d) -> Result<Self, ConfigError> {
        validate_size("ReflectiveBox", &size)?;
        Ok(Self { origin, size })
    }
}

impl Module for ReflectiveBox {
    fn name(&self) -> &str {
        "ReflectiveBox"
    }

    fn describe(&self) -> String {
        format!(
            "Reflective box: origin {:?} Mpc, size {:?} Mpc",
            (self.origin / MPC).as_slice(),
            (self.size / MPC).as_slice()
        )
    }

    fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let n = cell(c.current.position(), &self.origin, &self.size)?;
        if n == Vector3d::zeros() {
            return Ok(());
        }
        // An odd cell index means an odd number of reflections on that axis.
        let odd = n.map(|k| k % 2.0 != 0.0);
        let flip = odd.map(|o| if o { -1.0 } else { 1.0 });

        for state in [&mut c.current, &mut c.previous, &mut c.source, &mut c.created] {
            let mut local = (state.position() - self.origin).component_div(&self.size);
            for axis in 0..3 {
                local[axis] = if odd[axis] {
                    n[axis] + 1.0 - local[axis]
                } else {
                    local[axis] - n[axis]
                };
            }
            state.set_position(local.component_mul(&self.size) + self.origin);
            let direction = state.direction().component_mul(&flip);
            state.set_direction(direction);
        }
        Ok(())
    }
}

// ── CubicBoundary ──────────────────────────────────────────────────

/// Rejects candidates outside a cube.
///
/// With step limiting on (the default), bids the distance to the nearest
/// wall plus a margin so the crossing is not overshot by much.
#[derive(Debug)]
pub struct CubicBoundary {
    origin: Vector3d,
    size: f64,
    margin: f64,
    limit_step: bool,
    condition: Condition,
}

impl CubicBoundary {
    /// Cube spanning `origin` to `origin + (size, size, size)`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] unless `size` is finite and
    /// positive.
    pub fn new(origin: Vector3d, size: f64) -> Result<Self, ConfigError> {
        validate_length("CubicBoundary", "size", size)?;
        Ok(Self {
            origin,
            size,
            margin: 0.1 * KPC,
            limit_step: true,
            condition: Condition::new("CubicBoundary"),
        })
    }

    /// Margin added to the bid distance (default: 0.1 kpc).
    pub fn set_margin(&mut self, margin: f64) {
        self.margin = margin;
    }

    /// Whether to bid the distance to the walls (default: true).
    pub fn set_limit_step(&mut self, limit: bool) {
        self.limit_step = limit;
    }

    /// Reject/accept settings.
    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }
}

impl Module for CubicBoundary {
    fn name(&self) -> &str {
        "CubicBoundary"
    }

    fn describe(&self) -> String {
        format!(
            "Cubic boundary: origin {:?} Mpc, size {} Mpc",
            (self.origin / MPC).as_slice(),
            self.size / MPC
        )
    }

    fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let r = c.current.position() - self.origin;
        let lo = r.min();
        let hi = r.max();
        if lo <= 0.0 || hi >= self.size {
            self.condition.reject(c, ctx)?;
        }
        if self.limit_step {
            c.limit_next_step(lo + self.margin);
            c.limit_next_step(self.size - hi + self.margin);
        }
        Ok(())
    }
}

// ── SphericalBoundary ──────────────────────────────────────────────

/// Rejects candidates outside a sphere.
#[derive(Debug)]
pub struct SphericalBoundary {
    center: Vector3d,
    radius: f64,
    margin: f64,
    limit_step: bool,
    condition: Condition,
}

impl SphericalBoundary {
    /// Sphere of `radius` around `center`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] unless `radius` is finite and
    /// positive.
    pub fn new(center: Vector3d, radius: f64) -> Result<Self, ConfigError> {
        validate_length("SphericalBoundary", "radius", radius)?;
        Ok(Self {
            center,
            radius,
            margin: 0.1 * KPC,
            limit_step: true,
            condition: Condition::new("SphericalBoundary"),
        })
    }

    /// Margin added to the bid distance (default: 0.1 kpc).
    pub fn set_margin(&mut self, margin: f64) {
        self.margin = margin;
    }

    /// Whether to bid the distance to the surface (default: true).
    pub fn set_limit_step(&mut self, limit: bool) {
        self.limit_step = limit;
    }

    /// Reject/accept settings.
    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }
}

impl Module for SphericalBoundary {
    fn name(&self) -> &str {
        "SphericalBoundary"
    }

    fn describe(&self) -> String {
        format!(
            "Spherical boundary: radius {} Mpc around {:?} Mpc",
            self.radius / MPC,
            (self.center / MPC).as_slice()
        )
    }

    fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let d = (c.current.position() - self.center).norm();
        if d >= self.radius {
            self.condition.reject(c, ctx)?;
        }
        if self.limit_step {
            c.limit_next_step(self.radius - d + self.margin);
        }
        Ok(())
    }
}
