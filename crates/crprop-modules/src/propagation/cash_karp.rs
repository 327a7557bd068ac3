//! Adaptive Cash–Karp propagation in magnetic fields.
//!
//! Integrates the Lorentz-force equation of motion for the phase point
//! (position, direction) with the embedded 4(5)-order Cash–Karp
//! Runge–Kutta pair. The difference of the two solutions estimates the
//! local error; steps above the tolerance are retried shorter, steps below
//! it are accepted and the next step is proposed longer.
//!
//! Neutral particles skip the integrator and move in a straight line.

use std::ops::{Add, Mul};
use std::sync::Arc;

use crprop_core::units::{C_LIGHT, GPC, KPC};
use crprop_core::vector::{is_finite, unit_vector};
use crprop_core::{Candidate, ConfigError, ModuleError, Vector3d};
use crprop_module::{Module, ProcessContext};
use log::debug;

use super::simple::straight_step;
use super::validate_step_bounds;
use crate::field::Field;

// ── Cash–Karp tableau ──────────────────────────────────────────────

const A: [[f64; 5]; 6] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0],
    [3.0 / 10.0, -9.0 / 10.0, 6.0 / 5.0, 0.0, 0.0],
    [-11.0 / 54.0, 5.0 / 2.0, -70.0 / 27.0, 35.0 / 27.0, 0.0],
    [
        1631.0 / 55296.0,
        175.0 / 512.0,
        575.0 / 13824.0,
        44275.0 / 110592.0,
        253.0 / 4096.0,
    ],
];

/// Stage nodes c_i, the fraction of the step at which stage i is evaluated.
const NODES: [f64; 6] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 3.0 / 5.0, 1.0, 7.0 / 8.0];

/// Fifth-order weights.
const B: [f64; 6] = [37.0 / 378.0, 0.0, 250.0 / 621.0, 125.0 / 594.0, 0.0, 512.0 / 1771.0];

/// Embedded fourth-order weights.
const B_STAR: [f64; 6] = [
    2825.0 / 27648.0,
    0.0,
    18575.0 / 48384.0,
    13525.0 / 55296.0,
    277.0 / 14336.0,
    1.0 / 4.0,
];

const SAFETY: f64 = 0.95;
const ERROR_EXPONENT: f64 = -0.2;

// ── phase point ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
struct Phase {
    x: Vector3d,
    u: Vector3d,
}

impl Phase {
    const ZERO: Phase = Phase {
        x: Vector3d::new(0.0, 0.0, 0.0),
        u: Vector3d::new(0.0, 0.0, 0.0),
    };
}

impl Add for Phase {
    type Output = Phase;

    fn add(self, rhs: Phase) -> Phase {
        Phase {
            x: self.x + rhs.x,
            u: self.u + rhs.u,
        }
    }
}

impl Mul<f64> for Phase {
    type Output = Phase;

    fn mul(self, s: f64) -> Phase {
        Phase {
            x: self.x * s,
            u: self.u * s,
        }
    }
}

// ── configuration ──────────────────────────────────────────────────

/// How the six error components are combined into one number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorNorm {
    /// Largest absolute component.
    #[default]
    WorstOffender,
    /// Root mean square over the components.
    Rms,
}

impl ErrorNorm {
    /// Position errors are taken relative to the step length, direction
    /// errors as they are. A NaN component makes the norm NaN.
    fn apply(self, err: &Phase, step: f64) -> f64 {
        let pos = err.x / step;
        let comps = [pos.x, pos.y, pos.z, err.u.x, err.u.y, err.u.z];
        if comps.iter().any(|c| c.is_nan()) {
            return f64::NAN;
        }
        match self {
            ErrorNorm::WorstOffender => comps.iter().fold(0.0f64, |m, c| m.max(c.abs())),
            ErrorNorm::Rms => (comps.iter().map(|c| c * c).sum::<f64>() / 6.0).sqrt(),
        }
    }
}

/// What to do when the minimum step still misses the tolerance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FloorPolicy {
    /// Fail the candidate with [`ModuleError::StepFloorReached`].
    #[default]
    Fail,
    /// Accept the minimum-step result anyway.
    Accept,
}

/// Cash–Karp propagation in a magnetic field.
pub struct PropagationCK {
    field: Arc<dyn Field>,
    tolerance: f64,
    min_step: f64,
    max_step: f64,
    error_norm: ErrorNorm,
    max_retries: u32,
    floor_policy: FloorPolicy,
    max_growth: f64,
    max_shrink: f64,
}

impl std::fmt::Debug for PropagationCK {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagationCK")
            .field("tolerance", &self.tolerance)
            .field("min_step", &self.min_step)
            .field("max_step", &self.max_step)
            .field("error_norm", &self.error_norm)
            .field("max_retries", &self.max_retries)
            .field("floor_policy", &self.floor_policy)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PropagationCK`].
///
/// Required field: `field`.
pub struct PropagationCKBuilder {
    field: Option<Arc<dyn Field>>,
    tolerance: f64,
    min_step: f64,
    max_step: f64,
    error_norm: ErrorNorm,
    max_retries: u32,
    floor_policy: FloorPolicy,
    max_growth: f64,
    max_shrink: f64,
}

impl PropagationCK {
    /// Create a new builder.
    pub fn builder() -> PropagationCKBuilder {
        PropagationCKBuilder {
            field: None,
            tolerance: 1e-4,
            min_step: 0.1 * KPC,
            max_step: 1.0 * GPC,
            error_norm: ErrorNorm::WorstOffender,
            max_retries: 32,
            floor_policy: FloorPolicy::Fail,
            max_growth: 5.0,
            max_shrink: 0.1,
        }
    }

    /// Target relative error per step.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Smallest step the integrator shrinks to.
    pub fn min_step(&self) -> f64 {
        self.min_step
    }

    /// Largest step the integrator grows to.
    pub fn max_step(&self) -> f64 {
        self.max_step
    }

    fn derivative(&self, y: &Phase, q_c_over_e: f64, time: f64) -> Result<Phase, ModuleError> {
        let velocity = unit_vector(&y.u).ok_or(ModuleError::NonFinite { quantity: "direction" })? * C_LIGHT;
        let b = self.field.value_at(&y.x, time);
        Ok(Phase {
            x: velocity,
            u: velocity.cross(&b) * q_c_over_e,
        })
    }

    /// One trial step of duration `h`. Returns the fifth-order solution and
    /// the error estimate.
    fn try_step(&self, y: &Phase, h: f64, q_c_over_e: f64, t0: f64) -> Result<(Phase, Phase), ModuleError> {
        let mut k = [Phase::ZERO; 6];
        let mut out = *y;
        let mut err = Phase::ZERO;
        for i in 0..6 {
            let mut yi = *y;
            for (j, kj) in k.iter().enumerate().take(i) {
                yi = yi + *kj * (A[i][j] * h);
            }
            k[i] = self.derivative(&yi, q_c_over_e, t0 + NODES[i] * h)?;
            out = out + k[i] * (B[i] * h);
            err = err + k[i] * ((B[i] - B_STAR[i]) * h);
        }
        Ok((out, err))
    }

    /// Proposed next step after a step of length `step` with error ratio `r`.
    fn adapt(&self, step: f64, r: f64) -> f64 {
        let scaled = if r > 0.0 {
            step * SAFETY * r.powf(ERROR_EXPONENT)
        } else {
            f64::INFINITY
        };
        if r > 1.0 {
            scaled.max(step * self.max_shrink).max(self.min_step)
        } else {
            scaled.min(step * self.max_growth).min(self.max_step).max(self.min_step)
        }
    }
}

impl PropagationCKBuilder {
    /// Set the magnetic field.
    pub fn field(mut self, field: Arc<dyn Field>) -> Self {
        self.field = Some(field);
        self
    }

    /// Set the tolerance (default: 1e-4). Must lie in (0, 1].
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the minimum step (default: 0.1 kpc). Must be > 0.
    pub fn min_step(mut self, step: f64) -> Self {
        self.min_step = step;
        self
    }

    /// Set the maximum step (default: 1 Gpc).
    pub fn max_step(mut self, step: f64) -> Self {
        self.max_step = step;
        self
    }

    /// Set the error norm (default: worst offender).
    pub fn error_norm(mut self, norm: ErrorNorm) -> Self {
        self.error_norm = norm;
        self
    }

    /// Set how many rejected attempts one step may take (default: 32).
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the behaviour at the minimum step (default: fail).
    pub fn floor_policy(mut self, policy: FloorPolicy) -> Self {
        self.floor_policy = policy;
        self
    }

    /// Set the largest factor by which the step may grow (default: 5).
    pub fn max_growth(mut self, factor: f64) -> Self {
        self.max_growth = factor;
        self
    }

    /// Set the smallest factor by which the step may shrink (default: 0.1).
    pub fn max_shrink(mut self, factor: f64) -> Self {
        self.max_shrink = factor;
        self
    }

    /// Build the module, validating all configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the field is missing, the tolerance lies outside
    /// (0, 1], the step bounds are invalid, the retry budget is zero, or the
    /// growth/shrink factors are not `> 1` and in `(0, 1)` respectively.
    pub fn build(self) -> Result<PropagationCK, ConfigError> {
        const MODULE: &str = "PropagationCK";
        let field = self.field.ok_or(ConfigError::Missing {
            module: MODULE,
            parameter: "field",
        })?;
        if !(self.tolerance > 0.0 && self.tolerance <= 1.0) {
            return Err(ConfigError::InvalidTolerance {
                module: MODULE,
                value: self.tolerance,
            });
        }
        validate_step_bounds(MODULE, self.min_step, self.max_step)?;
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidParameter {
                module: MODULE,
                parameter: "max_retries",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.max_growth > 1.0 && self.max_growth.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                module: MODULE,
                parameter: "max_growth",
                reason: format!("must be finite and > 1, got {}", self.max_growth),
            });
        }
        if !(self.max_shrink > 0.0 && self.max_shrink < 1.0) {
            return Err(ConfigError::InvalidParameter {
                module: MODULE,
                parameter: "max_shrink",
                reason: format!("must lie in (0, 1), got {}", self.max_shrink),
            });
        }
        Ok(PropagationCK {
            field,
            tolerance: self.tolerance,
            min_step: self.min_step,
            max_step: self.max_step,
            error_norm: self.error_norm,
            max_retries: self.max_retries,
            floor_policy: self.floor_policy,
            max_growth: self.max_growth,
            max_shrink: self.max_shrink,
        })
    }
}

impl Module for PropagationCK {
    fn name(&self) -> &str {
        "PropagationCK"
    }

    fn describe(&self) -> String {
        format!(
            "PropagationCK: tolerance {}, step {} - {} kpc, {:?} norm",
            self.tolerance,
            self.min_step / KPC,
            self.max_step / KPC,
            self.error_norm
        )
    }

    fn process(&self, c: &mut Candidate, _ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let charge = c.current.charge();
        if charge == 0.0 {
            return straight_step(c, self.min_step, self.max_step);
        }

        let q_c_over_e = charge * C_LIGHT / c.current.energy();
        if !q_c_over_e.is_finite() {
            return Err(ModuleError::NonFinite {
                quantity: "charge-to-energy ratio",
            });
        }
        let y0 = Phase {
            x: *c.current.position(),
            u: *c.current.direction(),
        };
        let t0 = c.trajectory_length() / C_LIGHT;

        let (step, next, out) = if self.min_step == self.max_step {
            let (out, _) = self.try_step(&y0, self.max_step / C_LIGHT, q_c_over_e, t0)?;
            (self.max_step, self.max_step, out)
        } else {
            let mut step = c.next_step().clamp(self.min_step, self.max_step);
            let mut retries = 0u32;
            loop {
                let (out, err) = self.try_step(&y0, step / C_LIGHT, q_c_over_e, t0)?;
                let r = self.error_norm.apply(&err, step) / self.tolerance;
                if r.is_nan() {
                    return Err(ModuleError::NonFinite {
                        quantity: "error estimate",
                    });
                }
                if r <= 1.0 {
                    break (step, self.adapt(step, r), out);
                }
                if step <= self.min_step {
                    debug!(
                        "candidate {}: step floor {step} m reached with error ratio {r:.3e}",
                        c.serial_number()
                    );
                    match self.floor_policy {
                        FloorPolicy::Fail => {
                            return Err(ModuleError::StepFloorReached { step, error_ratio: r });
                        }
                        FloorPolicy::Accept => break (step, self.min_step, out),
                    }
                }
                retries += 1;
                if retries > self.max_retries {
                    return Err(ModuleError::RetryBudgetExhausted {
                        retries: self.max_retries,
                    });
                }
                step = self.adapt(step, r);
            }
        };

        if !is_finite(&out.x) {
            return Err(ModuleError::NonFinite { quantity: "position" });
        }
        let direction = unit_vector(&out.u).ok_or(ModuleError::NonFinite { quantity: "direction" })?;

        c.previous = c.current.clone();
        c.current.set_position(out.x);
        c.current.set_direction(direction);
        c.set_current_step(step);
        c.limit_next_step(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{UniformField, ZeroField};
    use crprop_core::particle_id::PROTON_PDG;
    use crprop_core::units::{EEV, EPLUS, MPC, NANOGAUSS};
    use crprop_core::{ParticleState, SerialCounter};

    fn proton(energy: f64) -> Candidate {
        let state = ParticleState::new(PROTON_PDG, energy, Vector3d::zeros(), Vector3d::x());
        Candidate::new(state, &SerialCounter::default())
    }

    fn step(prop: &PropagationCK, c: &mut Candidate) -> Result<(), ModuleError> {
        let mut ctx = ProcessContext::seeded(0);
        c.reset_step_bid();
        let result = prop.process(c, &mut ctx);
        c.commit_step_bid();
        result
    }

    fn larmor_radius(energy: f64, b: f64) -> f64 {
        energy / (EPLUS * C_LIGHT * b)
    }

    // ── builder ────────────────────────────────────────────────

    #[test]
    fn builder_requires_field() {
        assert!(matches!(
            PropagationCK::builder().build(),
            Err(ConfigError::Missing { parameter: "field", .. })
        ));
    }

    #[test]
    fn builder_rejects_bad_tolerance() {
        for tol in [0.0, -1e-3, 1.5, f64::NAN] {
            let r = PropagationCK::builder()
                .field(Arc::new(ZeroField))
                .tolerance(tol)
                .build();
            assert!(matches!(r, Err(ConfigError::InvalidTolerance { .. })), "{tol}");
        }
    }

    #[test]
    fn builder_rejects_inverted_steps() {
        let r = PropagationCK::builder()
            .field(Arc::new(ZeroField))
            .min_step(2.0)
            .max_step(1.0)
            .build();
        assert!(matches!(r, Err(ConfigError::MinStepExceedsMax { .. })));
    }

    #[test]
    fn builder_rejects_zero_step_bounds() {
        let base = || PropagationCK::builder().field(Arc::new(ZeroField));
        assert!(matches!(
            base().min_step(0.0).max_step(MPC).build(),
            Err(ConfigError::InvalidStep { value, .. }) if value == 0.0
        ));
        assert!(matches!(
            base().min_step(0.0).max_step(0.0).build(),
            Err(ConfigError::InvalidStep { .. })
        ));
    }

    #[test]
    fn builder_rejects_zero_retries_and_bad_factors() {
        let base = || PropagationCK::builder().field(Arc::new(ZeroField));
        assert!(base().max_retries(0).build().is_err());
        assert!(base().max_growth(1.0).build().is_err());
        assert!(base().max_shrink(1.0).build().is_err());
        assert!(base().build().is_ok());
    }

    // ── integration ────────────────────────────────────────────

    #[test]
    fn zero_field_is_exact_straight_line() {
        let prop = PropagationCK::builder()
            .field(Arc::new(ZeroField))
            .min_step(1.0 * KPC)
            .max_step(100.0 * MPC)
            .build()
            .unwrap();
        let mut c = proton(10.0 * EEV);
        c.set_next_step(3.0 * MPC);
        step(&prop, &mut c).unwrap();

        assert_eq!(c.current_step(), 3.0 * MPC);
        let expected = Vector3d::new(3.0 * MPC, 0.0, 0.0);
        assert!((c.current.position() - expected).norm() <= 1e-12 * 3.0 * MPC);
        assert_eq!(*c.current.direction(), Vector3d::x());
        // No error means maximal growth.
        assert_eq!(c.next_step(), 15.0 * MPC);
        assert_eq!(*c.previous.position(), Vector3d::zeros());
    }

    #[test]
    fn neutral_particle_moves_straight() {
        let prop = PropagationCK::builder()
            .field(Arc::new(UniformField::new(Vector3d::new(0.0, 0.0, NANOGAUSS))))
            .min_step(1.0 * KPC)
            .max_step(10.0 * MPC)
            .build()
            .unwrap();
        let state = ParticleState::new(22, EEV, Vector3d::zeros(), Vector3d::y());
        let mut c = Candidate::new(state, &SerialCounter::default());
        c.set_next_step(1.0 * MPC);
        step(&prop, &mut c).unwrap();
        assert_eq!(*c.current.position(), Vector3d::new(0.0, 1.0 * MPC, 0.0));
        assert_eq!(c.next_step(), 10.0 * MPC);
    }

    #[test]
    fn gyration_radius_is_conserved() {
        let b = NANOGAUSS;
        let energy = EEV;
        let r_l = larmor_radius(energy, b);
        let prop = PropagationCK::builder()
            .field(Arc::new(UniformField::new(Vector3d::new(0.0, 0.0, b))))
            .tolerance(1e-6)
            .min_step(1e-4 * r_l)
            .max_step(0.05 * r_l)
            .build()
            .unwrap();
        let mut c = proton(energy);
        // v × B = x × z = -y, so a positive charge circles around (0, -r_L, 0).
        let center = Vector3d::new(0.0, -r_l, 0.0);
        for _ in 0..200 {
            step(&prop, &mut c).unwrap();
            assert!((c.current.direction().norm() - 1.0).abs() < 1e-12);
        }
        let radius = (c.current.position() - center).norm();
        assert!((radius / r_l - 1.0).abs() < 1e-3, "radius ratio {}", radius / r_l);
        assert_eq!(c.current.energy(), energy);
        assert!(c.trajectory_length() > r_l);
    }

    #[test]
    fn floor_reached_fails_or_accepts() {
        let b = NANOGAUSS;
        let r_l = larmor_radius(EEV, b);
        let base = || {
            PropagationCK::builder()
                .field(Arc::new(UniformField::new(Vector3d::new(0.0, 0.0, b))))
                .tolerance(1e-12)
                .min_step(0.5 * r_l)
                .max_step(r_l)
        };

        let failing = base().build().unwrap();
        let mut c = proton(EEV);
        c.set_next_step(0.5 * r_l);
        let err = step(&failing, &mut c).unwrap_err();
        assert!(matches!(err, ModuleError::StepFloorReached { .. }));
        assert_eq!(c.trajectory_length(), 0.0);

        let accepting = base().floor_policy(FloorPolicy::Accept).build().unwrap();
        let mut c = proton(EEV);
        c.set_next_step(0.5 * r_l);
        step(&accepting, &mut c).unwrap();
        assert_eq!(c.current_step(), 0.5 * r_l);
        assert_eq!(c.next_step(), 0.5 * r_l);
    }

    #[test]
    fn retry_budget_exhausted() {
        let b = NANOGAUSS;
        let r_l = larmor_radius(EEV, b);
        let prop = PropagationCK::builder()
            .field(Arc::new(UniformField::new(Vector3d::new(0.0, 0.0, b))))
            .tolerance(1e-12)
            .min_step(1e-9 * r_l)
            .max_step(r_l)
            .max_retries(1)
            .build()
            .unwrap();
        let mut c = proton(EEV);
        c.set_next_step(r_l);
        assert_eq!(
            step(&prop, &mut c),
            Err(ModuleError::RetryBudgetExhausted { retries: 1 })
        );
    }

    #[test]
    fn fixed_step_when_bounds_equal() {
        let prop = PropagationCK::builder()
            .field(Arc::new(UniformField::new(Vector3d::new(0.0, 0.0, NANOGAUSS))))
            .min_step(1.0 * MPC)
            .max_step(1.0 * MPC)
            .build()
            .unwrap();
        let mut c = proton(EEV);
        step(&prop, &mut c).unwrap();
        assert_eq!(c.current_step(), 1.0 * MPC);
        assert_eq!(c.next_step(), 1.0 * MPC);
    }

    #[test]
    fn nan_error_component_propagates() {
        let err = Phase {
            x: Vector3d::new(0.0, f64::NAN, 0.0),
            u: Vector3d::new(1.0, 0.0, 0.0),
        };
        assert!(ErrorNorm::WorstOffender.apply(&err, 1.0).is_nan());
        assert!(ErrorNorm::Rms.apply(&err, 1.0).is_nan());
        // Zero-length step: 0/0 in the position error.
        assert!(ErrorNorm::WorstOffender.apply(&Phase::ZERO, 0.0).is_nan());
    }

    #[test]
    fn nan_field_fails_the_step() {
        let prop = PropagationCK::builder()
            .field(Arc::new(UniformField::new(Vector3d::new(0.0, 0.0, f64::NAN))))
            .min_step(KPC)
            .max_step(MPC)
            .build()
            .unwrap();
        let mut c = proton(EEV);
        c.set_next_step(MPC);
        assert!(matches!(step(&prop, &mut c), Err(ModuleError::NonFinite { .. })));
        assert_eq!(c.trajectory_length(), 0.0);
    }

    #[test]
    fn rms_norm_never_exceeds_worst_offender() {
        let err = Phase {
            x: Vector3d::new(1.0, -2.0, 0.5),
            u: Vector3d::new(0.1, 0.0, -0.3),
        };
        let worst = ErrorNorm::WorstOffender.apply(&err, 1.0);
        let rms = ErrorNorm::Rms.apply(&err, 1.0);
        assert_eq!(worst, 2.0);
        assert!(rms <= worst);
    }
}
