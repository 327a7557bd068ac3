//! [`Random`]: seeded per-stream random-number capability.
//!
//! Every candidate in a bulk run draws from its own ChaCha stream keyed by
//! `(seed, index)`, so results are independent of worker scheduling.

use std::f64::consts::PI;

use rand::distr::Open01;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Exp1, StandardNormal};

use crate::vector::{perpendicular, unit_vector, Vector3d};

/// Random-number generator with the samplers the simulation needs.
#[derive(Clone, Debug)]
pub struct Random {
    rng: ChaCha8Rng,
}

impl Random {
    /// Generator on stream 0 of `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Generator on an independent `stream` of `seed`.
    pub fn for_stream(seed: u64, stream: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Self { rng }
    }

    /// Direct access to the underlying generator for other distributions.
    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Uniform draw in [0, 1).
    pub fn uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Uniform draw in the open interval (0, 1). Safe to take the log of.
    pub fn uniform_open(&mut self) -> f64 {
        self.rng.sample(Open01)
    }

    /// Uniform draw in [min, max).
    pub fn uniform_range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.uniform()
    }

    /// Gaussian draw with the given mean and standard deviation.
    pub fn normal(&mut self, mean: f64, sigma: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        mean + sigma * z
    }

    /// Exponential draw with the given mean.
    pub fn exponential(&mut self, mean: f64) -> f64 {
        let e: f64 = self.rng.sample(Exp1);
        mean * e
    }

    /// Draw from dN/dx ∝ x^index on [min, max].
    pub fn power_law(&mut self, index: f64, min: f64, max: f64) -> f64 {
        let u = self.uniform();
        if (index + 1.0).abs() < f64::EPSILON {
            let (lmin, lmax) = (min.ln(), max.ln());
            (lmin + (lmax - lmin) * u).exp()
        } else {
            let g = index + 1.0;
            let (pmin, pmax) = (min.powf(g), max.powf(g));
            (pmin + (pmax - pmin) * u).powf(1.0 / g)
        }
    }

    /// Unit vector uniformly distributed on the sphere.
    pub fn isotropic_vector(&mut self) -> Vector3d {
        let z = self.uniform_range(-1.0, 1.0);
        let phi = self.uniform_range(0.0, 2.0 * PI);
        let r = (1.0 - z * z).max(0.0).sqrt();
        Vector3d::new(r * phi.cos(), r * phi.sin(), z)
    }

    /// Unit vector uniformly distributed within `angle` radians of `mean`.
    ///
    /// A zero `mean` has no axis; the draw is then isotropic.
    pub fn cone_vector(&mut self, mean: &Vector3d, angle: f64) -> Vector3d {
        let Some(axis) = unit_vector(mean) else {
            return self.isotropic_vector();
        };
        let cos_theta = self.uniform_range(angle.cos(), 1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let phi = self.uniform_range(0.0, 2.0 * PI);
        let u = perpendicular(&axis);
        let w = axis.cross(&u);
        u * (sin_theta * phi.cos()) + w * (sin_theta * phi.sin()) + axis * cos_theta
    }

    /// Uniform point on the segment from `a` to `b`.
    pub fn interpolated_position(&mut self, a: &Vector3d, b: &Vector3d) -> Vector3d {
        a + (b - a) * self.uniform()
    }
}
