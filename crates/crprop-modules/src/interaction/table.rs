//! In-memory rate tables for the stochastic interactions.
//!
//! Tables are built from plain arrays and validated once at construction.
//! Lookups never fail: an id with no entry has no channels, and arguments
//! outside a curve's tabulated range are clamped to its end points.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crprop_core::{Candidate, ConfigError, Random};

/// Scratch list of `(channel, rate)` pairs filled once per pass.
pub type ChannelRates = SmallVec<[(i32, f64); 8]>;

// ── RateCurve ──────────────────────────────────────────────────────

/// A tabulated, non-negative function of one positive argument.
///
/// Interpolated log-log between grid points. Segments touching a zero
/// value fall back to linear interpolation in `log x`.
#[derive(Clone, Debug, PartialEq)]
pub struct RateCurve {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl RateCurve {
    /// Curve through the points `(x[i], y[i])`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidTable`] if the arrays are empty or differ in
    /// length, `x` is not positive and strictly increasing, or any `y` is
    /// negative or non-finite.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, ConfigError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(invalid(format!(
                "rate curve needs matching non-empty axes, got {} and {} points",
                x.len(),
                y.len()
            )));
        }
        if !x.iter().all(|v| v.is_finite() && *v > 0.0) {
            return Err(invalid("rate curve abscissae must be finite and > 0".into()));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(invalid("rate curve abscissae must be strictly increasing".into()));
        }
        if !y.iter().all(|v| v.is_finite() && *v >= 0.0) {
            return Err(invalid("rate curve values must be finite and >= 0".into()));
        }
        Ok(Self { x, y })
    }

    /// Curve on a logarithmically equidistant grid from `x_min` to `x_max`.
    ///
    /// # Errors
    ///
    /// As [`RateCurve::new`], and if fewer than two values are given.
    pub fn log_spaced(x_min: f64, x_max: f64, y: Vec<f64>) -> Result<Self, ConfigError> {
        if y.len() < 2 || !(x_min > 0.0 && x_max > x_min) {
            return Err(invalid(format!(
                "log grid needs 0 < x_min < x_max and two values, got [{x_min}, {x_max}] with {}",
                y.len()
            )));
        }
        let n = y.len() - 1;
        let ratio = (x_max / x_min).ln();
        let x = (0..=n)
            .map(|i| x_min * (ratio * i as f64 / n as f64).exp())
            .collect();
        Self::new(x, y)
    }

    /// Smallest and largest tabulated argument.
    pub fn range(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Interpolated value at `x`, clamped outside the table. NaN yields 0.
    pub fn value(&self, x: f64) -> f64 {
        if x.is_nan() {
            return 0.0;
        }
        let last = self.x.len() - 1;
        if x <= self.x[0] {
            return self.y[0];
        }
        if x >= self.x[last] {
            return self.y[last];
        }
        let i = self.x.partition_point(|v| *v <= x);
        let (x0, x1, y0, y1) = (self.x[i - 1], self.x[i], self.y[i - 1], self.y[i]);
        let t = (x / x0).ln() / (x1 / x0).ln();
        if y0 > 0.0 && y1 > 0.0 {
            y0 * (y1 / y0).powf(t)
        } else {
            y0 + (y1 - y0) * t
        }
    }
}

// ── EmissionSpectrum ───────────────────────────────────────────────

/// A binned energy distribution to draw emitted particles from.
///
/// A bin is chosen by its weight, then the energy is drawn log-uniformly
/// inside it.
#[derive(Clone, Debug, PartialEq)]
pub struct EmissionSpectrum {
    edges: Vec<f64>,
    cdf: Vec<f64>,
}

impl EmissionSpectrum {
    /// Spectrum with bins `[edges[i], edges[i + 1])` weighted by `weights[i]`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidTable`] unless there is one more edge than
    /// weights, edges are positive and strictly increasing, weights are
    /// finite and non-negative, and at least one weight is positive.
    pub fn new(edges: Vec<f64>, weights: &[f64]) -> Result<Self, ConfigError> {
        if weights.is_empty() || edges.len() != weights.len() + 1 {
            return Err(invalid(format!(
                "spectrum needs n + 1 edges for n weights, got {} and {}",
                edges.len(),
                weights.len()
            )));
        }
        if !edges.iter().all(|e| e.is_finite() && *e > 0.0) || edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(invalid("spectrum edges must be positive and strictly increasing".into()));
        }
        if !weights.iter().all(|w| w.is_finite() && *w >= 0.0) {
            return Err(invalid("spectrum weights must be finite and >= 0".into()));
        }
        let cdf: Vec<f64> = weights
            .iter()
            .scan(0.0, |sum, w| {
                *sum += w;
                Some(*sum)
            })
            .collect();
        if cdf.last().is_none_or(|total| *total <= 0.0) {
            return Err(invalid("spectrum has no positive weight".into()));
        }
        Ok(Self { edges, cdf })
    }

    /// Draw one energy.
    pub fn sample(&self, random: &mut Random) -> f64 {
        let total = self.cdf[self.cdf.len() - 1];
        let pick = random.uniform() * total;
        let bin = self.cdf.partition_point(|c| *c <= pick).min(self.cdf.len() - 1);
        let (lo, hi) = (self.edges[bin], self.edges[bin + 1]);
        lo * (hi / lo).powf(random.uniform())
    }
}

// ── ChannelTable ───────────────────────────────────────────────────

/// One interaction outcome with its rate curve.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    /// Model-specific channel code.
    pub code: i32,
    /// Rate per metre as a function of the model's lookup variable.
    pub rate: RateCurve,
    /// Optional photon emission accompanying the channel.
    pub photons: Option<EmissionSpectrum>,
}

impl Channel {
    /// Channel without accompanying emission.
    pub fn new(code: i32, rate: RateCurve) -> Self {
        Self {
            code,
            rate,
            photons: None,
        }
    }

    /// Emit one photon drawn from `spectrum` per interaction.
    pub fn with_photons(mut self, spectrum: EmissionSpectrum) -> Self {
        self.photons = Some(spectrum);
        self
    }
}

/// Channels keyed by particle id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelTable {
    entries: IndexMap<i32, Vec<Channel>>,
}

impl ChannelTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel for particle `id`. A repeated code replaces the
    /// earlier channel.
    pub fn insert(&mut self, id: i32, channel: Channel) -> &mut Self {
        let list = self.entries.entry(id).or_default();
        match list.iter_mut().find(|c| c.code == channel.code) {
            Some(existing) => *existing = channel,
            None => list.push(channel),
        }
        self
    }

    /// Channels of particle `id`; empty if it has none.
    pub fn channels(&self, id: i32) -> &[Channel] {
        self.entries.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The channel with `code` for particle `id`.
    pub fn channel(&self, id: i32, code: i32) -> Option<&Channel> {
        self.channels(id).iter().find(|c| c.code == code)
    }

    /// Push `(code, rate(x) * scale)` for every channel of `id` into `out`.
    pub fn rates_into(&self, id: i32, x: f64, scale: f64, out: &mut ChannelRates) {
        out.extend(self.channels(id).iter().map(|c| (c.code, c.rate.value(x) * scale)));
    }

    /// Number of particle ids with at least one channel.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── cutoff ─────────────────────────────────────────────────────────

/// Secondaries below either threshold are discarded on creation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SecondaryCutoff {
    /// Minimum total energy.
    pub min_energy: f64,
    /// Minimum statistical weight.
    pub min_weight: f64,
}

impl SecondaryCutoff {
    /// Whether `secondary` survives the cutoff.
    pub fn keeps(&self, secondary: &Candidate) -> bool {
        secondary.current.energy() >= self.min_energy && secondary.weight() >= self.min_weight
    }
}

/// Linear interpolation of `(xs, ys)` at `x`, clamped at the ends.
///
/// `xs` must be increasing and as long as `ys`; empty tables and NaN
/// give 0.
pub fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 || x.is_nan() {
        return 0.0;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    let i = xs[..n].partition_point(|v| *v <= x);
    let (x0, x1) = (xs[i - 1], xs[i]);
    ys[i - 1] + (ys[i] - ys[i - 1]) * (x - x0) / (x1 - x0)
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::InvalidTable { reason }
}
