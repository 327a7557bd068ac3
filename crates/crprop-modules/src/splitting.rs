//! Weight splitting on energy-bin crossings.

use crprop_core::{Candidate, ConfigError, ModuleError};
use crprop_module::{Module, ProcessContext};

/// Splits a candidate into `n_split` equally weighted copies each time its
/// energy rises across a bin edge.
///
/// The candidate's weight is divided by `n_split` per crossed edge and
/// `n_split - 1` copies are added as secondaries. The copies see the
/// current energy as their previous energy, so they are not split again
/// for the same crossing. Candidates at or below the minimal weight are
/// left alone.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateSplitting {
    n_split: u32,
    bins: Vec<f64>,
    min_weight: f64,
}

impl Default for CandidateSplitting {
    /// No splitting.
    fn default() -> Self {
        Self {
            n_split: 0,
            bins: Vec::new(),
            min_weight: 1.0,
        }
    }
}

impl CandidateSplitting {
    /// `n_bins` edges between `e_min` and `e_max`, linearly or
    /// logarithmically spaced.
    pub fn new(
        n_split: u32,
        e_min: f64,
        e_max: f64,
        n_bins: usize,
        min_weight: f64,
        log: bool,
    ) -> Result<Self, ConfigError> {
        let mut s = Self::default();
        s.set_n_split(n_split);
        s.set_energy_bins(e_min, e_max, n_bins, log)?;
        s.set_min_weight(min_weight);
        Ok(s)
    }

    /// Splitting for diffusive shock acceleration with a spectrum of
    /// `spectral_index` (must be < -1): always two copies, edges at
    /// `e_min * dE^i` for `i = 1..=n_bins` with `dE = 0.5^(1/(index+1))`,
    /// and minimal weight `2^-n_bins`.
    pub fn for_spectrum(spectral_index: f64, e_min: f64, n_bins: u32) -> Result<Self, ConfigError> {
        if !(spectral_index < -1.0) {
            return Err(invalid("spectral_index", format!("must be < -1, got {spectral_index}")));
        }
        if !(e_min.is_finite() && e_min > 0.0) {
            return Err(invalid("e_min", format!("must be finite and > 0, got {e_min}")));
        }
        let de = 0.5f64.powf(1.0 / (spectral_index + 1.0));
        Ok(Self {
            n_split: 2,
            bins: (1..=n_bins).map(|i| e_min * de.powi(i as i32)).collect(),
            min_weight: 0.5f64.powi(n_bins as i32),
        })
    }

    /// Number of copies per crossing, including the original. 0 disables
    /// splitting.
    pub fn set_n_split(&mut self, n: u32) {
        self.n_split = n;
    }

    /// Candidates with weight at or below `w` are not split.
    pub fn set_min_weight(&mut self, w: f64) {
        self.min_weight = w;
    }

    /// Replace the bin edges.
    pub fn set_energy_bins(&mut self, e_min: f64, e_max: f64, n_bins: usize, log: bool) -> Result<(), ConfigError> {
        if !(e_min.is_finite() && e_max.is_finite()) || e_min > e_max {
            return Err(invalid("energy_bins", format!("need finite e_min <= e_max, got {e_min} and {e_max}")));
        }
        if log && e_min <= 0.0 {
            return Err(invalid("energy_bins", "logarithmic bins need e_min > 0".into()));
        }
        let de = (e_max - e_min) / n_bins as f64;
        self.bins = (0..n_bins)
            .map(|i| {
                if log {
                    if n_bins == 1 {
                        e_min
                    } else {
                        e_min * (e_max / e_min).powf(i as f64 / (n_bins as f64 - 1.0))
                    }
                } else {
                    e_min + i as f64 * de
                }
            })
            .collect();
        Ok(())
    }

    /// Bin edges, ascending.
    pub fn energy_bins(&self) -> &[f64] {
        &self.bins
    }

    /// Copies per crossing.
    pub fn n_split(&self) -> u32 {
        self.n_split
    }

    /// Minimal weight.
    pub fn min_weight(&self) -> f64 {
        self.min_weight
    }
}

fn invalid(parameter: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidParameter {
        module: "CandidateSplitting",
        parameter,
        reason,
    }
}

impl Module for CandidateSplitting {
    fn name(&self) -> &str {
        "CandidateSplitting"
    }

    fn describe(&self) -> String {
        format!(
            "CandidateSplitting: {} copies over {} energy bins, minimal weight {}",
            self.n_split,
            self.bins.len(),
            self.min_weight
        )
    }

    fn process(&self, c: &mut Candidate, ctx: &mut ProcessContext) -> Result<(), ModuleError> {
        let current = c.current.energy();
        let previous = c.previous.energy();
        if c.weight() <= self.min_weight || self.n_split == 0 {
            return Ok(());
        }
        let Some(&lowest) = self.bins.first() else {
            return Ok(());
        };
        if current < lowest {
            return Ok(());
        }

        // First edge above the previous energy; edges from there up to the
        // current energy were crossed during the last step.
        let Some(first) = self.bins.iter().position(|&edge| previous < edge) else {
            return Ok(());
        };
        let crossed = self.bins[first..].iter().take_while(|&&edge| current >= edge).count();
        for _ in 0..crossed {
            c.update_weight(1.0 / f64::from(self.n_split));
            for _ in 1..self.n_split {
                let mut copy = c.clone_with_new_serials(false, ctx.serials());
                copy.previous.set_energy(current);
                c.add_secondary_candidate(copy);
            }
        }
        Ok(())
    }
}
