//! SI base units, prefixes and physical constants.
//!
//! All quantities in crprop are plain `f64` values in SI units. Multiply
//! by a constant to enter a value (`50.0 * MPC`) and divide to read one
//! back (`length / MPC`).
//!
//! Constants follow CODATA 2006 and the IAU 2012/2015 resolutions.

use std::f64::consts::PI;

// ── SI base and derived units ──────────────────────────────────────

/// One metre.
pub const METER: f64 = 1.0;
/// One second.
pub const SECOND: f64 = 1.0;
/// One kilogram.
pub const KILOGRAM: f64 = 1.0;
/// One ampere.
pub const AMPERE: f64 = 1.0;
/// One kelvin.
pub const KELVIN: f64 = 1.0;

/// One newton.
pub const NEWTON: f64 = KILOGRAM * METER / SECOND / SECOND;
/// One joule.
pub const JOULE: f64 = NEWTON * METER;
/// One tesla.
pub const TESLA: f64 = NEWTON / AMPERE / METER;
/// One volt.
pub const VOLT: f64 = KILOGRAM * METER * METER / AMPERE / SECOND / SECOND / SECOND;
/// One coulomb.
pub const COULOMB: f64 = AMPERE * SECOND;

// ── physical constants ─────────────────────────────────────────────

/// Elementary charge.
pub const EPLUS: f64 = 1.602176487e-19 * AMPERE * SECOND;
/// Speed of light in vacuum.
pub const C_LIGHT: f64 = 2.99792458e8 * METER / SECOND;
/// Speed of light squared.
pub const C_SQUARED: f64 = C_LIGHT * C_LIGHT;
/// Atomic mass unit.
pub const AMU: f64 = 1.660538921e-27 * KILOGRAM;
/// Proton rest mass.
pub const MASS_PROTON: f64 = 1.67262158e-27 * KILOGRAM;
/// Neutron rest mass.
pub const MASS_NEUTRON: f64 = 1.67492735e-27 * KILOGRAM;
/// Electron rest mass.
pub const MASS_ELECTRON: f64 = 9.10938291e-31 * KILOGRAM;
/// Muon rest mass.
pub const MASS_MUON: f64 = 1.883531594e-28 * KILOGRAM;
/// Planck constant.
pub const H_PLANCK: f64 = 6.62606957e-34 * JOULE * SECOND;
/// Boltzmann constant.
pub const K_BOLTZMANN: f64 = 1.3806488e-23 * JOULE / KELVIN;

// ── magnetic field strength ────────────────────────────────────────

/// One gauss.
pub const GAUSS: f64 = 1e-4 * TESLA;
/// One microgauss.
pub const MICROGAUSS: f64 = 1e-6 * GAUSS;
/// One nanogauss.
pub const NANOGAUSS: f64 = 1e-9 * GAUSS;

// ── energy ─────────────────────────────────────────────────────────

/// One electronvolt.
pub const EV: f64 = EPLUS * VOLT;
/// One kiloelectronvolt.
pub const KEV: f64 = 1e3 * EV;
/// One megaelectronvolt.
pub const MEV: f64 = 1e6 * EV;
/// One gigaelectronvolt.
pub const GEV: f64 = 1e9 * EV;
/// One teraelectronvolt.
pub const TEV: f64 = 1e12 * EV;
/// One petaelectronvolt.
pub const PEV: f64 = 1e15 * EV;
/// One exaelectronvolt.
pub const EEV: f64 = 1e18 * EV;

// ── distance ───────────────────────────────────────────────────────

/// One kilometre.
pub const KILOMETER: f64 = 1000.0 * METER;
/// One astronomical unit.
pub const AU: f64 = 149_597_870_700.0 * METER;
/// One parsec.
pub const PARSEC: f64 = 648_000.0 / PI * AU;
/// One kiloparsec.
pub const KPC: f64 = 1e3 * PARSEC;
/// One megaparsec.
pub const MPC: f64 = 1e6 * PARSEC;
/// One gigaparsec.
pub const GPC: f64 = 1e9 * PARSEC;
