//! Physical and numerical constants shared by the recombination kernels.
//!
//! Values follow the radiative-transfer code the coefficients feed into, so
//! rates computed here stay consistent with the rest of that simulation.

/// `h / k` in cgs units (s K).
pub const PLANCK_OVER_BOLTZMANN: f64 = 4.799_437e-11;
/// Largest `h (nu - nu_0) / k T` worth integrating over before the Boltzmann
/// factor makes the remaining tail negligible.
pub const NUMAX_LIMIT: f64 = 30.0;
/// `(2 pi / (m_e k))^1.5 * 2 / c^2` prefactor of the Milne relation.
pub const ALPHA_SP_CONSTANT: f64 = 5.796_18e-36;
/// Relative tolerance every recombination integral is evaluated to.
pub const ALPHA_SP_REL_TOL: f64 = 1.0e-4;
