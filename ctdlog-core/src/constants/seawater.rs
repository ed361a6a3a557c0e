//! Seawater and Fresh-Water Conversion Coefficients
//!
//! Salinity follows Miller, Bradford and Peters, *Specific Conductance:
//! Theoretical Considerations and Application to Analytical Quality Control*,
//! USGS Water-Supply Paper 2311 (1988):
//!
//! ```text
//! K          = B0 + B1·T + B2·T² + B3·T³ + B4·T⁴ + B5·T⁵ + B6·T⁶
//! A          = 0.36996 / (k^-1.07 − 7.464e-4)
//! chlorinity = A · K
//! salinity   = 1.80655 · chlorinity
//! ```
//!
//! with `T` in °C and `k` in mS/cm.

/// Temperature polynomial coefficients `B0..=B6`.
///
/// Source: USGS Water-Supply Paper 2311
pub const SALINITY_TEMPERATURE_POLY: [f32; 7] = [
    0.13855E1,
    -0.46485668E-1,
    0.14887785E-2,
    -0.63083433E-4,
    0.25144517E-5,
    -0.59600245E-7,
    0.57778085E-9,
];

/// Numerator of the conductance term `A`.
pub const SALINITY_CONDUCTANCE_SCALE: f32 = 0.36996;

/// Exponent applied to conductance in the `A` term.
pub const SALINITY_CONDUCTANCE_EXPONENT: f32 = -1.07;

/// Offset subtracted from `k^-1.07`; the term must stay strictly above it.
pub const SALINITY_CONDUCTANCE_OFFSET: f32 = 7.464E-4;

/// Chlorinity to salinity ratio (Knudsen).
pub const CHLORINITY_TO_SALINITY: f32 = 1.80655;

/// Linear temperature compensation coefficient for KCl / fresh water (1/°C).
///
/// Source: USGS Water-Supply Paper 2311; Pawlowicz (2008)
pub const K25_TEMPERATURE_COEFFICIENT: f32 = 0.0191;

/// Reference temperature for compensated conductivity (°C).
pub const K25_REFERENCE_TEMPERATURE_C: f32 = 25.0;

/// Ratio of total dissolved solids to k25.
///
/// Pawlowicz (2008) notes the factor varies widely with composition.
pub const TDS_PER_K25: f32 = 0.65;
