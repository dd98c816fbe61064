//! Standard normal distribution helpers.
//!
//! The fragility model only needs the CDF:
//!
//! - `Φ(z) = ½ · erfc(−z / √2)`
//!
//! Numerical notes:
//! - `erfc` uses the Chebyshev-fitted rational form from Numerical Recipes
//!   (fractional error < 1.2e-7 everywhere), which is far below the
//!   probability clamp applied by the likelihood.
//! - Evaluating through `erfc` (rather than `1 - erf`) keeps the lower tail
//!   accurate instead of cancelling to zero.

use std::f64::consts::SQRT_2;

/// Complementary error function.
pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * (-z * z + poly).exp();
    if x >= 0.0 { ans } else { 2.0 - ans }
}

/// Standard normal CDF `Φ(z)`.
pub fn normal_cdf(z: f64) -> f64 {
    if z == f64::INFINITY {
        return 1.0;
    }
    if z == f64::NEG_INFINITY {
        return 0.0;
    }
    0.5 * erfc(-z / SQRT_2)
}
