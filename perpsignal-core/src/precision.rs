//! Fixed-precision rounding for published numbers.
//!
//! Currency is published with 2 decimals, prices and percentages with 4,
//! fractions with 6.

pub const CURRENCY_DECIMALS: i32 = 2;
pub const PRICE_DECIMALS: i32 = 4;
pub const FRACTION_DECIMALS: i32 = 6;

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
