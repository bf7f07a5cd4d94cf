//! Numeric notation used by ISOTROPY
//!
//! The engine reads and prints rationals as `p/q`. These helpers convert
//! between that notation and `f64` for callers that need numbers.

use crate::error::{Error, Result};

/// Denominator bound used when rendering basis and cell matrices
pub const MATRIX_MAX_DENOMINATOR: u64 = 1000;

/// Parse `3`, `-0.25` or `1/2` into a float
pub fn parse_number(text: &str) -> Result<f64> {
    let text = text.trim();
    let not_numeric = || Error::NotNumeric {
        text: text.to_string(),
    };

    if let Some((num, den)) = text.split_once('/') {
        let num: f64 = num.trim().parse().map_err(|_| not_numeric())?;
        let den: f64 = den.trim().parse().map_err(|_| not_numeric())?;
        if den == 0.0 {
            return Err(not_numeric());
        }
        return Ok(num / den);
    }

    text.parse().map_err(|_| not_numeric())
}

/// Largest magnitude whose integer part an `f64` still holds exactly
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Closest fraction to `x` whose denominator does not exceed `max_denominator`
///
/// `None` for NaN, infinities and magnitudes past 2^53, which have no
/// meaningful rational form.
pub fn approximate_fraction(x: f64, max_denominator: u64) -> Option<(i64, u64)> {
    if !x.is_finite() || x.abs() >= EXACT_INTEGER_LIMIT {
        return None;
    }
    let max_denominator = max_denominator.max(1);
    let negative = x < 0.0;
    let target = x.abs();

    let (mut p0, mut q0, mut p1, mut q1) = (0i64, 1u64, 1i64, 0u64);
    let mut remainder = target;
    loop {
        let a = remainder.floor();
        let q2 = q0 as f64 + a * q1 as f64;
        if q2 > max_denominator as f64 {
            break;
        }
        let Some(p2) = (a as i64).checked_mul(p1).and_then(|p| p.checked_add(p0)) else {
            break;
        };
        (p0, q0, p1, q1) = (p1, q1, p2, q2 as u64);

        let fractional = remainder - a;
        if fractional < 1e-12 || (p1 as f64 / q1 as f64 - target).abs() < 1e-12 {
            break;
        }
        remainder = 1.0 / fractional;
    }
    if q1 == 0 {
        return None;
    }

    // semiconvergent between the last two convergents
    let k = max_denominator.saturating_sub(q0) / q1;
    let bound = i64::try_from(k)
        .ok()
        .and_then(|k| k.checked_mul(p1))
        .and_then(|p| p.checked_add(p0))
        .zip(k.checked_mul(q1).and_then(|q| q.checked_add(q0)));
    let convergent_err = (p1 as f64 / q1 as f64 - target).abs();
    let (num, den) = match bound {
        Some((bp, bq)) if bq > 0 && (bp as f64 / bq as f64 - target).abs() < convergent_err => {
            (bp, bq)
        }
        _ => (p1, q1),
    };

    Some(if negative && num != 0 {
        (-num, den)
    } else {
        (num, den)
    })
}

/// Render `x` as `p/q` (or `p` for whole numbers)
///
/// Values without a rational form fall back to plain float formatting.
pub fn fraction_string(x: f64, max_denominator: u64) -> String {
    match approximate_fraction(x, max_denominator) {
        Some((num, 1)) => num.to_string(),
        Some((num, den)) => format!("{}/{}", num, den),
        None => x.to_string(),
    }
}

/// `1/2,0,0` style vector
pub fn vector_to_iso_string(vector: &[f64], max_denominator: u64) -> String {
    vector
        .iter()
        .map(|x| fraction_string(*x, max_denominator))
        .collect::<Vec<_>>()
        .join(",")
}

/// `1,0,0 0,1,0 0,0,1` style matrix (rows separated by spaces)
pub fn matrix_to_iso_string<R: AsRef<[f64]>>(rows: &[R]) -> String {
    rows.iter()
        .map(|row| vector_to_iso_string(row.as_ref(), MATRIX_MAX_DENOMINATOR))
        .collect::<Vec<_>>()
        .join(" ")
}
