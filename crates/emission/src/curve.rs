//! Quadratic emission curve.
//!
//! The curve `f(x) = a·x² + b·x + c` tracks the remaining gap to the soft
//! supply ceiling (in whole tokens) as a function of emission time `x` in
//! days, with `c` the soft ceiling itself. The current position on the curve
//! is the smaller root of `a·x² + b·x + circulating = 0`, i.e. the point where
//! `f(x) = c - circulating`. The tokens to emit over an interval `Δ` are the
//! drop of the curve between `x` and `x + Δ`.
//!
//! Floating point is confined to this module. Callers truncate results toward
//! zero and never round.

use crate::errors::EmissionError;
use attn_types::Amount;

/// Both roots of `a·x² + b·x + c = 0`, larger first.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Result<(f64, f64), EmissionError> {
    let d = b * b - 4.0 * a * c;
    if !(d >= 0.0) || a == 0.0 {
        return Err(EmissionError::CurveUnsolvable { circulating: c });
    }
    let sqrt_d = d.sqrt();
    Ok(((-b + sqrt_d) / 2.0 / a, (-b - sqrt_d) / 2.0 / a))
}

/// `a·x² + b·x + c`.
pub fn parabola(a: f64, b: f64, c: f64, x: f64) -> f64 {
    a * x * x + b * x + c
}

/// Curve position for a circulating supply expressed in whole tokens.
pub fn current_offset(a: f64, b: f64, circulating_tokens: f64) -> Result<f64, EmissionError> {
    let (_, smaller) = solve_quadratic(a, b, circulating_tokens)?;
    Ok(smaller)
}

/// Whole tokens the curve releases between `offset` and `offset + span_days`.
///
/// Negative drops (past the curve's vertex) release nothing.
pub fn emission_over(a: f64, b: f64, offset: f64, span_days: f64) -> f64 {
    let drop = parabola(a, b, 0.0, offset) - parabola(a, b, 0.0, offset + span_days);
    drop.max(0.0)
}

/// Convert whole tokens into minimal units, truncating toward zero.
pub fn tokens_to_units(tokens: f64, unit: Amount) -> Amount {
    // `as` saturates: negatives and NaN become 0.
    (tokens * unit as f64) as Amount
}

/// Truncate to whole tokens first, then scale to minimal units.
pub fn whole_tokens_to_units(tokens: f64, unit: Amount) -> Amount {
    (tokens as Amount).saturating_mul(unit)
}
