//! Proportional payment calculator.

use attn_types::Amount;

/// Tokens owed to an account with `attention_rate` out of `round_supply`.
///
/// The share is computed as `round_supply / floor(total_attention / attention_rate)`
/// in integer units, then clamped to `available`. A portion at or above the
/// round supply pays nothing. A rate above the total (portion rounds to zero)
/// is paid as if it held the whole total.
pub fn calculate_payment(
    total_attention: f64,
    attention_rate: f64,
    round_supply: Amount,
    available: Amount,
) -> Amount {
    if !(attention_rate > 0.0) || !(total_attention > 0.0) {
        return 0;
    }
    let portion = ((total_attention / attention_rate) as Amount).max(1);
    let payment = if portion < round_supply {
        round_supply / portion
    } else {
        0
    };
    payment.min(available)
}
