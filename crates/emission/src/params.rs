use crate::errors::EmissionError;
use attn_types::{AccountName, Amount, TokenSymbol, SECONDS_PER_DAY, SECONDS_PER_HOUR};
use serde::{Deserialize, Serialize};

/// Tolerance used when checking that platform weights sum to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// System accounts the controller moves tokens through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemAccounts {
    /// Network treasury: issues new tokens and receives unspent platform balances.
    pub treasury: AccountName,
    /// Holds the per-block producer bucket.
    pub block_pay: AccountName,
    /// Holds the per-vote producer bucket.
    pub vote_pay: AccountName,
}

impl Default for SystemAccounts {
    fn default() -> Self {
        Self {
            treasury: AccountName::from_static("snax"),
            block_pay: AccountName::from_static("snax.bpay"),
            vote_pay: AccountName::from_static("snax.vpay"),
        }
    }
}

/// Network parameters controlling emission and producer pay.
///
/// Amounts are in minimal units of `system_symbol`; curve coefficients are in
/// whole tokens with `x` measured in days.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionParams {
    pub system_symbol: TokenSymbol,
    pub accounts: SystemAccounts,
    /// No rewards are minted until activated stake reaches this amount.
    pub min_activated_stake: Amount,
    /// Floor for a single block's reward.
    pub min_per_block_amount: Amount,
    /// Vote pay below this is withheld.
    pub min_pervote_daily_pay: Amount,
    /// Floor for the supply gap used when funding a platform round.
    pub min_supply_difference: Amount,
    /// Quadratic coefficient of the emission curve.
    pub parabola_a: i64,
    /// Linear coefficient of the emission curve.
    pub parabola_b: i64,
    /// Seconds a producer must wait between claims.
    pub claim_interval_secs: u64,
    /// Seconds per unit of a platform's configured `period`.
    pub period_unit_secs: u64,
    /// Slots between elected-producer schedule refreshes.
    pub schedule_update_slots: u64,
    /// Seconds between blocks.
    pub block_interval_secs: f64,
}

impl Default for EmissionParams {
    fn default() -> Self {
        Self {
            system_symbol: TokenSymbol::from_static("SNAX", 4),
            accounts: SystemAccounts::default(),
            min_activated_stake: 10_000_000_000_0000,
            min_per_block_amount: 15_8548,
            min_pervote_daily_pay: 100_0000,
            min_supply_difference: 1_000_000_000_0000,
            parabola_a: 4_385_772,
            parabola_b: -1_324_503_311,
            claim_interval_secs: SECONDS_PER_DAY,
            period_unit_secs: SECONDS_PER_HOUR,
            schedule_update_slots: 120,
            block_interval_secs: 0.5,
        }
    }
}

impl EmissionParams {
    pub fn validate(&self) -> Result<(), EmissionError> {
        if self.parabola_a <= 0 {
            return Err(EmissionError::InvalidParameter(
                "parabola_a must be positive".into(),
            ));
        }
        if self.parabola_b >= 0 {
            return Err(EmissionError::InvalidParameter(
                "parabola_b must be negative".into(),
            ));
        }
        if self.period_unit_secs == 0 {
            return Err(EmissionError::InvalidParameter(
                "period_unit_secs must be positive".into(),
            ));
        }
        if !(self.block_interval_secs > 0.0) {
            return Err(EmissionError::InvalidParameter(
                "block_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Block interval expressed in curve units (days).
    pub fn block_interval_days(&self) -> f64 {
        self.block_interval_secs / SECONDS_PER_DAY as f64
    }
}

/// A platform's share of network emission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub account: AccountName,
    /// Fraction of the network round budget; all weights sum to 1 (or 0 while disabled).
    pub weight: f64,
    /// Minimum hours between two funding requests.
    pub period: u64,
}

/// Check a platform table: strictly sorted by account, non-negative weights,
/// positive periods, and weights summing to exactly 1 or 0.
pub fn validate_platforms(platforms: &[PlatformConfig]) -> Result<(), EmissionError> {
    let mut total_weight = 0.0;
    for (index, platform) in platforms.iter().enumerate() {
        if index > 0 && platforms[index - 1].account >= platform.account {
            return Err(EmissionError::InvalidParameter(
                "platforms must be sorted".into(),
            ));
        }
        if !(platform.weight >= 0.0) {
            return Err(EmissionError::InvalidParameter(format!(
                "platform {} weight must be greater than or equal to 0",
                platform.account
            )));
        }
        if platform.period == 0 {
            return Err(EmissionError::InvalidParameter(format!(
                "platform {} period must be greater than 0",
                platform.account
            )));
        }
        total_weight += platform.weight;
    }

    let is_one = (total_weight - 1.0).abs() <= WEIGHT_SUM_TOLERANCE;
    let is_zero = total_weight.abs() <= WEIGHT_SUM_TOLERANCE;
    if !is_one && !is_zero {
        return Err(EmissionError::InvalidParameter(format!(
            "summary weight of all platforms must be equal to 1 or 0, got {total_weight}"
        )));
    }
    Ok(())
}
