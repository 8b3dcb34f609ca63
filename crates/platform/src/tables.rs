//! Rows of the attention ledger, the registered-account table and pending
//! bindings, plus the inputs that create them.

use attn_types::{AccountName, RoundNumber, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A scored user, registered or not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Handle of the user on the platform itself.
    pub handle: String,
    pub attention_rate: f64,
    pub rating_position: u32,
    /// Round the rate was last submitted for.
    pub last_attention_round: Option<RoundNumber>,
    pub ranked_period_count: u8,
}

impl User {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            handle: String::new(),
            attention_rate: 0.0,
            rating_position: 0,
            last_attention_round: None,
            ranked_period_count: 0,
        }
    }

    /// Whether the rate counts toward `round`.
    pub fn scored_in(&self, round: RoundNumber) -> bool {
        self.last_attention_round == Some(round)
    }
}

/// Proof a user controls the platform identity they claim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationProof {
    pub post: u64,
    pub salt: String,
}

/// A user bound to a chain account and therefore payable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub chain_account: AccountName,
    pub last_paid_round: Option<RoundNumber>,
    /// Last round a payout sweep counted this account.
    pub last_visited_round: Option<RoundNumber>,
    pub created_at: Timestamp,
    pub verification_proof: VerificationProof,
    pub active: bool,
    pub custom_stats: Vec<u32>,
}

/// Reservation of an id for a chain account that has not registered yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBinding {
    pub chain_account: AccountName,
    pub id: UserId,
    pub created_at: Timestamp,
}

/// Input of `add_account`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountRegistration {
    pub chain_account: AccountName,
    pub id: UserId,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub verification: VerificationProof,
    #[serde(default)]
    pub custom_stats: Vec<u32>,
}

/// Input of `update_rate`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateUpdate {
    pub id: UserId,
    pub attention_rate: f64,
    #[serde(default)]
    pub rating_position: u32,
    #[serde(default)]
    pub ranked_period_count: u8,
    #[serde(default)]
    pub handle: Option<String>,
    /// Added element-wise to the account's custom stats.
    #[serde(default)]
    pub stat_diff: Vec<u32>,
}

impl RateUpdate {
    pub fn new(id: UserId, attention_rate: f64) -> Self {
        Self {
            id,
            attention_rate,
            rating_position: 0,
            ranked_period_count: 0,
            handle: None,
            stat_diff: Vec::new(),
        }
    }
}

pub(crate) fn merge_stats(stats: &mut Vec<u32>, diff: &[u32]) {
    if stats.len() < diff.len() {
        stats.resize(diff.len(), 0);
    }
    for (stat, delta) in stats.iter_mut().zip(diff) {
        *stat = stat.saturating_add(*delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_stats_extends_and_saturates() {
        let mut stats = vec![1, u32::MAX];
        merge_stats(&mut stats, &[2, 5, 7]);
        assert_eq!(stats, vec![3, u32::MAX, 7]);
    }

    #[test]
    fn test_rate_update_defaults_from_json() {
        let update: RateUpdate = serde_json::from_str(r#"{"id": 9, "attention_rate": 1.5}"#).unwrap();
        assert_eq!(update, RateUpdate::new(9, 1.5));
    }
}
