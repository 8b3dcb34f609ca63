use attn_types::{AccountName, Amount, RoundNumber, Timestamp, TokenSymbol};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a platform round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    /// Scores for the current round are being submitted.
    AttentionLocked,
    /// Scores are frozen and the network was notified.
    RoundFunded,
    /// Payouts are being swept.
    Paying,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::AttentionLocked => "attention_locked",
            Phase::RoundFunded => "round_funded",
            Phase::Paying => "paying",
        };
        f.write_str(name)
    }
}

/// Singleton state of one platform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformState {
    pub name: String,
    /// The platform's own chain account; holds round supply and escrow.
    pub account: AccountName,
    pub phase: Phase,
    pub round_number: RoundNumber,
    /// Account of the emission controller that funds rounds.
    pub token_dealer: AccountName,
    /// Receives unspent round supply.
    pub treasury: AccountName,
    pub round_supply: Amount,
    pub sent_amount: Amount,
    pub total_attention: f64,
    pub registered_attention: f64,
    pub total_user_count: u64,
    pub registered_user_count: u64,
    /// Registered accounts visited by the current sweep.
    pub round_sent_count: u64,
    /// Users whose score was submitted for the current round.
    pub round_updated_count: u64,
    /// Token rounds are paid in. Always listed in `supported_tokens`.
    pub round_token: TokenSymbol,
    /// Tokens the platform can escrow and pay to users.
    pub supported_tokens: Vec<TokenSymbol>,
}

/// Counters of a closed round. Never modified once recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundHistory {
    pub round_number: RoundNumber,
    pub round_supply: Amount,
    pub sent_amount: Amount,
    /// Unspent supply returned to the treasury.
    pub returned_amount: Amount,
    pub total_attention: f64,
    pub registered_attention: f64,
    pub total_user_count: u64,
    pub registered_user_count: u64,
    pub round_sent_count: u64,
    pub round_updated_count: u64,
    pub closed_at: Timestamp,
}

impl RoundHistory {
    pub(crate) fn snapshot(state: &PlatformState, returned_amount: Amount, closed_at: Timestamp) -> Self {
        Self {
            round_number: state.round_number,
            round_supply: state.round_supply,
            sent_amount: state.sent_amount,
            returned_amount,
            total_attention: state.total_attention,
            registered_attention: state.registered_attention,
            total_user_count: state.total_user_count,
            registered_user_count: state.registered_user_count,
            round_sent_count: state.round_sent_count,
            round_updated_count: state.round_updated_count,
            closed_at,
        }
    }
}
