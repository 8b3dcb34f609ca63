//! Transactions accepted by the runtime and their receipts.

use crate::errors::RuntimeError;
use attn_emission::{BlockOutcome, ClaimReceipt, PlatformConfig};
use attn_platform::{AccountRegistration, PayBatchOutcome, Phase, RateUpdate};
use attn_types::{AccountName, Amount, Asset, TokenSymbol, UserId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    // Platform administration
    Initialize {
        platform: AccountName,
        name: String,
        token_dealer: AccountName,
        symbol: TokenSymbol,
        treasury: AccountName,
    },
    AddSymbol {
        platform: AccountName,
        symbol: TokenSymbol,
    },
    AddCreator {
        platform: AccountName,
        creator: AccountName,
    },
    RemoveCreator {
        platform: AccountName,
        creator: AccountName,
    },
    Activate {
        platform: AccountName,
        id: UserId,
    },
    Deactivate {
        platform: AccountName,
        id: UserId,
    },
    ResetPhase {
        platform: AccountName,
        phase: Phase,
    },

    // Registration
    AddPendingAccount {
        platform: AccountName,
        chain_account: AccountName,
        id: UserId,
    },
    DropPendingAccount {
        platform: AccountName,
        chain_account: AccountName,
    },
    AddAccount {
        platform: AccountName,
        registration: AccountRegistration,
    },
    AddAccounts {
        platform: AccountName,
        registrations: Vec<AccountRegistration>,
    },
    DropUser {
        platform: AccountName,
        id: UserId,
    },
    DropAccount {
        platform: AccountName,
        id: UserId,
    },
    /// Paid by the signer.
    TransferToUser {
        platform: AccountName,
        to: UserId,
        quantity: Asset,
        #[serde(default)]
        memo: String,
    },

    // Round
    LockAttention {
        platform: AccountName,
    },
    UpdateRate {
        platform: AccountName,
        update: RateUpdate,
        #[serde(default)]
        create_missing: bool,
    },
    UpdateRateBulk {
        platform: AccountName,
        updates: Vec<RateUpdate>,
        #[serde(default)]
        create_missing: bool,
    },
    LockRound {
        platform: AccountName,
    },
    StartRound {
        platform: AccountName,
    },
    PayBatch {
        platform: AccountName,
        #[serde(default)]
        cursor: Option<AccountName>,
        max_accounts: usize,
    },

    // Emission and producer pay
    SetPlatforms {
        platforms: Vec<PlatformConfig>,
    },
    SetCurve {
        a: i64,
        b: i64,
    },
    RegisterProducer {
        owner: AccountName,
    },
    UnregisterProducer {
        owner: AccountName,
    },
    SetProducerVotes {
        owner: AccountName,
        votes: f64,
    },
    SetActivatedStake {
        stake: Amount,
    },
    ClaimRewards {
        owner: AccountName,
    },

    // Ledger
    Transfer {
        to: AccountName,
        quantity: Asset,
        #[serde(default)]
        memo: String,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Initialize { .. } => "initialize",
            Action::AddSymbol { .. } => "add_symbol",
            Action::AddCreator { .. } => "add_creator",
            Action::RemoveCreator { .. } => "remove_creator",
            Action::Activate { .. } => "activate",
            Action::Deactivate { .. } => "deactivate",
            Action::ResetPhase { .. } => "reset_phase",
            Action::AddPendingAccount { .. } => "add_pending_account",
            Action::DropPendingAccount { .. } => "drop_pending_account",
            Action::AddAccount { .. } => "add_account",
            Action::AddAccounts { .. } => "add_accounts",
            Action::DropUser { .. } => "drop_user",
            Action::DropAccount { .. } => "drop_account",
            Action::TransferToUser { .. } => "transfer_to_user",
            Action::LockAttention { .. } => "lock_attention",
            Action::UpdateRate { .. } => "update_rate",
            Action::UpdateRateBulk { .. } => "update_rate_bulk",
            Action::LockRound { .. } => "lock_round",
            Action::StartRound { .. } => "start_round",
            Action::PayBatch { .. } => "pay_batch",
            Action::SetPlatforms { .. } => "set_platforms",
            Action::SetCurve { .. } => "set_curve",
            Action::RegisterProducer { .. } => "register_producer",
            Action::UnregisterProducer { .. } => "unregister_producer",
            Action::SetProducerVotes { .. } => "set_producer_votes",
            Action::SetActivatedStake { .. } => "set_activated_stake",
            Action::ClaimRewards { .. } => "claim_rewards",
            Action::Transfer { .. } => "transfer",
        }
    }

    /// Platform the action is addressed to, if any.
    pub fn platform(&self) -> Option<&AccountName> {
        match self {
            Action::Initialize { platform, .. }
            | Action::AddSymbol { platform, .. }
            | Action::AddCreator { platform, .. }
            | Action::RemoveCreator { platform, .. }
            | Action::Activate { platform, .. }
            | Action::Deactivate { platform, .. }
            | Action::ResetPhase { platform, .. }
            | Action::AddPendingAccount { platform, .. }
            | Action::DropPendingAccount { platform, .. }
            | Action::AddAccount { platform, .. }
            | Action::AddAccounts { platform, .. }
            | Action::DropUser { platform, .. }
            | Action::DropAccount { platform, .. }
            | Action::TransferToUser { platform, .. }
            | Action::LockAttention { platform }
            | Action::UpdateRate { platform, .. }
            | Action::UpdateRateBulk { platform, .. }
            | Action::LockRound { platform }
            | Action::StartRound { platform }
            | Action::PayBatch { platform, .. } => Some(platform),
            _ => None,
        }
    }
}

/// A scripted transaction: who signs it and what it does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedAction {
    pub signer: AccountName,
    pub action: Action,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Receipt {
    Applied,
    PayBatch(PayBatchOutcome),
    Claim(ClaimReceipt),
    Block(BlockOutcome),
}

impl Receipt {
    pub fn name(&self) -> &'static str {
        match self {
            Receipt::Applied => "applied",
            Receipt::PayBatch(_) => "pay_batch",
            Receipt::Claim(_) => "claim",
            Receipt::Block(_) => "block",
        }
    }

    pub fn into_pay_batch(self) -> Result<PayBatchOutcome, RuntimeError> {
        match self {
            Receipt::PayBatch(outcome) => Ok(outcome),
            other => Err(RuntimeError::UnexpectedReceipt {
                action: "pay_batch",
                receipt: other.name(),
            }),
        }
    }
}
