use crate::state::Phase;
use attn_emission::EmissionError;
use attn_ledger::LedgerError;
use attn_types::{AccountName, ErrorKind, RoundNumber, TokenSymbol, UserId};
use thiserror::Error;

/// Errors raised by platform operations. Every error aborts the operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlatformError {
    #[error("platform must be initialized")]
    NotInitialized,

    #[error("platform is already initialized")]
    AlreadyInitialized,

    #[error("{signer} is not allowed to perform this action")]
    Unauthorized { signer: AccountName },

    #[error("{operation} requires phase {expected}, platform is {actual}")]
    WrongPhase {
        operation: &'static str,
        expected: Phase,
        actual: Phase,
    },

    #[error("{operation} is not allowed while the platform is {phase}")]
    Busy {
        operation: &'static str,
        phase: Phase,
    },

    #[error("platform name can't be empty")]
    EmptyName,

    #[error("token {0} is already supported")]
    SymbolExists(TokenSymbol),

    #[error("token {0} is not supported by this platform")]
    UnknownSymbol(TokenSymbol),

    #[error("{0} is already a creator")]
    CreatorExists(AccountName),

    #[error("{0} is not a creator")]
    UnknownCreator(AccountName),

    #[error("user {0} doesn't exist")]
    UnknownUser(UserId),

    #[error("account for user {0} doesn't exist")]
    UnknownAccount(UserId),

    #[error("user {0} already has an account")]
    UserAlreadyRegistered(UserId),

    #[error("chain account {0} is already bound to a user")]
    AccountNameTaken(AccountName),

    #[error("platform account {0} can't be bound to a user")]
    SelfBinding(AccountName),

    #[error("user {0} must drop its account first")]
    UserHasAccount(UserId),

    #[error("pending binding for {account} reserves id {reserved}, got {requested}")]
    PendingMismatch {
        account: AccountName,
        reserved: UserId,
        requested: UserId,
    },

    #[error("no pending binding for {0}")]
    UnknownPending(AccountName),

    #[error("incorrect attention rate for user {id}: {current} -> {requested}")]
    RateDecreaseTooLarge {
        id: UserId,
        current: f64,
        requested: f64,
    },

    #[error("attention rate for user {id} must be a finite non-negative number, got {rate}")]
    InvalidRate { id: UserId, rate: f64 },

    #[error("user {0} appears twice in one bulk registration")]
    DuplicateInBulk(UserId),

    #[error("bulk of {len} entries exceeds the limit of {max}")]
    BulkTooLarge { len: usize, max: usize },

    #[error("batch size must be positive")]
    EmptyBatch,

    #[error("transfer amount must be positive")]
    NonPositiveAmount,

    #[error("account {account} already paid in round {round}")]
    DoublePayment {
        account: AccountName,
        round: RoundNumber,
    },

    #[error("registered-account index is inconsistent for {0}")]
    CorruptIndex(AccountName),

    #[error(transparent)]
    Emission(#[from] EmissionError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl PlatformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlatformError::NotInitialized
            | PlatformError::AlreadyInitialized
            | PlatformError::Unauthorized { .. }
            | PlatformError::WrongPhase { .. }
            | PlatformError::Busy { .. }
            | PlatformError::EmptyName
            | PlatformError::UnknownSymbol(_)
            | PlatformError::UnknownCreator(_)
            | PlatformError::UnknownUser(_)
            | PlatformError::UnknownAccount(_)
            | PlatformError::UnknownPending(_)
            | PlatformError::SelfBinding(_)
            | PlatformError::BulkTooLarge { .. }
            | PlatformError::EmptyBatch
            | PlatformError::NonPositiveAmount => ErrorKind::Precondition,
            PlatformError::SymbolExists(_)
            | PlatformError::CreatorExists(_)
            | PlatformError::UserAlreadyRegistered(_)
            | PlatformError::AccountNameTaken(_)
            | PlatformError::UserHasAccount(_)
            | PlatformError::PendingMismatch { .. }
            | PlatformError::RateDecreaseTooLarge { .. }
            | PlatformError::InvalidRate { .. }
            | PlatformError::DuplicateInBulk(_)
            | PlatformError::DoublePayment { .. }
            | PlatformError::CorruptIndex(_) => ErrorKind::Invariant,
            PlatformError::Emission(err) => err.kind(),
            PlatformError::Ledger(_) => ErrorKind::Ledger,
        }
    }
}
