use attn_ledger::LedgerError;
use attn_types::{AccountName, ErrorKind, Timestamp};
use thiserror::Error;

/// Errors raised by the emission controller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmissionError {
    #[error("invalid emission parameter: {0}")]
    InvalidParameter(String),

    #[error("platform {0} not found in platforms config")]
    UnknownPlatform(AccountName),

    #[error("platform {platform} can't request new tokens before {next_allowed}")]
    FundingRateLimited {
        platform: AccountName,
        next_allowed: Timestamp,
    },

    #[error("producer {0} not found")]
    UnknownProducer(AccountName),

    #[error("producer {0} is already registered")]
    ProducerExists(AccountName),

    #[error("producer {0} does not have an active key")]
    ProducerInactive(AccountName),

    #[error("cannot claim rewards until the chain is activated")]
    NotActivated,

    #[error("producer {producer} already claimed rewards within the past day (next claim after {next_allowed})")]
    ClaimRateLimited {
        producer: AccountName,
        next_allowed: Timestamp,
    },

    #[error("emission curve has no real root for circulating supply {circulating}")]
    CurveUnsolvable { circulating: f64 },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl EmissionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmissionError::InvalidParameter(_)
            | EmissionError::ProducerExists(_)
            | EmissionError::CurveUnsolvable { .. } => ErrorKind::Invariant,
            EmissionError::UnknownPlatform(_)
            | EmissionError::UnknownProducer(_)
            | EmissionError::ProducerInactive(_)
            | EmissionError::NotActivated => ErrorKind::Precondition,
            EmissionError::FundingRateLimited { .. } | EmissionError::ClaimRateLimited { .. } => {
                ErrorKind::RateLimit
            }
            EmissionError::Ledger(_) => ErrorKind::Ledger,
        }
    }
}
