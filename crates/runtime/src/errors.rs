use attn_emission::EmissionError;
use attn_ledger::LedgerError;
use attn_platform::PlatformError;
use attn_storage::StorageError;
use attn_types::{AccountName, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("platform {0} does not exist")]
    UnknownPlatform(AccountName),

    #[error("{signer} is not authorized to {action}")]
    Unauthorized {
        signer: AccountName,
        action: &'static str,
    },

    #[error("invalid genesis: {0}")]
    Genesis(String),

    #[error("stored state is incomplete: missing {0}")]
    IncompleteState(&'static str),

    #[error("{action} returned a {receipt} receipt")]
    UnexpectedReceipt {
        action: &'static str,
        receipt: &'static str,
    },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Emission(#[from] EmissionError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RuntimeError {
    /// Engine error class, `None` for host-level failures (genesis, storage).
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RuntimeError::UnknownPlatform(_) | RuntimeError::Unauthorized { .. } => {
                Some(ErrorKind::Precondition)
            }
            RuntimeError::Platform(err) => Some(err.kind()),
            RuntimeError::Emission(err) => Some(err.kind()),
            RuntimeError::Ledger(_) => Some(ErrorKind::Ledger),
            RuntimeError::Genesis(_)
            | RuntimeError::IncompleteState(_)
            | RuntimeError::UnexpectedReceipt { .. }
            | RuntimeError::Storage(_) => None,
        }
    }
}
