//! Token Ledger Client
//!
//! The reward engine never owns balances. It talks to the host chain's token
//! ledger through [`LedgerClient`]: balance queries, issuance and transfers,
//! all synchronous within the calling transaction.

pub mod account_ledger;

pub use account_ledger::{InMemoryLedger, LedgerClient, LedgerEntry, LedgerError, TokenStats};
