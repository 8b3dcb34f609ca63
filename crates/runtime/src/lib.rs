//! Runtime host for the attention reward engine.
//!
//! Stands in for the chain: it owns the token ledger, the emission
//! controller, every platform and a logical clock, and applies signed
//! [`Action`]s as transactions. A failed action leaves no trace.

pub mod action;
pub mod config;
pub mod errors;
pub mod host;

pub use action::{Action, Receipt, SignedAction};
pub use config::{BalanceGenesis, PlatformGenesis, ProducerGenesis, RuntimeConfig};
pub use errors::RuntimeError;
pub use host::Runtime;
