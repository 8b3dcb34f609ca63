use serde::{Deserialize, Serialize};

/// Failure classes every engine error maps onto.
///
/// All of them abort the enclosing transaction; none is retried by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Wrong phase, missing authority, not (or already) initialized.
    Precondition,
    /// The caller broke an engine invariant (duplicate id, double payment, bad rate).
    Invariant,
    /// The operation was requested before its period elapsed.
    RateLimit,
    /// The token ledger rejected an operation.
    Ledger,
}
