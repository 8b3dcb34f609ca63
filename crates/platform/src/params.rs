use serde::{Deserialize, Serialize};

/// Tunables of a single platform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformParams {
    /// Attention rates at or below this are never paid.
    pub dust_threshold: f64,
    /// Upper bound on entries in one bulk update or bulk registration.
    pub max_bulk_len: usize,
    /// Memo attached to round payouts.
    pub payout_memo: String,
}

impl Default for PlatformParams {
    fn default() -> Self {
        Self {
            dust_threshold: 0.1,
            max_bulk_len: 300,
            payout_memo: "payment for activity".to_string(),
        }
    }
}
