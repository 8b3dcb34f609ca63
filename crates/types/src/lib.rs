//! Primitive types shared by the attention reward engine.
//!
//! Token amounts are integers in minimal units; a symbol's precision only
//! matters for display.

pub mod account;
pub mod asset;
pub mod error;
pub mod time;

pub use account::*;
pub use asset::*;
pub use error::*;
pub use time::*;

/// Round counter of a platform. Incremented each time a payout sweep closes.
pub type RoundNumber = u64;

/// Numeric identifier of a scored user on an external platform.
pub type UserId = u64;

#[cfg(test)]
mod tests;
