//! Attention platform
//!
//! One [`Platform`] per tenant. Scores are frozen, the round is funded by the
//! network's [`attn_emission::RoundFunder`], and payouts are swept over the
//! registered-account table in caller-driven batches:
//!
//! ```text
//! Idle -> AttentionLocked -> RoundFunded -> Paying -> Idle
//! ```
//!
//! Payments owed to ids without a bound chain account are parked in the
//! [`EscrowStore`] and released when the id registers.

pub mod errors;
pub mod escrow;
pub mod params;
pub mod payment;
pub mod platform;
mod round;
pub mod state;
pub mod tables;

pub use errors::*;
pub use escrow::{EscrowEntry, EscrowStore};
pub use params::PlatformParams;
pub use payment::calculate_payment;
pub use platform::Platform;
pub use round::PayBatchOutcome;
pub use state::{Phase, PlatformState, RoundHistory};
pub use tables::*;
