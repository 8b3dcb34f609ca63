//! Emission Controller
//!
//! Paces how many tokens may enter circulation:
//! - per-block producer rewards split between a per-block and a per-vote bucket
//! - once-per-period round funding for each configured platform
//! - daily producer settlement from the two buckets
//!
//! Every reward figure is derived from a quadratic emission curve evaluated at
//! the current circulating supply, and is clamped so issuance never exceeds
//! the token's maximum supply.

pub mod controller;
pub mod curve;
pub mod errors;
pub mod params;
pub mod producers;

pub use controller::*;
pub use errors::*;
pub use params::*;
pub use producers::*;
