use serde::{Deserialize, Serialize};
use std::fmt;

pub const SECONDS_PER_HOUR: u64 = 3_600;
pub const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Block slots are half seconds.
pub const SLOTS_PER_SECOND: u64 = 2;
pub const SLOTS_PER_DAY: u64 = SLOTS_PER_SECOND * SECONDS_PER_DAY;

/// Wall-clock time in whole seconds since the chain epoch, as supplied by the host.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub const fn as_secs(self) -> u64 {
        self.0
    }

    pub fn saturating_add_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn secs_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Block production slot (half-second resolution).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockSlot(pub u64);

impl BlockSlot {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn slots_since(self, earlier: BlockSlot) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Wall-clock time this slot starts at, relative to the chain epoch.
    pub fn to_timestamp(self) -> Timestamp {
        Timestamp(self.0 / SLOTS_PER_SECOND)
    }
}

/// Logical clock of the host: wall time plus the current block slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainClock {
    pub now: Timestamp,
    pub slot: BlockSlot,
}

impl ChainClock {
    /// Advance by one block, keeping wall time in step with the slot.
    pub fn tick(&mut self) {
        self.slot = self.slot.next();
        self.now = self.now.max(self.slot.to_timestamp());
    }

    pub fn advance_secs(&mut self, secs: u64) {
        self.now = self.now.saturating_add_secs(secs);
        let min_slot = BlockSlot(self.now.as_secs().saturating_mul(SLOTS_PER_SECOND));
        self.slot = self.slot.max(min_slot);
    }
}
