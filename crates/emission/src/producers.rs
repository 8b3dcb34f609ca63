//! Block producer registry used for producer pay.
//!
//! Voting and schedule election live outside the engine; this registry only
//! records what settlement needs: unpaid blocks, vote weight, last claim.

use crate::errors::EmissionError;
use attn_types::{AccountName, BlockSlot, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProducerInfo {
    pub owner: AccountName,
    pub total_votes: f64,
    pub is_active: bool,
    pub unpaid_blocks: u64,
    pub last_claim_time: Option<Timestamp>,
    pub last_block_slot: Option<BlockSlot>,
}

impl ProducerInfo {
    pub fn new(owner: AccountName) -> Self {
        Self {
            owner,
            total_votes: 0.0,
            is_active: true,
            unpaid_blocks: 0,
            last_claim_time: None,
            last_block_slot: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProducerRegistry {
    producers: BTreeMap<AccountName, ProducerInfo>,
}

impl ProducerRegistry {
    pub fn register(&mut self, owner: AccountName) -> Result<(), EmissionError> {
        match self.producers.get_mut(&owner) {
            Some(existing) if existing.is_active => Err(EmissionError::ProducerExists(owner)),
            Some(existing) => {
                existing.is_active = true;
                Ok(())
            }
            None => {
                self.producers.insert(owner.clone(), ProducerInfo::new(owner));
                Ok(())
            }
        }
    }

    /// Deactivate a producer. Its unpaid blocks stay on record.
    pub fn deactivate(&mut self, owner: &AccountName) -> Result<(), EmissionError> {
        self.get_mut(owner)?.is_active = false;
        Ok(())
    }

    pub fn set_votes(&mut self, owner: &AccountName, votes: f64) -> Result<(), EmissionError> {
        if !(votes >= 0.0) {
            return Err(EmissionError::InvalidParameter(format!(
                "producer {owner} votes must be non-negative"
            )));
        }
        self.get_mut(owner)?.total_votes = votes;
        Ok(())
    }

    pub fn get(&self, owner: &AccountName) -> Option<&ProducerInfo> {
        self.producers.get(owner)
    }

    pub fn get_mut(&mut self, owner: &AccountName) -> Result<&mut ProducerInfo, EmissionError> {
        self.producers
            .get_mut(owner)
            .ok_or_else(|| EmissionError::UnknownProducer(owner.clone()))
    }

    /// Sum of the votes of all active producers.
    pub fn total_vote_weight(&self) -> f64 {
        self.producers
            .values()
            .filter(|p| p.is_active)
            .map(|p| p.total_votes)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProducerInfo> {
        self.producers.values()
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}
