//! Network emission controller and producer pay settlement.

use crate::curve;
use crate::errors::EmissionError;
use crate::params::{validate_platforms, EmissionParams, PlatformConfig};
use crate::producers::{ProducerInfo, ProducerRegistry};
use attn_ledger::LedgerClient;
use attn_types::{AccountName, Amount, Asset, BlockSlot, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Network-wide emission singleton.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalEmissionState {
    pub pervote_bucket: Amount,
    pub perblock_bucket: Amount,
    pub total_unpaid_blocks: u64,
    pub total_activated_stake: Amount,
    /// First time activated stake reached the activation threshold.
    pub thresh_activated_stake_time: Option<Timestamp>,
    pub last_fill_time: Option<Timestamp>,
    pub last_producer_schedule_update: BlockSlot,
    pub last_bp_semi_reward: Amount,
    pub parabola_a: i64,
    pub parabola_b: i64,
    pub platforms: Vec<PlatformConfig>,
}

impl GlobalEmissionState {
    fn new(params: &EmissionParams) -> Self {
        Self {
            pervote_bucket: 0,
            perblock_bucket: 0,
            total_unpaid_blocks: 0,
            total_activated_stake: 0,
            thresh_activated_stake_time: None,
            last_fill_time: None,
            last_producer_schedule_update: BlockSlot::default(),
            last_bp_semi_reward: 0,
            parabola_a: params.parabola_a,
            parabola_b: params.parabola_b,
            platforms: Vec::new(),
        }
    }
}

/// A funding request granted to a platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRequest {
    pub requested_at: Timestamp,
    pub token_amount: Amount,
}

/// Records the moment a platform froze scoring for a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformLock {
    pub locked_at: Timestamp,
}

/// Result of the per-block hook.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockOutcome {
    /// Total minted into both producer buckets for this block.
    pub minted: Amount,
    /// Whether the block was credited to a registered producer.
    pub counted: bool,
    /// The host should refresh the elected producer schedule.
    pub schedule_refresh_due: bool,
}

/// Result of a platform funding request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingReceipt {
    pub platform: AccountName,
    pub circulating: Amount,
    /// Network-wide budget for one round.
    pub round_budget: Amount,
    /// The platform's weighted share of `round_budget`.
    pub share: Amount,
    /// Newly minted into the treasury to cover the transfer.
    pub issued: Amount,
    /// Moved from the treasury to the platform.
    pub transferred: Amount,
}

/// Result of a producer claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub producer: AccountName,
    pub per_block_pay: Amount,
    pub per_vote_pay: Amount,
}

/// What a platform's round state machine needs from the network.
pub trait RoundFunder {
    /// Note that `platform` froze its scores for the coming round.
    fn lock_platform(&mut self, platform: &AccountName, now: Timestamp) -> Result<(), EmissionError>;

    /// Top the platform up to its share of the round budget.
    ///
    /// `already_held` is the part of the platform's balance that may be spent
    /// this round; only the difference to the share is moved.
    fn fund_round(
        &mut self,
        platform: &AccountName,
        already_held: Amount,
        ledger: &mut dyn LedgerClient,
        now: Timestamp,
    ) -> Result<FundingReceipt, EmissionError>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmissionController {
    params: EmissionParams,
    state: GlobalEmissionState,
    producers: ProducerRegistry,
    requests: BTreeMap<AccountName, Vec<PlatformRequest>>,
    locks: BTreeMap<AccountName, Vec<PlatformLock>>,
}

impl EmissionController {
    pub fn new(params: EmissionParams) -> Result<Self, EmissionError> {
        params.validate()?;
        Ok(Self {
            state: GlobalEmissionState::new(&params),
            params,
            producers: ProducerRegistry::default(),
            requests: BTreeMap::new(),
            locks: BTreeMap::new(),
        })
    }

    pub fn params(&self) -> &EmissionParams {
        &self.params
    }

    pub fn state(&self) -> &GlobalEmissionState {
        &self.state
    }

    pub fn producer(&self, owner: &AccountName) -> Option<&ProducerInfo> {
        self.producers.get(owner)
    }

    pub fn producers(&self) -> &ProducerRegistry {
        &self.producers
    }

    pub fn requests(&self, platform: &AccountName) -> &[PlatformRequest] {
        self.requests.get(platform).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn locks(&self, platform: &AccountName) -> &[PlatformLock] {
        self.locks.get(platform).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_activated(&self) -> bool {
        self.state.total_activated_stake >= self.params.min_activated_stake
    }

    /// Replace the platform table.
    pub fn set_platforms(&mut self, platforms: Vec<PlatformConfig>) -> Result<(), EmissionError> {
        validate_platforms(&platforms)?;
        info!(
            target: "emission",
            "Platform table updated with {} entries",
            platforms.len()
        );
        self.state.platforms = platforms;
        Ok(())
    }

    /// Replace the curve coefficients.
    pub fn set_curve(&mut self, a: i64, b: i64) -> Result<(), EmissionError> {
        if a <= 0 || b >= 0 {
            return Err(EmissionError::InvalidParameter(format!(
                "curve needs a > 0 and b < 0, got a={a} b={b}"
            )));
        }
        self.state.parabola_a = a;
        self.state.parabola_b = b;
        Ok(())
    }

    pub fn platform_config(&self, platform: &AccountName) -> Option<&PlatformConfig> {
        self.state.platforms.iter().find(|c| &c.account == platform)
    }

    pub fn register_producer(&mut self, owner: AccountName) -> Result<(), EmissionError> {
        info!(target: "emission", "Registering producer {}", owner);
        self.producers.register(owner)
    }

    pub fn unregister_producer(&mut self, owner: &AccountName) -> Result<(), EmissionError> {
        info!(target: "emission", "Deactivating producer {}", owner);
        self.producers.deactivate(owner)
    }

    pub fn set_producer_votes(&mut self, owner: &AccountName, votes: f64) -> Result<(), EmissionError> {
        self.producers.set_votes(owner, votes)
    }

    /// Update activated stake, remembering when the threshold was first reached.
    pub fn set_total_activated_stake(&mut self, stake: Amount, now: Timestamp) {
        self.state.total_activated_stake = stake;
        if self.is_activated() && self.state.thresh_activated_stake_time.is_none() {
            info!(target: "emission", "Network activated at {} with stake {}", now, stake);
            self.state.thresh_activated_stake_time = Some(now);
        }
    }

    /// Supply that is neither held by the treasury nor by any configured platform.
    pub fn circulating_supply(&self, ledger: &dyn LedgerClient) -> Result<Amount, EmissionError> {
        let symbol = &self.params.system_symbol;
        let mut held = ledger.balance_of(&self.params.accounts.treasury, symbol)?;
        for config in &self.state.platforms {
            held = held.saturating_add(ledger.balance_of(&config.account, symbol)?);
        }
        Ok(ledger.supply(symbol)?.saturating_sub(held))
    }

    /// Per-block hook: credit the producer and mint the block reward into the buckets.
    pub fn on_block(
        &mut self,
        ledger: &mut dyn LedgerClient,
        producer: &AccountName,
        slot: BlockSlot,
        now: Timestamp,
    ) -> Result<BlockOutcome, EmissionError> {
        let mut outcome = BlockOutcome::default();
        if !self.is_activated() {
            return Ok(outcome);
        }
        if self.state.last_fill_time.is_none() {
            self.state.last_fill_time = Some(now);
        }

        if self.producers.get(producer).is_some() {
            let semi = self.block_reward(ledger)? / 2;

            let info = self.producers.get_mut(producer)?;
            info.unpaid_blocks += 1;
            info.last_block_slot = Some(slot);
            self.state.total_unpaid_blocks += 1;
            outcome.counted = true;

            if semi > 0 {
                let asset = Asset::new(semi, self.params.system_symbol.clone());
                ledger.issue(&self.params.accounts.block_pay, &asset, "fund per-block bucket")?;
                ledger.issue(&self.params.accounts.vote_pay, &asset, "fund per-vote bucket")?;
                self.state.perblock_bucket += semi;
                self.state.pervote_bucket += semi;
                self.state.last_bp_semi_reward = semi;
                self.state.last_fill_time = Some(now);
                outcome.minted = semi * 2;
            }
            debug!(
                target: "emission",
                "Block {} by {}: minted {} into producer buckets",
                slot.0, producer, outcome.minted
            );
        }

        if slot.slots_since(self.state.last_producer_schedule_update) > self.params.schedule_update_slots {
            self.state.last_producer_schedule_update = slot;
            outcome.schedule_refresh_due = true;
        }
        Ok(outcome)
    }

    /// Reward for one block: the curve's drop over one block interval at the
    /// current offset, capped by the soft-ceiling gap, floored at the minimum
    /// per-block amount and capped by the remaining headroom to max supply.
    fn block_reward(&self, ledger: &dyn LedgerClient) -> Result<Amount, EmissionError> {
        let symbol = &self.params.system_symbol;
        let unit = symbol.unit();
        let supply = ledger.supply(symbol)?;
        let max_supply = ledger.max_supply(symbol)?;
        let circulating = self.circulating_supply(ledger)?;
        let gap = (max_supply / 10).saturating_sub(circulating);

        let (a, b) = self.curve();
        let nominal = match curve::current_offset(a, b, (circulating / unit) as f64) {
            Ok(offset) => curve::tokens_to_units(
                curve::emission_over(a, b, offset, self.params.block_interval_days()),
                unit,
            ),
            // Circulation beyond the curve's reach: fall back to the floor.
            Err(_) => 0,
        };

        Ok(nominal
            .min(gap)
            .max(self.params.min_per_block_amount)
            .min(max_supply.saturating_sub(supply)))
    }

    fn curve(&self) -> (f64, f64) {
        (self.state.parabola_a as f64, self.state.parabola_b as f64)
    }

    fn period_sum(&self) -> u64 {
        self.state.platforms.iter().map(|c| c.period).sum()
    }

    /// Network-wide budget of one round lasting `period` hours, counted in whole days.
    fn round_budget(
        &self,
        soft_limit: Amount,
        circulating: Amount,
        period: u64,
    ) -> Result<Amount, EmissionError> {
        let unit = self.params.system_symbol.unit();
        let supply_difference = soft_limit
            .saturating_sub(circulating)
            .max(self.params.min_supply_difference);

        let (a, b) = self.curve();
        let offset = curve::current_offset(a, b, (circulating / unit) as f64)?;
        let remaining = curve::parabola(
            a,
            b,
            (soft_limit / unit) as f64,
            offset + (period / 24) as f64,
        );
        Ok((supply_difference / unit)
            .saturating_sub(curve::whole_tokens_to_units(remaining, 1))
            .saturating_mul(unit))
    }

    /// Settle a producer's share of both buckets.
    pub fn claim_rewards(
        &mut self,
        owner: &AccountName,
        ledger: &mut dyn LedgerClient,
        now: Timestamp,
    ) -> Result<ClaimReceipt, EmissionError> {
        let producer = self
            .producers
            .get(owner)
            .ok_or_else(|| EmissionError::UnknownProducer(owner.clone()))?;
        if !producer.is_active {
            return Err(EmissionError::ProducerInactive(owner.clone()));
        }
        if !self.is_activated() {
            return Err(EmissionError::NotActivated);
        }
        if let Some(last) = producer.last_claim_time {
            if now.secs_since(last) <= self.params.claim_interval_secs {
                return Err(EmissionError::ClaimRateLimited {
                    producer: owner.clone(),
                    next_allowed: last.saturating_add_secs(self.params.claim_interval_secs + 1),
                });
            }
        }

        let per_block_pay = if self.state.total_unpaid_blocks > 0 {
            self.state.perblock_bucket * Amount::from(producer.unpaid_blocks)
                / Amount::from(self.state.total_unpaid_blocks)
        } else {
            0
        };

        let total_weight = self.producers.total_vote_weight();
        let mut per_vote_pay = if total_weight > 0.0 {
            (self.state.pervote_bucket as f64 * producer.total_votes / total_weight) as Amount
        } else {
            0
        };
        if per_vote_pay < self.params.min_pervote_daily_pay {
            per_vote_pay = 0;
        }
        // Float rounding must never overdraw the bucket.
        per_vote_pay = per_vote_pay.min(self.state.pervote_bucket);

        let unpaid = producer.unpaid_blocks;
        self.state.perblock_bucket -= per_block_pay;
        self.state.pervote_bucket -= per_vote_pay;
        self.state.total_unpaid_blocks -= unpaid;

        let info = self.producers.get_mut(owner)?;
        info.last_claim_time = Some(now);
        info.unpaid_blocks = 0;

        let symbol = self.params.system_symbol.clone();
        if per_block_pay > 0 {
            ledger.transfer(
                &self.params.accounts.block_pay,
                owner,
                &Asset::new(per_block_pay, symbol.clone()),
                "producer block pay",
            )?;
        }
        if per_vote_pay > 0 {
            ledger.transfer(
                &self.params.accounts.vote_pay,
                owner,
                &Asset::new(per_vote_pay, symbol),
                "producer vote pay",
            )?;
        }

        info!(
            target: "emission",
            "Producer {} claimed {} block pay and {} vote pay for {} blocks",
            owner, per_block_pay, per_vote_pay, unpaid
        );
        Ok(ClaimReceipt {
            producer: owner.clone(),
            per_block_pay,
            per_vote_pay,
        })
    }
}

impl RoundFunder for EmissionController {
    fn lock_platform(&mut self, platform: &AccountName, now: Timestamp) -> Result<(), EmissionError> {
        if self.platform_config(platform).is_none() {
            return Err(EmissionError::UnknownPlatform(platform.clone()));
        }
        debug!(target: "emission", "Platform {} locked its round at {}", platform, now);
        self.locks
            .entry(platform.clone())
            .or_default()
            .push(PlatformLock { locked_at: now });
        Ok(())
    }

    fn fund_round(
        &mut self,
        platform: &AccountName,
        already_held: Amount,
        ledger: &mut dyn LedgerClient,
        now: Timestamp,
    ) -> Result<FundingReceipt, EmissionError> {
        let config = self
            .platform_config(platform)
            .cloned()
            .ok_or_else(|| EmissionError::UnknownPlatform(platform.clone()))?;

        if let Some(last) = self.requests.get(platform).and_then(|r| r.last()) {
            let next_allowed = last
                .requested_at
                .saturating_add_secs(config.period.saturating_mul(self.params.period_unit_secs));
            if next_allowed > now {
                return Err(EmissionError::FundingRateLimited {
                    platform: platform.clone(),
                    next_allowed,
                });
            }
        }

        let symbol = self.params.system_symbol.clone();
        let soft_limit = ledger.max_supply(&symbol)? / 10;
        let circulating = self.circulating_supply(ledger)?;
        let round_budget = self.round_budget(soft_limit, circulating, config.period)?;

        let period_sum = Amount::from(self.period_sum());
        let weight_permille = (config.weight * 1000.0) as Amount;
        let share = round_budget / 1000 / period_sum * weight_permille * Amount::from(config.period);

        let transferred = share.saturating_sub(already_held);
        let treasury = self.params.accounts.treasury.clone();
        let issued = transferred.saturating_sub(ledger.balance_of(&treasury, &symbol)?);
        if issued > 0 {
            ledger.issue(
                &treasury,
                &Asset::new(issued, symbol.clone()),
                "amount to issue to pay platform users",
            )?;
        }
        if transferred > 0 {
            ledger.transfer(
                &treasury,
                platform,
                &Asset::new(transferred, symbol),
                "platform round supply",
            )?;
        }

        self.requests
            .entry(platform.clone())
            .or_default()
            .push(PlatformRequest {
                requested_at: now,
                token_amount: transferred,
            });

        info!(
            target: "emission",
            "Funded platform {}: share {} (budget {}, circulating {}), transferred {}, issued {}",
            platform, share, round_budget, circulating, transferred, issued
        );
        Ok(FundingReceipt {
            platform: platform.clone(),
            circulating,
            round_budget,
            share,
            issued,
            transferred,
        })
    }
}
