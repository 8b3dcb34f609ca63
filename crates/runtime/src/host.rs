//! The runtime host: owns every piece of engine state and applies actions
//! all-or-nothing.

use crate::action::{Action, Receipt};
use crate::config::RuntimeConfig;
use crate::errors::RuntimeError;
use attn_emission::{BlockOutcome, EmissionController};
use attn_ledger::{InMemoryLedger, LedgerClient};
use attn_platform::{Platform, RateUpdate, RoundHistory};
use attn_storage::StateStore;
use attn_types::{AccountName, Asset, ChainClock, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const GENESIS_MEMO: &str = "genesis";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Runtime {
    ledger: InMemoryLedger,
    emission: EmissionController,
    platforms: BTreeMap<AccountName, Platform>,
    clock: ChainClock,
}

impl Runtime {
    pub fn genesis(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let params = config.emission.clone();
        let treasury = params.accounts.treasury.clone();
        let symbol = params.system_symbol.clone();
        let now = Timestamp(0);

        let mut ledger = InMemoryLedger::new();
        ledger.create_token(treasury.clone(), &Asset::new(config.max_supply, symbol.clone()))?;
        for balance in &config.balances {
            ledger.issue(
                &balance.account,
                &Asset::new(balance.amount, symbol.clone()),
                GENESIS_MEMO,
            )?;
        }

        let mut emission = EmissionController::new(params)?;
        emission.set_platforms(config.platforms.clone())?;
        for producer in &config.producers {
            emission.register_producer(producer.owner.clone())?;
            emission.set_producer_votes(&producer.owner, producer.votes)?;
        }
        emission.set_total_activated_stake(config.activated_stake, now);

        let mut platforms = BTreeMap::new();
        for genesis in &config.platform_genesis {
            if platforms.contains_key(&genesis.account) {
                return Err(RuntimeError::Genesis(format!(
                    "platform {} listed twice",
                    genesis.account
                )));
            }
            let account = genesis.account.clone();
            let mut platform = Platform::new(account.clone(), genesis.params.clone());
            platform.initialize(
                &account,
                &genesis.name,
                genesis.token_dealer.clone().unwrap_or_else(|| treasury.clone()),
                symbol.clone(),
                genesis.treasury.clone().unwrap_or_else(|| treasury.clone()),
            )?;
            for creator in &genesis.creators {
                platform.add_creator(&account, creator.clone())?;
            }
            platforms.insert(account, platform);
        }

        info!(
            target: "runtime",
            "Genesis: max supply {}, {} platforms, {} producers",
            Asset::new(config.max_supply, symbol),
            platforms.len(),
            config.producers.len()
        );
        Ok(Self {
            ledger,
            emission,
            platforms,
            clock: ChainClock::default(),
        })
    }

    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }

    pub fn emission(&self) -> &EmissionController {
        &self.emission
    }

    pub fn platform(&self, account: &AccountName) -> Option<&Platform> {
        self.platforms.get(account)
    }

    pub fn platforms(&self) -> impl Iterator<Item = &Platform> {
        self.platforms.values()
    }

    pub fn clock(&self) -> ChainClock {
        self.clock
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now
    }

    pub fn advance_time(&mut self, secs: u64) {
        self.clock.advance_secs(secs);
        debug!(target: "runtime", "Clock advanced to {} (slot {})", self.clock.now, self.clock.slot.0);
    }

    /// Apply one signed action. On error every change it made is discarded.
    pub fn apply(&mut self, signer: &AccountName, action: Action) -> Result<Receipt, RuntimeError> {
        let name = action.name();
        let snapshot = self.clone();
        match self.dispatch(signer, action) {
            Ok(receipt) => {
                debug!(target: "runtime", "{} applied {}", signer, name);
                Ok(receipt)
            }
            Err(err) => {
                *self = snapshot;
                warn!(target: "runtime", "{} failed {}: {}", signer, name, err);
                Err(err)
            }
        }
    }

    /// Advance one slot and run the producer pay hook for `producer`.
    pub fn produce_block(&mut self, producer: &AccountName) -> Result<BlockOutcome, RuntimeError> {
        let snapshot = self.clone();
        self.clock.tick();
        match self
            .emission
            .on_block(&mut self.ledger, producer, self.clock.slot, self.clock.now)
        {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                *self = snapshot;
                warn!(target: "runtime", "Block by {} rejected: {}", producer, err);
                Err(err.into())
            }
        }
    }

    /// Drive one full round of `platform`: lock, score, fund, and sweep in
    /// batches of `batch_size`. Each step is its own transaction.
    pub fn run_round(
        &mut self,
        platform: &AccountName,
        updates: Vec<RateUpdate>,
        batch_size: usize,
    ) -> Result<RoundHistory, RuntimeError> {
        let max_bulk = self.platform_ref(platform)?.params().max_bulk_len.max(1);

        self.apply(platform, Action::LockAttention { platform: platform.clone() })?;
        let mut remaining = updates;
        while !remaining.is_empty() {
            let rest = remaining.split_off(remaining.len().min(max_bulk));
            self.apply(
                platform,
                Action::UpdateRateBulk {
                    platform: platform.clone(),
                    updates: remaining,
                    create_missing: true,
                },
            )?;
            remaining = rest;
        }
        self.apply(platform, Action::LockRound { platform: platform.clone() })?;
        self.apply(platform, Action::StartRound { platform: platform.clone() })?;

        let round = self.platform_ref(platform)?.state()?.round_number;
        let mut cursor = None;
        loop {
            let outcome = self
                .apply(
                    platform,
                    Action::PayBatch {
                        platform: platform.clone(),
                        cursor: cursor.take(),
                        max_accounts: batch_size,
                    },
                )?
                .into_pay_batch()?;
            if outcome.round_closed {
                break;
            }
            cursor = outcome.next_cursor;
        }

        self.platform_ref(platform)?
            .history(round)
            .cloned()
            .ok_or(RuntimeError::IncompleteState("round history"))
    }

    pub fn save(&self, store: &dyn StateStore) -> Result<(), RuntimeError> {
        store.put_ledger(&self.ledger)?;
        store.put_emission(&self.emission)?;
        for platform in self.platforms.values() {
            store.put_platform(platform)?;
        }
        store.put_clock(&self.clock)?;
        store.flush()?;
        info!(
            target: "runtime",
            "Saved state at {} ({} platforms)",
            self.clock.now,
            self.platforms.len()
        );
        Ok(())
    }

    /// Load a previously saved runtime; `None` when the store is empty.
    pub fn load(store: &dyn StateStore) -> Result<Option<Self>, RuntimeError> {
        let Some(ledger) = store.get_ledger()? else {
            return Ok(None);
        };
        let emission = store
            .get_emission()?
            .ok_or(RuntimeError::IncompleteState("emission"))?;
        let clock = store.get_clock()?.ok_or(RuntimeError::IncompleteState("clock"))?;

        let mut platforms = BTreeMap::new();
        for account in store.list_platforms()? {
            let platform = store
                .get_platform(&account)?
                .ok_or(RuntimeError::IncompleteState("platform"))?;
            platforms.insert(account, platform);
        }
        Ok(Some(Self {
            ledger,
            emission,
            platforms,
            clock,
        }))
    }

    fn platform_ref(&self, account: &AccountName) -> Result<&Platform, RuntimeError> {
        self.platforms
            .get(account)
            .ok_or_else(|| RuntimeError::UnknownPlatform(account.clone()))
    }

    fn platform_mut(&mut self, account: &AccountName) -> Result<&mut Platform, RuntimeError> {
        self.platforms
            .get_mut(account)
            .ok_or_else(|| RuntimeError::UnknownPlatform(account.clone()))
    }

    fn require_system(&self, signer: &AccountName, action: &'static str) -> Result<(), RuntimeError> {
        if signer != &self.emission.params().accounts.treasury {
            return Err(RuntimeError::Unauthorized {
                signer: signer.clone(),
                action,
            });
        }
        Ok(())
    }

    fn require_owner(signer: &AccountName, owner: &AccountName, action: &'static str) -> Result<(), RuntimeError> {
        if signer != owner {
            return Err(RuntimeError::Unauthorized {
                signer: signer.clone(),
                action,
            });
        }
        Ok(())
    }

    fn dispatch(&mut self, signer: &AccountName, action: Action) -> Result<Receipt, RuntimeError> {
        let now = self.clock.now;
        let name = action.name();
        match action {
            Action::Initialize {
                platform,
                name: display_name,
                token_dealer,
                symbol,
                treasury,
            } => {
                let entry = self
                    .platforms
                    .entry(platform.clone())
                    .or_insert_with(|| Platform::new(platform, Default::default()));
                entry.initialize(signer, &display_name, token_dealer, symbol, treasury)?;
            }
            Action::AddSymbol { platform, symbol } => {
                self.platform_mut(&platform)?.add_symbol(signer, symbol)?;
            }
            Action::AddCreator { platform, creator } => {
                self.platform_mut(&platform)?.add_creator(signer, creator)?;
            }
            Action::RemoveCreator { platform, creator } => {
                self.platform_mut(&platform)?.remove_creator(signer, &creator)?;
            }
            Action::Activate { platform, id } => {
                self.platform_mut(&platform)?.activate(signer, id)?;
            }
            Action::Deactivate { platform, id } => {
                self.platform_mut(&platform)?.deactivate(signer, id)?;
            }
            Action::ResetPhase { platform, phase } => {
                self.platform_mut(&platform)?.reset_phase(signer, phase)?;
            }
            Action::AddPendingAccount {
                platform,
                chain_account,
                id,
            } => {
                self.platform_mut(&platform)?
                    .add_pending_account(signer, chain_account, id, now)?;
            }
            Action::DropPendingAccount {
                platform,
                chain_account,
            } => {
                self.platform_mut(&platform)?
                    .drop_pending_account(signer, &chain_account)?;
            }
            Action::AddAccount {
                platform,
                registration,
            } => {
                let target = Self::lookup(&mut self.platforms, &platform)?;
                target.add_account(signer, registration, &mut self.ledger, now)?;
            }
            Action::AddAccounts {
                platform,
                registrations,
            } => {
                let target = Self::lookup(&mut self.platforms, &platform)?;
                target.add_accounts(signer, registrations, &mut self.ledger, now)?;
            }
            Action::DropUser { platform, id } => {
                self.platform_mut(&platform)?.drop_user(signer, id)?;
            }
            Action::DropAccount { platform, id } => {
                self.platform_mut(&platform)?.drop_account(signer, id)?;
            }
            Action::TransferToUser {
                platform,
                to,
                quantity,
                memo,
            } => {
                let target = Self::lookup(&mut self.platforms, &platform)?;
                target.transfer_to_user(signer, to, &quantity, &memo, &mut self.ledger)?;
            }
            Action::LockAttention { platform } => {
                self.platform_mut(&platform)?.lock_attention(signer)?;
            }
            Action::UpdateRate {
                platform,
                update,
                create_missing,
            } => {
                self.platform_mut(&platform)?
                    .update_rate(signer, update, create_missing)?;
            }
            Action::UpdateRateBulk {
                platform,
                updates,
                create_missing,
            } => {
                self.platform_mut(&platform)?
                    .update_rate_bulk(signer, updates, create_missing)?;
            }
            Action::LockRound { platform } => {
                let target = Self::lookup(&mut self.platforms, &platform)?;
                target.lock_round(signer, &mut self.emission, now)?;
            }
            Action::StartRound { platform } => {
                let target = Self::lookup(&mut self.platforms, &platform)?;
                target.start_round(signer, &mut self.emission, &mut self.ledger, now)?;
            }
            Action::PayBatch {
                platform,
                cursor,
                max_accounts,
            } => {
                let target = Self::lookup(&mut self.platforms, &platform)?;
                let outcome =
                    target.pay_batch(signer, cursor.as_ref(), max_accounts, &mut self.ledger, now)?;
                return Ok(Receipt::PayBatch(outcome));
            }
            Action::SetPlatforms { platforms } => {
                self.require_system(signer, name)?;
                self.emission.set_platforms(platforms)?;
            }
            Action::SetCurve { a, b } => {
                self.require_system(signer, name)?;
                self.emission.set_curve(a, b)?;
            }
            Action::RegisterProducer { owner } => {
                Self::require_owner(signer, &owner, name)?;
                self.emission.register_producer(owner)?;
            }
            Action::UnregisterProducer { owner } => {
                Self::require_owner(signer, &owner, name)?;
                self.emission.unregister_producer(&owner)?;
            }
            Action::SetProducerVotes { owner, votes } => {
                self.require_system(signer, name)?;
                self.emission.set_producer_votes(&owner, votes)?;
            }
            Action::SetActivatedStake { stake } => {
                self.require_system(signer, name)?;
                self.emission.set_total_activated_stake(stake, now);
            }
            Action::ClaimRewards { owner } => {
                Self::require_owner(signer, &owner, name)?;
                let receipt = self.emission.claim_rewards(&owner, &mut self.ledger, now)?;
                return Ok(Receipt::Claim(receipt));
            }
            Action::Transfer { to, quantity, memo } => {
                self.ledger.transfer(signer, &to, &quantity, &memo)?;
            }
        }
        Ok(Receipt::Applied)
    }

    fn lookup<'a>(
        platforms: &'a mut BTreeMap<AccountName, Platform>,
        account: &AccountName,
    ) -> Result<&'a mut Platform, RuntimeError> {
        platforms
            .get_mut(account)
            .ok_or_else(|| RuntimeError::UnknownPlatform(account.clone()))
    }
}
