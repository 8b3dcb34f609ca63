//! Platform tables, administration and account registration.

use crate::errors::PlatformError;
use crate::escrow::EscrowStore;
use crate::params::PlatformParams;
use crate::state::{Phase, PlatformState, RoundHistory};
use crate::tables::{Account, AccountRegistration, PendingBinding, User};
use attn_ledger::LedgerClient;
use attn_types::{AccountName, Amount, Asset, RoundNumber, Timestamp, TokenSymbol, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Platform {
    pub(crate) account: AccountName,
    pub(crate) params: PlatformParams,
    pub(crate) state: Option<PlatformState>,
    pub(crate) users: BTreeMap<UserId, User>,
    pub(crate) accounts: BTreeMap<UserId, Account>,
    /// Registered-account table in payout order.
    pub(crate) by_name: BTreeMap<AccountName, UserId>,
    pub(crate) pending: BTreeMap<AccountName, PendingBinding>,
    pub(crate) escrow: EscrowStore,
    pub(crate) history: BTreeMap<RoundNumber, RoundHistory>,
    pub(crate) creators: BTreeSet<AccountName>,
}

impl Platform {
    pub fn new(account: AccountName, params: PlatformParams) -> Self {
        Self {
            account,
            params,
            state: None,
            users: BTreeMap::new(),
            accounts: BTreeMap::new(),
            by_name: BTreeMap::new(),
            pending: BTreeMap::new(),
            escrow: EscrowStore::default(),
            history: BTreeMap::new(),
            creators: BTreeSet::new(),
        }
    }

    pub fn initialize(
        &mut self,
        signer: &AccountName,
        name: &str,
        token_dealer: AccountName,
        symbol: TokenSymbol,
        treasury: AccountName,
    ) -> Result<(), PlatformError> {
        self.require_self(signer)?;
        if self.state.is_some() {
            return Err(PlatformError::AlreadyInitialized);
        }
        if name.is_empty() {
            return Err(PlatformError::EmptyName);
        }

        info!(
            target: "platform",
            "Initializing platform {} ({}) paying in {}",
            self.account, name, symbol
        );
        self.state = Some(PlatformState {
            name: name.to_string(),
            account: self.account.clone(),
            phase: Phase::Idle,
            round_number: 0,
            token_dealer,
            treasury,
            round_supply: 0,
            sent_amount: 0,
            total_attention: 0.0,
            registered_attention: 0.0,
            total_user_count: 0,
            registered_user_count: 0,
            round_sent_count: 0,
            round_updated_count: 0,
            round_token: symbol.clone(),
            supported_tokens: vec![symbol],
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    pub fn account_name(&self) -> &AccountName {
        &self.account
    }

    pub fn params(&self) -> &PlatformParams {
        &self.params
    }

    pub fn state(&self) -> Result<&PlatformState, PlatformError> {
        self.state.as_ref().ok_or(PlatformError::NotInitialized)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn account(&self, id: UserId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    pub fn account_by_name(&self, name: &AccountName) -> Option<&Account> {
        self.by_name.get(name).and_then(|id| self.accounts.get(id))
    }

    /// Registered accounts in payout order.
    pub fn registered_accounts(&self) -> impl Iterator<Item = &Account> {
        self.by_name.values().filter_map(|id| self.accounts.get(id))
    }

    pub fn escrowed(&self, symbol: &TokenSymbol, id: UserId) -> Amount {
        self.escrow.get(symbol, id).map(|e| e.amount).unwrap_or(0)
    }

    pub fn escrow(&self) -> &EscrowStore {
        &self.escrow
    }

    pub fn history(&self, round: RoundNumber) -> Option<&RoundHistory> {
        self.history.get(&round)
    }

    pub fn rounds(&self) -> impl Iterator<Item = &RoundHistory> {
        self.history.values()
    }

    pub fn pending(&self, chain_account: &AccountName) -> Option<&PendingBinding> {
        self.pending.get(chain_account)
    }

    pub fn is_creator(&self, name: &AccountName) -> bool {
        self.creators.contains(name)
    }

    // -------------------------------------------------------------------------
    // Administration
    // -------------------------------------------------------------------------

    pub fn add_symbol(&mut self, signer: &AccountName, symbol: TokenSymbol) -> Result<(), PlatformError> {
        self.require_self(signer)?;
        let state = self.state.as_mut().ok_or(PlatformError::NotInitialized)?;
        if state.supported_tokens.contains(&symbol) {
            return Err(PlatformError::SymbolExists(symbol));
        }
        debug!(target: "platform", "Platform {} now supports {}", self.account, symbol);
        state.supported_tokens.push(symbol);
        Ok(())
    }

    pub fn add_creator(&mut self, signer: &AccountName, creator: AccountName) -> Result<(), PlatformError> {
        self.require_self(signer)?;
        self.state()?;
        if !self.creators.insert(creator.clone()) {
            return Err(PlatformError::CreatorExists(creator));
        }
        Ok(())
    }

    pub fn remove_creator(&mut self, signer: &AccountName, creator: &AccountName) -> Result<(), PlatformError> {
        self.require_self(signer)?;
        self.state()?;
        if !self.creators.remove(creator) {
            return Err(PlatformError::UnknownCreator(creator.clone()));
        }
        Ok(())
    }

    pub fn activate(&mut self, signer: &AccountName, id: UserId) -> Result<(), PlatformError> {
        self.set_account_active(signer, id, true)
    }

    /// Inactive accounts are still visited by payout sweeps but never paid.
    pub fn deactivate(&mut self, signer: &AccountName, id: UserId) -> Result<(), PlatformError> {
        self.set_account_active(signer, id, false)
    }

    fn set_account_active(&mut self, signer: &AccountName, id: UserId, active: bool) -> Result<(), PlatformError> {
        self.require_self(signer)?;
        self.state()?;
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(PlatformError::UnknownAccount(id))?;
        account.active = active;
        Ok(())
    }

    /// Force the phase. Operator recovery after an aborted automation run.
    pub fn reset_phase(&mut self, signer: &AccountName, phase: Phase) -> Result<(), PlatformError> {
        self.require_self(signer)?;
        let state = self.state.as_mut().ok_or(PlatformError::NotInitialized)?;
        warn!(
            target: "platform",
            "Platform {} phase forced from {} to {}",
            state.account, state.phase, phase
        );
        state.phase = phase;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    pub fn add_pending_account(
        &mut self,
        signer: &AccountName,
        chain_account: AccountName,
        id: UserId,
        now: Timestamp,
    ) -> Result<(), PlatformError> {
        self.require_creator_or_self(signer)?;
        self.state()?;
        self.require_foreign(&chain_account)?;
        if self.by_name.contains_key(&chain_account) {
            return Err(PlatformError::AccountNameTaken(chain_account));
        }
        if self.accounts.contains_key(&id) {
            return Err(PlatformError::UserAlreadyRegistered(id));
        }
        self.pending.insert(
            chain_account.clone(),
            PendingBinding {
                chain_account,
                id,
                created_at: now,
            },
        );
        Ok(())
    }

    pub fn drop_pending_account(
        &mut self,
        signer: &AccountName,
        chain_account: &AccountName,
    ) -> Result<(), PlatformError> {
        self.require_creator_or_self(signer)?;
        self.state()?;
        self.pending
            .remove(chain_account)
            .map(|_| ())
            .ok_or_else(|| PlatformError::UnknownPending(chain_account.clone()))
    }

    /// Bind `registration.id` to a chain account, releasing anything escrowed for it.
    pub fn add_account(
        &mut self,
        signer: &AccountName,
        registration: AccountRegistration,
        ledger: &mut dyn LedgerClient,
        now: Timestamp,
    ) -> Result<(), PlatformError> {
        self.require_creator_or_self(signer)?;
        self.require_not_paying("add_account")?;
        self.check_registration(&registration)?;
        self.register(registration, ledger, now)
    }

    /// Register a list of accounts. The whole list is validated before any
    /// account is added.
    pub fn add_accounts(
        &mut self,
        signer: &AccountName,
        registrations: Vec<AccountRegistration>,
        ledger: &mut dyn LedgerClient,
        now: Timestamp,
    ) -> Result<(), PlatformError> {
        self.require_creator_or_self(signer)?;
        self.require_not_paying("add_accounts")?;
        self.check_bulk_len(registrations.len())?;

        let mut ids = BTreeSet::new();
        let mut names = BTreeSet::new();
        for registration in &registrations {
            if !ids.insert(registration.id) {
                return Err(PlatformError::DuplicateInBulk(registration.id));
            }
            if !names.insert(registration.chain_account.clone()) {
                return Err(PlatformError::AccountNameTaken(registration.chain_account.clone()));
            }
            self.check_registration(registration)?;
        }

        let count = registrations.len();
        for registration in registrations {
            self.register(registration, ledger, now)?;
        }
        info!(target: "platform", "Platform {} registered {} accounts", self.account, count);
        Ok(())
    }

    fn check_registration(&self, registration: &AccountRegistration) -> Result<(), PlatformError> {
        self.require_foreign(&registration.chain_account)?;
        if self.accounts.contains_key(&registration.id) {
            return Err(PlatformError::UserAlreadyRegistered(registration.id));
        }
        if self.by_name.contains_key(&registration.chain_account) {
            return Err(PlatformError::AccountNameTaken(registration.chain_account.clone()));
        }
        if let Some(pending) = self.pending.get(&registration.chain_account) {
            if pending.id != registration.id {
                return Err(PlatformError::PendingMismatch {
                    account: registration.chain_account.clone(),
                    reserved: pending.id,
                    requested: registration.id,
                });
            }
        }
        Ok(())
    }

    fn register(
        &mut self,
        registration: AccountRegistration,
        ledger: &mut dyn LedgerClient,
        now: Timestamp,
    ) -> Result<(), PlatformError> {
        let state = self.state.as_mut().ok_or(PlatformError::NotInitialized)?;
        let id = registration.id;

        let user = self.users.entry(id).or_insert_with(|| {
            state.total_user_count += 1;
            User::new(id)
        });
        if !registration.handle.is_empty() {
            user.handle = registration.handle;
        }
        if user.scored_in(state.round_number) {
            state.registered_attention += user.attention_rate;
        }
        state.registered_user_count += 1;

        self.pending.remove(&registration.chain_account);
        self.by_name.insert(registration.chain_account.clone(), id);
        self.accounts.insert(
            id,
            Account {
                id,
                chain_account: registration.chain_account.clone(),
                last_paid_round: None,
                last_visited_round: None,
                created_at: now,
                verification_proof: registration.verification,
                active: true,
                custom_stats: registration.custom_stats,
            },
        );
        debug!(
            target: "platform",
            "Bound user {} to {} on {}",
            id, registration.chain_account, self.account
        );

        self.claim_escrowed(id, &registration.chain_account, ledger)
    }

    /// Release every escrow entry of `id` to its newly bound chain account.
    fn claim_escrowed(
        &mut self,
        id: UserId,
        chain_account: &AccountName,
        ledger: &mut dyn LedgerClient,
    ) -> Result<(), PlatformError> {
        let symbols = self.state()?.supported_tokens.clone();
        for symbol in symbols {
            if let Some(entry) = self.escrow.take(&symbol, id) {
                info!(
                    target: "platform",
                    "Releasing {} escrowed for user {} to {}",
                    Asset::new(entry.amount, symbol.clone()),
                    id,
                    chain_account
                );
                ledger.transfer(
                    &self.account,
                    chain_account,
                    &Asset::new(entry.amount, symbol),
                    "escrowed transfers",
                )?;
            }
        }
        Ok(())
    }

    /// Remove a user that never registered, with its current-round contribution.
    pub fn drop_user(&mut self, signer: &AccountName, id: UserId) -> Result<(), PlatformError> {
        self.require_self(signer)?;
        self.require_not_paying("drop_user")?;
        if self.accounts.contains_key(&id) {
            return Err(PlatformError::UserHasAccount(id));
        }
        let user = self.users.remove(&id).ok_or(PlatformError::UnknownUser(id))?;
        let state = self.state.as_mut().ok_or(PlatformError::NotInitialized)?;

        state.total_user_count = state.total_user_count.saturating_sub(1);
        if user.scored_in(state.round_number) {
            state.total_attention -= user.attention_rate;
            state.round_updated_count = state.round_updated_count.saturating_sub(1);
        }
        debug!(target: "platform", "Dropped user {} from {}", id, self.account);
        Ok(())
    }

    /// Unbind a user's chain account. The user keeps its score.
    ///
    /// Safe while paying: the registered count and, for an already visited
    /// account, the sweep count shrink together so the round can still close.
    pub fn drop_account(&mut self, signer: &AccountName, id: UserId) -> Result<(), PlatformError> {
        self.require_creator_or_self(signer)?;
        let account = self.accounts.remove(&id).ok_or(PlatformError::UnknownAccount(id))?;
        self.by_name.remove(&account.chain_account);
        let state = self.state.as_mut().ok_or(PlatformError::NotInitialized)?;

        state.registered_user_count = state.registered_user_count.saturating_sub(1);
        if let Some(user) = self.users.get(&id) {
            if user.scored_in(state.round_number) {
                state.registered_attention -= user.attention_rate;
            }
        }
        if state.phase == Phase::Paying && account.last_visited_round == Some(state.round_number) {
            state.round_sent_count = state.round_sent_count.saturating_sub(1);
        }
        info!(
            target: "platform",
            "Dropped account {} of user {} from {}",
            account.chain_account, id, self.account
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Transfers to users
    // -------------------------------------------------------------------------

    /// Pay a platform user by id. Unregistered ids are paid into escrow held
    /// by the platform account.
    pub fn transfer_to_user(
        &mut self,
        from: &AccountName,
        to: UserId,
        quantity: &Asset,
        memo: &str,
        ledger: &mut dyn LedgerClient,
    ) -> Result<(), PlatformError> {
        let state = self.state()?;
        if !state.supported_tokens.contains(&quantity.symbol) {
            return Err(PlatformError::UnknownSymbol(quantity.symbol.clone()));
        }
        if quantity.is_zero() {
            return Err(PlatformError::NonPositiveAmount);
        }

        if let Some(account) = self.accounts.get(&to) {
            ledger.transfer(from, &account.chain_account, quantity, memo)?;
            debug!(target: "platform", "Transferred {} from {} to user {}", quantity, from, to);
            return Ok(());
        }

        if from != &self.account {
            ledger.transfer(from, &self.account, quantity, memo)?;
        }
        let escrowed = self.escrow.credit(&quantity.symbol, to, quantity.amount);
        info!(
            target: "platform",
            "Escrowed {} from {} for unregistered user {} (now {})",
            quantity,
            from,
            to,
            Asset::new(escrowed, quantity.symbol.clone())
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Guards
    // -------------------------------------------------------------------------

    pub(crate) fn require_self(&self, signer: &AccountName) -> Result<(), PlatformError> {
        if signer != &self.account {
            return Err(PlatformError::Unauthorized {
                signer: signer.clone(),
            });
        }
        Ok(())
    }

    fn require_creator_or_self(&self, signer: &AccountName) -> Result<(), PlatformError> {
        if signer == &self.account || self.creators.contains(signer) {
            return Ok(());
        }
        Err(PlatformError::Unauthorized {
            signer: signer.clone(),
        })
    }

    /// Payouts to the platform's own account would be self-transfers.
    fn require_foreign(&self, chain_account: &AccountName) -> Result<(), PlatformError> {
        if chain_account == &self.account {
            return Err(PlatformError::SelfBinding(chain_account.clone()));
        }
        Ok(())
    }

    fn require_not_paying(&self, operation: &'static str) -> Result<(), PlatformError> {
        let phase = self.state()?.phase;
        if phase == Phase::Paying {
            return Err(PlatformError::Busy { operation, phase });
        }
        Ok(())
    }

    pub(crate) fn check_bulk_len(&self, len: usize) -> Result<(), PlatformError> {
        if len > self.params.max_bulk_len {
            return Err(PlatformError::BulkTooLarge {
                len,
                max: self.params.max_bulk_len,
            });
        }
        Ok(())
    }
}
