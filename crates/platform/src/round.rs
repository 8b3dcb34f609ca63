//! Round state machine: score submission, funding and the paginated payout sweep.

use crate::errors::PlatformError;
use crate::payment::calculate_payment;
use crate::platform::Platform;
use crate::state::{Phase, PlatformState, RoundHistory};
use crate::tables::{merge_stats, RateUpdate, User};
use attn_emission::RoundFunder;
use attn_ledger::LedgerClient;
use attn_types::{AccountName, Amount, Asset, Timestamp, TokenSymbol, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Result of one `pay_batch` call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayBatchOutcome {
    pub visited: usize,
    pub paid: usize,
    pub amount: Amount,
    /// Inclusive lower bound for the next call; `None` once the table end was reached.
    pub next_cursor: Option<AccountName>,
    pub round_closed: bool,
}

fn require_phase(state: &PlatformState, operation: &'static str, expected: Phase) -> Result<(), PlatformError> {
    if state.phase != expected {
        return Err(PlatformError::WrongPhase {
            operation,
            expected,
            actual: state.phase,
        });
    }
    Ok(())
}

impl Platform {
    fn state_mut(&mut self) -> Result<&mut PlatformState, PlatformError> {
        self.state.as_mut().ok_or(PlatformError::NotInitialized)
    }

    /// Balance of `symbol` held by the platform minus everything escrowed in it.
    fn spendable(&self, symbol: &TokenSymbol, ledger: &dyn LedgerClient) -> Result<Amount, PlatformError> {
        let held = ledger.balance_of(&self.account, symbol)?;
        Ok(held.saturating_sub(self.escrow.total(symbol)))
    }

    /// Open score submission for the current round.
    pub fn lock_attention(&mut self, signer: &AccountName) -> Result<(), PlatformError> {
        self.require_self(signer)?;
        let state = self.state_mut()?;
        require_phase(state, "lock_attention", Phase::Idle)?;

        state.total_attention = 0.0;
        state.registered_attention = 0.0;
        state.round_updated_count = 0;
        state.phase = Phase::AttentionLocked;
        info!(
            target: "platform",
            "Platform {} collecting attention for round {}",
            state.account, state.round_number
        );
        Ok(())
    }

    /// Freeze scores and notify the network.
    pub fn lock_round(
        &mut self,
        signer: &AccountName,
        funder: &mut dyn RoundFunder,
        now: Timestamp,
    ) -> Result<(), PlatformError> {
        self.require_self(signer)?;
        let account = self.account.clone();
        let state = self.state_mut()?;
        require_phase(state, "lock_round", Phase::AttentionLocked)?;

        funder.lock_platform(&account, now)?;
        state.phase = Phase::RoundFunded;
        info!(
            target: "platform",
            "Platform {} froze round {}: total attention {}, {} users scored",
            account, state.round_number, state.total_attention, state.round_updated_count
        );
        Ok(())
    }

    /// Request the round's supply and begin paying.
    pub fn start_round(
        &mut self,
        signer: &AccountName,
        funder: &mut dyn RoundFunder,
        ledger: &mut dyn LedgerClient,
        now: Timestamp,
    ) -> Result<(), PlatformError> {
        self.require_self(signer)?;
        let state = self.state()?;
        require_phase(state, "start_round", Phase::RoundFunded)?;
        let symbol = state.round_token.clone();

        let held = self.spendable(&symbol, ledger)?;
        let receipt = funder.fund_round(&self.account, held, ledger, now)?;
        let round_supply = self.spendable(&symbol, ledger)?;

        let state = self.state_mut()?;
        state.round_supply = round_supply;
        state.sent_amount = 0;
        state.round_sent_count = 0;
        state.phase = Phase::Paying;
        info!(
            target: "platform",
            "Platform {} started round {} with supply {} ({} transferred)",
            state.account,
            state.round_number,
            Asset::new(round_supply, symbol),
            receipt.transferred
        );
        Ok(())
    }

    /// Pay up to `max_accounts` registered accounts starting at `cursor`
    /// (inclusive, in account-name order; `None` starts at the beginning).
    ///
    /// Closes the round once the sweep reaches the end of the table and every
    /// registered account was visited.
    pub fn pay_batch(
        &mut self,
        signer: &AccountName,
        cursor: Option<&AccountName>,
        max_accounts: usize,
        ledger: &mut dyn LedgerClient,
        now: Timestamp,
    ) -> Result<PayBatchOutcome, PlatformError> {
        self.require_self(signer)?;
        if max_accounts == 0 {
            return Err(PlatformError::EmptyBatch);
        }
        let state = self.state()?;
        require_phase(state, "pay_batch", Phase::Paying)?;
        let round = state.round_number;
        let total_attention = state.total_attention;
        let round_supply = state.round_supply;
        let unsent = round_supply.saturating_sub(state.sent_amount);
        let symbol = state.round_token.clone();
        let dust = self.params.dust_threshold;

        let window: Vec<(AccountName, UserId)> = match cursor {
            Some(start) => self.by_name.range(start.clone()..),
            None => self.by_name.range::<AccountName, _>(..),
        }
        .take(max_accounts.saturating_add(1))
        .map(|(name, id)| (name.clone(), *id))
        .collect();
        let (batch, rest) = window.split_at(window.len().min(max_accounts));
        let next_cursor = rest.first().map(|(name, _)| name.clone());

        // Validate the whole batch before paying anyone.
        let mut payable = Vec::new();
        for (name, id) in batch {
            let account = self
                .accounts
                .get(id)
                .ok_or_else(|| PlatformError::CorruptIndex(name.clone()))?;
            let rate = match self.users.get(id) {
                Some(user) if user.scored_in(round) && user.attention_rate > dust => user.attention_rate,
                _ => continue,
            };
            if !account.active {
                continue;
            }
            if account.last_paid_round == Some(round) {
                return Err(PlatformError::DoublePayment {
                    account: name.clone(),
                    round,
                });
            }
            payable.push((*id, rate));
        }

        // Deposits made while paying stay out of this round.
        let mut balance = self.spendable(&symbol, ledger)?.min(unsent);
        let mut outcome = PayBatchOutcome {
            visited: batch.len(),
            next_cursor,
            ..PayBatchOutcome::default()
        };
        for (id, rate) in payable {
            let payment = calculate_payment(total_attention, rate, round_supply, balance);
            let Some(account) = self.accounts.get_mut(&id) else {
                continue;
            };
            if payment > 0 {
                ledger.transfer(
                    &self.account,
                    &account.chain_account,
                    &Asset::new(payment, symbol.clone()),
                    &self.params.payout_memo,
                )?;
                balance -= payment;
                outcome.amount += payment;
                outcome.paid += 1;
                debug!(
                    target: "platform",
                    "Round {}: paid {} to {} (rate {})",
                    round, payment, account.chain_account, rate
                );
            }
            account.last_paid_round = Some(round);
        }

        let mut newly_visited = 0;
        for (_, id) in batch {
            if let Some(account) = self.accounts.get_mut(id) {
                if account.last_visited_round != Some(round) {
                    account.last_visited_round = Some(round);
                    newly_visited += 1;
                }
            }
        }

        let state = self.state_mut()?;
        state.sent_amount += outcome.amount;
        state.round_sent_count += newly_visited;
        debug!(
            target: "platform",
            "Round {}: batch visited {} accounts ({} new), paid {} ({}/{} swept)",
            round,
            outcome.visited,
            newly_visited,
            outcome.amount,
            state.round_sent_count,
            state.registered_user_count
        );

        if outcome.next_cursor.is_none() && state.round_sent_count == state.registered_user_count {
            self.close_round(ledger, now)?;
            outcome.round_closed = true;
        }
        Ok(outcome)
    }

    fn close_round(&mut self, ledger: &mut dyn LedgerClient, now: Timestamp) -> Result<(), PlatformError> {
        let state = self.state()?;
        let symbol = state.round_token.clone();
        let treasury = state.treasury.clone();

        let returned = self.spendable(&symbol, ledger)?;
        if returned > 0 {
            ledger.transfer(&self.account, &treasury, &Asset::new(returned, symbol), "rest of money")?;
        }

        let state = self.state.as_mut().ok_or(PlatformError::NotInitialized)?;
        let snapshot = RoundHistory::snapshot(state, returned, now);
        info!(
            target: "platform",
            "Platform {} closed round {}: sent {} of {} to {} accounts, returned {}",
            state.account,
            state.round_number,
            state.sent_amount,
            state.round_supply,
            state.round_sent_count,
            returned
        );
        self.history.insert(state.round_number, snapshot);

        state.round_supply = 0;
        state.round_number += 1;
        state.phase = Phase::Idle;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Attention updates
    // -------------------------------------------------------------------------

    /// Submit one user's score for the current round.
    pub fn update_rate(
        &mut self,
        signer: &AccountName,
        update: RateUpdate,
        create_missing: bool,
    ) -> Result<(), PlatformError> {
        self.update_rate_bulk(signer, vec![update], create_missing)
    }

    /// Submit scores for many users. The whole list is validated before any
    /// rate changes.
    pub fn update_rate_bulk(
        &mut self,
        signer: &AccountName,
        updates: Vec<RateUpdate>,
        create_missing: bool,
    ) -> Result<(), PlatformError> {
        self.require_self(signer)?;
        require_phase(self.state()?, "update_rate", Phase::AttentionLocked)?;
        self.check_bulk_len(updates.len())?;

        let mut effective: BTreeMap<UserId, f64> = BTreeMap::new();
        for update in &updates {
            let rate = update.attention_rate;
            if !rate.is_finite() {
                return Err(PlatformError::InvalidRate { id: update.id, rate });
            }
            let current = effective
                .get(&update.id)
                .copied()
                .or_else(|| self.users.get(&update.id).map(|u| u.attention_rate));
            match current {
                Some(current) => {
                    let diff = rate - current;
                    if !(diff >= 0.0 || diff.abs() <= current.abs()) {
                        return Err(PlatformError::RateDecreaseTooLarge {
                            id: update.id,
                            current,
                            requested: rate,
                        });
                    }
                }
                None if !create_missing => return Err(PlatformError::UnknownUser(update.id)),
                None if rate < 0.0 => return Err(PlatformError::InvalidRate { id: update.id, rate }),
                None => {}
            }
            effective.insert(update.id, rate);
        }

        let count = updates.len();
        for update in updates {
            self.apply_rate(update)?;
        }
        debug!(target: "platform", "Platform {} applied {} rate updates", self.account, count);
        Ok(())
    }

    fn apply_rate(&mut self, update: RateUpdate) -> Result<(), PlatformError> {
        let state = self.state.as_mut().ok_or(PlatformError::NotInitialized)?;
        let round = state.round_number;

        let user = self.users.entry(update.id).or_insert_with(|| {
            state.total_user_count += 1;
            User::new(update.id)
        });
        // Repeated updates within a round only move the totals by the difference.
        let delta = if user.scored_in(round) {
            update.attention_rate - user.attention_rate
        } else {
            state.round_updated_count += 1;
            update.attention_rate
        };

        user.attention_rate = update.attention_rate;
        user.rating_position = update.rating_position;
        user.ranked_period_count = update.ranked_period_count;
        user.last_attention_round = Some(round);
        if let Some(handle) = update.handle {
            user.handle = handle;
        }

        state.total_attention += delta;
        if let Some(account) = self.accounts.get_mut(&update.id) {
            state.registered_attention += delta;
            merge_stats(&mut account.custom_stats, &update.stat_diff);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PlatformParams;
    use crate::tables::AccountRegistration;
    use attn_emission::{EmissionError, FundingReceipt};
    use attn_ledger::InMemoryLedger;
    use attn_types::ErrorKind;

    fn name(s: &str) -> AccountName {
        AccountName::new(s).unwrap()
    }

    fn snax() -> TokenSymbol {
        TokenSymbol::from_static("SNAX", 4)
    }

    /// Mints a fixed round supply straight into the platform.
    struct FixedFunder {
        supply: Amount,
        locks: usize,
    }

    impl RoundFunder for FixedFunder {
        fn lock_platform(&mut self, _platform: &AccountName, _now: Timestamp) -> Result<(), EmissionError> {
            self.locks += 1;
            Ok(())
        }

        fn fund_round(
            &mut self,
            platform: &AccountName,
            already_held: Amount,
            ledger: &mut dyn LedgerClient,
            _now: Timestamp,
        ) -> Result<FundingReceipt, EmissionError> {
            let transferred = self.supply.saturating_sub(already_held);
            if transferred > 0 {
                ledger.issue(platform, &Asset::new(transferred, snax()), "round")?;
            }
            Ok(FundingReceipt {
                platform: platform.clone(),
                circulating: 0,
                round_budget: self.supply,
                share: self.supply,
                issued: transferred,
                transferred,
            })
        }
    }

    struct Fixture {
        platform: Platform,
        ledger: InMemoryLedger,
        funder: FixedFunder,
        me: AccountName,
    }

    fn fixture(supply: Amount) -> Fixture {
        let me = name("p.test");
        let mut ledger = InMemoryLedger::new();
        ledger
            .create_token(name("snax"), &Asset::new(1_000_000_000, snax()))
            .unwrap();
        let mut platform = Platform::new(me.clone(), PlatformParams::default());
        platform
            .initialize(&me, "test", name("snax"), snax(), name("snax"))
            .unwrap();
        Fixture {
            platform,
            ledger,
            funder: FixedFunder { supply, locks: 0 },
            me,
        }
    }

    fn registration(account: &str, id: UserId) -> AccountRegistration {
        AccountRegistration {
            chain_account: name(account),
            id,
            handle: String::new(),
            verification: Default::default(),
            custom_stats: Vec::new(),
        }
    }

    impl Fixture {
        fn register(&mut self, account: &str, id: UserId) {
            self.platform
                .add_account(&self.me, registration(account, id), &mut self.ledger, Timestamp(0))
                .unwrap();
        }

        fn score(&mut self, rates: &[(UserId, f64)]) {
            let updates = rates.iter().map(|(id, rate)| RateUpdate::new(*id, *rate)).collect();
            self.platform.update_rate_bulk(&self.me, updates, true).unwrap();
        }

        fn fund(&mut self) {
            self.platform
                .lock_round(&self.me, &mut self.funder, Timestamp(1))
                .unwrap();
            self.platform
                .start_round(&self.me, &mut self.funder, &mut self.ledger, Timestamp(2))
                .unwrap();
        }

        fn pay(&mut self, cursor: Option<&str>, max: usize) -> Result<PayBatchOutcome, PlatformError> {
            let cursor = cursor.map(name);
            self.platform
                .pay_batch(&self.me, cursor.as_ref(), max, &mut self.ledger, Timestamp(3))
        }

        fn balance(&self, account: &str) -> Amount {
            self.ledger.balance_of(&name(account), &snax()).unwrap()
        }
    }

    #[test]
    fn test_two_account_round_is_clamped_to_funding() {
        let mut f = fixture(100);
        f.register("alice", 1);
        f.register("bob", 2);
        f.platform.lock_attention(&f.me).unwrap();
        f.score(&[(1, 4.0), (2, 1.0)]);
        f.fund();
        assert_eq!(f.platform.state().unwrap().round_supply, 100);

        let outcome = f.pay(None, 10).unwrap();
        assert_eq!(outcome.visited, 2);
        assert_eq!(outcome.paid, 1);
        assert_eq!(outcome.amount, 100);
        assert!(outcome.round_closed);

        assert_eq!(f.balance("alice"), 100);
        assert_eq!(f.balance("bob"), 0);

        let history = f.platform.history(0).unwrap();
        assert_eq!(history.sent_amount, 100);
        assert_eq!(history.returned_amount, 0);
        assert_eq!(history.round_sent_count, 2);

        let state = f.platform.state().unwrap();
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.round_number, 1);
        assert_eq!(state.round_supply, 0);
    }

    #[test]
    fn test_mid_round_deposit_is_not_paid_out() {
        let mut f = fixture(100);
        f.register("alice", 1);
        f.register("bob", 2);
        f.platform.lock_attention(&f.me).unwrap();
        f.score(&[(1, 4.0), (2, 1.0)]);
        f.fund();
        f.ledger
            .issue(&f.me, &Asset::new(50, snax()), "deposit")
            .unwrap();

        let outcome = f.pay(None, 10).unwrap();
        assert!(outcome.round_closed);
        assert_eq!(outcome.amount, 100);
        assert_eq!(f.balance("alice"), 100);
        assert_eq!(f.balance("bob"), 0);

        let history = f.platform.history(0).unwrap();
        assert!(history.sent_amount <= history.round_supply);
        assert_eq!(history.returned_amount, 50);
    }

    #[test]
    fn test_platform_account_cannot_be_registered() {
        let mut f = fixture(100);
        f.register("alice", 1);
        let err = f
            .platform
            .add_account(&f.me, registration("p.test", 2), &mut f.ledger, Timestamp(0))
            .unwrap_err();
        assert_eq!(err, PlatformError::SelfBinding(name("p.test")));
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(matches!(
            f.platform.add_accounts(
                &f.me,
                vec![registration("bob", 3), registration("p.test", 2)],
                &mut f.ledger,
                Timestamp(0)
            ),
            Err(PlatformError::SelfBinding(_))
        ));
        assert!(f.platform.account(3).is_none());
        assert!(matches!(
            f.platform.add_pending_account(&f.me, name("p.test"), 2, Timestamp(0)),
            Err(PlatformError::SelfBinding(_))
        ));

        f.platform.lock_attention(&f.me).unwrap();
        f.score(&[(1, 1.0), (2, 1.0)]);
        f.fund();
        let outcome = f.pay(None, 10).unwrap();
        assert!(outcome.round_closed);
    }

    #[test]
    fn test_unspent_supply_returns_to_treasury() {
        let mut f = fixture(1_000);
        f.register("alice", 1);
        f.register("bob", 2);
        f.platform.lock_attention(&f.me).unwrap();
        f.score(&[(1, 3.0), (2, 1.0), (3, 4.0)]);
        f.fund();

        // total 8.0: alice 1000/2, bob 1000/8; user 3 is unregistered
        f.pay(None, 10).unwrap();
        assert_eq!(f.balance("alice"), 500);
        assert_eq!(f.balance("bob"), 125);
        assert_eq!(f.balance("snax"), 375);
        assert_eq!(f.balance("p.test"), 0);
        assert_eq!(f.platform.history(0).unwrap().returned_amount, 375);
    }

    #[test]
    fn test_overlapping_cursor_is_a_double_payment() {
        let mut f = fixture(1_000);
        f.register("alice", 1);
        f.register("bob", 2);
        f.register("carol", 3);
        f.platform.lock_attention(&f.me).unwrap();
        f.score(&[(1, 1.0), (2, 1.0), (3, 1.0)]);
        f.fund();

        let first = f.pay(None, 2).unwrap();
        assert_eq!(first.next_cursor, Some(name("carol")));
        let err = f.pay(Some("bob"), 2).unwrap_err();
        assert_eq!(
            err,
            PlatformError::DoublePayment {
                account: name("bob"),
                round: 0
            }
        );
        assert_eq!(err.kind(), ErrorKind::Invariant);

        let last = f.pay(first.next_cursor.as_ref().map(|n| n.as_str()), 2).unwrap();
        assert!(last.round_closed);
    }

    #[test]
    fn test_ineligible_accounts_are_visited_but_not_paid() {
        let mut f = fixture(1_000);
        f.register("alice", 1);
        f.register("bob", 2);
        f.register("carol", 3);
        f.register("dave", 4);
        f.platform.deactivate(&f.me, 2).unwrap();
        f.platform.lock_attention(&f.me).unwrap();
        // dave was not scored this round, carol is dust
        f.score(&[(1, 1.0), (2, 1.0), (3, 0.1)]);
        f.fund();

        let outcome = f.pay(None, 10).unwrap();
        assert_eq!(outcome.visited, 4);
        assert_eq!(outcome.paid, 1);
        assert!(outcome.round_closed);
        assert_eq!(f.balance("bob"), 0);
        assert_eq!(f.balance("carol"), 0);
        assert_eq!(f.balance("dave"), 0);
        assert!(f.platform.account(2).unwrap().last_paid_round.is_none());
    }

    #[test]
    fn test_revisiting_unpaid_accounts_does_not_inflate_the_sweep_count() {
        let mut f = fixture(1_000);
        f.register("alice", 1);
        f.register("bob", 2);
        f.platform.lock_attention(&f.me).unwrap();
        f.score(&[(1, 1.0)]);
        f.fund();

        let first = f.pay(Some("bob"), 5).unwrap();
        assert!(!first.round_closed);
        let again = f.pay(Some("bob"), 5).unwrap();
        assert!(!again.round_closed);
        assert_eq!(f.platform.state().unwrap().round_sent_count, 1);

        let rest = f.pay(None, 5).unwrap();
        assert!(rest.round_closed);
        assert_eq!(rest.paid, 1);
        assert_eq!(f.platform.history(0).unwrap().round_sent_count, 2);
    }

    #[test]
    fn test_phase_guards() {
        let mut f = fixture(100);
        let err = f
            .platform
            .start_round(&f.me, &mut f.funder, &mut f.ledger, Timestamp(0))
            .unwrap_err();
        assert!(matches!(err, PlatformError::WrongPhase { actual: Phase::Idle, .. }));
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(f.pay(None, 1).is_err());
        assert!(f
            .platform
            .update_rate(&f.me, RateUpdate::new(1, 1.0), true)
            .is_err());

        f.platform.lock_attention(&f.me).unwrap();
        assert!(matches!(
            f.platform.lock_attention(&f.me),
            Err(PlatformError::WrongPhase { .. })
        ));
        f.register("alice", 1);
        f.score(&[(1, 1.0)]);
        f.fund();
        assert_eq!(f.funder.locks, 1);

        assert!(matches!(
            f.platform.start_round(&f.me, &mut f.funder, &mut f.ledger, Timestamp(0)),
            Err(PlatformError::WrongPhase { actual: Phase::Paying, .. })
        ));
        assert!(matches!(
            f.platform
                .add_account(&f.me, registration("bob", 2), &mut f.ledger, Timestamp(0)),
            Err(PlatformError::Busy { .. })
        ));
        assert!(matches!(f.pay(None, 0), Err(PlatformError::EmptyBatch)));
    }

    #[test]
    fn test_only_the_platform_drives_rounds() {
        let mut f = fixture(100);
        let stranger = name("mallory");
        assert!(matches!(
            f.platform.lock_attention(&stranger),
            Err(PlatformError::Unauthorized { .. })
        ));
        assert!(f
            .platform
            .reset_phase(&stranger, Phase::Paying)
            .is_err());
    }

    #[test]
    fn test_repeated_updates_count_the_delta() {
        let mut f = fixture(100);
        f.register("alice", 1);
        f.platform.lock_attention(&f.me).unwrap();
        f.score(&[(1, 2.0), (2, 3.0)]);
        f.score(&[(1, 5.0)]);
        f.score(&[(1, 4.0)]);

        let state = f.platform.state().unwrap();
        assert_eq!(state.total_attention, 7.0);
        assert_eq!(state.registered_attention, 4.0);
        assert_eq!(state.round_updated_count, 2);
        assert_eq!(state.total_user_count, 2);
        assert_eq!(f.platform.user(1).unwrap().attention_rate, 4.0);
    }

    #[test]
    fn test_rate_validation() {
        let mut f = fixture(100);
        f.platform.lock_attention(&f.me).unwrap();
        f.score(&[(1, 2.0)]);

        let err = f
            .platform
            .update_rate(&f.me, RateUpdate::new(1, -1.0), false)
            .unwrap_err();
        assert!(matches!(err, PlatformError::RateDecreaseTooLarge { id: 1, .. }));
        assert!(matches!(
            f.platform.update_rate(&f.me, RateUpdate::new(9, 1.0), false),
            Err(PlatformError::UnknownUser(9))
        ));
        assert!(matches!(
            f.platform.update_rate(&f.me, RateUpdate::new(9, f64::INFINITY), true),
            Err(PlatformError::InvalidRate { .. })
        ));
        assert!(matches!(
            f.platform.update_rate(&f.me, RateUpdate::new(9, -0.5), true),
            Err(PlatformError::InvalidRate { .. })
        ));

        // a bad entry anywhere rejects the whole bulk
        let bulk = vec![RateUpdate::new(1, 3.0), RateUpdate::new(1, -4.0)];
        assert!(f.platform.update_rate_bulk(&f.me, bulk, true).is_err());
        assert_eq!(f.platform.user(1).unwrap().attention_rate, 2.0);
        assert_eq!(f.platform.state().unwrap().total_attention, 2.0);
    }

    #[test]
    fn test_previous_round_scores_do_not_carry_over() {
        let mut f = fixture(100);
        f.register("alice", 1);
        f.platform.lock_attention(&f.me).unwrap();
        f.score(&[(1, 2.0)]);
        f.fund();
        f.pay(None, 5).unwrap();

        f.platform.lock_attention(&f.me).unwrap();
        assert_eq!(f.platform.state().unwrap().total_attention, 0.0);
        f.score(&[(1, 1.0)]);
        let state = f.platform.state().unwrap();
        assert_eq!(state.total_attention, 1.0);
        assert_eq!(state.registered_attention, 1.0);
    }

    #[test]
    fn test_drop_account_mid_round_keeps_round_closable() {
        let mut f = fixture(1_000);
        f.register("alice", 1);
        f.register("bob", 2);
        f.register("carol", 3);
        f.platform.lock_attention(&f.me).unwrap();
        f.score(&[(1, 1.0), (2, 1.0), (3, 1.0)]);
        f.fund();

        let first = f.pay(None, 1).unwrap();
        assert_eq!(first.next_cursor, Some(name("bob")));
        f.platform.drop_account(&f.me, 1).unwrap();
        f.platform.drop_account(&f.me, 3).unwrap();

        let state = f.platform.state().unwrap();
        assert_eq!(state.registered_user_count, 1);
        assert_eq!(state.round_sent_count, 0);

        let rest = f.pay(Some("bob"), 5).unwrap();
        assert!(rest.round_closed);
        assert!(f.platform.account_by_name(&name("alice")).is_none());
        assert_eq!(f.platform.user(1).unwrap().attention_rate, 1.0);
    }

    #[test]
    fn test_reset_phase_recovers_a_stuck_round() {
        let mut f = fixture(100);
        f.platform.lock_attention(&f.me).unwrap();
        f.platform.reset_phase(&f.me, Phase::Idle).unwrap();
        f.platform.lock_attention(&f.me).unwrap();
        assert_eq!(f.platform.state().unwrap().phase, Phase::AttentionLocked);
    }

    #[test]
    fn test_empty_table_closes_immediately() {
        let mut f = fixture(50);
        f.platform.lock_attention(&f.me).unwrap();
        f.fund();
        let outcome = f.pay(None, 3).unwrap();
        assert!(outcome.round_closed);
        assert_eq!(outcome.visited, 0);
        assert_eq!(f.balance("snax"), 50);
    }
}
