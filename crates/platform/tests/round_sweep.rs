use attn_emission::{EmissionController, EmissionParams, PlatformConfig};
use attn_ledger::{InMemoryLedger, LedgerClient, LedgerEntry};
use attn_platform::{
    AccountRegistration, PayBatchOutcome, Phase, Platform, PlatformError, PlatformParams,
    PlatformState, RateUpdate,
};
use attn_types::{AccountName, Amount, Asset, Timestamp, TokenSymbol, UserId};
use proptest::prelude::*;

fn name(s: &str) -> AccountName {
    AccountName::new(s).unwrap()
}

fn snax() -> TokenSymbol {
    TokenSymbol::from_static("SNAX", 4)
}

/// `user` + base-5 digits, e.g. `user.1.2`, so every index maps to a valid name.
fn chain_name(index: usize) -> AccountName {
    let mut digits = String::new();
    let mut n = index;
    loop {
        digits.insert(0, char::from(b'1' + (n % 5) as u8));
        n /= 5;
        if n == 0 {
            break;
        }
    }
    name(&format!("user.{digits}"))
}

struct Network {
    ledger: InMemoryLedger,
    emission: EmissionController,
    platform: Platform,
    me: AccountName,
}

impl Network {
    fn new() -> Self {
        let me = name("p.test");
        let params = EmissionParams::default();
        let mut ledger = InMemoryLedger::new();
        ledger
            .create_token(
                params.accounts.treasury.clone(),
                &Asset::new(100_000_000_000_0000, snax()),
            )
            .unwrap();
        let mut emission = EmissionController::new(params).unwrap();
        emission
            .set_platforms(vec![PlatformConfig {
                account: me.clone(),
                weight: 1.0,
                period: 24,
            }])
            .unwrap();

        let mut platform = Platform::new(me.clone(), PlatformParams::default());
        platform
            .initialize(&me, "test platform", name("snax"), snax(), name("snax"))
            .unwrap();
        Self {
            ledger,
            emission,
            platform,
            me,
        }
    }

    /// Users `0..rates.len()`; those flagged `true` are bound to a chain account.
    fn populate(&mut self, users: &[(f64, bool)]) {
        let registrations = users
            .iter()
            .enumerate()
            .filter(|(_, (_, registered))| *registered)
            .map(|(index, _)| AccountRegistration {
                chain_account: chain_name(index),
                id: index as UserId,
                handle: format!("handle{index}"),
                verification: Default::default(),
                custom_stats: Vec::new(),
            })
            .collect();
        self.platform
            .add_accounts(&self.me, registrations, &mut self.ledger, Timestamp(0))
            .unwrap();

        self.platform.lock_attention(&self.me).unwrap();
        let updates = users
            .iter()
            .enumerate()
            .map(|(index, (rate, _))| RateUpdate::new(index as UserId, *rate))
            .collect();
        self.platform.update_rate_bulk(&self.me, updates, true).unwrap();
        self.platform
            .lock_round(&self.me, &mut self.emission, Timestamp(10))
            .unwrap();
        self.platform
            .start_round(&self.me, &mut self.emission, &mut self.ledger, Timestamp(20))
            .unwrap();
    }

    fn pay(&mut self, cursor: Option<&AccountName>, max: usize) -> Result<PayBatchOutcome, PlatformError> {
        self.platform
            .pay_batch(&self.me, cursor, max, &mut self.ledger, Timestamp(30))
    }

    /// Sweep the whole table in batches of `batch_size`.
    fn sweep(&mut self, batch_size: usize) -> Vec<PayBatchOutcome> {
        let mut cursor = None;
        let mut outcomes = Vec::new();
        loop {
            let outcome = self.pay(cursor.as_ref(), batch_size).unwrap();
            let closed = outcome.round_closed;
            cursor = outcome.next_cursor.clone();
            outcomes.push(outcome);
            if closed {
                return outcomes;
            }
            assert!(cursor.is_some(), "sweep ended without closing the round");
        }
    }

    fn payouts(&self) -> Vec<(AccountName, Amount)> {
        let mut payouts: Vec<_> = self
            .ledger
            .journal()
            .iter()
            .filter_map(|entry| match entry {
                LedgerEntry::Transfer {
                    from, to, quantity, ..
                } if from == &self.me && to.as_str().starts_with("user.") => {
                    Some((to.clone(), quantity.amount))
                }
                _ => None,
            })
            .collect();
        payouts.sort();
        payouts
    }

    fn state(&self) -> PlatformState {
        self.platform.state().unwrap().clone()
    }
}

fn run(users: &[(f64, bool)], batch_size: usize) -> (PlatformState, Vec<(AccountName, Amount)>, Network) {
    let mut network = Network::new();
    network.populate(users);
    network.sweep(batch_size);
    (network.state(), network.payouts(), network)
}

fn sample_users() -> Vec<(f64, bool)> {
    (0..23)
        .map(|i| (f64::from(i % 6) * 1.25, i % 4 != 3))
        .collect()
}

#[test]
fn test_pagination_batch_sizes_agree() {
    let users = sample_users();
    let (state_one, payouts_one, _) = run(&users, 1);
    let (state_seven, payouts_seven, _) = run(&users, 7);
    let (state_all, payouts_all, _) = run(&users, users.len());

    assert_eq!(state_one, state_seven);
    assert_eq!(state_one, state_all);
    assert_eq!(payouts_one, payouts_seven);
    assert_eq!(payouts_one, payouts_all);
    assert_eq!(state_one.phase, Phase::Idle);
    assert_eq!(state_one.round_number, 1);
}

#[test]
fn test_round_conservation() {
    let users = sample_users();
    let (_, payouts, network) = run(&users, 5);
    let history = network.platform.history(0).unwrap();

    let paid: Amount = payouts.iter().map(|(_, amount)| amount).sum();
    assert!(paid <= history.round_supply);
    assert_eq!(history.sent_amount, paid);
    assert_eq!(history.sent_amount + history.returned_amount, history.round_supply);
    assert_eq!(network.ledger.balance_of(&name("p.test"), &snax()).unwrap(), 0);
}

#[test]
fn test_every_registered_account_is_paid_once() {
    let users = sample_users();
    let (_, payouts, network) = run(&users, 4);
    let mut names: Vec<_> = payouts.iter().map(|(to, _)| to.clone()).collect();
    let before = names.len();
    names.dedup();
    assert_eq!(names.len(), before);

    for account in network.platform.registered_accounts() {
        let user = network.platform.user(account.id).unwrap();
        if user.attention_rate > 0.1 {
            assert_eq!(account.last_paid_round, Some(0));
        }
        assert_eq!(account.last_visited_round, Some(0));
    }
}

#[test]
fn test_overlapping_cursors_fail_without_side_effects() {
    let users = sample_users();
    let mut network = Network::new();
    network.populate(&users);

    let first = network.pay(None, 6).unwrap();
    let journal_len = network.ledger.journal().len();
    let before = network.state();

    let overlap = network.registered_names()[3].clone();
    let err = network.pay(Some(&overlap), 6).unwrap_err();
    assert!(matches!(err, PlatformError::DoublePayment { .. }));
    assert_eq!(network.ledger.journal().len(), journal_len);
    assert_eq!(network.state(), before);

    let mut cursor = first.next_cursor;
    loop {
        let outcome = network.pay(cursor.as_ref(), 6).unwrap();
        if outcome.round_closed {
            break;
        }
        cursor = outcome.next_cursor;
    }
}

impl Network {
    fn registered_names(&self) -> Vec<AccountName> {
        self.platform
            .registered_accounts()
            .map(|account| account.chain_account.clone())
            .collect()
    }
}

#[test]
fn test_escrow_round_trip() {
    let mut network = Network::new();
    let donor = name("donor");
    let me = network.me.clone();
    network
        .ledger
        .issue(&donor, &Asset::new(1_000, snax()), "gift")
        .unwrap();

    network
        .platform
        .transfer_to_user(&donor, 42, &Asset::new(300, snax()), "tip", &mut network.ledger)
        .unwrap();
    network
        .platform
        .transfer_to_user(&donor, 42, &Asset::new(450, snax()), "tip", &mut network.ledger)
        .unwrap();
    assert_eq!(network.platform.escrowed(&snax(), 42), 750);
    assert_eq!(network.ledger.balance_of(&me, &snax()).unwrap(), 750);

    let bound = name("late.joiner");
    network
        .platform
        .add_account(
            &me,
            AccountRegistration {
                chain_account: bound.clone(),
                id: 42,
                handle: String::new(),
                verification: Default::default(),
                custom_stats: Vec::new(),
            },
            &mut network.ledger,
            Timestamp(5),
        )
        .unwrap();

    let received: Vec<_> = network.ledger.transfers_to(&bound).cloned().collect();
    assert_eq!(received, vec![Asset::new(750, snax())]);
    assert_eq!(network.platform.escrowed(&snax(), 42), 0);
    assert!(network.platform.escrow().is_empty());

    // once bound, transfers go straight to the account
    network
        .platform
        .transfer_to_user(&donor, 42, &Asset::new(5, snax()), "tip", &mut network.ledger)
        .unwrap();
    assert_eq!(network.ledger.balance_of(&bound, &snax()).unwrap(), 755);
}

#[test]
fn test_escrow_is_not_spent_by_rounds() {
    let mut network = Network::new();
    let donor = name("donor");
    network
        .ledger
        .issue(&donor, &Asset::new(500, snax()), "gift")
        .unwrap();
    network
        .platform
        .transfer_to_user(&donor, 999, &Asset::new(500, snax()), "tip", &mut network.ledger)
        .unwrap();

    network.populate(&[(2.0, true), (1.0, true)]);
    network.sweep(10);

    assert_eq!(network.platform.escrowed(&snax(), 999), 500);
    assert_eq!(network.ledger.balance_of(&name("p.test"), &snax()).unwrap(), 500);
}

#[test]
fn test_pending_binding_must_match() {
    let mut network = Network::new();
    let me = network.me.clone();
    network
        .platform
        .add_pending_account(&me, name("alice"), 7, Timestamp(1))
        .unwrap();

    let mismatch = AccountRegistration {
        chain_account: name("alice"),
        id: 8,
        handle: String::new(),
        verification: Default::default(),
        custom_stats: Vec::new(),
    };
    assert!(matches!(
        network
            .platform
            .add_account(&me, mismatch.clone(), &mut network.ledger, Timestamp(2)),
        Err(PlatformError::PendingMismatch { reserved: 7, requested: 8, .. })
    ));

    let matching = AccountRegistration { id: 7, ..mismatch };
    network
        .platform
        .add_account(&me, matching, &mut network.ledger, Timestamp(2))
        .unwrap();
    assert!(network.platform.pending(&name("alice")).is_none());
    assert_eq!(network.platform.account_by_name(&name("alice")).unwrap().id, 7);
}

#[test]
fn test_creators_may_register_accounts() {
    let mut network = Network::new();
    let me = network.me.clone();
    let creator = name("creator");
    let registration = AccountRegistration {
        chain_account: name("alice"),
        id: 1,
        handle: String::new(),
        verification: Default::default(),
        custom_stats: Vec::new(),
    };
    assert!(matches!(
        network
            .platform
            .add_account(&creator, registration.clone(), &mut network.ledger, Timestamp(0)),
        Err(PlatformError::Unauthorized { .. })
    ));

    network.platform.add_creator(&me, creator.clone()).unwrap();
    network
        .platform
        .add_account(&creator, registration, &mut network.ledger, Timestamp(0))
        .unwrap();
    assert!(network.platform.is_creator(&creator));

    network.platform.remove_creator(&me, &creator).unwrap();
    assert!(network.platform.remove_creator(&me, &creator).is_err());
}

#[test]
fn test_bulk_registration_is_all_or_nothing() {
    let mut network = Network::new();
    let me = network.me.clone();
    let entry = |account: &str, id: UserId| AccountRegistration {
        chain_account: name(account),
        id,
        handle: String::new(),
        verification: Default::default(),
        custom_stats: Vec::new(),
    };
    let bulk = vec![entry("alice", 1), entry("bob", 2), entry("carol", 1)];
    assert!(matches!(
        network.platform.add_accounts(&me, bulk, &mut network.ledger, Timestamp(0)),
        Err(PlatformError::DuplicateInBulk(1))
    ));
    assert_eq!(network.platform.registered_accounts().count(), 0);
    assert_eq!(network.state().registered_user_count, 0);

    let too_many = (0..301).map(|i| entry("alice", i)).collect();
    assert!(matches!(
        network.platform.add_accounts(&me, too_many, &mut network.ledger, Timestamp(0)),
        Err(PlatformError::BulkTooLarge { len: 301, max: 300 })
    ));
}

#[test]
fn test_drop_user_requires_unregistered() {
    let mut network = Network::new();
    let me = network.me.clone();
    network.populate(&[(2.0, true), (3.0, false)]);
    network.sweep(10);

    assert!(matches!(
        network.platform.drop_user(&me, 0),
        Err(PlatformError::UserHasAccount(0))
    ));
    network.platform.drop_user(&me, 1).unwrap();
    assert!(network.platform.user(1).is_none());
    assert_eq!(network.state().total_user_count, 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_any_batch_size_matches_single_sweep(
        users in proptest::collection::vec((0.0f64..50.0, any::<bool>()), 0..40),
        batch_size in 1usize..12,
    ) {
        let (state_paged, payouts_paged, network) = run(&users, batch_size);
        let (state_whole, payouts_whole, _) = run(&users, usize::MAX);

        prop_assert_eq!(&state_paged, &state_whole);
        prop_assert_eq!(&payouts_paged, &payouts_whole);

        let history = network.platform.history(0).unwrap();
        let paid: Amount = payouts_paged.iter().map(|(_, amount)| amount).sum();
        prop_assert!(paid <= history.round_supply);
        prop_assert_eq!(history.sent_amount, paid);
        prop_assert_eq!(history.round_sent_count, history.registered_user_count);
    }
}
