use crate::{AccountName, AccountNameError, Asset, BlockSlot, ChainClock, TokenSymbol, Timestamp};

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_account_name_validation() {
        assert!(AccountName::new("alice").is_ok());
        assert!(AccountName::new("snax.bpay").is_ok());
        assert_eq!(AccountName::new(""), Err(AccountNameError::Empty));
        assert_eq!(
            AccountName::new("Alice"),
            Err(AccountNameError::InvalidCharacter('A'))
        );
        assert_eq!(
            AccountName::new("abcdefghijklm"),
            Err(AccountNameError::TooLong {
                max: 12,
                actual: 13
            })
        );
        assert_eq!(AccountName::new(".alice"), Err(AccountNameError::DotBoundary));
        assert_eq!(
            AccountName::new("bob6"),
            Err(AccountNameError::InvalidCharacter('6'))
        );
    }

    #[test]
    fn test_account_name_ordering_is_lexical() {
        let mut names: Vec<AccountName> = ["carol", "alice", "bob", "alice.a"]
            .iter()
            .map(|n| AccountName::new(*n).unwrap())
            .collect();
        names.sort();
        let sorted: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(sorted, vec!["alice", "alice.a", "bob", "carol"]);
    }

    #[test]
    fn test_account_name_serde_rejects_invalid() {
        let ok: AccountName = serde_json::from_str("\"platform\"").unwrap();
        assert_eq!(ok.as_str(), "platform");
        assert!(serde_json::from_str::<AccountName>("\"NOPE\"").is_err());
    }

    #[test]
    fn test_symbol_parse_and_display() {
        let symbol: TokenSymbol = "4,SNAX".parse().unwrap();
        assert_eq!(symbol.code(), "SNAX");
        assert_eq!(symbol.precision(), 4);
        assert_eq!(symbol.unit(), 10_000);
        assert_eq!(symbol.to_string(), "4,SNAX");
        assert!("SNAX".parse::<TokenSymbol>().is_err());
        assert!("4,snax".parse::<TokenSymbol>().is_err());
        assert!(TokenSymbol::new("TOOLONGSYM", 4).is_err());
    }

    #[test]
    fn test_asset_display() {
        let symbol = TokenSymbol::new("SNAX", 4).unwrap();
        assert_eq!(Asset::new(1_2345, symbol.clone()).to_string(), "1.2345 SNAX");
        assert_eq!(Asset::new(5, symbol).to_string(), "0.0005 SNAX");
        let whole = TokenSymbol::new("PTS", 0).unwrap();
        assert_eq!(Asset::new(42, whole).to_string(), "42 PTS");
    }

    #[test]
    fn test_time_helpers() {
        let t = Timestamp::from_secs(100);
        assert_eq!(t.saturating_add_secs(50).as_secs(), 150);
        assert_eq!(t.secs_since(Timestamp::from_secs(40)), 60);
        assert_eq!(Timestamp::from_secs(40).secs_since(t), 0);
        assert_eq!(BlockSlot(10).slots_since(BlockSlot(4)), 6);
        assert_eq!(BlockSlot(7).to_timestamp(), Timestamp::from_secs(3));
    }

    #[test]
    fn test_chain_clock_keeps_slot_and_time_in_step() {
        let mut clock = ChainClock::default();
        clock.tick();
        clock.tick();
        clock.tick();
        assert_eq!(clock.slot, BlockSlot(3));
        assert_eq!(clock.now, Timestamp(1));

        clock.advance_secs(10);
        assert_eq!(clock.now, Timestamp(11));
        assert_eq!(clock.slot, BlockSlot(22));
        clock.tick();
        assert_eq!(clock.slot, BlockSlot(23));
        assert_eq!(clock.now, Timestamp(11));
    }
}
