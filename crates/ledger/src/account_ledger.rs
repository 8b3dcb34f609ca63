//! Account ledger interface for reward distribution
//!
//! Provides a lightweight, deterministic interface for querying, issuing and
//! transferring tokens between chain accounts. Used by the emission controller
//! and the platform round machine for every token movement.

use attn_types::{AccountName, Amount, Asset, TokenSymbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Ledger failures. All of them abort the enclosing transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("token {0} does not exist")]
    UnknownToken(TokenSymbol),
    #[error("token {0} already exists")]
    TokenExists(TokenSymbol),
    #[error("quantity must be positive")]
    NonPositiveQuantity,
    #[error("cannot transfer to self ({0})")]
    SelfTransfer(AccountName),
    #[error("issuing {requested} would exceed max supply (available {available})")]
    MaxSupplyExceeded { requested: Amount, available: Amount },
    #[error("{owner} has insufficient balance: needs {needed}, holds {available}")]
    InsufficientBalance {
        owner: AccountName,
        needed: Amount,
        available: Amount,
    },
}

/// Interface for token ledger operations.
pub trait LedgerClient: Send + Sync {
    /// Balance held by `owner` in `symbol` (zero when the owner has no row).
    fn balance_of(&self, owner: &AccountName, symbol: &TokenSymbol) -> Result<Amount, LedgerError>;

    /// Total issued supply of `symbol`.
    fn supply(&self, symbol: &TokenSymbol) -> Result<Amount, LedgerError>;

    /// Maximum supply of `symbol`.
    fn max_supply(&self, symbol: &TokenSymbol) -> Result<Amount, LedgerError>;

    /// Mint `quantity` directly into `to`.
    fn issue(&mut self, to: &AccountName, quantity: &Asset, memo: &str) -> Result<(), LedgerError>;

    /// Move `quantity` from `from` to `to`.
    fn transfer(
        &mut self,
        from: &AccountName,
        to: &AccountName,
        quantity: &Asset,
        memo: &str,
    ) -> Result<(), LedgerError>;
}

/// Supply statistics of a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStats {
    pub issuer: AccountName,
    pub supply: Amount,
    pub max_supply: Amount,
}

/// One executed ledger operation, in chain order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntry {
    Issue {
        to: AccountName,
        quantity: Asset,
        memo: String,
    },
    Transfer {
        from: AccountName,
        to: AccountName,
        quantity: Asset,
        memo: String,
    },
}

// -----------------------------------------------------------------------------
// 🧠 In-memory implementation (for the runtime host and testing)
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryLedger {
    tokens: BTreeMap<TokenSymbol, TokenStats>,
    balances: BTreeMap<TokenSymbol, BTreeMap<AccountName, Amount>>,
    journal: Vec<LedgerEntry>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token with its issuer and maximum supply.
    pub fn create_token(
        &mut self,
        issuer: AccountName,
        max_supply: &Asset,
    ) -> Result<(), LedgerError> {
        if max_supply.amount == 0 {
            return Err(LedgerError::NonPositiveQuantity);
        }
        if self.tokens.contains_key(&max_supply.symbol) {
            return Err(LedgerError::TokenExists(max_supply.symbol.clone()));
        }
        self.tokens.insert(
            max_supply.symbol.clone(),
            TokenStats {
                issuer,
                supply: 0,
                max_supply: max_supply.amount,
            },
        );
        self.balances.entry(max_supply.symbol.clone()).or_default();
        Ok(())
    }

    pub fn token(&self, symbol: &TokenSymbol) -> Option<&TokenStats> {
        self.tokens.get(symbol)
    }

    /// Every operation executed so far, oldest first.
    pub fn journal(&self) -> &[LedgerEntry] {
        &self.journal
    }

    /// Transfers that credited `to`, in order.
    pub fn transfers_to<'a>(&'a self, to: &'a AccountName) -> impl Iterator<Item = &'a Asset> + 'a {
        self.journal.iter().filter_map(move |entry| match entry {
            LedgerEntry::Transfer {
                to: recipient,
                quantity,
                ..
            } if recipient == to => Some(quantity),
            _ => None,
        })
    }

    /// Sum of every balance of `symbol`. Equals the supply for a consistent ledger.
    pub fn total_balances(&self, symbol: &TokenSymbol) -> Amount {
        self.balances
            .get(symbol)
            .map(|rows| rows.values().sum())
            .unwrap_or(0)
    }

    fn stats_mut(&mut self, symbol: &TokenSymbol) -> Result<&mut TokenStats, LedgerError> {
        self.tokens
            .get_mut(symbol)
            .ok_or_else(|| LedgerError::UnknownToken(symbol.clone()))
    }

    fn rows_mut(
        &mut self,
        symbol: &TokenSymbol,
    ) -> Result<&mut BTreeMap<AccountName, Amount>, LedgerError> {
        self.balances
            .get_mut(symbol)
            .ok_or_else(|| LedgerError::UnknownToken(symbol.clone()))
    }
}

impl LedgerClient for InMemoryLedger {
    fn balance_of(&self, owner: &AccountName, symbol: &TokenSymbol) -> Result<Amount, LedgerError> {
        let rows = self
            .balances
            .get(symbol)
            .ok_or_else(|| LedgerError::UnknownToken(symbol.clone()))?;
        Ok(rows.get(owner).copied().unwrap_or(0))
    }

    fn supply(&self, symbol: &TokenSymbol) -> Result<Amount, LedgerError> {
        self.tokens
            .get(symbol)
            .map(|stats| stats.supply)
            .ok_or_else(|| LedgerError::UnknownToken(symbol.clone()))
    }

    fn max_supply(&self, symbol: &TokenSymbol) -> Result<Amount, LedgerError> {
        self.tokens
            .get(symbol)
            .map(|stats| stats.max_supply)
            .ok_or_else(|| LedgerError::UnknownToken(symbol.clone()))
    }

    fn issue(&mut self, to: &AccountName, quantity: &Asset, memo: &str) -> Result<(), LedgerError> {
        if quantity.amount == 0 {
            return Err(LedgerError::NonPositiveQuantity);
        }
        let stats = self.stats_mut(&quantity.symbol)?;
        let available = stats.max_supply.saturating_sub(stats.supply);
        if quantity.amount > available {
            return Err(LedgerError::MaxSupplyExceeded {
                requested: quantity.amount,
                available,
            });
        }
        stats.supply += quantity.amount;

        let balance = self.rows_mut(&quantity.symbol)?.entry(to.clone()).or_insert(0);
        *balance += quantity.amount;

        debug!(target: "ledger", to = %to, quantity = %quantity, memo, "issue");
        self.journal.push(LedgerEntry::Issue {
            to: to.clone(),
            quantity: quantity.clone(),
            memo: memo.to_string(),
        });
        Ok(())
    }

    fn transfer(
        &mut self,
        from: &AccountName,
        to: &AccountName,
        quantity: &Asset,
        memo: &str,
    ) -> Result<(), LedgerError> {
        if quantity.amount == 0 {
            return Err(LedgerError::NonPositiveQuantity);
        }
        if from == to {
            return Err(LedgerError::SelfTransfer(from.clone()));
        }
        let rows = self.rows_mut(&quantity.symbol)?;
        let available = rows.get(from).copied().unwrap_or(0);
        if available < quantity.amount {
            return Err(LedgerError::InsufficientBalance {
                owner: from.clone(),
                needed: quantity.amount,
                available,
            });
        }
        let remaining = available - quantity.amount;
        if remaining == 0 {
            rows.remove(from);
        } else {
            rows.insert(from.clone(), remaining);
        }
        *rows.entry(to.clone()).or_insert(0) += quantity.amount;

        debug!(target: "ledger", from = %from, to = %to, quantity = %quantity, memo, "transfer");
        self.journal.push(LedgerEntry::Transfer {
            from: from.clone(),
            to: to.clone(),
            quantity: quantity.clone(),
            memo: memo.to_string(),
        });
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ✅ Tests
// -----------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> AccountName {
        AccountName::new(s).unwrap()
    }

    fn snax() -> TokenSymbol {
        TokenSymbol::new("SNAX", 4).unwrap()
    }

    fn ledger_with_token(max: Amount) -> InMemoryLedger {
        let mut ledger = InMemoryLedger::new();
        ledger
            .create_token(name("snax"), &Asset::new(max, snax()))
            .unwrap();
        ledger
    }

    #[test]
    fn test_in_memory_ledger_creation() {
        let ledger = ledger_with_token(1_000);
        assert_eq!(ledger.supply(&snax()).unwrap(), 0);
        assert_eq!(ledger.max_supply(&snax()).unwrap(), 1_000);
        assert_eq!(ledger.balance_of(&name("alice"), &snax()).unwrap(), 0);
    }

    #[test]
    fn test_issue_and_transfer() {
        let mut ledger = ledger_with_token(1_000);
        ledger
            .issue(&name("snax"), &Asset::new(600, snax()), "premine")
            .unwrap();
        ledger
            .transfer(&name("snax"), &name("alice"), &Asset::new(250, snax()), "gift")
            .unwrap();

        assert_eq!(ledger.balance_of(&name("snax"), &snax()).unwrap(), 350);
        assert_eq!(ledger.balance_of(&name("alice"), &snax()).unwrap(), 250);
        assert_eq!(ledger.supply(&snax()).unwrap(), 600);
        assert_eq!(ledger.total_balances(&snax()), 600);
        assert_eq!(ledger.journal().len(), 2);
        assert_eq!(
            ledger.transfers_to(&name("alice")).map(|a| a.amount).collect::<Vec<_>>(),
            vec![250]
        );
    }

    #[test]
    fn test_issue_respects_max_supply() {
        let mut ledger = ledger_with_token(1_000);
        ledger
            .issue(&name("snax"), &Asset::new(900, snax()), "")
            .unwrap();
        let err = ledger
            .issue(&name("snax"), &Asset::new(200, snax()), "")
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::MaxSupplyExceeded {
                requested: 200,
                available: 100
            }
        );
        assert_eq!(ledger.supply(&snax()).unwrap(), 900);
    }

    #[test]
    fn test_insufficient_balance() {
        let mut ledger = ledger_with_token(1_000);
        ledger
            .issue(&name("alice"), &Asset::new(100, snax()), "")
            .unwrap();

        let result = ledger.transfer(&name("alice"), &name("bob"), &Asset::new(150, snax()), "");
        assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
        assert_eq!(ledger.balance_of(&name("alice"), &snax()).unwrap(), 100);
        assert_eq!(ledger.journal().len(), 1);
    }

    #[test]
    fn test_rejects_zero_self_and_unknown() {
        let mut ledger = ledger_with_token(1_000);
        ledger
            .issue(&name("alice"), &Asset::new(100, snax()), "")
            .unwrap();
        assert_eq!(
            ledger.transfer(&name("alice"), &name("bob"), &Asset::zero(snax()), ""),
            Err(LedgerError::NonPositiveQuantity)
        );
        assert_eq!(
            ledger.transfer(&name("alice"), &name("alice"), &Asset::new(1, snax()), ""),
            Err(LedgerError::SelfTransfer(name("alice")))
        );
        let other = TokenSymbol::new("OTHER", 2).unwrap();
        assert!(matches!(
            ledger.balance_of(&name("alice"), &other),
            Err(LedgerError::UnknownToken(_))
        ));
    }

    #[test]
    fn test_ledger_serde_roundtrip_keeps_balances() {
        let mut ledger = ledger_with_token(1_000);
        ledger
            .issue(&name("alice"), &Asset::new(42, snax()), "")
            .unwrap();
        let json = serde_json::to_string(&ledger).unwrap();
        let restored: InMemoryLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.balance_of(&name("alice"), &snax()).unwrap(), 42);
        assert_eq!(restored.journal(), ledger.journal());
    }
}
