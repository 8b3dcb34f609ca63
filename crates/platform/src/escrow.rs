//! Tokens owed to ids that have no bound chain account yet.

use attn_types::{Amount, TokenSymbol, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowEntry {
    pub id: UserId,
    pub amount: Amount,
}

/// One escrow table per token symbol, keyed by recipient id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowStore {
    tables: BTreeMap<TokenSymbol, BTreeMap<UserId, EscrowEntry>>,
}

impl EscrowStore {
    /// Add `amount` to the entry of `id`, returning the new escrowed total.
    pub fn credit(&mut self, symbol: &TokenSymbol, id: UserId, amount: Amount) -> Amount {
        let entry = self
            .tables
            .entry(symbol.clone())
            .or_default()
            .entry(id)
            .or_insert(EscrowEntry { id, amount: 0 });
        entry.amount = entry.amount.saturating_add(amount);
        entry.amount
    }

    pub fn get(&self, symbol: &TokenSymbol, id: UserId) -> Option<&EscrowEntry> {
        self.tables.get(symbol).and_then(|table| table.get(&id))
    }

    /// Remove and return the entry of `id`.
    pub fn take(&mut self, symbol: &TokenSymbol, id: UserId) -> Option<EscrowEntry> {
        let table = self.tables.get_mut(symbol)?;
        let entry = table.remove(&id);
        if table.is_empty() {
            self.tables.remove(symbol);
        }
        entry
    }

    /// Everything escrowed in `symbol`.
    pub fn total(&self, symbol: &TokenSymbol) -> Amount {
        self.tables
            .get(symbol)
            .map(|table| table.values().map(|e| e.amount).sum())
            .unwrap_or(0)
    }

    pub fn entries<'a>(&'a self, symbol: &TokenSymbol) -> impl Iterator<Item = &'a EscrowEntry> + 'a {
        self.tables.get(symbol).into_iter().flat_map(|table| table.values())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snax() -> TokenSymbol {
        TokenSymbol::from_static("SNAX", 4)
    }

    #[test]
    fn test_credit_accumulates_and_take_clears() {
        let mut escrow = EscrowStore::default();
        assert_eq!(escrow.credit(&snax(), 7, 30), 30);
        assert_eq!(escrow.credit(&snax(), 7, 12), 42);
        escrow.credit(&snax(), 8, 1);
        assert_eq!(escrow.total(&snax()), 43);

        assert_eq!(escrow.take(&snax(), 7), Some(EscrowEntry { id: 7, amount: 42 }));
        assert!(escrow.get(&snax(), 7).is_none());
        assert_eq!(escrow.take(&snax(), 7), None);
        assert_eq!(escrow.total(&snax()), 1);

        escrow.take(&snax(), 8);
        assert!(escrow.is_empty());
    }

    #[test]
    fn test_tables_are_per_symbol() {
        let other = TokenSymbol::from_static("GOLOS", 3);
        let mut escrow = EscrowStore::default();
        escrow.credit(&snax(), 1, 5);
        escrow.credit(&other, 1, 9);
        assert_eq!(escrow.total(&snax()), 5);
        assert_eq!(escrow.entries(&other).count(), 1);
        assert!(escrow.take(&TokenSymbol::from_static("NONE", 0), 1).is_none());
    }
}
