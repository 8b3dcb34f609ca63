use attn_emission::EmissionController;
use attn_ledger::InMemoryLedger;
use attn_platform::{Platform, RoundHistory};
use attn_types::{AccountName, ChainClock, RoundNumber};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Storage errors
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt key in tree {tree}: {key}")]
    CorruptKey { tree: &'static str, key: String },
}

pub type Result<T> = std::result::Result<T, StorageError>;

const LEDGER_KEY: &[u8] = b"ledger";
const EMISSION_KEY: &[u8] = b"emission";
const CLOCK_KEY: &[u8] = b"clock";

/// Everything the host persists.
pub trait StateStore: Send + Sync {
    fn put_ledger(&self, ledger: &InMemoryLedger) -> Result<()>;
    fn get_ledger(&self) -> Result<Option<InMemoryLedger>>;

    fn put_emission(&self, controller: &EmissionController) -> Result<()>;
    fn get_emission(&self) -> Result<Option<EmissionController>>;

    /// Store a platform and append any round history rows not stored yet.
    fn put_platform(&self, platform: &Platform) -> Result<()>;
    fn get_platform(&self, account: &AccountName) -> Result<Option<Platform>>;
    fn list_platforms(&self) -> Result<Vec<AccountName>>;

    fn get_round_history(&self, platform: &AccountName, round: RoundNumber) -> Result<Option<RoundHistory>>;
    fn list_round_history(&self, platform: &AccountName) -> Result<Vec<RoundHistory>>;

    fn put_clock(&self, clock: &ChainClock) -> Result<()>;
    fn get_clock(&self) -> Result<Option<ChainClock>>;

    fn flush(&self) -> Result<()>;
}

fn history_prefix(platform: &AccountName) -> Vec<u8> {
    let mut key = platform.as_str().as_bytes().to_vec();
    key.push(b'/');
    key
}

fn history_key(platform: &AccountName, round: RoundNumber) -> Vec<u8> {
    let mut key = history_prefix(platform);
    key.extend_from_slice(&round.to_be_bytes());
    key
}

/// Sled-backed implementation
pub struct SledStateStore {
    db: Db,
    ledger: Tree,
    emission: Tree,
    platforms: Tree,
    round_history: Tree,
    meta: Tree,
}

impl SledStateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self {
            ledger: db.open_tree("ledger")?,
            emission: db.open_tree("emission")?,
            platforms: db.open_tree("platforms")?,
            round_history: db.open_tree("round_history")?,
            meta: db.open_tree("meta")?,
            db,
        })
    }

    fn put<T: Serialize>(tree: &Tree, key: &[u8], value: &T) -> Result<()> {
        tree.insert(key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(tree: &Tree, key: &[u8]) -> Result<Option<T>> {
        match tree.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl StateStore for SledStateStore {
    fn put_ledger(&self, ledger: &InMemoryLedger) -> Result<()> {
        Self::put(&self.ledger, LEDGER_KEY, ledger)
    }

    fn get_ledger(&self) -> Result<Option<InMemoryLedger>> {
        Self::get(&self.ledger, LEDGER_KEY)
    }

    fn put_emission(&self, controller: &EmissionController) -> Result<()> {
        Self::put(&self.emission, EMISSION_KEY, controller)
    }

    fn get_emission(&self) -> Result<Option<EmissionController>> {
        Self::get(&self.emission, EMISSION_KEY)
    }

    fn put_platform(&self, platform: &Platform) -> Result<()> {
        let account = platform.account_name();
        Self::put(&self.platforms, account.as_str().as_bytes(), platform)?;

        let mut appended = 0;
        for history in platform.rounds() {
            let key = history_key(account, history.round_number);
            if !self.round_history.contains_key(&key)? {
                Self::put(&self.round_history, &key, history)?;
                appended += 1;
            }
        }
        debug!(
            target: "storage",
            "Stored platform {} ({} new history rows)",
            account, appended
        );
        Ok(())
    }

    fn get_platform(&self, account: &AccountName) -> Result<Option<Platform>> {
        Self::get(&self.platforms, account.as_str().as_bytes())
    }

    fn list_platforms(&self) -> Result<Vec<AccountName>> {
        let mut names = Vec::new();
        for item in self.platforms.iter() {
            let (key, _) = item?;
            let name = String::from_utf8(key.to_vec())
                .ok()
                .and_then(|s| AccountName::new(s).ok())
                .ok_or_else(|| StorageError::CorruptKey {
                    tree: "platforms",
                    key: String::from_utf8_lossy(&key).into_owned(),
                })?;
            names.push(name);
        }
        Ok(names)
    }

    fn get_round_history(&self, platform: &AccountName, round: RoundNumber) -> Result<Option<RoundHistory>> {
        Self::get(&self.round_history, &history_key(platform, round))
    }

    fn list_round_history(&self, platform: &AccountName) -> Result<Vec<RoundHistory>> {
        let mut rows = Vec::new();
        for item in self.round_history.scan_prefix(history_prefix(platform)) {
            let (_, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    fn put_clock(&self, clock: &ChainClock) -> Result<()> {
        Self::put(&self.meta, CLOCK_KEY, clock)
    }

    fn get_clock(&self) -> Result<Option<ChainClock>> {
        Self::get(&self.meta, CLOCK_KEY)
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStateStore {
    ledger: Arc<RwLock<Option<InMemoryLedger>>>,
    emission: Arc<RwLock<Option<EmissionController>>>,
    platforms: Arc<RwLock<BTreeMap<AccountName, Platform>>>,
    round_history: Arc<RwLock<BTreeMap<(AccountName, RoundNumber), RoundHistory>>>,
    clock: Arc<RwLock<Option<ChainClock>>>,
}

impl StateStore for MemoryStateStore {
    fn put_ledger(&self, ledger: &InMemoryLedger) -> Result<()> {
        *self.ledger.write() = Some(ledger.clone());
        Ok(())
    }

    fn get_ledger(&self) -> Result<Option<InMemoryLedger>> {
        Ok(self.ledger.read().clone())
    }

    fn put_emission(&self, controller: &EmissionController) -> Result<()> {
        *self.emission.write() = Some(controller.clone());
        Ok(())
    }

    fn get_emission(&self) -> Result<Option<EmissionController>> {
        Ok(self.emission.read().clone())
    }

    fn put_platform(&self, platform: &Platform) -> Result<()> {
        let account = platform.account_name().clone();
        let mut history = self.round_history.write();
        for row in platform.rounds() {
            history
                .entry((account.clone(), row.round_number))
                .or_insert_with(|| row.clone());
        }
        self.platforms.write().insert(account, platform.clone());
        Ok(())
    }

    fn get_platform(&self, account: &AccountName) -> Result<Option<Platform>> {
        Ok(self.platforms.read().get(account).cloned())
    }

    fn list_platforms(&self) -> Result<Vec<AccountName>> {
        Ok(self.platforms.read().keys().cloned().collect())
    }

    fn get_round_history(&self, platform: &AccountName, round: RoundNumber) -> Result<Option<RoundHistory>> {
        Ok(self
            .round_history
            .read()
            .get(&(platform.clone(), round))
            .cloned())
    }

    fn list_round_history(&self, platform: &AccountName) -> Result<Vec<RoundHistory>> {
        Ok(self
            .round_history
            .read()
            .iter()
            .filter(|((owner, _), _)| owner == platform)
            .map(|(_, row)| row.clone())
            .collect())
    }

    fn put_clock(&self, clock: &ChainClock) -> Result<()> {
        *self.clock.write() = Some(*clock);
        Ok(())
    }

    fn get_clock(&self) -> Result<Option<ChainClock>> {
        Ok(*self.clock.read())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
