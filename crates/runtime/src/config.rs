//! Genesis configuration of a runtime.

use attn_emission::{EmissionParams, PlatformConfig};
use attn_platform::PlatformParams;
use attn_types::{AccountName, Amount};
use serde::{Deserialize, Serialize};

/// Tokens issued to an account at genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceGenesis {
    pub account: AccountName,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProducerGenesis {
    pub owner: AccountName,
    #[serde(default)]
    pub votes: f64,
}

/// A platform initialized at genesis. Dealer and treasury default to the
/// network treasury.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformGenesis {
    pub account: AccountName,
    pub name: String,
    #[serde(default)]
    pub token_dealer: Option<AccountName>,
    #[serde(default)]
    pub treasury: Option<AccountName>,
    #[serde(default)]
    pub params: PlatformParams,
    #[serde(default)]
    pub creators: Vec<AccountName>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum supply of the system token, in minimal units.
    pub max_supply: Amount,
    pub emission: EmissionParams,
    /// Emission weights and funding periods.
    pub platforms: Vec<PlatformConfig>,
    /// Platforms to initialize.
    pub platform_genesis: Vec<PlatformGenesis>,
    pub producers: Vec<ProducerGenesis>,
    pub activated_stake: Amount,
    pub balances: Vec<BalanceGenesis>,
}

impl Default for RuntimeConfig {
    /// Single-platform devnet with one producer and activated stake.
    fn default() -> Self {
        let emission = EmissionParams::default();
        let platform = AccountName::from_static("p.devnet");
        Self {
            max_supply: 100_000_000_000_0000,
            activated_stake: emission.min_activated_stake,
            emission,
            platforms: vec![PlatformConfig {
                account: platform.clone(),
                weight: 1.0,
                period: 24,
            }],
            platform_genesis: vec![PlatformGenesis {
                account: platform,
                name: "devnet".to_string(),
                token_dealer: None,
                treasury: None,
                params: PlatformParams::default(),
                creators: Vec::new(),
            }],
            producers: vec![ProducerGenesis {
                owner: AccountName::from_static("bp.one"),
                votes: 1.0,
            }],
            balances: Vec::new(),
        }
    }
}
