//! Attention Rewards Command Line Interface
//!
//! Runs the reward engine locally: synthetic multi-round simulations,
//! scripted action batches against a persisted state, and state inspection.

mod settings;

use anyhow::{anyhow, Context, Result};
use attn_platform::{AccountRegistration, RateUpdate};
use attn_runtime::{Action, Runtime, SignedAction};
use attn_storage::SledStateStore;
use attn_types::{AccountName, UserId};
use clap::{Parser, Subcommand};
use serde_json::json;
use settings::{init_logging, AppConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "attn-cli")]
#[command(about = "Attention reward engine command line interface", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run full rounds with synthetic attention and print the round history
    Simulate {
        /// Number of rounds to run
        #[arg(long, default_value_t = 3)]
        rounds: u64,
        /// Number of scored users; every fifth one stays unregistered
        #[arg(long, default_value_t = 50)]
        users: usize,
        /// Accounts paid per batch
        #[arg(long, default_value_t = 10)]
        batch_size: usize,
        /// Blocks produced between rounds
        #[arg(long, default_value_t = 20)]
        blocks_per_round: u64,
        /// Platform to drive (defaults to the first genesis platform)
        #[arg(long)]
        platform: Option<String>,
    },
    /// Apply a JSON list of `{signer, action}` items and print the receipts
    Apply {
        /// Actions file
        #[arg(long)]
        actions: PathBuf,
        /// Persist state here; resumes from it when it already holds a state
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Print persisted state
    Inspect {
        #[arg(long)]
        data_dir: PathBuf,
        /// Platform account; prints a network summary when omitted
        #[arg(long)]
        platform: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config)?;

    match cli.command {
        Commands::Simulate {
            rounds,
            users,
            batch_size,
            blocks_per_round,
            platform,
        } => simulate(&config, rounds, users, batch_size, blocks_per_round, platform),
        Commands::Apply { actions, data_dir } => apply(&config, &actions, data_dir.as_deref()),
        Commands::Inspect { data_dir, platform } => inspect(&data_dir, platform),
    }
}

fn parse_account(name: &str) -> Result<AccountName> {
    AccountName::new(name).map_err(|err| anyhow!("invalid account {name:?}: {err}"))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Deterministic attention: a repeating 1..=10 pattern.
fn synthetic_rates(users: usize, round: u64) -> Vec<RateUpdate> {
    (0..users)
        .map(|i| {
            let rate = ((i as u64 * 7 + round * 3) % 10 + 1) as f64;
            RateUpdate::new(i as UserId, rate)
        })
        .collect()
}

fn simulate(
    config: &AppConfig,
    rounds: u64,
    users: usize,
    batch_size: usize,
    blocks_per_round: u64,
    platform: Option<String>,
) -> Result<()> {
    let mut runtime = Runtime::genesis(&config.runtime)?;
    let platform = match platform {
        Some(name) => parse_account(&name)?,
        None => config
            .runtime
            .platform_genesis
            .first()
            .map(|genesis| genesis.account.clone())
            .ok_or_else(|| anyhow!("configuration has no genesis platform"))?,
    };
    let period_hours = runtime
        .emission()
        .platform_config(&platform)
        .map(|config| config.period)
        .ok_or_else(|| anyhow!("platform {platform} has no emission config"))?;
    let producer = config.runtime.producers.first().map(|p| p.owner.clone());

    let registrations = (0..users)
        .filter(|i| i % 5 != 4)
        .map(|i| {
            Ok(AccountRegistration {
                chain_account: parse_account(&format!("sim.{}", base5(i)))?,
                id: i as UserId,
                handle: format!("user{i}"),
                verification: Default::default(),
                custom_stats: Vec::new(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let max_bulk = runtime
        .platform(&platform)
        .ok_or_else(|| anyhow!("platform {platform} does not exist"))?
        .params()
        .max_bulk_len
        .max(1);
    for chunk in registrations.chunks(max_bulk) {
        runtime.apply(
            &platform,
            Action::AddAccounts {
                platform: platform.clone(),
                registrations: chunk.to_vec(),
            },
        )?;
    }

    let mut history = Vec::new();
    for round in 0..rounds {
        if let Some(producer) = &producer {
            for _ in 0..blocks_per_round {
                runtime.produce_block(producer)?;
            }
        }
        let closed = runtime
            .run_round(&platform, synthetic_rates(users, round), batch_size)
            .with_context(|| format!("round {round} failed"))?;
        info!(
            "Round {} paid {} of {} to {} accounts",
            closed.round_number, closed.sent_amount, closed.round_supply, closed.round_sent_count
        );
        history.push(closed);
        runtime.advance_time(period_hours * 3_600);
    }

    print_json(&json!({
        "platform": platform,
        "rounds": history,
        "emission": runtime.emission().state(),
    }))
}

/// Base-5 digits written with `1..=5`, so any index forms a valid account name.
fn base5(mut n: usize) -> String {
    let mut digits = String::new();
    loop {
        digits.insert(0, char::from(b'1' + (n % 5) as u8));
        n /= 5;
        if n == 0 {
            return digits;
        }
    }
}

fn apply(config: &AppConfig, actions: &Path, data_dir: Option<&Path>) -> Result<()> {
    let script = fs::read_to_string(actions)
        .with_context(|| format!("failed to read {}", actions.display()))?;
    let script: Vec<SignedAction> =
        serde_json::from_str(&script).context("actions must be a JSON list of {signer, action}")?;

    let store = data_dir
        .map(|dir| SledStateStore::new(dir).with_context(|| format!("failed to open {}", dir.display())))
        .transpose()?;
    let mut runtime = match &store {
        Some(store) => match Runtime::load(store)? {
            Some(runtime) => runtime,
            None => Runtime::genesis(&config.runtime)?,
        },
        None => Runtime::genesis(&config.runtime)?,
    };

    let mut results = Vec::with_capacity(script.len());
    for item in script {
        let name = item.action.name();
        match runtime.apply(&item.signer, item.action) {
            Ok(receipt) => results.push(json!({ "action": name, "receipt": receipt })),
            Err(err) => {
                warn!("{} by {} failed: {}", name, item.signer, err);
                results.push(json!({
                    "action": name,
                    "error": err.to_string(),
                    "kind": err.kind().map(|kind| format!("{kind:?}")),
                }));
            }
        }
    }

    if let Some(store) = &store {
        runtime.save(store)?;
    }
    print_json(&results)
}

fn inspect(data_dir: &Path, platform: Option<String>) -> Result<()> {
    let store = SledStateStore::new(data_dir)
        .with_context(|| format!("failed to open {}", data_dir.display()))?;
    let runtime = Runtime::load(&store)?
        .ok_or_else(|| anyhow!("no state stored in {}", data_dir.display()))?;

    match platform {
        Some(name) => {
            let account = parse_account(&name)?;
            let platform = runtime
                .platform(&account)
                .ok_or_else(|| anyhow!("platform {account} does not exist"))?;
            let history: Vec<_> = platform.rounds().collect();
            print_json(&json!({
                "state": platform.state()?,
                "registered_accounts": platform.registered_accounts().count(),
                "history": history,
            }))
        }
        None => {
            let platforms: Vec<_> = runtime.platforms().map(|p| p.account_name().clone()).collect();
            print_json(&json!({
                "clock": runtime.clock(),
                "emission": runtime.emission().state(),
                "platforms": platforms,
            }))
        }
    }
}
