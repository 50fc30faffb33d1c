use std::path::PathBuf;
use std::process::ExitCode;

use anchor_lang::prelude::Pubkey;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use holder_airdrop::config::Settings;
use holder_airdrop::holders::{fetch_holders, parse_holders};
use holder_airdrop::ledger::rpc::keypair_from_base58;
use holder_airdrop::ledger::RpcLedger;
use holder_airdrop::ops::{run_airdrop, run_fixed_amount, Dispatcher, ThreadPause};
use holder_airdrop::state::RecipientMapping;
use holder_airdrop::utils::amount::units_to_base;
use holder_airdrop::AirdropError;

/// NFT holder random SPL token airdrop on Solana
#[derive(Parser, Debug)]
#[command(name = "holder-airdrop")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "airdrop.toml")]
    config: PathBuf,

    /// Force dry-run regardless of the configuration file
    #[arg(long)]
    dry_run: bool,

    /// Seed for a reproducible distribution plan
    #[arg(long)]
    seed: Option<u64>,

    /// Sender secret key (base58); overrides `private_key` in the config
    #[arg(long, env = "AIRDROP_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a fixed amount to every mapped holder's destination (ignores dry_run)
    TestMapping {
        /// Amount in whole asset units, e.g. 0.01
        amount: f64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            match err.downcast_ref::<AirdropError>() {
                Some(e) if e.is_invariant_violation() => ExitCode::from(3),
                Some(e) if e.is_configuration() => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load(&cli.config)?;
    if cli.dry_run {
        settings.dry_run = true;
    }
    if let Some(seed) = cli.seed {
        settings.seed = Some(seed);
    }
    if let Some(key) = cli.private_key {
        settings.private_key = key;
    }

    match cli.command {
        Some(Command::TestMapping { amount }) => test_mapping(&settings, amount),
        None => airdrop(&settings),
    }
}

fn load_holders(settings: &Settings) -> anyhow::Result<Vec<Pubkey>> {
    let raw = fetch_holders(&settings.nft_worker_url, &settings.nft_collection_id)?;
    Ok(parse_holders(&raw)?)
}

fn signing_ledger(settings: &Settings) -> anyhow::Result<RpcLedger> {
    let payer = keypair_from_base58(&settings.private_key)?;
    Ok(RpcLedger::new(&settings.rpc_url, payer, settings.decimals))
}

fn airdrop(settings: &Settings) -> anyhow::Result<()> {
    let params = settings.plan_params()?;
    let mint = settings.mint_pubkey()?;

    info!("{}", "=".repeat(60));
    info!("NFT Holder {} Random Airdrop", settings.symbol);
    info!("{}", "=".repeat(60));
    info!("Collection ID : {}", settings.nft_collection_id);
    info!("Total         : {} {}", settings.total_usdc_amount, settings.symbol);
    info!("Min per holder: {} {}", settings.min_usdc_amount, settings.symbol);
    info!("Dry run       : {}", settings.dry_run);
    info!("Sleep time    : {}s", settings.tx_sleep_time);
    info!("Max retries   : {}", settings.tx_max_retries);
    info!(
        "Addr mapping  : {}",
        if settings.address_mapping_file.is_empty() { "(none)" } else { &settings.address_mapping_file }
    );
    if params.alpha == 1.0 {
        info!("Distr. alpha  : 1.0 (classic cut-the-line)");
    } else {
        let variance = if params.alpha < 1.0 { "high" } else { "low" };
        info!("Distr. alpha  : {} (Dirichlet, {variance} variance)", params.alpha);
    }

    let holders = load_holders(settings)?;
    let mapping = RecipientMapping::load(&settings.address_mapping_file)?;

    let mut rng = match settings.seed {
        Some(seed) => {
            info!(seed, "using fixed seed");
            ChaCha20Rng::seed_from_u64(seed)
        }
        None => ChaCha20Rng::from_entropy(),
    };

    let ledger = if settings.dry_run {
        RpcLedger::read_only(&settings.rpc_url, settings.decimals)
    } else {
        signing_ledger(settings)?
    };
    let mut dispatcher = Dispatcher::new(
        ledger,
        ThreadPause,
        mint,
        params.total_budget,
        settings.dispatch_config()?,
    );
    let outcome = run_airdrop(&holders, &mapping, &params, &mut rng, &mut dispatcher)?;
    if outcome.report.dry_run {
        info!("Dry run finished, set dry_run = false to send.");
    }
    Ok(())
}

fn test_mapping(settings: &Settings, amount: f64) -> anyhow::Result<()> {
    let amount = units_to_base(amount, settings.decimals)?;
    if settings.address_mapping_file.trim().is_empty() {
        return Err(AirdropError::InvalidConfig(
            "address_mapping_file is not configured, cannot run test-mapping".to_string(),
        )
        .into());
    }
    let mapping = RecipientMapping::load(&settings.address_mapping_file)?;
    let holders = load_holders(settings)?;
    let ledger = signing_ledger(settings)?;

    let report = run_fixed_amount(
        &holders,
        &mapping,
        amount,
        settings.mint_pubkey()?,
        ledger,
        ThreadPause,
        settings.dispatch_config()?,
    )?;
    if report.fail_count > 0 {
        info!("{} test transfer(s) failed", report.fail_count);
    }
    Ok(())
}
