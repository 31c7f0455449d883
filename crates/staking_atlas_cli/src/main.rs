//! staking-atlas CLI: validators, delegations, balance, verify.

use clap::{Parser, Subcommand};
use staking_atlas::chain::{Cache, FetchConfig, FetchError, Fetcher, RawAccount};
use staking_atlas::config::AtlasConfig;
use staking_atlas::snapshot::{digest_path, ValidatorSnapshot};
use staking_atlas::staking::{
    build_delegations_page, build_validator_map, DelegationsPage, Registry, SnapshotCell,
    ValidatorMap,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let config = AtlasConfig::load();
    match cli.command {
        Command::Validators(args) => run_validators(args, &config),
        Command::Delegations(args) => run_delegations(args, &config),
        Command::Balance(args) => run_balance(args, &config),
        Command::Verify(args) => run_verify(args),
    }
}

#[derive(Parser)]
#[command(name = "staking-atlas")]
#[command(author = "gorusys <goru.connector@outlook.com>")]
#[command(about = "Canonical Tezos staking data: bakers, curated identities, delegations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch bakers, merge with the registry and write a validator snapshot.
    Validators(ValidatorsArgs),
    /// Resolve delegations for one or more accounts.
    Delegations(DelegationsArgs),
    /// Print an account's spendable balance.
    Balance(BalanceArgs),
    /// Check a snapshot against its .sha256 file.
    Verify(VerifyArgs),
}

#[derive(Parser)]
struct SourceArgs {
    /// Curated registry JSON; overrides `registry_path` from the config file.
    #[arg(long)]
    registry: Option<PathBuf>,
    /// Baker list endpoint; overrides `bakers_url` from the config file.
    #[arg(long)]
    bakers_url: Option<String>,
    /// Node RPC base URL; overrides `rpc_url` from the config file.
    #[arg(long)]
    rpc_url: Option<String>,
    #[arg(long, default_value = "./data/cache")]
    cache_dir: PathBuf,
    #[arg(long)]
    offline: bool,
}

#[derive(Parser)]
struct ValidatorsArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long, default_value = "./snapshots/validators.json")]
    out: PathBuf,
}

#[derive(Parser)]
struct DelegationsArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long = "address", required = true)]
    addresses: Vec<String>,
    /// Resolve against a saved snapshot instead of fetching bakers.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Parser)]
struct BalanceArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long)]
    address: String,
}

#[derive(Parser)]
struct VerifyArgs {
    #[arg(long)]
    snapshot: PathBuf,
}

fn fetcher(source: &SourceArgs, config: &AtlasConfig) -> CliResult<Fetcher> {
    let cache = Cache::open(source.cache_dir.join("cache.sqlite"))?;
    Ok(Fetcher::new(fetch_config(source, config), Some(cache))?)
}

/// Defaults, then the config file, then command-line flags.
fn fetch_config(source: &SourceArgs, config: &AtlasConfig) -> FetchConfig {
    let mut fetch = config.fetch_config(FetchConfig {
        offline: source.offline,
        ..Default::default()
    });
    if let Some(url) = &source.bakers_url {
        fetch.bakers_url.clone_from(url);
    }
    if let Some(url) = &source.rpc_url {
        fetch.rpc_url.clone_from(url);
    }
    fetch
}

fn load_registry(source: &SourceArgs, config: &AtlasConfig) -> CliResult<Registry> {
    let path = source.registry.as_ref().or(config.registry_path.as_ref());
    match path {
        Some(p) => {
            let registry = Registry::load_from_path(p, config.image_base())?;
            if registry.is_empty() {
                warn!(path = %p.display(), "registry file has no entries");
            }
            Ok(registry)
        }
        None => {
            warn!("no registry configured; every validator will be unbranded");
            Ok(Registry::default())
        }
    }
}

fn fetch_validator_map(
    rt: &tokio::runtime::Runtime,
    fetcher: &Fetcher,
    registry: &Registry,
) -> CliResult<ValidatorMap> {
    let body = rt.block_on(fetcher.bakers_raw())?;
    let (map, rejected) = build_validator_map(&body, registry)?;
    if !rejected.is_empty() {
        warn!(count = rejected.len(), "bakers rejected");
    }
    Ok(map)
}

fn run_validators(args: ValidatorsArgs, config: &AtlasConfig) -> CliResult<()> {
    let registry = load_registry(&args.source, config)?;
    let fetcher = fetcher(&args.source, config)?;
    let rt = tokio::runtime::Runtime::new()?;
    let map = fetch_validator_map(&rt, &fetcher, &registry)?;
    let snapshot = ValidatorSnapshot::new(map);
    let hash = snapshot.save(&args.out)?;
    info!(
        out = %args.out.display(),
        validators = snapshot.validators.len(),
        requests = fetcher.request_count(),
        "validators complete"
    );
    println!("{hash}");
    Ok(())
}

fn run_delegations(args: DelegationsArgs, config: &AtlasConfig) -> CliResult<()> {
    let fetcher = fetcher(&args.source, config)?;
    let rt = tokio::runtime::Runtime::new()?;
    let map = match &args.snapshot {
        Some(path) => ValidatorSnapshot::load(path)?.validators,
        None => {
            let registry = load_registry(&args.source, config)?;
            fetch_validator_map(&rt, &fetcher, &registry)?
        }
    };
    let cell = SnapshotCell::new(map);
    let fetched = rt.block_on(async {
        let mut fetched = Vec::with_capacity(args.addresses.len());
        for address in &args.addresses {
            fetched.push((address.clone(), fetcher.account(address).await));
        }
        fetched
    });
    let report = resolve_fetched(fetched, &cell.current());
    for failure in &report.failures {
        warn!(address = %failure.address, error = %failure.error, "account not resolved");
    }
    println!("{}", serde_json::to_string_pretty(&report.page)?);
    if report.failures.is_empty() {
        Ok(())
    } else {
        Err(format!("{} of {} accounts failed", report.failures.len(), args.addresses.len()).into())
    }
}

struct AccountFailure {
    address: String,
    error: String,
}

struct DelegationsReport {
    page: DelegationsPage,
    failures: Vec<AccountFailure>,
}

/// Resolve every fetched account against one snapshot, reporting fetch and
/// validation failures by the address they belong to.
fn resolve_fetched(
    fetched: Vec<(String, Result<RawAccount, FetchError>)>,
    map: &ValidatorMap,
) -> DelegationsReport {
    let mut failures = Vec::new();
    let mut addresses = Vec::with_capacity(fetched.len());
    let mut accounts = Vec::with_capacity(fetched.len());
    for (address, result) in fetched {
        match result {
            Ok(account) => {
                addresses.push(address);
                accounts.push(account);
            }
            Err(e) => failures.push(AccountFailure {
                address,
                error: e.to_string(),
            }),
        }
    }
    let outcome = build_delegations_page(&accounts, map);
    failures.extend(outcome.rejected.into_iter().map(|r| AccountFailure {
        address: addresses[r.index].clone(),
        error: r.error.to_string(),
    }));
    DelegationsReport {
        page: outcome.page,
        failures,
    }
}

fn run_balance(args: BalanceArgs, config: &AtlasConfig) -> CliResult<()> {
    let fetcher = fetcher(&args.source, config)?;
    let rt = tokio::runtime::Runtime::new()?;
    let balance = rt.block_on(fetcher.undelegated_balance(&args.address))?;
    println!("{balance}");
    Ok(())
}

fn run_verify(args: VerifyArgs) -> CliResult<()> {
    let json = std::fs::read_to_string(&args.snapshot)?;
    let snapshot: ValidatorSnapshot = serde_json::from_str(&json)?;
    let expected = read_digest(&digest_path(&args.snapshot));
    let result = snapshot.verify(expected.as_deref())?;
    if result.matches {
        println!("OK\t{}", result.computed);
    } else {
        eprintln!(
            "MISMATCH\tcomputed={}\texpected={:?}",
            result.computed, result.expected
        );
        std::process::exit(1);
    }
    Ok(())
}

fn read_digest(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use staking_atlas::staking::{DelegationStatus, StakeValidator, StakingDetails, ValidatorIdentity};

    fn account(delegate: &str, balance: &str) -> RawAccount {
        RawAccount {
            delegate: Some(delegate.into()),
            balance: balance.into(),
            ..Default::default()
        }
    }

    #[test]
    fn failures_are_reported_by_address() {
        let map: ValidatorMap = std::iter::once(StakeValidator {
            id: "tz1baker".into(),
            status: true,
            info: ValidatorIdentity::default(),
            details: StakingDetails::default(),
        })
        .collect();
        let fetched = vec![
            ("tz1a".to_string(), Err(FetchError::OfflineMiss("contract tz1a".into()))),
            ("tz1b".to_string(), Ok(account("tz1baker", "10"))),
            ("tz1c".to_string(), Ok(account("tz1baker", "x"))),
        ];
        let report = resolve_fetched(fetched, &map);
        assert_eq!(report.page.len(), 1);
        assert_eq!(report.page[0].value, "10");
        assert_eq!(report.page[0].status, DelegationStatus::Active);
        let failed: Vec<_> = report.failures.iter().map(|f| f.address.as_str()).collect();
        assert_eq!(failed, ["tz1a", "tz1c"]);
    }

    #[test]
    fn url_flags_override_config() {
        let cli = Cli::try_parse_from([
            "staking-atlas",
            "balance",
            "--address",
            "tz1a",
            "--bakers-url",
            "http://localhost:1/bakers",
            "--rpc-url",
            "http://localhost:2",
            "--offline",
        ])
        .unwrap();
        let Command::Balance(args) = cli.command else {
            panic!("expected balance");
        };
        let config = AtlasConfig {
            bakers_url: Some("http://config/bakers".into()),
            rpc_url: Some("http://config".into()),
            ..Default::default()
        };
        let fetch = fetch_config(&args.source, &config);
        assert_eq!(fetch.bakers_url, "http://localhost:1/bakers");
        assert_eq!(fetch.rpc_url, "http://localhost:2");
        assert!(fetch.offline);
    }
}
