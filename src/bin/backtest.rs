use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use signal_backtest::config::BacktestConfig;
use signal_backtest::data::{load_clean_cache, BinanceProvider, DatasetOutcome, PriceDataStore};
use signal_backtest::report::MetricsReporter;
use signal_backtest::runner::{BatchRunner, FailurePolicy};
use signal_backtest::simulation::SignalPortfolio;
use signal_backtest::types::PairId;

#[derive(Parser, Debug)]
#[command(name = "backtest", about = "Run the strategy batch over cached or fetched bars")]
struct Args {
    /// JSON config; missing fields fall back to defaults.
    #[arg(long, env = "BACKTEST_CONFIG")]
    config: Option<PathBuf>,

    /// Parquet bar cache.
    #[arg(long, env = "BACKTEST_CACHE")]
    cache: Option<PathBuf>,

    /// Ledger and screenshot directory.
    #[arg(long, env = "BACKTEST_RESULTS_DIR")]
    results_dir: Option<PathBuf>,

    /// Pair to backtest, e.g. ETH/BTC. Defaults to the first pair in the dataset.
    #[arg(long, env = "BACKTEST_PAIR")]
    pair: Option<String>,

    /// Use the cache only; never call the exchange.
    #[arg(long)]
    offline: bool,

    /// Keep going when a strategy fails.
    #[arg(long)]
    continue_on_error: bool,

    #[arg(long, env = "BACKTEST_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let mut cfg = BacktestConfig::load(args.config.as_deref())?;
    if let Some(cache) = args.cache {
        cfg.data.cache_path = cache;
    }
    if let Some(dir) = args.results_dir {
        cfg.results_dir = dir;
    }
    if args.continue_on_error {
        cfg.failure_policy = FailurePolicy::Continue;
    }

    let dataset = if args.offline {
        load_clean_cache(&cfg.data.cache_path)
            .with_context(|| format!("no usable cache at {}", cfg.data.cache_path.display()))?
    } else {
        let provider = BinanceProvider::new(&cfg.data.api_base)?;
        let store = PriceDataStore::new(provider, &cfg.data.cache_path, cfg.data.universe.clone());
        match store
            .load_or_fetch(&cfg.data.window())
            .await
            .context("loading price data")?
        {
            DatasetOutcome::Loaded { series, source } => {
                tracing::info!(?source, rows = series.len(), "dataset ready");
                series
            }
            DatasetOutcome::Empty => {
                tracing::warn!("no data for the configured universe; nothing to run");
                return Ok(());
            }
        }
    };

    let pair = match args.pair {
        Some(p) => PairId(p),
        None => dataset
            .pairs()
            .into_iter()
            .next()
            .context("dataset has no pairs")?,
    };
    let series = dataset.for_pair(&pair);
    anyhow::ensure!(!series.is_empty(), "pair {pair} not in dataset");
    tracing::info!(%pair, bars = series.len(), "backtesting pair");

    let mut runner = BatchRunner::new(
        SignalPortfolio::new(cfg.costs.clone()),
        MetricsReporter::new(&cfg.results_dir),
    )
    .with_policy(cfg.failure_policy);
    for strategy in cfg.strategies.build() {
        runner = runner.register(strategy);
    }

    let report = runner.run(&series)?;
    println!("{}", serde_json::to_string_pretty(&report.records())?);
    if !report.failed.is_empty() {
        for f in &report.failed {
            tracing::error!(strategy = %f.strategy, error = %f.error, "strategy failed");
        }
        anyhow::bail!("{} of {} strategies failed", report.failed.len(), runner.strategy_names().len());
    }
    Ok(())
}
