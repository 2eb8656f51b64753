//! SetupFlow CLI: scan, level and sizing commands.
//!
//! Commands:
//! - `scan`: one pass over every configured symbol; persists setups and alerts
//! - `levels`: daily pivot levels per symbol for a date (published or recalculated)
//! - `size`: position size, leverage and risk checks for a single trade
//! - `check-config`: load and validate a runner configuration

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;

use setupflow_core::domain::Side;
use setupflow_core::risk::{validate_trade, InstrumentClass, TradeRequest};
use setupflow_core::{LifecycleEngine, PassReport};
use setupflow_runner::{
    init_logging, open_source, run_scan, write_levels_csv, JsonlStore, RunnerConfig,
};

#[derive(Parser)]
#[command(
    name = "setupflow",
    about = "SetupFlow CLI: trade setup detection, scoring and risk sizing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one pass over every configured symbol.
    Scan {
        /// Path to the runner TOML config.
        #[arg(long, default_value = "setupflow.toml")]
        config: PathBuf,

        /// Scan time (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<DateTime<FixedOffset>>,

        /// Rewrite the store log with one line per row after the pass.
        #[arg(long, default_value_t = false)]
        compact: bool,

        /// Print the full pass report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Exit non-zero if any symbol failed.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Print (or write as CSV) the daily levels of every configured symbol.
    Levels {
        #[arg(long, default_value = "setupflow.toml")]
        config: PathBuf,

        /// Trading date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Write a CSV level table here instead of printing JSON.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Size a trade and run the trade-level risk checks.
    Size {
        #[arg(long)]
        entry: f64,

        #[arg(long)]
        stop: f64,

        #[arg(long)]
        target: f64,

        #[arg(long, value_enum, default_value_t = SideArg::Long)]
        side: SideArg,

        /// Instrument class: spot, cfd or knock_out.
        #[arg(long)]
        instrument: Option<InstrumentClass>,

        /// Account balance. Defaults to the configured balance.
        #[arg(long)]
        balance: Option<f64>,

        /// Fraction of balance at risk. Defaults to the configured risk per trade.
        #[arg(long)]
        risk: Option<f64>,

        /// Runner config supplying risk settings. Built-in defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Load and validate a runner configuration.
    CheckConfig {
        #[arg(long, default_value = "setupflow.toml")]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SideArg {
    Long,
    Short,
}

impl From<SideArg> for Side {
    fn from(s: SideArg) -> Self {
        match s {
            SideArg::Long => Side::Long,
            SideArg::Short => Side::Short,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            config,
            at,
            compact,
            json,
            strict,
        } => run_scan_cmd(config, at, compact, json, strict),
        Commands::Levels { config, date, out } => run_levels(config, date, out),
        Commands::Size {
            entry,
            stop,
            target,
            side,
            instrument,
            balance,
            risk,
            config,
        } => run_size(entry, stop, target, side.into(), instrument, balance, risk, config),
        Commands::CheckConfig { config } => run_check_config(config),
    }
}

fn load_config(path: &Path) -> Result<RunnerConfig> {
    RunnerConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))
}

fn run_scan_cmd(
    config_path: PathBuf,
    at: Option<DateTime<FixedOffset>>,
    compact: bool,
    json: bool,
    strict: bool,
) -> Result<()> {
    let cfg = load_config(&config_path)?;
    init_logging(&cfg.logging)?;

    let now = at.map_or_else(Utc::now, |t| t.with_timezone(&Utc));

    info!(config = %config_path.display(), symbols = cfg.symbols.len(), %now, "starting scan");
    let report = run_scan(&cfg, now)?;
    if compact {
        let store = JsonlStore::open(&cfg.output.store_path)?;
        store.compact()?;
        info!(path = %store.path().display(), "store compacted");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if strict && !report.failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(report: &PassReport) {
    println!(
        "{:<10} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}",
        "symbol", "candles", "alerts", "setups", "active", "filled", "stopped"
    );
    for s in &report.symbols {
        println!(
            "{:<10} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}",
            s.symbol,
            s.candles,
            s.alerts_created,
            s.setups_created,
            s.setups_activated,
            s.setups_filled,
            s.setups_stopped
        );
    }
    for f in &report.failures {
        eprintln!("FAILED {}: {}", f.symbol, f.error);
    }
    println!(
        "{} symbol(s), {} alert(s), {} new setup(s), {} failure(s)",
        report.symbols.len(),
        report.alerts_created(),
        report.setups_created(),
        report.failures.len()
    );
}

fn run_levels(config_path: PathBuf, date: Option<NaiveDate>, out: Option<PathBuf>) -> Result<()> {
    let cfg = load_config(&config_path)?;
    init_logging(&cfg.logging)?;

    let date = date.unwrap_or_else(|| Utc::now().date_naive());

    let source = open_source(&cfg)?;
    let mut table = Vec::new();
    for symbol in &cfg.symbols {
        match source.daily_levels(symbol, date) {
            Ok(Some(levels)) => table.push(levels),
            Ok(None) => eprintln!("{symbol}: no prior session before {date}"),
            Err(e) => eprintln!("{symbol}: {e}"),
        }
    }

    match out {
        Some(path) => {
            write_levels_csv(&path, &table)?;
            println!("Wrote {} level row(s) to {}", table.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&table)?),
    }
    if table.is_empty() {
        bail!("no levels for {date}");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_size(
    entry: f64,
    stop: f64,
    target: f64,
    side: Side,
    instrument: Option<InstrumentClass>,
    balance: Option<f64>,
    risk: Option<f64>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut risk_cfg = match &config_path {
        Some(path) => load_config(path)?.engine.risk,
        None => Default::default(),
    };
    if let Some(b) = balance {
        risk_cfg.account_balance = b;
    }
    risk_cfg.validate()?;

    let mut req = TradeRequest::new("", side, entry, stop, target);
    req.instrument = instrument;
    req.risk_fraction = risk;

    let report = validate_trade(&req, &risk_cfg);
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_valid {
        std::process::exit(1);
    }
    Ok(())
}

fn run_check_config(config_path: PathBuf) -> Result<()> {
    let cfg = load_config(&config_path)?;
    let engine = LifecycleEngine::new(cfg.engine.clone())?;

    println!("Config OK: {}", config_path.display());
    println!(
        "  symbols:    {} ({})",
        cfg.symbols.len(),
        cfg.symbols.join(", ")
    );
    println!("  timeframe:  {}", cfg.timeframe);
    println!("  lookback:   {}h", cfg.lookback_hours);
    println!("  source:     {:?}", cfg.data.source);
    println!("  store:      {}", cfg.output.store_path.display());
    println!("  strategies:");
    for s in engine.strategies().enabled() {
        println!(
            "    {:<16} {:?} priority {} threshold {:.2}",
            s.id.as_str(),
            s.kind,
            u8::from(s.priority),
            cfg.engine.threshold_for(s)
        );
    }
    Ok(())
}
