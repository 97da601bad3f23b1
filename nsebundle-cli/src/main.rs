//! nsebundle CLI: ingest, session and universe commands.
//!
//! Commands:
//! - `ingest`: fetch the configured universe and write a bundle directory
//! - `sessions`: list the sessions a calendar yields for a date range
//! - `universe`: print the configured (or default) symbol universe
//! - `init-config`: write the default NSE config as TOML
//! - `signals`: ingest in memory and print a strategy's latest target weights

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use nsebundle_core::calendar::calendar_by_name;
use nsebundle_core::config::{BundleConfig, ProviderConfig};
use nsebundle_core::data::TracingProgress;
use nsebundle_core::pipeline::{ingest, provider_from_config, IngestSummary};
use nsebundle_core::strategy::{run_sessions, StrategyKind};
use nsebundle_core::writer::{BundleWriter, MemoryWriter, ParquetBundleWriter};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nsebundle", about = "NSE daily-bar bundle ingestion")]
struct Cli {
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "nsebundle=info")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that override fields of the loaded config.
#[derive(clap::Args, Clone, Default)]
struct Overrides {
    /// Path to a TOML bundle config. Defaults to the built-in NSE config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Symbols to ingest (replaces the configured universe).
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    symbols: Option<Vec<String>>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD).
    #[arg(long)]
    end: Option<String>,

    /// Calendar name: XNSE, XBOM or 24/7.
    #[arg(long)]
    calendar: Option<String>,

    /// Read `{SYMBOL}.csv` files from this directory instead of Yahoo.
    #[arg(long)]
    csv_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the universe and write a bundle.
    Ingest {
        #[command(flatten)]
        overrides: Overrides,

        /// Bundle output directory (overrides the config).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Run everything but keep the bundle in memory.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Print the run summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List calendar sessions in a date range.
    Sessions {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Print the symbol universe.
    Universe {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Write the default NSE config to a TOML file.
    InitConfig {
        #[arg(default_value = "nsebundle.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Ingest in memory and print a strategy's target weights for the last session.
    Signals {
        #[command(flatten)]
        overrides: Overrides,

        /// equal_weight or momentum.
        #[arg(long, default_value = "momentum")]
        strategy: String,

        /// Momentum lookback in sessions.
        #[arg(long, default_value_t = 20)]
        lookback: usize,

        /// Maximum number of holdings.
        #[arg(long, default_value_t = 5)]
        top_n: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    match cli.command {
        Commands::Ingest {
            overrides,
            output,
            dry_run,
            json,
        } => run_ingest(&overrides, output, dry_run, json),
        Commands::Sessions { overrides } => run_sessions_cmd(&overrides),
        Commands::Universe { overrides } => run_universe(&overrides),
        Commands::InitConfig { path, force } => run_init_config(&path, force),
        Commands::Signals {
            overrides,
            strategy,
            lookback,
            top_n,
        } => run_signals(&overrides, &strategy, lookback, top_n),
    }
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date '{raw}'"))
}

fn load_config(overrides: &Overrides) -> Result<BundleConfig> {
    let mut config = match &overrides.config {
        Some(path) => BundleConfig::from_file(path)?,
        None => BundleConfig::default_nse(),
    };

    if let Some(symbols) = &overrides.symbols {
        config.symbol_universe = symbols.iter().map(|s| s.trim().to_uppercase()).collect();
    }
    if let Some(start) = &overrides.start {
        config.start_date = parse_date(start)?;
    }
    if let Some(end) = &overrides.end {
        config.end_date = parse_date(end)?;
    }
    if let Some(calendar) = &overrides.calendar {
        config.calendar_name = calendar.clone();
    }
    if let Some(dir) = &overrides.csv_dir {
        config.provider = ProviderConfig::Csv { dir: dir.clone() };
    }

    config.validate()?;
    Ok(config)
}

fn ingest_into(config: &BundleConfig, writer: &mut dyn BundleWriter) -> Result<IngestSummary> {
    let provider = provider_from_config(&config.provider)?;
    let calendar = calendar_by_name(&config.calendar_name, &config.holidays)?;
    Ok(ingest(
        config,
        provider.as_ref(),
        calendar.as_ref(),
        writer,
        &TracingProgress,
    )?)
}

fn run_ingest(
    overrides: &Overrides,
    output: Option<PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let mut config = load_config(overrides)?;
    if let Some(output) = output {
        config.output_dir = output;
    }

    let summary = if dry_run {
        ingest_into(&config, &mut MemoryWriter::new())?
    } else {
        ingest_into(&config, &mut ParquetBundleWriter::new(&config.output_dir))?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
        if !dry_run {
            println!("Bundle written to: {}", config.output_dir.display());
        }
    }
    Ok(())
}

fn print_summary(summary: &IngestSummary) {
    println!("=== Ingest Summary ===");
    println!("Requested:     {}", summary.requested.len());
    println!("Ingested:      {}", summary.ingested.len());
    println!("Sessions:      {}", summary.sessions);
    println!("Bar rows:      {}", summary.bar_rows);
    println!("Dropped rows:  {}", summary.dropped_rows);
    println!("Splits:        {}", summary.splits);
    println!("Dividends:     {}", summary.dividends);
    for failed in &summary.failed {
        println!("Failed:        {} ({})", failed.symbol, failed.reason);
    }
    for skipped in &summary.skipped {
        println!("Skipped:       {skipped}");
    }
}

fn run_sessions_cmd(overrides: &Overrides) -> Result<()> {
    let config = load_config(overrides)?;
    let calendar = calendar_by_name(&config.calendar_name, &config.holidays)?;
    let sessions = calendar.sessions_in_range(config.start_date, config.end_date)?;

    for session in &sessions {
        println!("{session}");
    }
    eprintln!("{} sessions on {}", sessions.len(), calendar.name());
    Ok(())
}

fn run_universe(overrides: &Overrides) -> Result<()> {
    let config = load_config(overrides)?;
    for symbol in &config.symbol_universe {
        println!("{symbol}");
    }
    Ok(())
}

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(path, BundleConfig::default_nse().to_toml()?)
        .with_context(|| format!("write {}", path.display()))?;
    println!("Config written to: {}", path.display());
    Ok(())
}

fn run_signals(overrides: &Overrides, strategy: &str, lookback: usize, top_n: usize) -> Result<()> {
    let mut kind = match strategy {
        "equal_weight" => StrategyKind::equal_weight(top_n),
        "momentum" => StrategyKind::momentum(lookback, top_n),
        _ => bail!("unknown strategy '{strategy}'. Valid: equal_weight, momentum"),
    };

    let config = load_config(overrides)?;
    let mut writer = MemoryWriter::new();
    ingest_into(&config, &mut writer)?;

    let bars: Vec<_> = writer.bars.into_values().collect();
    let Some((session, weights)) = run_sessions(&mut kind, &bars, 1.0).pop() else {
        bail!("no sessions in range");
    };

    println!("Target weights for {session}:");
    if weights.is_empty() {
        println!("  (no positions)");
    }
    for (symbol, weight) in weights.iter() {
        println!("  {symbol:<12} {:>6.2}%", weight * 100.0);
    }
    Ok(())
}
