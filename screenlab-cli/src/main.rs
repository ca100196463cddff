//! ScreenLab CLI — run scans, list rules, validate configuration.
//!
//! Commands:
//! - `scan` — screen a set of symbols and print or export the ranked report
//! - `rules` — list the built-in rules with their default parameters
//! - `validate` — load a scan configuration file and build its rule registry

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use screenlab_core::RuleKind;
use screenlab_runner::logging::DEFAULT_LOG_LEVEL;
use screenlab_runner::{
    init_logging, run_scan, ConsoleSink, CsvDirectoryProvider, CsvFileSink, InstrumentProvider,
    JsonFileSink, ReportSink, RetryingProvider, ScanControl, ScanFile, ScanProgress,
    SyntheticProvider, Universe,
};

#[derive(Parser)]
#[command(
    name = "screenlab",
    about = "ScreenLab CLI — rule-based daily stock screening"
)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen symbols against the configured rules.
    Scan {
        /// Scan configuration TOML. Built-in defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory of <SYMBOL>.csv files.
        #[arg(long, conflicts_with = "synthetic", required_unless_present = "synthetic")]
        data_dir: Option<PathBuf>,

        /// Use deterministic synthetic bars instead of real data.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Comma-separated symbols (e.g. AAPL,MSFT,NVDA).
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Universe TOML file with sector ticker lists.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Restrict the universe to these sectors (repeatable).
        #[arg(long, requires = "universe")]
        sector: Vec<String>,

        /// Override the minimum composite score.
        #[arg(long)]
        min_score: Option<f64>,

        /// Override the worker count.
        #[arg(long)]
        workers: Option<usize>,

        /// Write the full report as JSON.
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write ranked results as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Rows shown in the console summary.
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// List built-in rules and their default parameters.
    Rules,
    /// Validate a scan configuration file.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose { "debug" } else { DEFAULT_LOG_LEVEL });

    match cli.command {
        Commands::Scan {
            config,
            data_dir,
            synthetic,
            symbols,
            universe,
            sector,
            min_score,
            workers,
            json,
            csv,
            top,
        } => run_scan_cmd(ScanArgs {
            config,
            data_dir,
            synthetic,
            symbols,
            universe,
            sector,
            min_score,
            workers,
            json,
            csv,
            top,
        }),
        Commands::Rules => run_rules_cmd(),
        Commands::Validate { config } => run_validate_cmd(config),
    }
}

struct ScanArgs {
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    synthetic: bool,
    symbols: Vec<String>,
    universe: Option<PathBuf>,
    sector: Vec<String>,
    min_score: Option<f64>,
    workers: Option<usize>,
    json: Option<PathBuf>,
    csv: Option<PathBuf>,
    top: usize,
}

fn load_scan_file(path: Option<&PathBuf>) -> Result<ScanFile> {
    match path {
        Some(path) => ScanFile::from_file(path)
            .with_context(|| format!("invalid scan configuration {}", path.display())),
        None => Ok(ScanFile::default()),
    }
}

fn resolve_symbols(args: &ScanArgs) -> Result<BTreeSet<String>> {
    let mut symbols: BTreeSet<String> = args
        .symbols
        .iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    if let Some(path) = &args.universe {
        let universe = Universe::from_file(path)
            .with_context(|| format!("invalid universe file {}", path.display()))?;
        symbols.extend(universe.symbols(&args.sector)?);
    }

    if symbols.is_empty() {
        bail!("no symbols to scan: pass --symbols and/or --universe");
    }
    Ok(symbols)
}

fn run_scan_cmd(args: ScanArgs) -> Result<()> {
    let file = load_scan_file(args.config.as_ref())?;
    let registry = file.build_registry().context("invalid rule configuration")?;
    let symbols = resolve_symbols(&args)?;

    let mut request = file.scan_request(symbols);
    if let Some(min_score) = args.min_score {
        request.min_composite_score = min_score;
    }
    if let Some(workers) = args.workers {
        request.max_concurrency = workers;
    }

    let source: Box<dyn InstrumentProvider> = match (&args.data_dir, args.synthetic) {
        (Some(dir), false) => Box::new(CsvDirectoryProvider::new(dir)),
        (None, true) => Box::new(SyntheticProvider::default()),
        _ => bail!("exactly one of --data-dir or --synthetic is required"),
    };
    let provider = RetryingProvider::new(source, file.retry_policy());

    let control = ScanControl::new();
    let on_progress = |p: &ScanProgress| {
        tracing::debug!(completed = p.completed, total = p.total, found = p.found, "progress");
    };
    let report = run_scan(&registry, &provider, &request, &control, Some(&on_progress))?;

    let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(ConsoleSink::new(io::stdout(), args.top))];
    if let Some(path) = args.json {
        sinks.push(Box::new(JsonFileSink::new(path)));
    }
    if let Some(path) = args.csv {
        sinks.push(Box::new(CsvFileSink::new(path)));
    }
    for sink in &mut sinks {
        sink.write_report(&report)?;
    }

    Ok(())
}

fn run_rules_cmd() -> Result<()> {
    for kind in RuleKind::ALL {
        let rule = kind.create(kind.as_str());
        let defaults = kind.default_config();
        println!("{kind}");
        println!("  {}", rule.description());
        println!("  params:");
        for (key, value) in &defaults.params {
            println!("    {key:<24} {value}");
        }
        println!("  thresholds:");
        for (key, value) in &defaults.thresholds {
            println!("    {key:<24} {value}");
        }
        println!("  requires {} bars with defaults", rule.required_bars(&defaults));
        println!();
    }
    Ok(())
}

fn run_validate_cmd(config: PathBuf) -> Result<()> {
    let file = load_scan_file(Some(&config))?;
    let registry = file.build_registry().context("invalid rule configuration")?;

    println!("{}: OK", config.display());
    println!("  config hash     {}", registry.fingerprint().short());
    println!("  min score       {}", file.scan.min_composite_score);
    println!("  workers         {}", file.scan.max_concurrency);
    println!(
        "  retry           {} attempts, {} ms base, x{}",
        file.provider.retry_max_attempts, file.provider.retry_base_delay_ms, file.provider.retry_backoff
    );
    for id in registry.ids() {
        if let Some((rule, cfg)) = registry.get(id) {
            println!(
                "  rule {:<16} {:<16} weight {:<6} {}",
                id,
                rule.kind(),
                cfg.weight,
                if cfg.enabled { "enabled" } else { "disabled" }
            );
        }
    }
    Ok(())
}
