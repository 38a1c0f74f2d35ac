//! Papertrade CLI — run, batch, and config commands.
//!
//! Commands:
//! - `run` — run one session on a simulated clock (or `--live` on the wall clock)
//! - `batch` — run the same config over many seeds in parallel
//! - `config init` — write a default session config
//! - `config check` — validate a config and print its session id

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use papertrade_core::config::SignalSourceKind;
use papertrade_core::{OperatingMode, StepOutput};
use papertrade_runner::export::{export_batch_csv, write_json};
use papertrade_runner::{
    run_batch, seed_range, spawn_session, PerformanceSummary, SeedOutcome, Session, SessionConfig,
    SessionEvent, SessionReport,
};

#[derive(Parser)]
#[command(
    name = "papertrade",
    about = "Papertrade CLI — simulated BTC candles, indicator signals, paper trading"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    DataCollection,
    Prediction,
    PaperTrading,
}

impl From<ModeArg> for OperatingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::DataCollection => OperatingMode::DataCollection,
            ModeArg::Prediction => OperatingMode::Prediction,
            ModeArg::PaperTrading => OperatingMode::PaperTrading,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Rules,
    SimulatedExternal,
}

impl From<SourceArg> for SignalSourceKind {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Rules => SignalSourceKind::Rules,
            SourceArg::SimulatedExternal => SignalSourceKind::SimulatedExternal,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one session and print its performance summary.
    Run {
        /// Path to a TOML session config. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of steps (overrides the config).
        #[arg(long)]
        steps: Option<u64>,

        /// Master seed (overrides the config).
        #[arg(long)]
        seed: Option<u64>,

        /// Operating mode (overrides the config).
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Signal source (overrides the config).
        #[arg(long, value_enum)]
        source: Option<SourceArg>,

        /// Step against the wall clock at the configured tick interval.
        #[arg(long, default_value_t = false)]
        live: bool,

        /// Disable the CSV market and trade logs.
        #[arg(long, default_value_t = false)]
        no_journal: bool,

        /// Write the session report as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run one session per seed in parallel.
    Batch {
        /// Path to a TOML session config. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// First seed.
        #[arg(long, default_value_t = 1)]
        base_seed: u64,

        /// Number of seeds.
        #[arg(long, default_value_t = 8)]
        runs: usize,

        /// Write per-seed results as CSV to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Config file commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default session config.
    Init {
        #[arg(default_value = "papertrade.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Validate a session config and print its session id.
    Check { path: PathBuf },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            steps,
            seed,
            mode,
            source,
            live,
            no_journal,
            report,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(steps) = steps {
                cfg.steps = steps;
            }
            if let Some(seed) = seed {
                cfg.pipeline.seed = seed;
            }
            if let Some(mode) = mode {
                cfg.pipeline.mode = mode.into();
            }
            if let Some(source) = source {
                cfg.pipeline.signal.source = source.into();
            }
            if no_journal {
                cfg.journal.enabled = false;
            }
            run_cmd(cfg, live, report.as_deref())
        }
        Commands::Batch {
            config,
            base_seed,
            runs,
            output,
        } => {
            let cfg = load_config(config.as_deref())?;
            batch_cmd(&cfg, base_seed, runs, output.as_deref())
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => config_init(&path, force),
            ConfigAction::Check { path } => config_check(&path),
        },
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default: info for our crates).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn,papertrade_core=info,papertrade_runner=info,papertrade=info")
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(SessionConfig::default()),
    }
}

fn run_cmd(cfg: SessionConfig, live: bool, report_path: Option<&Path>) -> Result<()> {
    if live && cfg.steps == 0 {
        info!("live session without a step limit; interrupt to stop");
    }
    if !live && cfg.steps == 0 {
        bail!("--steps must be > 0 for a simulated run");
    }
    let session = Session::new(cfg).context("failed to create session")?;
    let report = if live {
        run_live(session)?
    } else {
        session.run().context("session failed")?
    };

    print_report(&report);
    if let Some(path) = report_path {
        write_json(&report, path)?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn run_live(session: Session) -> Result<SessionReport> {
    let handle = spawn_session(session)?;
    for event in handle.events().iter() {
        match event {
            SessionEvent::Step(out) => {
                for line in step_lines(&out) {
                    println!("{line}");
                }
            }
            SessionEvent::Finished(report) => return Ok(*report),
            SessionEvent::Failed { error } => bail!("session failed: {error}"),
        }
    }
    bail!("session worker exited without a report")
}

/// Console lines for one live step: the fresh signal, then each settlement.
fn step_lines(out: &StepOutput) -> Vec<String> {
    let mut lines = Vec::new();
    let at = out.at.format("%H:%M:%S");
    if out.fresh_signal {
        if let Some(signal) = out.signal.as_ref() {
            lines.push(format!(
                "{at}  {:>10.2}  {:<8} {:>5.1}%  ({})",
                out.tick.price,
                signal.direction.to_string(),
                signal.confidence,
                signal.origin.as_str()
            ));
        }
    }
    for p in &out.settled {
        lines.push(format!(
            "{at}  settled {}  {}  pnl {:+.2}  balance {:.2}",
            p.id,
            p.status.as_str(),
            p.pnl.unwrap_or(0.0),
            out.account.balance
        ));
    }
    lines
}

fn batch_cmd(cfg: &SessionConfig, base_seed: u64, runs: usize, output: Option<&Path>) -> Result<()> {
    if runs == 0 {
        bail!("--runs must be > 0");
    }
    if cfg.steps == 0 {
        bail!("batch runs need steps > 0");
    }
    let seeds = seed_range(base_seed, runs);
    let outcomes = run_batch(cfg, &seeds).context("batch failed")?;
    print_batch(&outcomes);

    if let Some(path) = output {
        let csv = export_batch_csv(&outcomes)?;
        std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Batch results saved to: {}", path.display());
    }
    Ok(())
}

fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (pass --force to overwrite)", path.display());
    }
    let text = SessionConfig::default().to_toml_string()?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn config_check(path: &Path) -> Result<()> {
    let cfg = SessionConfig::from_file(path)
        .with_context(|| format!("invalid config {}", path.display()))?;
    println!("Config OK: {}", path.display());
    println!("Session id: {}", cfg.session_id()?);
    println!("Mode:       {:?}", cfg.pipeline.mode);
    println!("Source:     {:?}", cfg.pipeline.signal.source);
    println!("Seed:       {}", cfg.pipeline.seed);
    let start = cfg
        .start_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "wall clock".into());
    println!("Start:      {start}");
    Ok(())
}

fn print_report(report: &SessionReport) {
    println!();
    println!("=== Session Report ===");
    println!("Session:        {}", &report.session_id[..12.min(report.session_id.len())]);
    println!("Seed:           {}", report.seed);
    println!("Steps:          {}", report.steps);
    println!("Candles:        {}", report.candles_sealed);
    println!();
    print_summary(&report.summary);
    println!();
}

fn print_summary(s: &PerformanceSummary) {
    println!("--- Performance ---");
    println!("Settled:        {}", s.total_settled);
    println!("Wins/Losses:    {} / {}", s.wins, s.losses);
    println!("Neutral:        {}", s.neutrals);
    println!("Still open:     {}", s.still_open);
    println!("Win Rate:       {:.1}%", s.win_rate * 100.0);
    println!("Net PnL:        {:+.2}", s.net_pnl);
    println!(
        "Balance:        {:.2} -> {:.2} ({:+.2}%)",
        s.starting_balance,
        s.current_balance,
        s.return_pct()
    );
}

fn print_batch(outcomes: &[SeedOutcome]) {
    println!();
    println!(
        "{:<8} {:>8} {:>6} {:>6} {:>9} {:>12}",
        "Seed", "Settled", "Wins", "Losses", "Win Rate", "Net PnL"
    );
    println!("{}", "-".repeat(54));
    for o in outcomes {
        let s = &o.summary;
        println!(
            "{:<8} {:>8} {:>6} {:>6} {:>8.1}% {:>+12.2}",
            o.seed,
            s.total_settled,
            s.wins,
            s.losses,
            s.win_rate * 100.0,
            s.net_pnl
        );
    }
    let total: f64 = outcomes.iter().map(|o| o.summary.net_pnl).sum();
    println!("{}", "-".repeat(54));
    println!("Mean net PnL: {:+.2}", total / outcomes.len() as f64);
}
