//! perpsignal CLI — recommend, simulate, and rank commands.
//!
//! Commands:
//! - `recommend` — build one recommendation from a JSON market snapshot,
//!   optionally driven by a prompt such as `"BTC --objective 10 --simulate"`
//! - `simulate` — replay a paper trade against CSV candles
//! - `rank` — scan a directory of snapshots and list the best setups
//!
//! Logs go to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use perpsignal_core::{
    evaluate_paper_trade, parse_trading_input, parse_trading_symbol, Candle, EngineConfig,
    Horizon, Interval, LevelMode, ObjectivePlan, ObjectiveTarget, PaperTrade, PositionSizing,
    Recommendation, RecommendationEngine, SimulationOutcome, TradingInput,
};
use perpsignal_runner::{
    load_candles_csv, MarketSnapshot, OpportunityRanker, RankReport, RankRequest,
    SnapshotGenerator,
};

#[derive(Parser)]
#[command(
    name = "perpsignal",
    about = "perpsignal CLI — perpetual-futures trade recommendations"
)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a recommendation from a market snapshot file.
    Recommend {
        /// JSON market snapshot (last price, indicators, perp context, optional bias).
        #[arg(long)]
        snapshot: PathBuf,

        /// Pair or base symbol (e.g., BTC-USD or BTC). Defaults to the snapshot's perp symbol.
        #[arg(long)]
        pair: Option<String>,

        /// Trading prompt: `<SYMBOL> [-i] [--manual-levels] [--simulate]
        /// [--objective <USDC> | --horizon <DURATION>]`.
        #[arg(long, conflicts_with_all = ["pair", "objective", "horizon"])]
        prompt: Option<String>,

        /// Leverage multiplier (requires --size).
        #[arg(long)]
        leverage: Option<f64>,

        /// Margin in USD (requires --leverage).
        #[arg(long)]
        size: Option<f64>,

        /// Daily PnL target in USD. Defaults to the config value.
        #[arg(long)]
        daily_target: Option<f64>,

        #[command(flatten)]
        levels: LevelArgs,

        /// Base candle interval for objective targeting.
        #[arg(long, default_value = "1m")]
        interval: Interval,

        /// Path to a TOML engine config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Replay a trade against historical candles.
    Simulate {
        /// JSON paper trade or recommendation.
        #[arg(long)]
        trade: PathBuf,

        /// CSV candles (timestamp,open,high,low,close,volume).
        #[arg(long)]
        candles: PathBuf,

        /// Open time in epoch milliseconds. Required for recommendation files.
        #[arg(long)]
        opened_at: Option<i64>,

        /// Window length after the open.
        #[arg(long, conflicts_with = "horizon_end")]
        horizon_minutes: Option<u32>,

        /// Window end in epoch milliseconds.
        #[arg(long)]
        horizon_end: Option<i64>,

        /// Print JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Rank symbols by estimated positive-PnL probability.
    Rank {
        /// Directory holding one <SYMBOL>.json snapshot per symbol.
        #[arg(long)]
        snapshot_dir: PathBuf,

        /// Comma-separated base symbols. Defaults to the built-in scan list.
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Candle interval.
        #[arg(long, default_value = "1m")]
        interval: Interval,

        /// Higher-timeframe bias interval.
        #[arg(long, default_value = "15m")]
        bias_interval: Interval,

        /// Number of actionable setups to keep.
        #[arg(long, default_value_t = 5)]
        top: usize,

        /// Scan symbols in parallel.
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Path to a TOML engine config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Stop-loss/take-profit selection. At most one family may be used.
#[derive(Args)]
struct LevelArgs {
    /// Stop-loss distance in percent of entry.
    #[arg(long)]
    sl_pct: Option<f64>,

    /// Take-profit distance in percent of entry.
    #[arg(long)]
    tp_pct: Option<f64>,

    /// Stop-loss distance in USD per unit.
    #[arg(long)]
    sl_usd: Option<f64>,

    /// Take-profit distance in USD per unit.
    #[arg(long)]
    tp_usd: Option<f64>,

    /// USDC profit objective on the notional (requires --leverage and --size).
    #[arg(long)]
    objective: Option<f64>,

    /// Holding horizon in minutes (requires --leverage and --size).
    #[arg(long)]
    horizon: Option<Horizon>,
}

impl LevelArgs {
    fn into_mode(self, base_interval: Interval) -> Result<LevelMode> {
        let percent = self.sl_pct.is_some() || self.tp_pct.is_some();
        let usd = self.sl_usd.is_some() || self.tp_usd.is_some();
        let target = ObjectiveTarget::from_options(self.objective, self.horizon)?;

        let families = [percent, usd, target.is_some()];
        if families.iter().filter(|used| **used).count() > 1 {
            bail!("Use only one of --sl-pct/--tp-pct, --sl-usd/--tp-usd, or --objective/--horizon.");
        }

        let mode = if percent {
            LevelMode::Percent {
                stop_loss_pct: self.sl_pct,
                take_profit_pct: self.tp_pct,
            }
        } else if usd {
            LevelMode::Usd {
                stop_loss_usd: self.sl_usd,
                take_profit_usd: self.tp_usd,
            }
        } else if let Some(target) = target {
            LevelMode::Objective {
                target,
                base_interval,
            }
        } else {
            LevelMode::Atr
        };
        mode.validate()?;
        Ok(mode)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Recommend {
            snapshot,
            pair,
            prompt,
            leverage,
            size,
            daily_target,
            levels,
            interval,
            config,
            json,
        } => {
            let sizing = match (leverage, size) {
                (Some(leverage), Some(size)) => Some(PositionSizing::new(leverage, size)?),
                (None, None) => None,
                _ => bail!("--leverage and --size must be given together"),
            };
            let mode = levels.into_mode(interval)?;
            let settings = match prompt {
                Some(raw) => {
                    let input = parse_trading_input(&raw)?;
                    RecommendSettings::from_prompt(&input, sizing, daily_target, mode, interval)?
                }
                None => RecommendSettings {
                    pair,
                    sizing,
                    daily_target,
                    mode,
                    paper_trade: false,
                },
            };
            run_recommend(&snapshot, &settings, config.as_deref(), json)
        }
        Commands::Simulate {
            trade,
            candles,
            opened_at,
            horizon_minutes,
            horizon_end,
            json,
        } => run_simulate(&trade, &candles, opened_at, horizon_minutes, horizon_end, json),
        Commands::Rank {
            snapshot_dir,
            symbols,
            interval,
            bias_interval,
            top,
            parallel,
            config,
            json,
        } => {
            let symbols = symbols
                .iter()
                .map(|s| parse_trading_symbol(s))
                .collect::<Result<Vec<_>, _>>()?;
            let req = RankRequest {
                symbols,
                interval,
                bias_interval: Some(bias_interval),
                top,
            };
            run_rank(snapshot_dir, &req, parallel, config.as_deref(), json)
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_engine(config: Option<&Path>) -> Result<RecommendationEngine> {
    let config = match config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    info!(fingerprint = %config.fingerprint(), "engine config ready");
    Ok(RecommendationEngine::new(config))
}

/// Normalizes `BTC`, `btc-usd` or a perp symbol like `BTC_USDC_PERP` to `BTC-USD`.
fn resolve_pair(raw: &str) -> Result<String> {
    let base = raw.split(|c| c == '-' || c == '_').next().unwrap_or(raw);
    Ok(format!("{}-USD", parse_trading_symbol(base)?))
}

/// Everything `recommend` needs besides the snapshot and config.
#[derive(Debug, Clone, PartialEq)]
struct RecommendSettings {
    pair: Option<String>,
    sizing: Option<PositionSizing>,
    daily_target: Option<f64>,
    mode: LevelMode,
    /// Open a paper trade at the current time when the result is actionable.
    paper_trade: bool,
}

impl RecommendSettings {
    /// Merges a parsed prompt with the level and sizing flags.
    ///
    /// `-i` needs explicit sizing and `--manual-levels` needs a percent or
    /// USD level family. A prompt objective or horizon selects objective mode.
    fn from_prompt(
        input: &TradingInput,
        sizing: Option<PositionSizing>,
        daily_target: Option<f64>,
        mode: LevelMode,
        base_interval: Interval,
    ) -> Result<Self> {
        if input.full_interactive && sizing.is_none() {
            bail!("-i needs --leverage and --size");
        }
        let manual = matches!(mode, LevelMode::Percent { .. } | LevelMode::Usd { .. });
        if input.manual_levels && !manual {
            bail!("--manual-levels needs --sl-pct/--tp-pct or --sl-usd/--tp-usd");
        }

        let mode = match ObjectiveTarget::from_options(input.objective_usdc, input.objective_horizon)? {
            Some(_) if manual => {
                bail!("Use only one of --sl-pct/--tp-pct, --sl-usd/--tp-usd, or --objective/--horizon.")
            }
            Some(target) => LevelMode::Objective {
                target,
                base_interval,
            },
            None => mode,
        };

        Ok(Self {
            pair: Some(input.pair()),
            sizing,
            daily_target,
            mode,
            paper_trade: input.run_simulation,
        })
    }
}

/// A recommendation plus the paper trade opened from it, if any.
#[derive(Serialize)]
struct RecommendOutput {
    #[serde(flatten)]
    recommendation: Recommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    paper_trade: Option<PaperTrade>,
}

fn build_recommendation(
    snapshot_path: &Path,
    settings: &RecommendSettings,
    config: Option<&Path>,
) -> Result<RecommendOutput> {
    let engine = load_engine(config)?;
    let snapshot = MarketSnapshot::from_file(snapshot_path)?;
    let pair = resolve_pair(settings.pair.as_deref().unwrap_or(&snapshot.perp.symbol))?;
    debug!(%pair, mode = ?settings.mode, "building recommendation");

    let mut req = snapshot.build_request(pair).with_mode(settings.mode);
    if let Some(sizing) = settings.sizing {
        req = req.with_sizing(sizing);
    }
    if let Some(target) = settings.daily_target {
        req = req.with_daily_target(target);
    }
    let recommendation = engine.build(&req)?;

    let paper_trade = if settings.paper_trade && recommendation.is_actionable() {
        Some(PaperTrade::from_recommendation(
            &recommendation,
            Utc::now().timestamp_millis(),
        )?)
    } else {
        if settings.paper_trade {
            info!(pair = %recommendation.pair, "no paper trade for a NO_TRADE result");
        }
        None
    };

    Ok(RecommendOutput {
        recommendation,
        paper_trade,
    })
}

fn run_recommend(
    snapshot_path: &Path,
    settings: &RecommendSettings,
    config: Option<&Path>,
    json: bool,
) -> Result<()> {
    let output = build_recommendation(snapshot_path, settings, config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_recommendation(&output.recommendation);
        if let Some(trade) = &output.paper_trade {
            println!("--- Paper Trade ---");
            print_trade_lines(trade);
            println!();
        }
    }
    Ok(())
}

/// A trade file holds either a ready paper trade or a recommendation.
#[derive(Deserialize)]
#[serde(untagged)]
enum TradeFile {
    Paper(PaperTrade),
    Recommendation(Box<Recommendation>),
}

#[derive(Serialize)]
struct SimulationReport {
    trade: PaperTrade,
    horizon_end_ms: i64,
    candle_count: usize,
    first_candle: Option<DateTime<Utc>>,
    last_candle: Option<DateTime<Utc>>,
    outcome: SimulationOutcome,
}

fn run_simulate(
    trade_path: &Path,
    candles_path: &Path,
    opened_at: Option<i64>,
    horizon_minutes: Option<u32>,
    horizon_end: Option<i64>,
    json: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(trade_path)
        .with_context(|| format!("reading trade {}", trade_path.display()))?;
    let parsed: TradeFile = serde_json::from_str(&content).with_context(|| {
        format!(
            "parsing trade {} as a paper trade or recommendation",
            trade_path.display()
        )
    })?;

    // A recommendation's objective plan supplies a default window.
    let (trade, plan_minutes) = match parsed {
        TradeFile::Paper(mut trade) => {
            if let Some(opened_at) = opened_at {
                trade.opened_at_ms = opened_at;
            }
            (trade, None)
        }
        TradeFile::Recommendation(rec) => {
            let Some(opened_at) = opened_at else {
                bail!("--opened-at is required when simulating a recommendation");
            };
            let trade = PaperTrade::from_recommendation(&rec, opened_at)?;
            (trade, rec.objective.as_ref().map(|plan| plan.horizon_minutes))
        }
    };

    let horizon_end_ms = match (horizon_end, horizon_minutes.or(plan_minutes)) {
        (Some(end), _) => end,
        (None, Some(minutes)) => trade.horizon_end_ms(minutes),
        (None, None) => bail!("Specify --horizon-minutes or --horizon-end"),
    };
    if horizon_end_ms <= trade.opened_at_ms {
        bail!("Horizon end must be after the open time");
    }

    let candles = load_candles_csv(candles_path)?;
    debug!(count = candles.len(), "candles loaded");
    let outcome = evaluate_paper_trade(&trade, &candles, horizon_end_ms)?;
    info!(status = ?outcome.status, exit = ?outcome.exit_kind, "simulation finished");

    let report = SimulationReport {
        trade,
        horizon_end_ms,
        candle_count: candles.len(),
        first_candle: candles.iter().min_by_key(|c| c.timestamp).and_then(Candle::datetime),
        last_candle: candles.iter().max_by_key(|c| c.timestamp).and_then(Candle::datetime),
        outcome,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_simulation(&report);
    }
    Ok(())
}

fn run_rank(
    snapshot_dir: PathBuf,
    req: &RankRequest,
    parallel: bool,
    config: Option<&Path>,
    json: bool,
) -> Result<()> {
    if !snapshot_dir.is_dir() {
        bail!("Snapshot directory not found: {}", snapshot_dir.display());
    }
    let engine = load_engine(config)?;
    let ranker =
        OpportunityRanker::new(SnapshotGenerator::new(snapshot_dir, engine)).with_parallelism(parallel);
    let report = ranker.rank(req);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_rank(&report);
    }
    Ok(())
}

fn fmt_optional_usd(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("${v:.2}"))
}

fn fmt_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn fmt_timestamp(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms).map_or_else(|| ms.to_string(), fmt_datetime)
}

fn objective_lines(plan: &ObjectivePlan) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Objective:      ${:.2} on ${:.2} notional",
            plan.objective_usdc, plan.notional_usd
        ),
        format!("Horizon:        {} ({} candles)", plan.horizon, plan.horizon_candles),
        format!("Target TP:      {:.4}%", plan.target_tp_pct),
        format!("Target SL:      {:.4}%", plan.target_sl_pct),
        format!("Plan R/R:       {:.2}", plan.risk_reward),
        format!("Time Stop:      {}", plan.time_stop_rule),
    ];
    if let Some(warning) = &plan.plausibility_warning {
        lines.push(format!("WARNING: {warning}"));
    }
    lines
}

fn print_recommendation(rec: &Recommendation) {
    println!();
    println!("=== {} ===", rec.pair);
    println!("Action:         {}", rec.action);
    println!("Confidence:     {}%", rec.confidence);
    println!("Regime:         {}", rec.regime);
    println!();
    println!("--- Levels ---");
    println!("Entry:          {}", rec.entry);
    println!("Stop Loss:      {}", rec.stop_loss);
    println!("Take Profit:    {}", rec.take_profit);
    println!("Risk/Reward:    {:.2}", rec.risk_reward_ratio);
    if let (Some(leverage), Some(size)) = (rec.leverage, rec.position_size_usd) {
        println!();
        println!("--- Position ---");
        println!("Leverage:       {leverage}x");
        println!("Margin:         ${size:.2}");
        println!("PnL @ SL:       {}", fmt_optional_usd(rec.estimated_pnl_at_stop_loss));
        println!("PnL @ TP:       {}", fmt_optional_usd(rec.estimated_pnl_at_take_profit));
    }
    println!("Daily Target:   ${:.2}", rec.daily_target_usd);
    if let Some(trades) = rec.trades_to_daily_target {
        println!("Trades Needed:  {trades}");
    }
    if let Some(plan) = &rec.objective {
        println!();
        println!("--- Objective ---");
        for line in objective_lines(plan) {
            println!("{line}");
        }
    }
    println!();
    println!("--- Perp ---");
    println!("Symbol:         {}", rec.perp.symbol);
    println!("Funding:        {:.6} (avg {:.6})", rec.perp.funding_rate, rec.perp.funding_rate_avg);
    println!("Premium:        {:.4}%", rec.perp.premium_pct);
    println!("Mark / Index:   {} / {}", rec.perp.mark_price, rec.perp.index_price);
    println!("Open Interest:  {}", rec.perp.open_interest);
    println!();
    println!("--- Rationale ---");
    for line in &rec.rationale {
        println!("- {line}");
    }
    println!();
}

fn print_trade_lines(trade: &PaperTrade) {
    println!("Direction:      {}", trade.direction);
    println!("Entry:          {}", trade.entry);
    println!("Stop Loss:      {}", trade.stop_loss);
    println!("Take Profit:    {}", trade.take_profit);
    println!("Opened:         {}", fmt_timestamp(trade.opened_at_ms));
}

fn print_simulation(report: &SimulationReport) {
    let outcome = &report.outcome;
    println!();
    println!("=== Paper Trade ===");
    print_trade_lines(&report.trade);
    println!("Window End:     {}", fmt_timestamp(report.horizon_end_ms));
    println!("Candles:        {}", report.candle_count);
    if let (Some(first), Some(last)) = (report.first_candle, report.last_candle) {
        println!("Candle Span:    {} .. {}", fmt_datetime(first), fmt_datetime(last));
    }
    println!();
    println!("--- Outcome ---");
    println!("Status:         {:?}", outcome.status);
    println!("Exit:           {:?} @ {}", outcome.exit_kind, outcome.exit_price);
    println!("PnL:            {:.4}%", outcome.pnl_pct);
    println!("Reason:         {}", outcome.reason);
    println!();
}

fn print_rank(report: &RankReport) {
    println!();
    println!(
        "=== Top {} of {} scanned ===",
        report.ranked.len(),
        report.scanned_symbols
    );
    if report.ranked.is_empty() {
        println!("No actionable setups.");
    }
    for (i, opp) in report.ranked.iter().enumerate() {
        let rec = &opp.recommendation;
        println!(
            "{:>2}. {:<10} {:<6} P(+PnL) {:>3}%  conf {:>3}%  R/R {:.2}  entry {}  SL {}  TP {}",
            i + 1,
            opp.pair,
            rec.action,
            opp.probability_positive_pnl,
            rec.confidence,
            rec.risk_reward_ratio,
            rec.entry,
            rec.stop_loss,
            rec.take_profit,
        );
    }
    if !report.skipped.is_empty() {
        println!();
        println!("--- Skipped ---");
        for skip in &report.skipped {
            println!("{:<6} {}", skip.symbol, skip.reason);
        }
    }
    println!();
}
