//! Coin signals - main entry point
//!
//! This binary provides two subcommands:
//! - evaluate: Run the signal pipeline on candle JSON files
//! - check-exits: Evaluate exit conditions for a stored position

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coin_signals::config::AppConfig;
use coin_signals::exits::check_exit_conditions;
use coin_signals::pipeline::{evaluate, EvaluationContext, MultiTimeframeCandles};
use coin_signals::types::{PositionState, Symbol};

#[derive(Parser, Debug)]
#[command(name = "coin-signals")]
#[command(about = "Crypto signal generation and risk-sizing pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate an asset and print the resulting signal as JSON
    Evaluate {
        /// Asset symbol, e.g. "BTC"
        #[arg(short, long)]
        symbol: String,

        /// Path to daily candle JSON (array of rows or keyed objects)
        #[arg(long)]
        daily: String,

        /// Path to 4h candle JSON
        #[arg(long)]
        h4: String,

        /// Path to 1h candle JSON (primary timeframe)
        #[arg(long)]
        h1: String,

        /// Path to configuration file; defaults apply when omitted
        #[arg(short, long)]
        config: Option<String>,

        /// Path to an open-position JSON for this symbol
        #[arg(short, long)]
        position: Option<String>,
    },

    /// Check exit conditions for a position at a given price
    CheckExits {
        /// Path to position JSON
        #[arg(short, long)]
        position: String,

        /// Current market price
        #[arg(long)]
        price: f64,

        /// Path to configuration file; defaults apply when omitted
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();

    Ok(())
}

fn load_config(path: Option<&str>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_file(path),
        None => Ok(AppConfig::default()),
    }
}

fn read_json(path: &str) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {path} as JSON"))
}

fn run_evaluate(
    symbol: String,
    daily: String,
    h4: String,
    h1: String,
    config: Option<String>,
    position: Option<String>,
) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let symbol = Symbol::new(symbol);

    let position: Option<PositionState> = match position {
        Some(path) => {
            let raw = read_json(&path)?;
            Some(
                serde_json::from_value(raw)
                    .with_context(|| format!("failed to parse position from {path}"))?,
            )
        }
        None => None,
    };

    let mut ctx = EvaluationContext::new();
    let candles = MultiTimeframeCandles::from_json(
        &symbol,
        &read_json(&daily)?,
        &read_json(&h4)?,
        &read_json(&h1)?,
        &mut ctx,
    );

    let signal = evaluate(
        symbol,
        &candles,
        &config.risk,
        position.as_ref(),
        &mut ctx,
    );

    for warning in &ctx.warnings {
        info!(symbol = %warning.symbol, "{}", warning.message);
    }
    println!("{}", serde_json::to_string_pretty(&signal)?);
    Ok(())
}

fn run_check_exits(position: String, price: f64, config: Option<String>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let raw = read_json(&position)?;
    let position: PositionState = serde_json::from_value(raw)
        .with_context(|| "failed to parse position JSON")?;

    let now_ms = chrono::Utc::now().timestamp_millis();
    match check_exit_conditions(&position, price, &config.exits, now_ms) {
        Some(condition) => println!("{}", serde_json::to_string_pretty(&condition)?),
        None => println!("null"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Evaluate {
            symbol,
            daily,
            h4,
            h1,
            config,
            position,
        } => run_evaluate(symbol, daily, h4, h1, config, position),

        Commands::CheckExits {
            position,
            price,
            config,
        } => run_check_exits(position, price, config),
    }
}
