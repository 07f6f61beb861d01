//! Grid controller - main entry point
//!
//! Two subcommands:
//! - run: start the controller poll loop (dry-run unless --live)
//! - signal: publish a trading signal into the channel by hand

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use grid_bot::Direction;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "grid-bot")]
#[command(about = "Signal-driven grid trading controller for Binance USDT-M futures", long_about = None)]
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
    /// Run the controller poll loop
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.json")]
        config: String,

        /// Arm live trading (CAUTION - REAL MONEY!). Default is dry run.
        #[arg(long)]
        live: bool,

        /// Poll interval in seconds (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Publish a trading signal into the channel
    Signal {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.json")]
        config: String,

        /// Trading pair (defaults to the configured symbol)
        #[arg(short, long)]
        pair: Option<String>,

        /// Signal direction
        #[arg(short, long, value_enum)]
        direction: DirectionArg,

        /// Timeframe label (defaults to the configured timeframe)
        #[arg(short, long)]
        timeframe: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum DirectionArg {
    Long,
    Short,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Long => Direction::Long,
            DirectionArg::Short => Direction::Short,
        }
    }
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy HTTP stack crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Run { .. } => "run",
        Commands::Signal { .. } => "signal",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Run {
            config,
            live,
            interval,
        } => commands::run::run(config, live, interval),

        Commands::Signal {
            config,
            pair,
            direction,
            timeframe,
        } => commands::signal::run(config, pair, direction.into(), timeframe),
    }
}
