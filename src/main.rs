use anyhow::Result;
use callpace::config::Config;
use callpace::config_validator::ConfigValidator;
use callpace::{debounce, throttle, MonotonicClock, Ticker, TokioScheduler};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "callpace", version, about = "Debounce, throttle and tick stdin-driven events")]
struct Cli {
    /// Log level, overriding CALLPACE_LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Read configuration from a JSON file instead of the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Echo a stdin line once input has been quiet for the delay
    Debounce {
        #[arg(long, value_parser = parse_duration)]
        delay: Option<Duration>,
    },
    /// Echo stdin lines, at most one per interval
    Throttle {
        #[arg(long, value_parser = parse_duration)]
        interval: Option<Duration>,
    },
    /// Print a counter once per interval
    Ticker {
        #[arg(long, value_parser = parse_duration)]
        interval: Option<Duration>,

        /// Stop after this many ticks
        #[arg(long, default_value_t = 5)]
        ticks: u64,
    },
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    ConfigValidator::parse_duration("duration", raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_json(&std::fs::read_to_string(path)?)
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?,
        None => Config::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?,
    };
    if let Some(level) = cli.log_level {
        config.log_level = level.to_lowercase();
    }
    config.validate()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("callpace={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Debounce { delay } => run_debounce(delay.unwrap_or(config.debounce_delay)).await,
        Command::Throttle { interval } => {
            run_throttle(interval.unwrap_or(config.throttle_interval)).await
        }
        Command::Ticker { interval, ticks } => {
            run_ticker(interval.unwrap_or(config.tick_interval), ticks).await
        }
    }
}

async fn run_debounce(delay: Duration) -> Result<()> {
    tracing::info!(delay = %humantime::format_duration(delay), "Debouncing stdin");

    let scheduler = Arc::new(TokioScheduler::current()?);
    let debounced = debounce(|line: String| println!("{}", line), delay, scheduler)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        debounced.call(line)?;
    }

    // Every call ends up either fired or dropped; wait for the last one to land.
    loop {
        let stats = debounced.stats();
        if stats.fired + stats.dropped >= stats.invocations {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    tracing::info!(stats = ?debounced.stats(), "Debounce finished");
    Ok(())
}

async fn run_throttle(interval: Duration) -> Result<()> {
    tracing::info!(interval = %humantime::format_duration(interval), "Throttling stdin");

    let throttled = throttle(
        |line: String| println!("{}", line),
        interval,
        Arc::new(MonotonicClock::new()),
    )?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        throttled.call(line)?;
    }

    tracing::info!(stats = ?throttled.stats(), "Throttle finished");
    Ok(())
}

async fn run_ticker(interval: Duration, ticks: u64) -> Result<()> {
    if ticks == 0 {
        return Ok(());
    }

    let scheduler = Arc::new(TokioScheduler::current()?);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let ticker = Ticker::new(interval, scheduler, move |count| {
        let _ = tx.send(count);
    })?;

    ticker.start()?;
    tracing::info!(interval = %humantime::format_duration(interval), ticks, "Ticker started");

    while let Some(count) = rx.recv().await {
        println!("{}", count);
        if count >= ticks {
            break;
        }
    }

    ticker.stop()?;
    Ok(())
}
