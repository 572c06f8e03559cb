use clap::Parser;
use floor_scan::cli::{Cli, Commands};
use floor_scan::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)
        .unwrap_or_else(|e| {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            Config::default()
        })
        .with_env();

    // Initialize telemetry
    let _telemetry = floor_scan::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Scan(args) => {
            tracing::info!(mode = ?args.fetch_mode(), "Starting scan");
            args.execute(&config).await?;
        }
        Commands::Tick(args) => {
            args.execute(&config).await?;
        }
        Commands::Daemon(args) => {
            tracing::info!("Starting scheduler daemon");
            args.execute(&config).await?;
        }
        Commands::Status(args) => {
            args.execute(&config).await?;
        }
        Commands::Reset(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Floor: lookback={} percentile={}",
                config.floor.lookback, config.floor.percentile
            );
            println!(
                "  Matcher: price_floor={} min_sample_size={:?}",
                config.matcher.price_floor, config.matcher.min_sample_size
            );
            println!(
                "  Scheduler: lead={}m grace={}m tick={}s timezone={}",
                config.scheduler.lead_minutes,
                config.scheduler.early_start_grace_minutes,
                config.scheduler.tick_interval_secs,
                config.scheduler.timezone
            );
            println!(
                "  Odds: {} {} ({}), api key {}",
                config.odds.sport,
                config.odds.bookmaker,
                config.odds.regions,
                if config.odds.api_key.is_empty() { "missing" } else { "set" }
            );
            println!("  Game logs: {:?}", config.stats.game_log_dir);
            println!("  Output: {:?}", config.storage.output_dir);
        }
    }

    Ok(())
}
