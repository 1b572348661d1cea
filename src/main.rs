use clap::Parser;
use risk_pilot::cli::{Cli, Commands};
use risk_pilot::config::Config;
use risk_pilot::ledger::Ledger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    // Initialize telemetry
    risk_pilot::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting paper replay");
            args.execute(&config).await?;
        }
        Commands::Calibrate(args) => {
            tracing::info!("Starting calibration");
            args.execute(&config).await?;
        }
        Commands::Report(args) => {
            tracing::info!("Building report");
            args.execute(&config).await?;
        }
        Commands::Status => {
            let ledger = Ledger::open(&config.ledger)?;
            let state = ledger.snapshot()?;
            println!("risk-pilot status");
            println!("  Symbol:   {}", config.engine.symbol);
            println!("  Cash:     {}", state.cash);
            match state.side {
                Some(side) => {
                    println!("  Position: {} qty={}", side.as_str(), state.qty);
                    if let Some(entry) = state.entry_price {
                        println!("  Entry:    {entry}");
                    }
                }
                None => println!("  Position: flat"),
            }
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Symbol:     {}", config.engine.symbol);
            println!(
                "  VolTarget:  target={} k={} atr_period={}",
                config.vol_target.target_annualized_vol,
                config.vol_target.k,
                config.vol_target.atr_period
            );
            println!(
                "  Sizing:     mode={:?} base_risk={}",
                config.sizing.mode, config.sizing.base_risk
            );
            println!(
                "  Fees:       {} bps + {} bps slippage",
                config.fees.fee_bps, config.fees.slippage_bps
            );
            println!("  Ledger:     {}", config.ledger.journal_path.display());
        }
    }

    Ok(())
}
