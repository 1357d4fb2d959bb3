//! Squares off an underlying from the command line.

use anyhow::Result;
use clap::Args;
use squareoff_core::AppConfig;
use squareoff_kite::{ExitExecutor, LegStatus};

/// Arguments for the exit command.
#[derive(Args, Debug)]
pub struct ExitArgs {
    /// Underlying symbol prefix (e.g., NIFTY, BANKNIFTY)
    #[arg(short, long)]
    pub underlying: String,

    /// Print the offsetting orders without placing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Runs the square-off, or prints the plan with `--dry-run`.
pub async fn run_exit(config: &AppConfig, args: ExitArgs) -> Result<()> {
    let client = super::kite_client(config)?;
    let executor = ExitExecutor::new(client);

    if args.dry_run {
        let orders = executor.plan(&args.underlying).await?;

        println!("\n=== Square-off plan for {} (dry run) ===\n", args.underlying);
        if orders.is_empty() {
            println!("No open positions.");
        }
        for order in &orders {
            println!(
                "{:<4} {:>8}  {:<26} {} {}",
                order.transaction_type,
                order.quantity,
                order.tradingsymbol,
                order.exchange,
                order.product
            );
        }
        return Ok(());
    }

    let report = executor.exit_underlying(&args.underlying).await?;

    println!("\n=== {} ===\n", report.message());
    for leg in &report.results {
        match &leg.status {
            LegStatus::Placed { order_id } => println!(
                "OK    {:<4} {:>8}  {:<26} order {}",
                leg.transaction_type, leg.quantity, leg.symbol, order_id
            ),
            LegStatus::Failed { error } => println!(
                "FAIL  {:<4} {:>8}  {:<26} {}",
                leg.transaction_type, leg.quantity, leg.symbol, error
            ),
        }
    }

    if report.failed_count() > 0 {
        anyhow::bail!("{} leg(s) failed to square off", report.failed_count());
    }

    Ok(())
}
