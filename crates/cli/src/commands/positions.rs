//! Prints the aggregated positions view.

use anyhow::Result;
use clap::Args;
use rust_decimal::Decimal;
use squareoff_core::{
    aggregate_live, aggregate_mock, load_mock_file, AppConfig, Grouping, InstrumentMap, Mode,
    PrefixResolver, Underlying, UnderlyingResolver,
};
use squareoff_kite::KiteClient;

/// Arguments for the positions command.
#[derive(Args, Debug)]
pub struct PositionsArgs {
    /// Position source (demo or live). Defaults to positions.default_mode.
    #[arg(long)]
    pub mode: Option<Mode>,
}

/// Loads positions from the selected source and prints them as a table.
pub async fn run_positions(config: &AppConfig, args: PositionsArgs) -> Result<()> {
    let mode = args.mode.unwrap_or(config.positions.default_mode);

    let underlyings = match mode {
        Mode::Demo => {
            let doc = load_mock_file(&config.positions.mock_file)?;
            aggregate_mock(&doc)?
        }
        Mode::Live => {
            let client = super::kite_client(config)?;
            let book = client.get_positions().await?;

            let resolver = live_resolver(&client, config).await;
            aggregate_live(&book.net, resolver.as_ref())
        }
    };

    print_table(mode, &underlyings);
    Ok(())
}

/// Picks the grouping for live positions. A failed instrument download
/// falls back to prefix grouping.
async fn live_resolver(client: &KiteClient, config: &AppConfig) -> Box<dyn UnderlyingResolver> {
    if config.positions.grouping == Grouping::Prefix {
        return Box::new(PrefixResolver);
    }

    let exchange = config.positions.instruments_exchange.as_str();
    match client.get_instruments(exchange).await {
        Ok(instruments) => Box::new(InstrumentMap::from_pairs(
            instruments.into_iter().map(|i| (i.tradingsymbol, i.name)),
        )),
        Err(e) => {
            tracing::warn!(exchange, error = %e, "Instrument dump unavailable, grouping by prefix");
            Box::new(PrefixResolver)
        }
    }
}

fn print_table(mode: Mode, underlyings: &[Underlying]) {
    println!("\n=== Positions ({mode}) ===\n");

    if underlyings.is_empty() {
        println!("No positions.");
        return;
    }

    println!("{:<28} {:>10} {:>14} {:>10}", "Instrument", "Qty", "P&L", "Delta");
    println!("{}", "-".repeat(65));

    let mut grand_total = Decimal::ZERO;
    for underlying in underlyings {
        println!(
            "{:<28} {:>10} {:>14} {:>9}%",
            underlying.name,
            format!("{} legs", underlying.legs.len()),
            underlying.total_pnl.round_dp(2),
            underlying.total_pnl_pct,
        );
        for leg in &underlying.legs {
            println!(
                "  {:<26} {:>10} {:>14} {:>10}",
                leg.name,
                leg.quantity,
                leg.pnl.round_dp(2),
                leg.delta.round_dp(2),
            );
        }
        grand_total += underlying.total_pnl;
    }

    println!("{}", "-".repeat(65));
    println!("{:<28} {:>10} {:>14}", "Total", "", grand_total.round_dp(2));
}
