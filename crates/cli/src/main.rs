use clap::{Parser, Subcommand};

mod commands;

use commands::{ExitArgs, PositionsArgs};

#[derive(Parser)]
#[command(name = "squareoff")]
#[command(about = "Position proxy and square-off executor for Kite Connect", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = squareoff_core::config_loader::DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web API server
    Server {
        /// Server address (defaults to server.host:server.port from config)
        #[arg(short, long, env = "SQUAREOFF_ADDR")]
        addr: Option<String>,
    },
    /// Print the aggregated positions view
    Positions(PositionsArgs),
    /// Square off every open leg of an underlying
    Exit(ExitArgs),
    /// Probe the trading platform's login state
    CheckLogin,
    /// Check the brokerage session token
    Session,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = squareoff_core::ConfigLoader::load_from(&cli.config)?;

    match cli.command {
        Commands::Server { addr } => {
            let addr = addr.unwrap_or_else(|| config.server.addr());
            run_server(config, &addr).await?;
        }
        Commands::Positions(args) => {
            commands::run_positions(&config, args).await?;
        }
        Commands::Exit(args) => {
            commands::run_exit(&config, args).await?;
        }
        Commands::CheckLogin => {
            commands::run_check_login(&config).await?;
        }
        Commands::Session => {
            commands::run_session(&config).await?;
        }
    }

    Ok(())
}

async fn run_server(config: squareoff_core::AppConfig, addr: &str) -> anyhow::Result<()> {
    tracing::info!(
        mode = %config.positions.default_mode,
        static_dir = %config.server.static_dir,
        "Starting web API server on {}",
        addr
    );

    let state = squareoff_web_api::AppState::new(config)?;
    let server = squareoff_web_api::ApiServer::new(state);

    server.serve(addr).await?;

    Ok(())
}
