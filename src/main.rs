use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxmoney::core::log::init_logging;
use fxmoney::core::Currency;
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fxmoney::AppCommand {
    fn from(cmd: Commands) -> fxmoney::AppCommand {
        match cmd {
            Commands::Rates => fxmoney::AppCommand::Rates,
            Commands::Convert { amount, to } => fxmoney::AppCommand::Convert { amount, to },
            Commands::Allocate { amount, ratios } => {
                fxmoney::AppCommand::Allocate { amount, ratios }
            }
            Commands::Watch => fxmoney::AppCommand::Watch,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display current conversion factors
    Rates,
    /// Convert an amount, e.g. "18 EUR" or "$13"
    Convert {
        amount: String,
        /// Target currency code
        #[arg(short, long, default_value = "USD")]
        to: Currency,
    },
    /// Split an amount by ratios without losing a cent
    Allocate {
        amount: String,
        #[arg(required = true, num_args = 1..)]
        ratios: Vec<Decimal>,
    },
    /// Follow factor refreshes until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxmoney::cli::setup::setup(),
        Some(cmd) => fxmoney::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
