use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use rating_oracle::core::address::Address;
use rating_oracle::core::log::init_logging;

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

impl From<Commands> for rating_oracle::AppCommand {
    fn from(cmd: Commands) -> rating_oracle::AppCommand {
        match cmd {
            Commands::Run => rating_oracle::AppCommand::Run,
            Commands::Cycle => rating_oracle::AppCommand::Cycle,
            Commands::SetKeeper { caller, keeper } => {
                rating_oracle::AppCommand::SetKeeper { caller, keeper }
            }
            Commands::Get { caller, symbol } => rating_oracle::AppCommand::Get { caller, symbol },
            Commands::Symbols => rating_oracle::AppCommand::Symbols,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Keep the store updated from the rating feed until interrupted
    Run,
    /// Run a single update cycle
    Cycle,
    /// Assign a new keeper (owner only)
    SetKeeper {
        /// Address of the caller, must be the store owner
        #[arg(long)]
        caller: Address,
        /// Address of the new keeper
        keeper: Address,
    },
    /// Show the rating for a symbol (requires stake)
    Get {
        /// Address of the caller, checked against the stake API
        #[arg(long)]
        caller: Address,
        symbol: String,
    },
    /// List every symbol with a rating, in first-update order
    Symbols,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => rating_oracle::cli::setup::setup(),
        Some(cmd) => rating_oracle::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
