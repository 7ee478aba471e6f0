use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use flashvault::core::log::init_logging;

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

impl From<Commands> for flashvault::AppCommand {
    fn from(cmd: Commands) -> flashvault::AppCommand {
        match cmd {
            Commands::Trigger { smart, count } => flashvault::AppCommand::Trigger {
                smart,
                count: count as usize,
            },
            Commands::Logs => flashvault::AppCommand::Logs,
            Commands::Dashboard { smart } => flashvault::AppCommand::Dashboard { smart },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run simulated flash loans and show the log
    Trigger {
        /// Attribute the loan to a smart account
        #[arg(long)]
        smart: bool,

        /// Number of flash loans to run concurrently
        #[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        count: u32,
    },
    /// Display the flash loan log, newest first
    Logs,
    /// Open the interactive dashboard
    Dashboard {
        /// Start with smart account mode enabled
        #[arg(long)]
        smart: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => flashvault::cli::setup::setup(),
        Some(cmd) => flashvault::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
