//! whisperflux CLI - Bulk migration of Graphite whisper archives into InfluxDB.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;
mod logging;

use commands::migrate::MigrateArgs;
use logging::LogFormat;

#[derive(Parser)]
#[command(name = "whisperflux")]
#[command(about = "Migrate Graphite whisper archives into InfluxDB", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy whisper data into InfluxDB
    Migrate(Box<MigrateArgs>),

    /// Show a whisper file's header
    Info {
        /// Path to a .wsp file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    logging::init(cli.verbose, cli.log_format)?;

    match command {
        Commands::Migrate(args) => {
            let code = commands::migrate::migrate(*args, cli.quiet).await?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Info { path } => commands::info::show_info(&path),
    }
}
