mod commands;
mod error;

use clap::{Parser, Subcommand};
use commands::*;
use error::Result;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a bounded in-process fuzzing loop
    Run(run::RunArgs),

    /// Minimize a crashing or otherwise interesting program
    Minimize(minimize::MinimizeArgs),

    /// Inspect and convert corpus snapshots
    Corpus {
        #[command(subcommand)]
        command: corpus::CorpusCommands,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(args) => RunCommand::execute(args),
        Commands::Minimize(args) => MinimizeCommand::execute(args),
        Commands::Corpus { command } => CorpusCommand::execute(command),
    }
}
