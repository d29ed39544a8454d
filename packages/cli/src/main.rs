mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{fix, inspect, run, FixArgs, InspectArgs, RunArgs};
use config::Config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Tabula CLI - inspect, repair and edit tables in JSON documents
#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log engine activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the cell grid and defects of every table
    Inspect(InspectArgs),

    /// Repair malformed tables
    Fix(FixArgs),

    /// Run a table command on a cell selection
    Run(RunArgs),
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = execute(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = Config::load(&cwd)?;

    init_logging(&config, cli.verbose);
    tabula_tables::map_cache::configure(config.map_cache);
    debug!(?config, "loaded configuration");

    match cli.command {
        Command::Inspect(args) => inspect(args),
        Command::Fix(args) => fix(args),
        Command::Run(args) => run(args, &config),
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
