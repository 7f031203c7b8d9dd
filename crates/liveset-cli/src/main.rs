//! liveset CLI - inspect and edit saved live sets through the access layer.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "liveset")]
#[command(author, version, about = "Object-graph access layer CLI", long_about = None)]
struct Cli {
    /// Settings file (defaults to $LIVESET_SETTINGS, then the user config dir)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a host object path from indices
    Path(commands::path::PathArgs),

    /// Print track, device and clip state of a saved set
    Inspect(commands::inspect::InspectArgs),

    /// Set track volume and panning
    Mix(commands::mix::MixArgs),

    /// Write MIDI notes into a clip
    Notes(commands::notes::NotesArgs),

    /// Show, validate or create the settings file
    Config(commands::config::ConfigArgs),
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = cli.settings.as_deref();
    match cli.command {
        Commands::Path(args) => commands::path::run(args),
        Commands::Inspect(args) => commands::inspect::run(args, settings),
        Commands::Mix(args) => commands::mix::run(args, settings),
        Commands::Notes(args) => commands::notes::run(args, settings),
        Commands::Config(args) => commands::config::run(args, settings),
    }
}
