//! Show, validate and create the settings file.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use liveset_config::{
    Settings, default_settings_path, find_settings, load_or_default, validate_settings,
};

/// Settings file management.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Settings subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective settings as TOML
    Show,

    /// Check the settings file for invalid values
    Validate,

    /// Write a settings file with default values
    Init {
        /// Destination (defaults to the user config dir)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print where settings are read from
    Path,
}

/// Run the config command.
pub fn run(args: ConfigArgs, settings: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            print!("{}", load_or_default(settings)?.to_toml()?);
        }
        ConfigCommand::Validate => {
            let loaded = load_or_default(settings)?;
            validate_settings(&loaded)?;
            println!("Settings OK");
        }
        ConfigCommand::Init { path, force } => {
            let path = path.unwrap_or_else(default_settings_path);
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            Settings::default().save(&path)?;
            println!("Wrote: {}", path.display());
        }
        ConfigCommand::Path => match settings.map(Path::to_path_buf).or_else(find_settings) {
            Some(path) => println!("{}", path.display()),
            None => println!("(defaults; no file at {})", default_settings_path().display()),
        },
    }
    Ok(())
}
