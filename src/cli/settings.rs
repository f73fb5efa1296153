//! The `settings` subcommands.
use crate::settings::{Settings, get_settings_file_path};
use anyhow::Result;
use clap::Subcommand;

/// Subcommands for inspecting the settings file
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Print where `settings.toml` is looked for
    Path,
    /// Print a commented-out `settings.toml` with the default values
    DumpDefault,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Path => println!("{}", get_settings_file_path().display()),
            Self::DumpDefault => print!("{}", Settings::default_file_contents()),
        }

        Ok(())
    }
}
