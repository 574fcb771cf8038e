//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => print!("{}", toml::to_string_pretty(&settings)?),
        ConfigAction::Path => {
            Output::info(&Settings::default_config_path().display().to_string())
        }
    }
    Ok(())
}
