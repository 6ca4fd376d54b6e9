//! `hookguard config` command implementation.

use super::output;
use crate::config::{self, Config};
use crate::error::{Error, Result};
use std::path::Path;

/// Run the config command: print the effective settings.
///
/// # Errors
///
/// Returns an error if the settings cannot be serialized.
pub fn run(config: &Config, explicit_path: Option<&Path>, json: bool) -> Result<()> {
    if json {
        return output::print_json(config);
    }

    let path = config::config_path(explicit_path);
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", path.display())
    };
    println!("# Config file: {source}");
    print!("{}", render(config)?);
    Ok(())
}

/// Write the default config file to the resolved config path.
///
/// Needs no loaded configuration, so it can replace a broken file.
///
/// # Errors
///
/// Returns an error if the file exists and `force` is false, or if it cannot
/// be written.
pub fn init(explicit_path: Option<&Path>, force: bool) -> Result<()> {
    let path = config::config_path(explicit_path);
    config::write_default_config(&path, force)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Effective settings as TOML.
///
/// # Errors
///
/// Returns a usage error if the settings cannot be serialized.
pub fn render(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| Error::Usage(format!("cannot render config: {e}")))
}
