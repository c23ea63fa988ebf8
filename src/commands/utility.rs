//! Utility commands: config

use std::path::PathBuf;

use lightwave::LightwaveConfig;

use super::CommandResult;

/// Print the effective configuration, optionally persisting it
pub fn config(config: &LightwaveConfig, path: &PathBuf, save: bool) -> CommandResult {
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    if save {
        config.save(path)?;
        eprintln!("Saved to {}", path.display());
    }
    Ok(())
}
