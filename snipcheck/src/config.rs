use std::fs;
use std::path::Path;

use excerpt::error::{Chainable, Result};
use excerpt::{error, Settings};

pub const CONFIG_FILE: &str = "snipcheck.toml";

/// Reads settings from `config` if given, else from `snipcheck.toml` in
/// `source`. Without either, the defaults apply.
pub fn load(source: &Path, config: Option<&Path>) -> Result<Settings> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => {
            let path = source.join(CONFIG_FILE);
            if !path.is_file() {
                tracing::debug!(source = %source.display(), "no config file; using defaults");
                return Ok(Settings::default());
            }

            path
        }
    };

    let contents = fs::read_to_string(&path)
        .chain_with(|| error!("failed to read config file", "path" => path.display()))?;

    let settings = toml::from_str(&contents)
        .chain_with(|| error!("invalid config file", "path" => path.display()))?;

    tracing::debug!(path = %path.display(), "loaded config");
    Ok(settings)
}
