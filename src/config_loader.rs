//! Scenario file loading.
//!
//! Loads a YAML scenario, validates it, and applies command-line overrides.

use std::fs::File;
use std::path::Path;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;

use crate::config::Config;

/// Load and parse a scenario from a YAML file.
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading scenario from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open scenario file '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse scenario file '{}'", config_path.display()))?;

    config.validate()?;

    info!(
        "Scenario loaded: {} nodes, {} links, {} traffic entr(ies)",
        config.nodes.len(),
        config.links.len(),
        config.traffic.len()
    );
    Ok(config)
}

/// CLI arguments that can override scenario settings.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub seed: Option<u64>,
}

/// Apply CLI overrides to a loaded scenario.
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    if let Some(seed) = overrides.seed {
        info!("Overriding scenario seed with {}", seed);
        config.general.seed = seed;
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}
