mod types;

pub use types::*;

use anyhow::{Context, Result};
use clipjoin_av::TemplateContext;
use clipjoin_common::Classifier;
use std::path::{Path, PathBuf};

/// Locations searched when no config file is given, in order
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "./clipjoin.toml",
    "~/.config/clipjoin/config.toml",
    "/etc/clipjoin/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config).with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    match find_default_config() {
        Some(path) => load_config(&path),
        None => Ok(Config::default()),
    }
}

/// First default config location that exists
pub fn find_default_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_PATHS
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .find(|p| p.exists())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    config.grouping.validate()?;
    Classifier::new(&config.grouping)?;

    let template = config.naming.template.trim();
    if template.is_empty() {
        anyhow::bail!("Naming template cannot be empty");
    }
    let known = TemplateContext::new()
        .with_var("key", "")
        .with_var("index", "")
        .with_var("count", "");
    for var in known.unknown_vars(template) {
        tracing::warn!("Naming template uses unknown variable {{{}}}", var);
    }

    if config.tools.timeout_secs == Some(0) {
        anyhow::bail!("tools.timeout_secs must be greater than 0");
    }

    for (name, path) in [
        ("ffmpeg", &config.tools.ffmpeg_path),
        ("ffprobe", &config.tools.ffprobe_path),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", name, path);
            }
        }
    }

    if let (Some(source), Some(staging)) = (&config.paths.source_dir, &config.paths.staging_dir) {
        if source.starts_with(staging) || staging.starts_with(source) {
            anyhow::bail!(
                "paths.staging_dir {:?} overlaps the source directory {:?}",
                staging,
                source
            );
        }
    }

    Ok(())
}
