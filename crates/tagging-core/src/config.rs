use anyhow::{Context, Result, bail};

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when no path is given.
pub const LOCAL_CONFIG_FILE: &str = "tagging.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub tagging: TaggingConfig,
}

/// Site settings read by every tagging component.
///
/// Values are copied into components at construction; nothing reads a
/// process-wide setting after that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggingConfig {
    #[serde(default = "default_true")]
    pub tagging_enabled: bool,
    #[serde(default = "default_max_tag_length")]
    pub max_tag_length: usize,
    #[serde(default = "default_max_tags_per_topic")]
    pub max_tags_per_topic: usize,
    #[serde(default = "default_min_trust_to_create_tag")]
    pub min_trust_to_create_tag: u8,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            tagging_enabled: default_true(),
            max_tag_length: default_max_tag_length(),
            max_tags_per_topic: default_max_tags_per_topic(),
            min_trust_to_create_tag: default_min_trust_to_create_tag(),
        }
    }
}

impl TaggingConfig {
    /// Reject limits that would make every edit drop all tags.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `max_tag_length` or
    /// `max_tags_per_topic` is zero.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tag_length == 0 {
            return Err(ConfigError::Invalid {
                field: "max_tag_length",
            });
        }
        if self.max_tags_per_topic == 0 {
            return Err(ConfigError::Invalid {
                field: "max_tags_per_topic",
            });
        }
        Ok(())
    }
}

/// Parse and validate a config file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or holds
/// out-of-range values.
pub fn load_config_file(path: &Path) -> Result<TaggingConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let file = toml::from_str::<ConfigFile>(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    file.tagging
        .validate()
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    Ok(file.tagging)
}

/// Resolve the effective config.
///
/// Lookup order: `explicit`, then `./tagging.toml`, then
/// `<config dir>/tagging/config.toml`, else defaults. An explicit path that
/// does not exist is an error; the implicit locations are optional.
///
/// # Errors
///
/// Returns an error if a config file is found but cannot be loaded.
pub fn resolve_config(explicit: Option<&Path>) -> Result<TaggingConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("config file {} does not exist", path.display());
        }
        return load_config_file(path);
    }

    for candidate in implicit_locations() {
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "loading tagging config");
            return load_config_file(&candidate);
        }
    }

    Ok(TaggingConfig::default())
}

fn implicit_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(config_dir) = dirs::config_dir() {
        locations.push(config_dir.join("tagging/config.toml"));
    }
    locations
}

const fn default_true() -> bool {
    true
}

const fn default_max_tag_length() -> usize {
    20
}

const fn default_max_tags_per_topic() -> usize {
    5
}

const fn default_min_trust_to_create_tag() -> u8 {
    3
}
