use anyhow::{Context as _, Result, bail};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::Session;
use crate::output::{kv, render};
use tagging_core::config::{ConfigFile, LOCAL_CONFIG_FILE};
use tagging_core::db::migrations::current_schema_version;

#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Also write a `tagging.toml` with the default settings to this
    /// directory.
    #[arg(long, value_name = "DIR")]
    pub write_config: Option<PathBuf>,

    /// Overwrite an existing `tagging.toml`.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    db: String,
    schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<String>,
}

fn write_default_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let path = dir.join(LOCAL_CONFIG_FILE);
    if path.exists() && !force {
        bail!(
            "{} already exists. Use `tg init --write-config {} --force` to overwrite it.",
            path.display(),
            dir.display()
        );
    }
    let body = toml::to_string_pretty(&ConfigFile::default()).context("serialize default config")?;
    std::fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Execute `tg init`: create (or migrate) the store, optionally writing a
/// default config file.
pub fn run_init(args: &InitArgs, session: &Session) -> Result<()> {
    let conn = session.open_store()?;
    let schema_version = current_schema_version(&conn).context("read schema version")?;

    let config = args
        .write_config
        .as_deref()
        .map(|dir| write_default_config(dir, args.force))
        .transpose()?;

    tracing::info!(db = %session.db_path.display(), schema_version, "store ready");

    let payload = InitOutput {
        db: session.db_path.display().to_string(),
        schema_version,
        config: config.map(|p| p.display().to_string()),
    };
    render(session.output, &payload, |value, w| {
        kv(w, "store", &value.db)?;
        kv(w, "schema", value.schema_version.to_string())?;
        if let Some(config) = &value.config {
            kv(w, "config", config)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_round_trips_through_loader() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_default_config(dir.path(), false).expect("write config");
        let loaded = tagging_core::config::load_config_file(&path).expect("load config");
        assert_eq!(loaded, tagging_core::config::TaggingConfig::default());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = TempDir::new().expect("tempdir");
        write_default_config(dir.path(), false).expect("first write");
        assert!(write_default_config(dir.path(), false).is_err());
        assert!(write_default_config(dir.path(), true).is_ok());
    }
}
