pub mod cloud;
pub mod init;
pub mod notifications;
pub mod search;
pub mod tag;
pub mod topic;
pub mod user;

use anyhow::{Context as _, Result};
use rusqlite::Connection;
use std::path::PathBuf;

use crate::output::OutputMode;
use tagging_core::config::{TaggingConfig, resolve_config};
use tagging_core::db::open_store;
use tagging_core::db::users::{User, find_user};
use tagging_core::guardian::Guardian;

/// Per-invocation state shared by every handler.
#[derive(Debug)]
pub struct Session {
    pub db_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub output: OutputMode,
}

impl Session {
    pub fn open_store(&self) -> Result<Connection> {
        open_store(&self.db_path)
    }

    pub fn config(&self) -> Result<TaggingConfig> {
        resolve_config(self.config_path.as_deref()).context("load tagging config")
    }
}

/// Look a user up by name; a missing user is an error.
pub fn require_user(conn: &Connection, username: &str) -> Result<User> {
    find_user(conn, username)
        .context("look up user")?
        .with_context(|| format!("no user named '{username}'"))
}

/// Capability context for the acting user; anonymous when `username` is
/// `None`.
pub fn guardian_for(
    conn: &Connection,
    username: Option<&str>,
    config: &TaggingConfig,
) -> Result<Guardian> {
    match username {
        None => Ok(Guardian::anonymous(config)),
        Some(name) => {
            let user = require_user(conn, name)?;
            Guardian::for_user(conn, user.user_id, config)
                .with_context(|| format!("resolve acting user '{name}'"))
        }
    }
}
