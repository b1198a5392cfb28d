use anyhow::{Context as _, Result};
use clap::Args;
use std::io::Write as _;

use super::Session;
use crate::output::render;
use tagging_core::db::tags::{DEFAULT_CLOUD_LIMIT, tag_cloud};

#[derive(Args, Debug)]
pub struct CloudArgs {
    /// Number of most-used tags to include.
    #[arg(long, short, default_value_t = DEFAULT_CLOUD_LIMIT)]
    pub limit: u32,
}

pub fn run_cloud(args: &CloudArgs, session: &Session) -> Result<()> {
    let conn = session.open_store()?;
    let cloud = tag_cloud(&conn, args.limit).context("build tag cloud")?;

    render(session.output, &cloud, |value, w| {
        if value.cloud.is_empty() {
            return writeln!(w, "(no tags)");
        }
        writeln!(w, "{:<24} {:>6}", "TAG", "TOPICS")?;
        writeln!(w, "{}", "-".repeat(31))?;
        for entry in &value.cloud {
            writeln!(w, "{:<24} {:>6}", entry.tag, entry.count)?;
        }
        Ok(())
    })
}
