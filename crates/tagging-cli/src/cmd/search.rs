use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::io::Write as _;

use super::Session;
use crate::output::render;
use tagging_core::db::tags::{DEFAULT_SEARCH_LIMIT, TagCount, search_tags};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Substring to look for; anything outside `[a-z0-9]` is ignored.
    #[arg(default_value = "")]
    pub term: String,

    /// Maximum number of matches.
    #[arg(long, short, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
struct SearchOutput {
    results: Vec<TagCount>,
}

pub fn run_search(args: &SearchArgs, session: &Session) -> Result<()> {
    let conn = session.open_store()?;
    let results = search_tags(&conn, &args.term, args.limit).context("search tags")?;

    render(session.output, &SearchOutput { results }, |value, w| {
        if value.results.is_empty() {
            return writeln!(w, "(no matching tags)");
        }
        for entry in &value.results {
            writeln!(w, "{:<24} {:>6}", entry.tag, entry.count)?;
        }
        Ok(())
    })
}
