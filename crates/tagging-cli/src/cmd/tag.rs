use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write as _;

use super::Session;
use crate::output::{kv, render};
use tagging_core::db::tags::topics_for_tag;
use tagging_core::tags::normalize::TagNormalizer;
use tagging_core::{Tag, TopicId};

#[derive(Args, Debug)]
pub struct TagArgs {
    #[command(subcommand)]
    pub command: TagCommand,
}

#[derive(Subcommand, Debug)]
pub enum TagCommand {
    #[command(about = "List topics carrying a tag, newest first")]
    Show(TagShowArgs),
}

#[derive(Args, Debug)]
pub struct TagShowArgs {
    /// Tag name; normalized the same way edits are.
    pub tag: String,
}

#[derive(Debug, Serialize)]
struct TagShowOutput {
    tag: Tag,
    topics: Vec<TopicId>,
}

pub fn run_tag(args: &TagArgs, session: &Session) -> Result<()> {
    match &args.command {
        TagCommand::Show(show) => run_show(show, session),
    }
}

fn run_show(args: &TagShowArgs, session: &Session) -> Result<()> {
    let config = session.config()?;
    let tag = TagNormalizer::new(config.max_tag_length).normalize(&args.tag);
    if tag.is_empty() {
        bail!("'{}' does not contain any usable tag characters", args.tag);
    }

    let conn = session.open_store()?;
    let topics = topics_for_tag(&conn, &tag).context("list topics for tag")?;

    render(session.output, &TagShowOutput { tag, topics }, |value, w| {
        kv(w, "tag", value.tag.as_str())?;
        if value.topics.is_empty() {
            return writeln!(w, "(no topics)");
        }
        for topic in &value.topics {
            writeln!(w, "  {topic}")?;
        }
        Ok(())
    })
}
