use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write as _;

use super::{Session, guardian_for};
use crate::output::{OutputMode, kv, render};
use tagging_core::db::tags::{TagChangeRecord, tag_change_history, topic_tag_set};
use tagging_core::db::topics::{Topic, get_topic, insert_topic};
use tagging_core::error::TaggingError;
use tagging_core::tracker::{FieldChange, TagChangeOutcome, TagChangeTracker};
use tagging_core::{Tag, TopicId, TopicTagSet};

#[derive(Args, Debug)]
pub struct TopicArgs {
    #[command(subcommand)]
    pub command: TopicCommand,
}

#[derive(Subcommand, Debug)]
pub enum TopicCommand {
    #[command(about = "Create a topic, optionally tagged")]
    Create(TopicCreateArgs),

    #[command(about = "Replace a topic's tags")]
    Edit(TopicEditArgs),

    #[command(about = "Show a topic with its tags")]
    Show(TopicShowArgs),
}

#[derive(Args, Debug)]
pub struct TopicCreateArgs {
    /// Topic title.
    pub title: String,

    /// Tag to attach (repeatable).
    #[arg(long = "tag", short = 't', value_name = "TAG")]
    pub tags: Vec<String>,

    /// Act as this user (anonymous when omitted).
    #[arg(long = "as", value_name = "USER")]
    pub actor: Option<String>,
}

#[derive(Args, Debug)]
pub struct TopicEditArgs {
    /// Topic id.
    pub id: i64,

    /// New tag set, in order (repeatable).
    #[arg(long = "tag", short = 't', value_name = "TAG", conflicts_with = "clear")]
    pub tags: Vec<String>,

    /// Remove every tag from the topic.
    #[arg(long)]
    pub clear: bool,

    /// Act as this user (anonymous when omitted).
    #[arg(long = "as", value_name = "USER")]
    pub actor: Option<String>,
}

#[derive(Args, Debug)]
pub struct TopicShowArgs {
    /// Topic id.
    pub id: i64,

    /// Include the tag change history, newest first.
    #[arg(long)]
    pub history: bool,
}

#[derive(Debug, Serialize)]
struct TopicOutput {
    topic: Topic,
    tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    change: Option<TagChangeOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<Vec<TagChangeRecord>>,
}

pub fn run_topic(args: &TopicArgs, session: &Session) -> Result<()> {
    match &args.command {
        TopicCommand::Create(create) => run_create(create, session),
        TopicCommand::Edit(edit) => run_edit(edit, session),
        TopicCommand::Show(show) => run_show(show, session),
    }
}

fn run_create(args: &TopicCreateArgs, session: &Session) -> Result<()> {
    let config = session.config()?;
    let conn = session.open_store()?;
    let guardian = guardian_for(&conn, args.actor.as_deref(), &config)?;

    let topic_id = insert_topic(&conn, &args.title).context("create topic")?;
    let change = TagChangeTracker::new(&conn, &config)
        .on_topic_created(topic_id, &args.tags, &guardian)
        .map_err(|err| fanout_warning(err, session))?;

    print_topic(session, &conn, topic_id, change, None)
}

fn run_edit(args: &TopicEditArgs, session: &Session) -> Result<()> {
    if args.tags.is_empty() && !args.clear {
        bail!("pass at least one --tag, or --clear to remove every tag");
    }

    let config = session.config()?;
    let conn = session.open_store()?;
    let guardian = guardian_for(&conn, args.actor.as_deref(), &config)?;
    let topic_id = TopicId::new(args.id);

    let stored: Vec<String> = topic_tag_set(&conn, topic_id)
        .context("read current tags")?
        .iter()
        .map(ToString::to_string)
        .collect();
    let proposed = (!args.clear).then(|| args.tags.clone());
    let field = FieldChange::tags((!stored.is_empty()).then_some(stored), proposed);

    let change = TagChangeTracker::new(&conn, &config)
        .on_field_change(topic_id, &field, &guardian)
        .map_err(|err| fanout_warning(err, session))?;

    print_topic(session, &conn, topic_id, change, None)
}

fn run_show(args: &TopicShowArgs, session: &Session) -> Result<()> {
    let conn = session.open_store()?;
    let topic_id = TopicId::new(args.id);
    let history = if args.history {
        Some(tag_change_history(&conn, topic_id, None).context("read tag history")?)
    } else {
        None
    };
    print_topic(session, &conn, topic_id, None, history)
}

/// A failed fanout leaves the tags saved; say so before bubbling the error.
fn fanout_warning(err: TaggingError, session: &Session) -> anyhow::Error {
    if session.output == OutputMode::Human {
        if let TaggingError::Fanout {
            topic_id, pending, ..
        } = &err
        {
            eprintln!(
                "warning: tags for topic {topic_id} were saved; notifying followers of {} failed",
                join(pending)
            );
        }
    }
    anyhow::Error::new(err)
}

fn print_topic(
    session: &Session,
    conn: &rusqlite::Connection,
    topic_id: TopicId,
    change: Option<TagChangeOutcome>,
    history: Option<Vec<TagChangeRecord>>,
) -> Result<()> {
    let topic = get_topic(conn, topic_id)
        .context("read topic")?
        .ok_or(TaggingError::TopicNotFound(topic_id))?;
    let tags = topic_tag_set(conn, topic_id)
        .context("read topic tags")?
        .into_vec();

    let payload = TopicOutput {
        topic,
        tags,
        change,
        history,
    };
    render(session.output, &payload, |value, w| {
        kv(w, "topic", format!("{} {}", value.topic.topic_id, value.topic.title))?;
        kv(w, "tags", join(&value.tags))?;
        if let Some(change) = &value.change {
            if !change.added.is_empty() {
                kv(w, "added", join(&change.added))?;
            }
            if let Some(report) = change.fanout {
                kv(w, "notified", report.inserted.to_string())?;
            }
        }
        if let Some(history) = &value.history {
            for record in history {
                writeln!(
                    w,
                    "  #{:<4} {} -> {}",
                    record.change_id,
                    describe(record.change.previous.as_ref().map(TopicTagSet::as_slice)),
                    describe(record.change.current.as_ref().map(TopicTagSet::as_slice)),
                )?;
            }
        }
        Ok(())
    })
}

fn join(tags: &[Tag]) -> String {
    if tags.is_empty() {
        return "(none)".to_string();
    }
    tags.iter().map(Tag::as_str).collect::<Vec<_>>().join(", ")
}

fn describe(tags: Option<&[Tag]>) -> String {
    tags.map_or_else(|| "(unset)".to_string(), join)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: TopicArgs,
    }

    #[test]
    fn create_collects_repeated_tags() {
        let w = Wrapper::parse_from(["test", "create", "Hello", "-t", "rust", "--tag", "sql"]);
        match w.args.command {
            TopicCommand::Create(create) => {
                assert_eq!(create.title, "Hello");
                assert_eq!(create.tags, vec!["rust", "sql"]);
                assert!(create.actor.is_none());
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn edit_rejects_tags_with_clear() {
        let result = Wrapper::try_parse_from(["test", "edit", "1", "--tag", "a", "--clear"]);
        assert!(result.is_err());
    }

    #[test]
    fn edit_parses_acting_user() {
        let w = Wrapper::parse_from(["test", "edit", "4", "--tag", "a", "--as", "sam"]);
        match w.args.command {
            TopicCommand::Edit(edit) => {
                assert_eq!(edit.id, 4);
                assert_eq!(edit.actor.as_deref(), Some("sam"));
            }
            _ => panic!("expected edit"),
        }
    }
}
