use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write as _;

use super::{Session, require_user};
use crate::output::render;
use tagging_core::Tag;
use tagging_core::db::preferences::{
    set_tag_notification_level, tag_notification_level, tag_notification_preferences,
};
use tagging_core::model::notification::{NotificationLevel, NotificationPreference};
use tagging_core::tags::normalize::TagNormalizer;

#[derive(Args, Debug)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Subcommand, Debug)]
pub enum NotificationsCommand {
    #[command(about = "Show a user's level for one tag, or every tag preference")]
    Get(NotificationsGetArgs),

    #[command(about = "Set a user's level for a tag")]
    Set(NotificationsSetArgs),
}

#[derive(Args, Debug)]
pub struct NotificationsGetArgs {
    /// Username.
    #[arg(long, short)]
    pub user: String,

    /// Tag to look up. Lists every stored tag preference when omitted.
    pub tag: Option<String>,
}

#[derive(Args, Debug)]
pub struct NotificationsSetArgs {
    /// Username.
    #[arg(long, short)]
    pub user: String,

    /// Tag to follow.
    pub tag: String,

    /// muted, regular, tracking or watching (or 0-3).
    pub level: NotificationLevel,
}

#[derive(Debug, Serialize)]
struct LevelOutput {
    tag: Tag,
    level: NotificationLevel,
}

#[derive(Debug, Serialize)]
struct PreferencesOutput {
    preferences: Vec<NotificationPreference>,
}

pub fn run_notifications(args: &NotificationsArgs, session: &Session) -> Result<()> {
    let config = session.config()?;
    let normalizer = TagNormalizer::new(config.max_tag_length);
    match &args.command {
        NotificationsCommand::Get(get) => run_get(get, &normalizer, session),
        NotificationsCommand::Set(set) => run_set(set, &normalizer, session),
    }
}

fn normalized(normalizer: &TagNormalizer, raw: &str) -> Result<Tag> {
    let tag = normalizer.normalize(raw);
    if tag.is_empty() {
        bail!("'{raw}' does not contain any usable tag characters");
    }
    Ok(tag)
}

fn run_get(args: &NotificationsGetArgs, normalizer: &TagNormalizer, session: &Session) -> Result<()> {
    let conn = session.open_store()?;
    let user = require_user(&conn, &args.user)?;

    if let Some(raw) = &args.tag {
        let tag = normalized(normalizer, raw)?;
        let level =
            tag_notification_level(&conn, user.user_id, &tag).context("read tag preference")?;
        return render(session.output, &LevelOutput { tag, level }, |value, w| {
            writeln!(w, "{} {}", value.tag, value.level)
        });
    }

    let preferences = tag_notification_preferences(&conn, user.user_id, normalizer)
        .context("list tag preferences")?;
    render(session.output, &PreferencesOutput { preferences }, |value, w| {
        if value.preferences.is_empty() {
            return writeln!(w, "(no tag preferences)");
        }
        for pref in &value.preferences {
            writeln!(w, "{:<24} {}", pref.tag, pref.level)?;
        }
        Ok(())
    })
}

fn run_set(args: &NotificationsSetArgs, normalizer: &TagNormalizer, session: &Session) -> Result<()> {
    let conn = session.open_store()?;
    let user = require_user(&conn, &args.user)?;
    let tag = normalized(normalizer, &args.tag)?;

    set_tag_notification_level(&conn, user.user_id, &tag, args.level)
        .context("store tag preference")?;
    tracing::info!(user = %user.username, tag = %tag, level = %args.level, "tag preference set");

    render(
        session.output,
        &LevelOutput {
            tag,
            level: args.level,
        },
        |value, w| writeln!(w, "{} {}", value.tag, value.level),
    )
}
