//! Per-tag preference → per-topic notification state.
//!
//! When a topic gains tags, every user with a non-regular preference for one
//! of those tags gets a `topic_users` row for the topic, unless they already
//! have one. The whole fanout is one `INSERT … SELECT` statement:
//!
//! - `NOT EXISTS` skips users who already have state for the topic
//! - `INSERT OR IGNORE` on the `(user_id, topic_id)` key absorbs a row that a
//!   concurrent fanout committed between the anti-join and the insert
//! - `GROUP BY user_id` keeps the statement at one row per user even when a
//!   user follows several of the new tags (highest level wins)
//!
//! A single statement commits or fails as a unit, and re-running it only
//! inserts rows that are still missing.

use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use serde::Serialize;
use std::fmt::Write as _;
use tracing::{debug, info};

use super::key::NotificationKeyCodec;
use crate::db::now_us;
use crate::model::TopicId;
use crate::model::notification::{NotificationLevel, NotificationReason};
use crate::model::tag::Tag;

/// Positional parameters bound before the preference keys.
const FIXED_PARAMS: usize = 4;

/// Result of one fanout call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FanoutReport {
    /// Number of tags the fanout considered.
    pub tags: usize,
    /// Number of `topic_users` rows inserted.
    pub inserted: usize,
}

pub struct NotificationFanout<'conn> {
    conn: &'conn Connection,
}

impl<'conn> NotificationFanout<'conn> {
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Insert notification state for `topic_id` on behalf of every user
    /// following one of `new_tags`.
    ///
    /// An empty `new_tags` is a no-op that does not touch the store.
    ///
    /// # Errors
    ///
    /// Returns the underlying store error; no rows from this call are left
    /// behind in that case.
    pub fn apply(&self, new_tags: &[Tag], topic_id: TopicId) -> rusqlite::Result<FanoutReport> {
        if new_tags.is_empty() {
            return Ok(FanoutReport::default());
        }

        let keys = NotificationKeyCodec::keys_for(new_tags);

        let mut sql = String::from(
            "INSERT OR IGNORE INTO topic_users (
                user_id, topic_id, notification_level, notifications_reason_id, created_at_us
             )
             SELECT up.user_id, ?1, MAX(up.level), ?2, ?3
             FROM user_preferences AS up
             WHERE up.level <> ?4
               AND NOT EXISTS (
                   SELECT 1 FROM topic_users AS tu
                   WHERE tu.topic_id = ?1 AND tu.user_id = up.user_id
               )
               AND up.pref_key IN (",
        );

        for index in 0..keys.len() {
            if index > 0 {
                sql.push_str(", ");
            }
            let _ = write!(sql, "?{}", FIXED_PARAMS + index + 1);
        }
        sql.push_str(")\n             GROUP BY up.user_id");

        let mut values = Vec::with_capacity(FIXED_PARAMS + keys.len());
        values.push(Value::Integer(topic_id.get()));
        values.push(Value::Integer(NotificationReason::PluginChanged.id()));
        values.push(Value::Integer(now_us()));
        values.push(Value::Integer(NotificationLevel::Regular.as_i64()));
        values.extend(keys.into_iter().map(Value::Text));

        debug!(topic_id = %topic_id, tags = ?new_tags, "fanning out tag notification levels");
        let inserted = self.conn.execute(&sql, params_from_iter(values.iter()))?;

        if inserted > 0 {
            info!(topic_id = %topic_id, inserted, "tag fanout inserted topic notification state");
        }

        Ok(FanoutReport {
            tags: new_tags.len(),
            inserted,
        })
    }
}
