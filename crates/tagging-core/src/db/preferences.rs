//! Per-tag notification preferences and per-topic notification state.

use rusqlite::{Connection, OptionalExtension, params};

use super::now_us;
use crate::model::notification::{
    NotificationLevel, NotificationPreference, NotificationReason, TopicNotificationState,
};
use crate::model::tag::Tag;
use crate::model::{TopicId, UserId};
use crate::notify::key::{NOTIFICATION_KEY_PREFIX, NotificationKeyCodec};
use crate::tags::normalize::TagNormalizer;

/// A user's level for `tag`, or [`NotificationLevel::Regular`] when they
/// never set one.
///
/// # Errors
///
/// Returns an error if the query fails or the stored level is out of range.
pub fn tag_notification_level(
    conn: &Connection,
    user_id: UserId,
    tag: &Tag,
) -> rusqlite::Result<NotificationLevel> {
    let level = conn
        .query_row(
            "SELECT level FROM user_preferences WHERE user_id = ?1 AND pref_key = ?2",
            params![user_id, NotificationKeyCodec::key_for(tag)],
            |row| row.get::<_, NotificationLevel>(0),
        )
        .optional()?;
    Ok(level.unwrap_or_default())
}

/// Store a user's level for `tag`, replacing any earlier value.
///
/// # Errors
///
/// Returns an error if the user does not exist or the write fails.
pub fn set_tag_notification_level(
    conn: &Connection,
    user_id: UserId,
    tag: &Tag,
    level: NotificationLevel,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO user_preferences (user_id, pref_key, level, updated_at_us)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id, pref_key) DO UPDATE SET
             level = excluded.level,
             updated_at_us = excluded.updated_at_us",
        params![user_id, NotificationKeyCodec::key_for(tag), level, now_us()],
    )?;
    Ok(())
}

/// Every per-tag preference a user has stored, ordered by tag.
///
/// # Errors
///
/// Returns an error if the query fails or a stored level is out of range.
pub fn tag_notification_preferences(
    conn: &Connection,
    user_id: UserId,
    normalizer: &TagNormalizer,
) -> rusqlite::Result<Vec<NotificationPreference>> {
    let mut stmt = conn.prepare(
        "SELECT pref_key, level FROM user_preferences
         WHERE user_id = ?1 AND substr(pref_key, 1, ?2) = ?3
         ORDER BY pref_key",
    )?;
    let prefix_len = i64::try_from(NOTIFICATION_KEY_PREFIX.len()).unwrap_or(i64::MAX);
    let rows = stmt.query_map(params![user_id, prefix_len, NOTIFICATION_KEY_PREFIX], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, NotificationLevel>(1)?))
    })?;

    let mut preferences = Vec::new();
    for row in rows {
        let (key, level) = row?;
        if let Some(tag) = NotificationKeyCodec::tag_for(&key, normalizer) {
            preferences.push(NotificationPreference {
                user_id,
                tag,
                level,
            });
        }
    }
    Ok(preferences)
}

/// A user's notification state for one topic, if any.
///
/// # Errors
///
/// Returns an error if the query fails or the stored level is out of range.
pub fn topic_notification_state(
    conn: &Connection,
    user_id: UserId,
    topic_id: TopicId,
) -> rusqlite::Result<Option<TopicNotificationState>> {
    conn.query_row(
        "SELECT notification_level, notifications_reason_id
         FROM topic_users WHERE user_id = ?1 AND topic_id = ?2",
        params![user_id, topic_id],
        |row| {
            let reason: Option<i64> = row.get(1)?;
            Ok(TopicNotificationState {
                user_id,
                topic_id,
                level: row.get(0)?,
                reason: reason.and_then(NotificationReason::from_id),
            })
        },
    )
    .optional()
}

/// Record a user's explicit choice for one topic, replacing any earlier row.
///
/// # Errors
///
/// Returns an error if the user or topic does not exist or the write fails.
pub fn set_topic_notification_level(
    conn: &Connection,
    user_id: UserId,
    topic_id: TopicId,
    level: NotificationLevel,
    reason: NotificationReason,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO topic_users (user_id, topic_id, notification_level, notifications_reason_id, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id, topic_id) DO UPDATE SET
             notification_level = excluded.notification_level,
             notifications_reason_id = excluded.notifications_reason_id",
        params![user_id, topic_id, level, reason.id(), now_us()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::db::topics::insert_topic;
    use crate::db::users::insert_user;

    fn tag(value: &str) -> Tag {
        TagNormalizer::new(20).normalize(value)
    }

    #[test]
    fn unset_preference_defaults_to_regular() {
        let conn = open_in_memory().expect("open store");
        let user = insert_user(&conn, "sam", 0).expect("insert user");
        let level = tag_notification_level(&conn, user, &tag("rust")).expect("level");
        assert_eq!(level, NotificationLevel::Regular);
    }

    #[test]
    fn set_preference_overwrites() {
        let conn = open_in_memory().expect("open store");
        let user = insert_user(&conn, "sam", 0).expect("insert user");
        set_tag_notification_level(&conn, user, &tag("rust"), NotificationLevel::Watching)
            .expect("set");
        set_tag_notification_level(&conn, user, &tag("rust"), NotificationLevel::Muted)
            .expect("overwrite");

        let level = tag_notification_level(&conn, user, &tag("rust")).expect("level");
        assert_eq!(level, NotificationLevel::Muted);
    }

    #[test]
    fn preference_for_missing_user_fails() {
        let conn = open_in_memory().expect("open store");
        let result = set_tag_notification_level(
            &conn,
            UserId::new(404),
            &tag("rust"),
            NotificationLevel::Watching,
        );
        assert!(result.is_err());
    }

    #[test]
    fn lists_only_tag_preferences() {
        let conn = open_in_memory().expect("open store");
        let user = insert_user(&conn, "sam", 0).expect("insert user");
        set_tag_notification_level(&conn, user, &tag("zeta"), NotificationLevel::Tracking)
            .expect("set");
        set_tag_notification_level(&conn, user, &tag("alpha"), NotificationLevel::Watching)
            .expect("set");
        conn.execute(
            "INSERT INTO user_preferences (user_id, pref_key, level, updated_at_us)
             VALUES (?1, 'digest_frequency', 2, 0)",
            [user],
        )
        .expect("insert unrelated preference");

        let prefs = tag_notification_preferences(&conn, user, &TagNormalizer::new(20))
            .expect("list preferences");
        let listed: Vec<(&str, NotificationLevel)> =
            prefs.iter().map(|p| (p.tag.as_str(), p.level)).collect();
        assert_eq!(
            listed,
            vec![
                ("alpha", NotificationLevel::Watching),
                ("zeta", NotificationLevel::Tracking)
            ]
        );
    }

    #[test]
    fn topic_state_upsert_replaces_level_and_reason() {
        let conn = open_in_memory().expect("open store");
        let user = insert_user(&conn, "sam", 0).expect("insert user");
        let topic = insert_topic(&conn, "Topic").expect("insert topic");

        assert!(topic_notification_state(&conn, user, topic).expect("query").is_none());

        set_topic_notification_level(
            &conn,
            user,
            topic,
            NotificationLevel::Tracking,
            NotificationReason::CreatedPost,
        )
        .expect("set");
        set_topic_notification_level(
            &conn,
            user,
            topic,
            NotificationLevel::Muted,
            NotificationReason::UserChanged,
        )
        .expect("replace");

        let state = topic_notification_state(&conn, user, topic)
            .expect("query")
            .expect("row");
        assert_eq!(state.level, NotificationLevel::Muted);
        assert_eq!(state.reason, Some(NotificationReason::UserChanged));
    }
}
