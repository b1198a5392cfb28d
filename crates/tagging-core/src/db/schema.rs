//! Canonical SQLite schema for the tagging store.
//!
//! - `topics` / `users` hold the minimal rows the tagging tables point at
//! - `topic_tags` is the typed tag-set relation (one row per tag, ordered by
//!   `position`)
//! - `user_preferences` holds per-user, per-key notification levels
//! - `topic_users` holds per-(user, topic) notification state; fanout only
//!   ever inserts here
//! - `tag_changes` is the audit trail of tag-set edits
//! - `store_meta` tracks the schema version

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS topics (
    topic_id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE CHECK (length(trim(username)) > 0),
    trust_level INTEGER NOT NULL DEFAULT 0 CHECK (trust_level BETWEEN 0 AND 4),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS topic_tags (
    topic_id INTEGER NOT NULL REFERENCES topics(topic_id) ON DELETE CASCADE,
    position INTEGER NOT NULL CHECK (position >= 0),
    tag TEXT NOT NULL CHECK (length(tag) > 0),
    PRIMARY KEY (topic_id, tag),
    UNIQUE (topic_id, position)
);

CREATE TABLE IF NOT EXISTS user_preferences (
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    pref_key TEXT NOT NULL CHECK (length(pref_key) > 0),
    level INTEGER NOT NULL CHECK (level BETWEEN 0 AND 3),
    updated_at_us INTEGER NOT NULL,
    PRIMARY KEY (user_id, pref_key)
);

CREATE TABLE IF NOT EXISTS topic_users (
    user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    topic_id INTEGER NOT NULL REFERENCES topics(topic_id) ON DELETE CASCADE,
    notification_level INTEGER NOT NULL CHECK (notification_level BETWEEN 0 AND 3),
    notifications_reason_id INTEGER,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (user_id, topic_id)
);

CREATE TABLE IF NOT EXISTS tag_changes (
    change_id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic_id INTEGER NOT NULL REFERENCES topics(topic_id) ON DELETE CASCADE,
    previous_tags TEXT,
    current_tags TEXT,
    recorded_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: read-path indexes for tag lookups and fanout.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_topic_tags_tag
    ON topic_tags(tag, topic_id);

CREATE INDEX IF NOT EXISTS idx_user_preferences_key
    ON user_preferences(pref_key, level, user_id);

CREATE INDEX IF NOT EXISTS idx_topic_users_topic
    ON topic_users(topic_id, user_id);

CREATE INDEX IF NOT EXISTS idx_tag_changes_topic
    ON tag_changes(topic_id, change_id DESC);

CREATE INDEX IF NOT EXISTS idx_topics_created
    ON topics(created_at_us DESC, topic_id DESC);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by tag lookup and fanout query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_topic_tags_tag",
    "idx_user_preferences_key",
    "idx_topic_users_topic",
    "idx_tag_changes_topic",
    "idx_topics_created",
];

#[cfg(test)]
mod tests {
    use crate::db::migrations;
    use rusqlite::{Connection, params};

    fn seeded_conn() -> rusqlite::Result<Connection> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn)?;

        for idx in 0..24_i64 {
            conn.execute(
                "INSERT INTO topics (topic_id, title, created_at_us, updated_at_us)
                 VALUES (?1, ?2, ?1, ?1)",
                params![idx + 1, format!("Topic {idx}")],
            )?;
            let tag = if idx % 3 == 0 { "release" } else { "support" };
            conn.execute(
                "INSERT INTO topic_tags (topic_id, position, tag) VALUES (?1, 0, ?2)",
                params![idx + 1, tag],
            )?;
            conn.execute(
                "INSERT INTO users (user_id, username, trust_level, created_at_us)
                 VALUES (?1, ?2, 1, 0)",
                params![idx + 1, format!("user{idx}")],
            )?;
            conn.execute(
                "INSERT INTO user_preferences (user_id, pref_key, level, updated_at_us)
                 VALUES (?1, 'tags_notification:release', 3, 0)",
                params![idx + 1],
            )?;
        }

        Ok(conn)
    }

    fn query_plan_details(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
        stmt.query_map([], |row| row.get::<_, String>(3))?
            .collect::<Result<Vec<_>, _>>()
    }

    #[test]
    fn query_plan_uses_tag_lookup_index() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(
            &conn,
            "SELECT topic_id
             FROM topic_tags
             WHERE tag = 'release'",
        )?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_topic_tags_tag")),
            "expected tag index in plan, got: {details:?}"
        );

        Ok(())
    }

    #[test]
    fn query_plan_uses_preference_key_index() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(
            &conn,
            "SELECT user_id
             FROM user_preferences
             WHERE pref_key IN ('tags_notification:release') AND level <> 1",
        )?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_user_preferences_key")),
            "expected preference key index in plan, got: {details:?}"
        );

        Ok(())
    }

    #[test]
    fn duplicate_tag_on_one_topic_is_rejected() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let result = conn.execute(
            "INSERT INTO topic_tags (topic_id, position, tag) VALUES (1, 1, 'release')",
            [],
        );
        assert!(result.is_err(), "topic_tags must reject a repeated tag");
        Ok(())
    }

    #[test]
    fn out_of_range_levels_are_rejected() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let result = conn.execute(
            "INSERT INTO topic_users (user_id, topic_id, notification_level, created_at_us)
             VALUES (1, 1, 7, 0)",
            [],
        );
        assert!(result.is_err(), "notification_level must stay within 0..=3");
        Ok(())
    }
}
