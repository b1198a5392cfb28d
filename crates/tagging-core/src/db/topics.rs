//! Topic rows. Topics themselves belong to the host application; the store
//! keeps just enough to anchor tag sets and notification state.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use super::now_us;
use crate::model::TopicId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    pub topic_id: TopicId,
    pub title: String,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// Insert a topic and return its id.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_topic(conn: &Connection, title: &str) -> rusqlite::Result<TopicId> {
    let now = now_us();
    conn.execute(
        "INSERT INTO topics (title, created_at_us, updated_at_us) VALUES (?1, ?2, ?2)",
        params![title, now],
    )?;
    Ok(TopicId::new(conn.last_insert_rowid()))
}

/// Fetch one topic.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_topic(conn: &Connection, topic_id: TopicId) -> rusqlite::Result<Option<Topic>> {
    conn.query_row(
        "SELECT topic_id, title, created_at_us, updated_at_us FROM topics WHERE topic_id = ?1",
        [topic_id],
        |row| {
            Ok(Topic {
                topic_id: row.get(0)?,
                title: row.get(1)?,
                created_at_us: row.get(2)?,
                updated_at_us: row.get(3)?,
            })
        },
    )
    .optional()
}

/// Whether a topic row exists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn topic_exists(conn: &Connection, topic_id: TopicId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM topics WHERE topic_id = ?1)",
        [topic_id],
        |row| row.get(0),
    )
}

pub(crate) fn touch_topic(conn: &Connection, topic_id: TopicId) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE topics SET updated_at_us = MAX(updated_at_us, ?1) WHERE topic_id = ?2",
        params![now_us(), topic_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn insert_then_get_round_trips_title() {
        let conn = open_in_memory().expect("open store");
        let id = insert_topic(&conn, "Welcome to the forum").expect("insert topic");

        let topic = get_topic(&conn, id).expect("query").expect("topic exists");
        assert_eq!(topic.title, "Welcome to the forum");
        assert_eq!(topic.created_at_us, topic.updated_at_us);
        assert!(topic_exists(&conn, id).expect("exists query"));
    }

    #[test]
    fn missing_topic_is_none() {
        let conn = open_in_memory().expect("open store");
        assert!(get_topic(&conn, TopicId::new(404)).expect("query").is_none());
        assert!(!topic_exists(&conn, TopicId::new(404)).expect("exists query"));
    }

    #[test]
    fn ids_are_assigned_in_order() {
        let conn = open_in_memory().expect("open store");
        let first = insert_topic(&conn, "one").expect("insert");
        let second = insert_topic(&conn, "two").expect("insert");
        assert!(second > first);
    }
}
