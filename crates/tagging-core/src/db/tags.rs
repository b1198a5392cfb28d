//! Topic tag sets and tag usage queries.
//!
//! All functions take a shared `&Connection` and return typed values. Write
//! helpers do not open their own transaction; callers that need an edit to
//! be atomic (the change tracker) wrap them in one.

use rusqlite::{Connection, params};
use serde::Serialize;
use std::collections::HashMap;

use super::now_us;
use super::topics::touch_topic;
use crate::model::TopicId;
use crate::model::tag::{Tag, TagChange, TopicTagSet};

/// Default number of tags in a tag cloud.
pub const DEFAULT_CLOUD_LIMIT: u32 = 300;

/// Default number of tag search results.
pub const DEFAULT_SEARCH_LIMIT: u32 = 5;

/// Tag with the number of topics carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: Tag,
    pub count: usize,
}

/// Most-used tags, sorted by name, with the count range for scaling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagCloud {
    pub cloud: Vec<TagCount>,
    pub max_count: usize,
    /// `None` when the cloud is empty.
    pub min_count: Option<usize>,
}

/// A persisted [`TagChange`] with its audit metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagChangeRecord {
    pub change_id: i64,
    pub change: TagChange,
    pub recorded_at_us: i64,
}

fn count_from_sql(count: i64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}

// ---------------------------------------------------------------------------
// Tag sets
// ---------------------------------------------------------------------------

/// Read a topic's tag set in stored order. A topic without tags (or that
/// does not exist) yields an empty set.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn topic_tag_set(conn: &Connection, topic_id: TopicId) -> rusqlite::Result<TopicTagSet> {
    let mut stmt = conn.prepare(
        "SELECT tag FROM topic_tags WHERE topic_id = ?1 ORDER BY position",
    )?;
    let tags = stmt
        .query_map([topic_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TopicTagSet::from_tags(tags.into_iter().map(Tag::from_normalized)))
}

/// Replace a topic's tag set with `tags`.
///
/// # Errors
///
/// Returns an error if any statement fails; wrap in a transaction to keep
/// the replacement atomic.
pub fn replace_topic_tags(
    conn: &Connection,
    topic_id: TopicId,
    tags: &TopicTagSet,
) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM topic_tags WHERE topic_id = ?1", [topic_id])?;

    let mut insert =
        conn.prepare("INSERT INTO topic_tags (topic_id, position, tag) VALUES (?1, ?2, ?3)")?;
    for (position, tag) in tags.iter().enumerate() {
        insert.execute(params![topic_id, i64::try_from(position).unwrap_or(i64::MAX), tag])?;
    }

    touch_topic(conn, topic_id)
}

/// Remove every tag from a topic.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn clear_topic_tags(conn: &Connection, topic_id: TopicId) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM topic_tags WHERE topic_id = ?1", [topic_id])?;
    touch_topic(conn, topic_id)
}

/// Append a tag-set edit to the audit log, returning its id.
///
/// # Errors
///
/// Returns an error if serialization or the insert fails.
pub fn record_tag_change(conn: &Connection, change: &TagChange) -> rusqlite::Result<i64> {
    let encode = |set: &Option<TopicTagSet>| -> rusqlite::Result<Option<String>> {
        set.as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))
    };

    conn.execute(
        "INSERT INTO tag_changes (topic_id, previous_tags, current_tags, recorded_at_us)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            change.topic_id,
            encode(&change.previous)?,
            encode(&change.current)?,
            now_us()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Audit history for a topic, newest first.
///
/// # Errors
///
/// Returns an error if the query fails or a stored tag list is not valid
/// JSON.
pub fn tag_change_history(
    conn: &Connection,
    topic_id: TopicId,
    limit: Option<u32>,
) -> rusqlite::Result<Vec<TagChangeRecord>> {
    let limit_clause = limit.map_or_else(String::new, |limit| format!(" LIMIT {limit}"));
    let sql = format!(
        "SELECT change_id, previous_tags, current_tags, recorded_at_us
         FROM tag_changes WHERE topic_id = ?1
         ORDER BY change_id DESC{limit_clause}"
    );

    let decode = |column: usize, raw: Option<String>| -> rusqlite::Result<Option<TopicTagSet>> {
        raw.map(|json| {
            serde_json::from_str::<Vec<String>>(&json)
                .map(|tags| TopicTagSet::from_tags(tags.into_iter().map(Tag::from_normalized)))
                .map_err(|error| {
                    rusqlite::Error::FromSqlConversionFailure(
                        column,
                        rusqlite::types::Type::Text,
                        Box::new(error),
                    )
                })
        })
        .transpose()
    };

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([topic_id], |row| {
        Ok(TagChangeRecord {
            change_id: row.get(0)?,
            change: TagChange {
                topic_id,
                previous: decode(1, row.get(1)?)?,
                current: decode(2, row.get(2)?)?,
            },
            recorded_at_us: row.get(3)?,
        })
    })?;
    rows.collect()
}

// ---------------------------------------------------------------------------
// Usage queries
// ---------------------------------------------------------------------------

/// Usage counts for `candidates`, in one query. Tags used on no topic are
/// absent from the map.
///
/// The candidates are bound as a single JSON array parameter, so the lookup
/// is not bounded by SQLite's host parameter limit.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn tag_counts(conn: &Connection, candidates: &[Tag]) -> rusqlite::Result<HashMap<Tag, usize>> {
    if candidates.is_empty() {
        return Ok(HashMap::new());
    }

    let encoded = serde_json::to_string(candidates)
        .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?;

    let mut stmt = conn.prepare(
        "SELECT tag, COUNT(*) FROM topic_tags
         WHERE tag IN (SELECT value FROM json_each(?1))
         GROUP BY tag",
    )?;
    let rows = stmt.query_map([encoded], |row| {
        Ok((
            Tag::from_normalized(row.get(0)?),
            count_from_sql(row.get(1)?),
        ))
    })?;
    rows.collect()
}

/// Most-used tags ordered by count desc then name.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn tags_by_count(conn: &Connection, limit: u32) -> rusqlite::Result<Vec<TagCount>> {
    let mut stmt = conn.prepare(
        "SELECT tt.tag, COUNT(*) AS count
         FROM topic_tags AS tt
         JOIN topics AS t ON t.topic_id = tt.topic_id
         GROUP BY tt.tag
         ORDER BY count DESC, tt.tag ASC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], map_tag_count)?;
    rows.collect()
}

/// The `limit` most-used tags, sorted by name, with min/max counts.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn tag_cloud(conn: &Connection, limit: u32) -> rusqlite::Result<TagCloud> {
    let mut cloud = tags_by_count(conn, limit)?;
    cloud.sort_by(|a, b| a.tag.cmp(&b.tag));

    let max_count = cloud.iter().map(|entry| entry.count).max().unwrap_or(0);
    let min_count = cloud.iter().map(|entry| entry.count).min();

    Ok(TagCloud {
        cloud,
        max_count,
        min_count,
    })
}

/// Tags containing `term`, most-used first.
///
/// The term is lower-cased and reduced to `[a-z0-9]`; an empty term matches
/// every tag. Lower-casing first means `RUST` searches for `rust` rather than
/// being stripped to the empty term.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn search_tags(conn: &Connection, term: &str, limit: u32) -> rusqlite::Result<Vec<TagCount>> {
    let needle: String = term
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();

    let mut stmt = conn.prepare(
        "SELECT tt.tag, COUNT(*) AS count
         FROM topic_tags AS tt
         JOIN topics AS t ON t.topic_id = tt.topic_id
         WHERE ?1 = '' OR tt.tag LIKE '%' || ?1 || '%'
         GROUP BY tt.tag
         ORDER BY count DESC, tt.tag ASC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![needle, limit], map_tag_count)?;
    rows.collect()
}

/// Topics carrying `tag`, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn topics_for_tag(conn: &Connection, tag: &Tag) -> rusqlite::Result<Vec<TopicId>> {
    let mut stmt = conn.prepare(
        "SELECT tt.topic_id
         FROM topic_tags AS tt
         JOIN topics AS t ON t.topic_id = tt.topic_id
         WHERE tt.tag = ?1
         ORDER BY t.created_at_us DESC, t.topic_id DESC",
    )?;
    let rows = stmt.query_map([tag], |row| row.get(0))?;
    rows.collect()
}

fn map_tag_count(row: &rusqlite::Row<'_>) -> rusqlite::Result<TagCount> {
    Ok(TagCount {
        tag: Tag::from_normalized(row.get(0)?),
        count: count_from_sql(row.get(1)?),
    })
}
