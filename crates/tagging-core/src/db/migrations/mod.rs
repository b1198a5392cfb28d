//! Schema versions for the tagging store.
//!
//! V1 creates the topic, user, tag, preference and audit tables; V2 adds the
//! lookup indexes the resolver and fanout rely on. The applied version is
//! kept in `PRAGMA user_version` and mirrored in the single `store_meta` row
//! so `tg init` can report it.

use super::schema;
use rusqlite::{Connection, types::Type};

/// Version a freshly opened store ends up at.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

const MIGRATIONS: &[(u32, &str)] = &[(1, schema::MIGRATION_V1_SQL), (2, schema::MIGRATION_V2_SQL)];

/// Schema version of the store behind `conn`; `0` for an empty file.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or holds a negative value.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Bring the store up to [`LATEST_SCHEMA_VERSION`] and return the version
/// reached.
///
/// A store that is already current is left untouched, so every connection
/// may call this on open. Each version step commits on its own; a failing
/// step leaves the store at the previous version.
///
/// # Errors
///
/// Returns the SQLite error of the first step that fails.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let mut current = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", i64::from(*version))?;
        tx.execute(
            "UPDATE store_meta SET schema_version = ?1 WHERE id = 1",
            [i64::from(*version)],
        )?;
        tx.commit()?;
        tracing::debug!(version, "applied tagging store migration");
        current = *version;
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::{LATEST_SCHEMA_VERSION, current_schema_version, migrate};
    use crate::db::schema;
    use rusqlite::{Connection, params};

    fn sqlite_object_exists(
        conn: &Connection,
        object_type: &str,
        object_name: &str,
    ) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            )",
            params![object_type, object_name],
            |row| row.get(0),
        )
    }

    #[test]
    fn migrate_empty_db_to_latest() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        let applied = migrate(&mut conn)?;
        assert_eq!(applied, LATEST_SCHEMA_VERSION);
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);

        for table in [
            "topics",
            "users",
            "topic_tags",
            "user_preferences",
            "topic_users",
            "tag_changes",
            "store_meta",
        ] {
            assert!(sqlite_object_exists(&conn, "table", table)?, "missing table {table}");
        }

        for index in schema::REQUIRED_INDEXES {
            assert!(
                sqlite_object_exists(&conn, "index", index)?,
                "missing expected index {index}"
            );
        }

        Ok(())
    }

    #[test]
    fn migrate_is_idempotent() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);

        let meta_rows: i64 =
            conn.query_row("SELECT COUNT(*) FROM store_meta", [], |row| row.get(0))?;
        assert_eq!(meta_rows, 1);

        let schema_version: i64 = conn.query_row(
            "SELECT schema_version FROM store_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(schema_version, i64::from(LATEST_SCHEMA_VERSION));

        Ok(())
    }

    #[test]
    fn migrate_upgrades_from_v1_and_keeps_rows() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        conn.execute_batch(schema::MIGRATION_V1_SQL)?;
        conn.pragma_update(None, "user_version", 1_i64)?;
        conn.execute(
            "INSERT INTO topics (topic_id, title, created_at_us, updated_at_us)
             VALUES (1, 'Welcome', 1, 1)",
            [],
        )?;
        conn.execute(
            "INSERT INTO topic_tags (topic_id, position, tag) VALUES (1, 0, 'meta')",
            [],
        )?;

        let applied = migrate(&mut conn)?;
        assert_eq!(applied, LATEST_SCHEMA_VERSION);
        assert!(sqlite_object_exists(&conn, "index", "idx_topic_tags_tag")?);

        let tag: String = conn.query_row(
            "SELECT tag FROM topic_tags WHERE topic_id = 1",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(tag, "meta");

        Ok(())
    }
}
