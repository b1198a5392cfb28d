//! User rows: identity plus the trust level used for tag-creation checks.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use super::now_us;
use crate::model::UserId;

/// Highest trust level a user can hold.
pub const MAX_TRUST_LEVEL: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub trust_level: u8,
}

/// Insert a user and return its id.
///
/// # Errors
///
/// Returns an error if the username is taken or `trust_level` exceeds
/// [`MAX_TRUST_LEVEL`].
pub fn insert_user(conn: &Connection, username: &str, trust_level: u8) -> rusqlite::Result<UserId> {
    conn.execute(
        "INSERT INTO users (username, trust_level, created_at_us) VALUES (?1, ?2, ?3)",
        params![username, trust_level, now_us()],
    )?;
    Ok(UserId::new(conn.last_insert_rowid()))
}

/// Fetch one user by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_user(conn: &Connection, user_id: UserId) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT user_id, username, trust_level FROM users WHERE user_id = ?1",
        [user_id],
        map_user,
    )
    .optional()
}

/// Fetch one user by username.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_user(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT user_id, username, trust_level FROM users WHERE username = ?1",
        [username],
        map_user,
    )
    .optional()
}

/// Change a user's trust level. Returns `false` when the user does not exist.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn set_trust_level(conn: &Connection, user_id: UserId, trust_level: u8) -> rusqlite::Result<bool> {
    let updated = conn.execute(
        "UPDATE users SET trust_level = ?1 WHERE user_id = ?2",
        params![trust_level, user_id],
    )?;
    Ok(updated > 0)
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        username: row.get(1)?,
        trust_level: row.get(2)?,
    })
}
