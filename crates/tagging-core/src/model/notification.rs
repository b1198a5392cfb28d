use rusqlite::ToSql;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::tag::Tag;
use super::{TopicId, UserId};
use crate::error::TaggingError;

/// How closely a user follows a topic, or every topic carrying a tag.
///
/// Discriminants are the integers persisted in `user_preferences.level` and
/// `topic_users.notification_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Muted = 0,
    Regular = 1,
    Tracking = 2,
    Watching = 3,
}

impl Default for NotificationLevel {
    fn default() -> Self {
        Self::Regular
    }
}

impl NotificationLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Muted => "muted",
            Self::Regular => "regular",
            Self::Tracking => "tracking",
            Self::Watching => "watching",
        }
    }

    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for NotificationLevel {
    type Error = TaggingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Muted),
            1 => Ok(Self::Regular),
            2 => Ok(Self::Tracking),
            3 => Ok(Self::Watching),
            other => Err(TaggingError::InvalidLevel(other)),
        }
    }
}

impl FromStr for NotificationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "muted" | "0" => Ok(Self::Muted),
            "regular" | "1" => Ok(Self::Regular),
            "tracking" | "2" => Ok(Self::Tracking),
            "watching" | "3" => Ok(Self::Watching),
            other => Err(format!(
                "unknown notification level '{other}' (expected muted, regular, tracking or watching)"
            )),
        }
    }
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for NotificationLevel {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_i64()))
    }
}

impl FromSql for NotificationLevel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;
        Self::try_from(raw).map_err(|_| FromSqlError::OutOfRange(raw))
    }
}

/// Why a `topic_users` row exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationReason {
    CreatedTopic = 1,
    UserChanged = 2,
    UserInteracted = 3,
    CreatedPost = 4,
    AutoWatch = 5,
    AutoWatchCategory = 6,
    AutoMuteCategory = 7,
    AutoTrackCategory = 8,
    /// Set by tag fanout.
    PluginChanged = 9,
}

impl NotificationReason {
    #[must_use]
    pub const fn id(self) -> i64 {
        self as i64
    }

    #[must_use]
    pub const fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::CreatedTopic),
            2 => Some(Self::UserChanged),
            3 => Some(Self::UserInteracted),
            4 => Some(Self::CreatedPost),
            5 => Some(Self::AutoWatch),
            6 => Some(Self::AutoWatchCategory),
            7 => Some(Self::AutoMuteCategory),
            8 => Some(Self::AutoTrackCategory),
            9 => Some(Self::PluginChanged),
            _ => None,
        }
    }
}

/// A user's notification level for every topic carrying `tag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPreference {
    pub user_id: UserId,
    pub tag: Tag,
    pub level: NotificationLevel,
}

/// A user's notification state for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicNotificationState {
    pub user_id: UserId,
    pub topic_id: TopicId,
    pub level: NotificationLevel,
    /// `None` when the stored reason id is not a known [`NotificationReason`].
    pub reason: Option<NotificationReason>,
}

#[cfg(test)]
mod tests {
    use super::{NotificationLevel, NotificationReason};

    #[test]
    fn levels_round_trip_through_storage_integers() {
        for level in [
            NotificationLevel::Muted,
            NotificationLevel::Regular,
            NotificationLevel::Tracking,
            NotificationLevel::Watching,
        ] {
            assert_eq!(NotificationLevel::try_from(level.as_i64()).ok(), Some(level));
        }
        assert!(NotificationLevel::try_from(4).is_err());
        assert!(NotificationLevel::try_from(-1).is_err());
    }

    #[test]
    fn levels_parse_names_and_numbers() {
        assert_eq!("Watching".parse::<NotificationLevel>(), Ok(NotificationLevel::Watching));
        assert_eq!(" 0 ".parse::<NotificationLevel>(), Ok(NotificationLevel::Muted));
        assert!("loud".parse::<NotificationLevel>().is_err());
    }

    #[test]
    fn default_level_is_regular() {
        assert_eq!(NotificationLevel::default(), NotificationLevel::Regular);
    }

    #[test]
    fn plugin_changed_reason_id_is_stable() {
        assert_eq!(NotificationReason::PluginChanged.id(), 9);
        assert_eq!(NotificationReason::from_id(9), Some(NotificationReason::PluginChanged));
        assert_eq!(NotificationReason::from_id(42), None);
    }
}
