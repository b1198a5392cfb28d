use std::fmt;

use crate::model::tag::Tag;
use crate::model::{TopicId, UserId};

/// Machine-readable error codes for callers that branch on failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ConfigInvalid,
    TopicNotFound,
    UserNotFound,
    InvalidNotificationLevel,
    StoreUnavailable,
    FanoutFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::ConfigInvalid => "E1002",
            Self::TopicNotFound => "E2001",
            Self::UserNotFound => "E2002",
            Self::InvalidNotificationLevel => "E2003",
            Self::StoreUnavailable => "E5001",
            Self::FanoutFailed => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ConfigInvalid => "Config value out of range",
            Self::TopicNotFound => "Topic not found",
            Self::UserNotFound => "User not found",
            Self::InvalidNotificationLevel => "Invalid notification level",
            Self::StoreUnavailable => "Store read or write failed",
            Self::FanoutFailed => "Notification fanout failed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in tagging.toml and retry."),
            Self::ConfigInvalid => {
                Some("max_tag_length and max_tags_per_topic must both be at least 1.")
            }
            Self::TopicNotFound | Self::UserNotFound => None,
            Self::InvalidNotificationLevel => {
                Some("Use one of: muted (0), regular (1), tracking (2), watching (3).")
            }
            Self::StoreUnavailable => Some("Retry the edit once the database is reachable."),
            Self::FanoutFailed => Some(
                "Tags were saved. Retry the fanout; users already notified are skipped.",
            ),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Config files that load but cannot be used.
///
/// Read failures stay plain I/O errors; these variants carry the codes a
/// caller needs to point the user at the file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("tagging.{field} must be at least 1")]
    Invalid { field: &'static str },
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { .. } => ErrorCode::ConfigParseError,
            Self::Invalid { .. } => ErrorCode::ConfigInvalid,
        }
    }
}

/// Failures surfaced by tag-set edits, fanout and preference updates.
///
/// Dropped or truncated tags are never errors: partial acceptance is the
/// normal outcome of an edit.
#[derive(Debug, thiserror::Error)]
pub enum TaggingError {
    /// Any read or write against the underlying store failed.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The tag set was persisted but the notification fanout failed.
    ///
    /// `pending` holds the tags whose fanout should be retried.
    #[error("notification fanout failed for topic {topic_id} ({} pending tags): {source}", pending.len())]
    Fanout {
        topic_id: TopicId,
        pending: Vec<Tag>,
        #[source]
        source: rusqlite::Error,
    },

    #[error("topic not found: {0}")]
    TopicNotFound(TopicId),

    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// A stored or requested notification level is outside the known scale.
    #[error("invalid notification level: {0}")]
    InvalidLevel(i64),
}

impl TaggingError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Store(_) => ErrorCode::StoreUnavailable,
            Self::Fanout { .. } => ErrorCode::FanoutFailed,
            Self::TopicNotFound(_) => ErrorCode::TopicNotFound,
            Self::UserNotFound(_) => ErrorCode::UserNotFound,
            Self::InvalidLevel(_) => ErrorCode::InvalidNotificationLevel,
        }
    }

    /// Whether re-running the same call can succeed without changes.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Fanout { .. })
    }
}
