//! Capability checks for tag edits.

use rusqlite::Connection;

use crate::config::TaggingConfig;
use crate::db::users::get_user;
use crate::error::TaggingError;
use crate::model::UserId;

/// Answers what the acting user may do during a tag edit.
pub trait CapabilityContext {
    /// Whether the actor may introduce tags no topic carries yet.
    fn can_create_tag(&self) -> bool;
}

/// The user performing an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub trust_level: u8,
}

/// Trust-level based [`CapabilityContext`].
///
/// Anonymous actors may never create tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guardian {
    actor: Option<Actor>,
    min_trust_to_create_tag: u8,
}

impl Guardian {
    #[must_use]
    pub const fn new(actor: Option<Actor>, min_trust_to_create_tag: u8) -> Self {
        Self {
            actor,
            min_trust_to_create_tag,
        }
    }

    #[must_use]
    pub const fn anonymous(config: &TaggingConfig) -> Self {
        Self::new(None, config.min_trust_to_create_tag)
    }

    /// Build a guardian for a stored user, reading their trust level.
    ///
    /// # Errors
    ///
    /// Returns [`TaggingError::UserNotFound`] if the user does not exist, or
    /// [`TaggingError::Store`] if the lookup fails.
    pub fn for_user(
        conn: &Connection,
        user_id: UserId,
        config: &TaggingConfig,
    ) -> Result<Self, TaggingError> {
        let user = get_user(conn, user_id)?.ok_or(TaggingError::UserNotFound(user_id))?;
        Ok(Self::new(
            Some(Actor {
                user_id: user.user_id,
                trust_level: user.trust_level,
            }),
            config.min_trust_to_create_tag,
        ))
    }
}

impl CapabilityContext for Guardian {
    fn can_create_tag(&self) -> bool {
        self.actor
            .is_some_and(|actor| actor.trust_level >= self.min_trust_to_create_tag)
    }
}
