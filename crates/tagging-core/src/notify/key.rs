//! Tag ↔ per-user preference key.

use crate::model::tag::Tag;
use crate::tags::normalize::TagNormalizer;

/// Prefix shared by every per-tag notification key.
pub const NOTIFICATION_KEY_PREFIX: &str = "tags_notification:";

/// Maps a tag to the key its notification level is stored under.
///
/// Keys are a fixed prefix followed by the tag, so stripping the prefix
/// recovers the tag and two distinct tags never share a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationKeyCodec;

impl NotificationKeyCodec {
    #[must_use]
    pub fn key_for(tag: &Tag) -> String {
        format!("{NOTIFICATION_KEY_PREFIX}{tag}")
    }

    /// Keys for a batch of tags, in input order.
    #[must_use]
    pub fn keys_for(tags: &[Tag]) -> Vec<String> {
        tags.iter().map(Self::key_for).collect()
    }

    /// Inverse of [`Self::key_for`]. Returns `None` for keys this codec did
    /// not produce, including keys whose suffix is not a canonical tag.
    #[must_use]
    pub fn tag_for(key: &str, normalizer: &TagNormalizer) -> Option<Tag> {
        let raw = key.strip_prefix(NOTIFICATION_KEY_PREFIX)?;
        let tag = normalizer.normalize(raw);
        (!tag.is_empty() && tag.as_str() == raw).then_some(tag)
    }
}
