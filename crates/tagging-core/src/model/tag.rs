use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

use super::TopicId;

/// A canonical tag.
///
/// Values only come out of [`crate::tags::normalize::TagNormalizer`] or out of
/// the store (which only ever holds normalized values), so every `Tag` is
/// lower-case, trimmed, length-capped and free of forbidden characters. The
/// normalizer may yield an empty tag; callers discard those.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub(crate) const fn from_normalized(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl ToSql for Tag {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

/// The ordered, duplicate-free tags of one topic.
///
/// Order is first-occurrence order from the edit that produced the set.
/// An empty set means the topic carries no tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TopicTagSet {
    tags: Vec<Tag>,
}

impl TopicTagSet {
    /// Build a set from an already-resolved tag list.
    ///
    /// Empty and repeated entries are skipped so the set invariant holds
    /// even for hand-built input.
    #[must_use]
    pub fn from_tags(tags: impl IntoIterator<Item = Tag>) -> Self {
        let mut set = Self::default();
        for tag in tags {
            if !tag.is_empty() && !set.contains(tag.as_str()) {
                set.tags.push(tag);
            }
        }
        set
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.as_str() == tag)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Tag] {
        &self.tags
    }

    /// Tags present in `self` that were not present in `previous`, in
    /// `self`'s order.
    #[must_use]
    pub fn added_since(&self, previous: &Self) -> Vec<Tag> {
        self.tags
            .iter()
            .filter(|tag| !previous.contains(tag.as_str()))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Tag> {
        self.tags
    }
}

impl<'a> IntoIterator for &'a TopicTagSet {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

/// Audit record of one tag-set edit.
///
/// `None` means the topic carried no tags field: `previous` on a topic that
/// was never tagged, `current` when the edit cleared the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagChange {
    pub topic_id: TopicId,
    pub previous: Option<TopicTagSet>,
    pub current: Option<TopicTagSet>,
}
