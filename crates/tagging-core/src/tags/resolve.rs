//! Raw tag list → final tag set for one topic edit.
//!
//! Steps: normalize, drop empties, dedupe (first occurrence wins), drop
//! tags the actor may not create, cap at `max_tags`. Nothing here is an
//! error: a fully filtered list is a valid, empty result.

use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use super::normalize::TagNormalizer;
use crate::config::TaggingConfig;
use crate::db::tags::tag_counts;
use crate::error::TaggingError;
use crate::model::tag::Tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSetResolver {
    normalizer: TagNormalizer,
    max_tags: usize,
}

impl TagSetResolver {
    #[must_use]
    pub const fn new(normalizer: TagNormalizer, max_tags: usize) -> Self {
        Self {
            normalizer,
            max_tags,
        }
    }

    #[must_use]
    pub const fn from_config(config: &TaggingConfig) -> Self {
        Self::new(
            TagNormalizer::new(config.max_tag_length),
            config.max_tags_per_topic,
        )
    }

    #[must_use]
    pub const fn normalizer(&self) -> &TagNormalizer {
        &self.normalizer
    }

    #[must_use]
    pub const fn max_tags(&self) -> usize {
        self.max_tags
    }

    /// Normalized, non-empty, de-duplicated tags in first-occurrence order.
    #[must_use]
    pub fn candidates<S: AsRef<str>>(&self, raw_tags: &[S]) -> Vec<Tag> {
        let mut seen = HashSet::new();
        raw_tags
            .iter()
            .map(|raw| self.normalizer.normalize(raw.as_ref()))
            .filter(|tag| !tag.is_empty())
            .filter(|tag| seen.insert(tag.clone()))
            .collect()
    }

    /// Resolve against an already-fetched usage map.
    ///
    /// When `can_create` is false, only tags that are keys of
    /// `existing_tag_counts` survive.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(
        &self,
        raw_tags: &[S],
        can_create: bool,
        existing_tag_counts: &HashMap<Tag, usize>,
    ) -> Vec<Tag> {
        let candidates = self.candidates(raw_tags);
        self.finish(candidates, can_create, existing_tag_counts)
    }

    /// Resolve, looking up tag existence in the store.
    ///
    /// The lookup is a single query over the whole candidate set and is
    /// skipped entirely when the actor may create tags.
    ///
    /// # Errors
    ///
    /// Returns [`TaggingError::Store`] if the existence lookup fails.
    pub fn resolve_in_store<S: AsRef<str>>(
        &self,
        conn: &Connection,
        raw_tags: &[S],
        can_create: bool,
    ) -> Result<Vec<Tag>, TaggingError> {
        let candidates = self.candidates(raw_tags);
        let existing = if can_create || candidates.is_empty() {
            HashMap::new()
        } else {
            tag_counts(conn, &candidates)?
        };
        Ok(self.finish(candidates, can_create, &existing))
    }

    fn finish(
        &self,
        mut tags: Vec<Tag>,
        can_create: bool,
        existing_tag_counts: &HashMap<Tag, usize>,
    ) -> Vec<Tag> {
        if !can_create {
            tags.retain(|tag| {
                let known = existing_tag_counts.contains_key(tag);
                if !known {
                    debug!(tag = %tag, "dropping tag the actor may not create");
                }
                known
            });
        }

        if tags.len() > self.max_tags {
            info!(
                requested = tags.len(),
                max_tags = self.max_tags,
                dropped = ?&tags[self.max_tags..],
                "truncating tag set to per-topic maximum"
            );
            tags.truncate(self.max_tags);
        }

        tags
    }
}
