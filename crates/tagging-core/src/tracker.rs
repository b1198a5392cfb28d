//! Entry point for topic create/edit events.
//!
//! One call is one transition: resolve the proposed tags, persist the new
//! set together with its audit row, then fan out notification state for the
//! tags the topic just gained.
//!
//! # Invariants
//!
//! - The previous set is read inside the same `BEGIN IMMEDIATE` transaction
//!   that writes the new one, so the delta never comes from a stale copy.
//! - The tag set and its audit row commit together or not at all.
//! - Fanout runs only after that commit; a fanout failure leaves the new set
//!   in place and is reported as [`TaggingError::Fanout`], which is safe to
//!   retry.
//! - Removed or unchanged tags never trigger fanout.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::TaggingConfig;
use crate::db::tags::{clear_topic_tags, record_tag_change, replace_topic_tags, topic_tag_set};
use crate::db::topics::topic_exists;
use crate::error::TaggingError;
use crate::guardian::CapabilityContext;
use crate::model::TopicId;
use crate::model::tag::{Tag, TagChange, TopicTagSet};
use crate::notify::fanout::{FanoutReport, NotificationFanout};
use crate::tags::resolve::TagSetResolver;

/// Name of the topic field this tracker owns.
pub const TAGS_FIELD: &str = "tags";

/// One tracked field change, as delivered by the revision pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    /// The pipeline's view of the field before the edit. Informational; the
    /// tracker re-reads the stored set.
    pub old_value: Option<Vec<String>>,
    /// Proposed raw tags. `None` or empty clears the field.
    pub new_value: Option<Vec<String>>,
}

impl FieldChange {
    #[must_use]
    pub fn tags(old_value: Option<Vec<String>>, new_value: Option<Vec<String>>) -> Self {
        Self {
            field: TAGS_FIELD.to_string(),
            old_value,
            new_value,
        }
    }
}

/// What one tracked edit did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagChangeOutcome {
    pub change: TagChange,
    /// Tags present now that were not present before.
    pub added: Vec<Tag>,
    /// `None` when there was nothing to fan out.
    pub fanout: Option<FanoutReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Create,
    Edit,
}

pub struct TagChangeTracker<'conn> {
    conn: &'conn Connection,
    resolver: TagSetResolver,
    enabled: bool,
}

impl<'conn> TagChangeTracker<'conn> {
    #[must_use]
    pub const fn new(conn: &'conn Connection, config: &TaggingConfig) -> Self {
        Self {
            conn,
            resolver: TagSetResolver::from_config(config),
            enabled: config.tagging_enabled,
        }
    }

    /// Handle one field change from the revision pipeline.
    ///
    /// Returns `Ok(None)` for fields other than [`TAGS_FIELD`] and when
    /// tagging is disabled.
    ///
    /// # Errors
    ///
    /// - [`TaggingError::TopicNotFound`] if the topic does not exist
    /// - [`TaggingError::Store`] if resolving or persisting fails (nothing
    ///   is written)
    /// - [`TaggingError::Fanout`] if the set was persisted but fanout failed
    pub fn on_field_change(
        &self,
        topic_id: TopicId,
        change: &FieldChange,
        ctx: &dyn CapabilityContext,
    ) -> Result<Option<TagChangeOutcome>, TaggingError> {
        if !self.enabled || change.field != TAGS_FIELD {
            return Ok(None);
        }

        match change.new_value.as_deref() {
            None | Some([]) => self.clear(topic_id).map(Some),
            Some(raw) => {
                self.transition(topic_id, raw, ctx, change.old_value.as_deref(), Trigger::Edit)
            }
        }
    }

    /// Handle a freshly created topic. A topic created without usable tags
    /// is left untouched and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::on_field_change`].
    pub fn on_topic_created<S: AsRef<str>>(
        &self,
        topic_id: TopicId,
        raw_tags: &[S],
        ctx: &dyn CapabilityContext,
    ) -> Result<Option<TagChangeOutcome>, TaggingError> {
        if !self.enabled || raw_tags.is_empty() {
            return Ok(None);
        }
        self.transition(topic_id, raw_tags, ctx, None, Trigger::Create)
    }

    fn transition<S: AsRef<str>>(
        &self,
        topic_id: TopicId,
        raw_tags: &[S],
        ctx: &dyn CapabilityContext,
        reported_previous: Option<&[String]>,
        trigger: Trigger,
    ) -> Result<Option<TagChangeOutcome>, TaggingError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !topic_exists(&tx, topic_id)? {
            return Err(TaggingError::TopicNotFound(topic_id));
        }

        let previous = topic_tag_set(&tx, topic_id)?;
        if let Some(reported) = reported_previous.filter(|r| !same_tags(r, &previous)) {
            debug!(topic_id = %topic_id, ?reported, stored = ?previous, "ignoring stale previous tag set");
        }

        let resolved = self
            .resolver
            .resolve_in_store(&tx, raw_tags, ctx.can_create_tag())?;
        let current = TopicTagSet::from_tags(resolved);

        if trigger == Trigger::Create && current.is_empty() {
            return Ok(None);
        }

        let added = current.added_since(&previous);
        replace_topic_tags(&tx, topic_id, &current)?;
        let change = TagChange {
            topic_id,
            previous: non_empty(previous),
            current: Some(current),
        };
        record_tag_change(&tx, &change)?;
        tx.commit()?;

        info!(
            topic_id = %topic_id,
            tags = ?change.current,
            added = added.len(),
            "persisted topic tag set"
        );

        let fanout = self.fan_out(topic_id, &added)?;
        Ok(Some(TagChangeOutcome {
            change,
            added,
            fanout,
        }))
    }

    fn clear(&self, topic_id: TopicId) -> Result<TagChangeOutcome, TaggingError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !topic_exists(&tx, topic_id)? {
            return Err(TaggingError::TopicNotFound(topic_id));
        }

        let previous = topic_tag_set(&tx, topic_id)?;
        clear_topic_tags(&tx, topic_id)?;
        let change = TagChange {
            topic_id,
            previous: non_empty(previous),
            current: None,
        };
        record_tag_change(&tx, &change)?;
        tx.commit()?;

        info!(topic_id = %topic_id, "cleared topic tag set");
        Ok(TagChangeOutcome {
            change,
            added: Vec::new(),
            fanout: None,
        })
    }

    fn fan_out(
        &self,
        topic_id: TopicId,
        added: &[Tag],
    ) -> Result<Option<FanoutReport>, TaggingError> {
        if added.is_empty() {
            return Ok(None);
        }

        NotificationFanout::new(self.conn)
            .apply(added, topic_id)
            .map(Some)
            .map_err(|source| {
                warn!(
                    topic_id = %topic_id,
                    pending = ?added,
                    error = %source,
                    "tag fanout failed after tag set was persisted"
                );
                TaggingError::Fanout {
                    topic_id,
                    pending: added.to_vec(),
                    source,
                }
            })
    }
}

fn non_empty(set: TopicTagSet) -> Option<TopicTagSet> {
    (!set.is_empty()).then_some(set)
}

fn same_tags(reported: &[String], stored: &TopicTagSet) -> bool {
    reported.len() == stored.len()
        && reported
            .iter()
            .zip(stored.iter())
            .all(|(raw, tag)| raw == tag.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::db::tags::{tag_change_history, topic_tag_set};
    use crate::db::topics::insert_topic;

    struct AllowAll;

    impl CapabilityContext for AllowAll {
        fn can_create_tag(&self) -> bool {
            true
        }
    }

    fn raw(tags: &[&str]) -> Option<Vec<String>> {
        Some(tags.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn other_fields_are_ignored() {
        let conn = open_in_memory().expect("open store");
        let topic = insert_topic(&conn, "Topic").expect("insert topic");
        let tracker = TagChangeTracker::new(&conn, &TaggingConfig::default());

        let change = FieldChange {
            field: "title".to_string(),
            old_value: None,
            new_value: raw(&["alpha"]),
        };
        assert!(tracker.on_field_change(topic, &change, &AllowAll).expect("edit").is_none());
        assert!(topic_tag_set(&conn, topic).expect("read").is_empty());
    }

    #[test]
    fn disabled_tagging_is_a_no_op() {
        let conn = open_in_memory().expect("open store");
        let topic = insert_topic(&conn, "Topic").expect("insert topic");
        let config = TaggingConfig {
            tagging_enabled: false,
            ..TaggingConfig::default()
        };
        let tracker = TagChangeTracker::new(&conn, &config);

        let outcome = tracker
            .on_field_change(topic, &FieldChange::tags(None, raw(&["alpha"])), &AllowAll)
            .expect("edit");
        assert!(outcome.is_none());
        assert!(
            tracker
                .on_topic_created(topic, &["alpha"], &AllowAll)
                .expect("create")
                .is_none()
        );
        assert!(topic_tag_set(&conn, topic).expect("read").is_empty());
    }

    #[test]
    fn missing_topic_is_reported_and_nothing_written() {
        let conn = open_in_memory().expect("open store");
        let tracker = TagChangeTracker::new(&conn, &TaggingConfig::default());

        let err = tracker
            .on_field_change(TopicId::new(99), &FieldChange::tags(None, raw(&["alpha"])), &AllowAll)
            .expect_err("missing topic");
        assert!(matches!(err, TaggingError::TopicNotFound(_)));
        assert!(conn.is_autocommit(), "transaction must be closed");
    }

    #[test]
    fn edit_records_audit_row_with_previous_and_current() {
        let conn = open_in_memory().expect("open store");
        let topic = insert_topic(&conn, "Topic").expect("insert topic");
        let tracker = TagChangeTracker::new(&conn, &TaggingConfig::default());

        tracker
            .on_field_change(topic, &FieldChange::tags(None, raw(&["alpha"])), &AllowAll)
            .expect("first edit");
        let outcome = tracker
            .on_field_change(
                topic,
                &FieldChange::tags(raw(&["alpha"]), raw(&["alpha", "beta"])),
                &AllowAll,
            )
            .expect("second edit")
            .expect("outcome");

        assert_eq!(outcome.added, vec!["beta"]);
        let history = tag_change_history(&conn, topic, None).expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].change, outcome.change);
    }

    #[test]
    fn creation_without_usable_tags_writes_nothing() {
        let conn = open_in_memory().expect("open store");
        let topic = insert_topic(&conn, "Topic").expect("insert topic");
        let tracker = TagChangeTracker::new(&conn, &TaggingConfig::default());

        let outcome = tracker
            .on_topic_created(topic, &["  ", "#?"], &AllowAll)
            .expect("create");
        assert!(outcome.is_none());
        assert!(tag_change_history(&conn, topic, None).expect("history").is_empty());
    }

    #[test]
    fn stale_pipeline_value_does_not_change_delta() {
        let conn = open_in_memory().expect("open store");
        let topic = insert_topic(&conn, "Topic").expect("insert topic");
        let tracker = TagChangeTracker::new(&conn, &TaggingConfig::default());

        tracker
            .on_topic_created(topic, &["alpha", "beta"], &AllowAll)
            .expect("create");

        // Pipeline believes the topic had no tags; stored set says otherwise.
        let outcome = tracker
            .on_field_change(
                topic,
                &FieldChange::tags(None, raw(&["alpha", "beta", "gamma"])),
                &AllowAll,
            )
            .expect("edit")
            .expect("outcome");
        assert_eq!(outcome.added, vec!["gamma"]);
    }
}
