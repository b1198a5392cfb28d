//! tagging-core library.
//!
//! Tag lifecycle for topics: normalize and resolve proposed tags, persist the
//! resulting set with an audit trail, and fan out per-topic notification
//! state to users who follow newly added tags.
//!
//! # Conventions
//!
//! - **Errors**: [`error::TaggingError`] for tracker operations, `rusqlite::Result`
//!   for raw store access, `anyhow::Result` for config and store setup.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod db;
pub mod error;
pub mod guardian;
pub mod model;
pub mod notify;
pub mod tags;
pub mod tracker;

pub use error::{ConfigError, ErrorCode, TaggingError};
pub use guardian::{CapabilityContext, Guardian};
pub use model::tag::{Tag, TagChange, TopicTagSet};
pub use model::{TopicId, UserId};
pub use tracker::{FieldChange, TagChangeOutcome, TagChangeTracker};
