//! Notification keys and tag fanout.

pub mod fanout;
pub mod key;
