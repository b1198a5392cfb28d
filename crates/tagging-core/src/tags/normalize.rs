//! Raw string → canonical [`Tag`].
//!
//! The steps run in a fixed order: lower-case, trim, truncate to the
//! configured length, strip forbidden characters. Truncation happens before
//! stripping, so a raw value full of punctuation yields a shorter tag rather
//! than pulling later characters into the window.

use crate::model::tag::Tag;

/// Characters that may never appear in a tag (whitespace is also stripped).
pub const FORBIDDEN_CHARS: &[char] = &['<', '\\', '/', '>', '.', '#', '?', '&'];

/// Regex source equivalent to the stripped character class, for clients that
/// pre-validate input.
pub const FORBIDDEN_PATTERN: &str = r"[<\\/>.#?&\s]";

/// Whether `c` is removed by [`TagNormalizer::normalize`].
#[must_use]
pub fn is_forbidden(c: char) -> bool {
    c.is_whitespace() || FORBIDDEN_CHARS.contains(&c)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagNormalizer {
    max_len: usize,
}

impl TagNormalizer {
    #[must_use]
    pub const fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// Canonicalize one raw value. Never fails; an unusable value comes
    /// back as an empty tag.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> Tag {
        let lowered = raw.to_lowercase();
        let cleaned: String = lowered
            .trim()
            .chars()
            .take(self.max_len)
            .filter(|c| !is_forbidden(*c))
            .collect();
        Tag::from_normalized(cleaned)
    }
}
