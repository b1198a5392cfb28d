use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use tagging_core::Tag;
use tagging_core::tags::normalize::{TagNormalizer, is_forbidden};
use tagging_core::tags::resolve::TagSetResolver;

fn raw_tag() -> impl Strategy<Value = String> {
    prop_oneof![
        "[ -~]{0,32}",
        "[a-zA-Z]{1,8}",
        "[ ]{0,3}[A-Za-z0-9#./?&<>-]{1,12}[ ]{0,3}",
    ]
}

fn raw_tags() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(raw_tag(), 0..12)
}

fn existing_counts(resolver: &TagSetResolver, raw: &[String]) -> HashMap<Tag, usize> {
    raw.iter()
        .map(|value| (resolver.normalizer().normalize(value), 1))
        .filter(|(tag, _)| !tag.is_empty())
        .collect()
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn normalize_is_idempotent(raw in raw_tag(), max_len in 1usize..30) {
        let normalizer = TagNormalizer::new(max_len);
        let once = normalizer.normalize(&raw);
        let twice = normalizer.normalize(once.as_str());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalized_tags_are_canonical(raw in raw_tag(), max_len in 1usize..30) {
        let tag = TagNormalizer::new(max_len).normalize(&raw);
        prop_assert!(tag.as_str().chars().count() <= max_len);
        prop_assert!(!tag.as_str().chars().any(is_forbidden));
        prop_assert_eq!(tag.as_str(), tag.as_str().to_lowercase());
    }

    #[test]
    fn resolved_set_is_capped_and_duplicate_free(
        raw in raw_tags(),
        max_tags in 1usize..8,
    ) {
        let resolver = TagSetResolver::new(TagNormalizer::new(20), max_tags);
        let resolved = resolver.resolve(&raw, true, &HashMap::new());

        prop_assert!(resolved.len() <= max_tags);
        prop_assert!(resolved.iter().all(|tag| !tag.is_empty()));
        let unique: HashSet<&str> = resolved.iter().map(Tag::as_str).collect();
        prop_assert_eq!(unique.len(), resolved.len());
    }

    #[test]
    fn resolving_twice_changes_nothing(raw in raw_tags()) {
        let resolver = TagSetResolver::new(TagNormalizer::new(20), 5);
        let first = resolver.resolve(&raw, true, &HashMap::new());
        let second = resolver.resolve(&first, true, &HashMap::new());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn without_create_right_only_existing_tags_survive(
        raw in raw_tags(),
        known in raw_tags(),
    ) {
        let resolver = TagSetResolver::new(TagNormalizer::new(20), 5);
        let existing = existing_counts(&resolver, &known);
        let resolved = resolver.resolve(&raw, false, &existing);

        prop_assert!(resolved.iter().all(|tag| existing.contains_key(tag)));
    }

    #[test]
    fn create_right_never_drops_more_than_the_cap(raw in raw_tags()) {
        let resolver = TagSetResolver::new(TagNormalizer::new(20), 5);
        let candidates = resolver.candidates(&raw);
        let resolved = resolver.resolve(&raw, true, &HashMap::new());
        prop_assert_eq!(resolved.len(), candidates.len().min(5));
        prop_assert_eq!(&resolved[..], &candidates[..resolved.len()]);
    }
}
