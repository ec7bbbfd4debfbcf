//! Property-based tests for override resolution and descriptor patching.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::descriptor::{extract, patch, OverrideSlot};
    use crate::overrides::{resolve_for_classifier, Overrides};
    use proptest::prelude::*;

    const PATH: &str = "META-INF/broker.xml";

    fn descriptor(uris: &[String]) -> String {
        let mut xml = String::from("<Broker>");
        for uri in uris {
            xml.push_str(&format!("<ConfigurableProperty uri=\"{}\"/>", uri));
        }
        xml.push_str("</Broker>");
        xml
    }

    // ============================================================================
    // resolve_for_classifier property tests
    // ============================================================================

    proptest! {
        /// Property: unscoped keys always pass through when no scoped key targets them
        #[test]
        fn unscoped_keys_always_apply(
            pairs in prop::collection::vec(("[a-z]{1,8}", "[a-zA-Z0-9]{0,8}"), 0..10),
            classifier in "[a-z]{0,6}",
        ) {
            let raw: Overrides = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let resolved = resolve_for_classifier(&raw, &classifier);
            prop_assert_eq!(resolved, raw);
        }

        /// Property: classifier matching ignores case
        #[test]
        fn classifier_match_is_case_insensitive(
            classifier in "[a-z]{1,6}",
            key in "[a-z]{1,8}",
            value in "[a-z0-9]{0,8}",
        ) {
            let raw: Overrides = vec![(format!("{}:{}", classifier.to_uppercase(), key), value.clone())]
                .into_iter()
                .collect();
            let resolved = resolve_for_classifier(&raw, &classifier);
            prop_assert_eq!(resolved.get(&key), Some(value.as_str()));
        }

        /// Property: resolved keys never contain the scope separator
        /// when raw keys contain at most one
        #[test]
        fn resolved_keys_are_unscoped(
            pairs in prop::collection::vec(("([a-z]{1,4},)*[a-z]{1,4}:[a-z]{1,8}|[a-z]{1,8}", "[a-z]{0,4}"), 0..10),
            classifier in "[a-z]{1,4}",
        ) {
            let raw: Overrides = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let resolved = resolve_for_classifier(&raw, &classifier);
            for key in resolved.keys() {
                prop_assert!(!key.contains(':'), "scoped key leaked: {}", key);
            }
        }
    }

    // ============================================================================
    // patch property tests
    // ============================================================================

    proptest! {
        /// Property: patching twice with the same overrides equals patching once
        #[test]
        fn patch_is_idempotent(
            uris in prop::collection::vec("[a-z]{1,6}", 1..6),
            values in prop::collection::vec(("[a-z]{1,6}", "[a-zA-Z0-9 ]{0,6}"), 0..6),
        ) {
            let xml = descriptor(&uris);
            let overrides: Overrides = values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let once = patch(xml.as_bytes(), &overrides, PATH).unwrap();
            let twice = patch(&once, &overrides, PATH).unwrap();
            prop_assert_eq!(once, twice);
        }

        /// Property: patching never changes the set of declared uris, and
        /// every declared uri with an override ends up carrying its value
        #[test]
        fn patch_preserves_declarations(
            uris in prop::collection::vec("[a-z]{1,6}", 1..6),
            values in prop::collection::vec(("[a-z]{1,6}", "[a-z0-9]{0,6}"), 0..6),
        ) {
            let xml = descriptor(&uris);
            let overrides: Overrides = values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let before = extract(xml.as_bytes(), PATH).unwrap();
            let after = extract(&patch(xml.as_bytes(), &overrides, PATH).unwrap(), PATH).unwrap();

            let before_keys: Vec<_> = before.iter().map(|(k, _)| k.to_string()).collect();
            let after_keys: Vec<_> = after.iter().map(|(k, _)| k.to_string()).collect();
            prop_assert_eq!(before_keys, after_keys);

            for (uri, slot) in after.iter() {
                match overrides.get(uri) {
                    Some(value) => prop_assert_eq!(slot, &OverrideSlot::Overridden(value.to_string())),
                    None => prop_assert_eq!(slot, &OverrideSlot::Declared),
                }
            }
        }
    }
}
