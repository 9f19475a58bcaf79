//! Property tests for role specifier matching and mapping decode

use base64::{engine::general_purpose::STANDARD, Engine as _};
use cretoai_dirsync::mapping::RoleIndex;
use cretoai_dirsync::{MappingRules, Role, RoleSpecifier, SyncError};
use proptest::prelude::*;

/// Randomly flip the case of each ASCII letter
fn recase(input: &str, mask: &[bool]) -> String {
    input
        .chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| {
            if *upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn test_qualified_match_ignores_case(
        category in "[A-Za-z]{1,12}",
        name in "[A-Za-z][A-Za-z ]{0,15}[A-Za-z]",
        mask in prop::collection::vec(any::<bool>(), 1..16),
    ) {
        prop_assume!(!name.eq_ignore_ascii_case("Unrelated"));

        let catalog = vec![
            Role::new(1, "Unrelated").with_category("Other"),
            Role::new(7, name.clone()).with_category(category.clone()),
        ];
        let index = RoleIndex::new(&catalog);

        let raw = format!(" {} / {} ", recase(&category, &mask), recase(&name, &mask));
        prop_assert_eq!(index.resolve(&RoleSpecifier::parse(&raw)), Some(7));
    }

    #[test]
    fn test_bare_match_ignores_case(
        name in "[A-Za-z]{1,16}",
        mask in prop::collection::vec(any::<bool>(), 1..16),
    ) {
        prop_assume!(!name.eq_ignore_ascii_case("Unrelated"));

        let catalog = vec![
            Role::new(1, "Unrelated"),
            Role::new(5, name.clone()).with_category("First"),
            Role::new(6, name.clone()).with_category("Second"),
        ];
        let index = RoleIndex::new(&catalog);

        // First catalog match wins for bare names
        prop_assert_eq!(index.resolve(&RoleSpecifier::parse(&recase(&name, &mask))), Some(5));
    }

    #[test]
    fn test_non_object_documents_rejected(value in prop_oneof![
        Just("[]".to_string()),
        Just("null".to_string()),
        any::<i64>().prop_map(|n| n.to_string()),
        "[a-z]{0,8}".prop_map(|s| format!("\"{}\"", s)),
    ]) {
        let result = MappingRules::decode(&STANDARD.encode(value));
        prop_assert!(matches!(result, Err(SyncError::InvalidInput(_))));
    }
}
