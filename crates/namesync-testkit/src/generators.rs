//! Proptest generators for property-based testing.

use std::collections::BTreeSet;

use proptest::prelude::*;

use namesync_core::{Key, Name, SeqName};

/// Generate a single name component.
pub fn name_component() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,8}".prop_map(String::from)
}

/// Generate a name of 1 to 3 components.
pub fn name() -> impl Strategy<Value = Name> {
    prop::collection::vec(name_component(), 1..=3).prop_map(|components| {
        components
            .into_iter()
            .fold(Name::root(), |name, c| name.append(c))
    })
}

/// Generate a nonzero sequence number.
pub fn seq() -> impl Strategy<Value = u32> {
    1u32..=10_000
}

/// Generate a sequenced identifier.
pub fn seq_name() -> impl Strategy<Value = SeqName> {
    (name(), seq()).prop_map(|(prefix, seq)| SeqName::new(prefix, seq))
}

/// Generate a table capacity (expected entries).
pub fn capacity() -> impl Strategy<Value = usize> {
    4usize..=60
}

/// Generate a set of distinct table keys.
pub fn key_set(max_len: usize) -> impl Strategy<Value = BTreeSet<Key>> {
    prop::collection::btree_set(any::<u32>(), 0..=max_len)
}

/// Generate a set of distinct prefixes, each with a sequence number.
///
/// Prefixes are made unique by component count and content, so the pairs
/// can be published side by side without colliding.
pub fn publication_set(max_len: usize) -> impl Strategy<Value = Vec<(Name, u32)>> {
    prop::collection::btree_map(name(), seq(), 0..=max_len)
        .prop_map(|map| map.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::SyncFixture;

    proptest! {
        #[test]
        fn prop_generated_names_roundtrip_uri(name in name()) {
            prop_assert_eq!(Name::from_uri(&name.to_uri()), name);
        }

        #[test]
        fn prop_seq_names_have_stable_keys(entry in seq_name()) {
            prop_assert_eq!(entry.key(), entry.clone().key());
        }

        // Publishing arbitrary disjoint-side publications and reconciling
        // both ways always converges, and every published sequence
        // survives on both sides.
        #[test]
        fn prop_fixture_converges(
            left_pubs in publication_set(4),
            right_pubs in publication_set(4),
        ) {
            // Namespace the two sides so no prefix is published on both.
            let left_pubs: Vec<(Name, u32)> = left_pubs
                .into_iter()
                .map(|(name, seq)| (Name::from_uri(&format!("/left{name}")), seq))
                .collect();
            let right_pubs: Vec<(Name, u32)> = right_pubs
                .into_iter()
                .map(|(name, seq)| (Name::from_uri(&format!("/right{name}")), seq))
                .collect();

            let mut fixture = SyncFixture::new(400);
            for (prefix, seq) in &left_pubs {
                fixture.left.add_prefix(prefix);
                fixture.left.publish(prefix, Some(*seq));
            }
            for (prefix, seq) in &right_pubs {
                fixture.right.add_prefix(prefix);
                fixture.right.publish(prefix, Some(*seq));
            }

            fixture.converge(8);

            for (prefix, seq) in &right_pubs {
                let left_seq = fixture.left.current_sequence(prefix).unwrap_or(0);
                prop_assert!(left_seq >= *seq);
            }
            for (prefix, seq) in &left_pubs {
                let right_seq = fixture.right.current_sequence(prefix).unwrap_or(0);
                prop_assert!(right_seq >= *seq);
            }
        }
    }
}
