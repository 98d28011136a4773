//! Property-based tests for skopos-core types.
//!
//! These tests use proptest to verify invariants across many randomly generated inputs.

use proptest::prelude::*;

use crate::{mask, ContainerImage, MASK_CHAR};

/// Strategy for generating registry hosts.
fn host_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{2,6}\\.gcr\\.io",
        "[0-9]{12}\\.dkr\\.ecr\\.[a-z]{2}-[a-z]{4,7}-[1-3]\\.amazonaws\\.com",
        "(ghcr|quay|lscr)\\.io",
        "[a-z][a-z0-9]{2,12}\\.example\\.com(:[1-9][0-9]{3})?",
    ]
}

/// Strategy for generating repository paths.
fn repository_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9]{0,7}([_-][a-z0-9]{1,7})?", 1..4)
        .prop_map(|parts| parts.join("/"))
}

/// Strategy for generating tags.
fn tag_strategy() -> impl Strategy<Value = String> {
    "(latest|v?[0-9]{1,2}\\.[0-9]{1,2}(\\.[0-9]{1,2})?(-alpine)?)"
}

proptest! {
    /// Masking preserves the number of characters.
    #[test]
    fn mask_preserves_length(secret in "\\PC{0,64}") {
        prop_assert_eq!(mask(&secret).chars().count(), secret.chars().count());
    }

    /// Masking keeps the first and last characters of longer secrets and hides the rest.
    #[test]
    fn mask_keeps_only_edges(secret in "[a-zA-Z0-9]{3,64}") {
        let masked: Vec<char> = mask(&secret).chars().collect();
        let plain: Vec<char> = secret.chars().collect();
        prop_assert_eq!(masked[0], plain[0]);
        prop_assert_eq!(masked[masked.len() - 1], plain[plain.len() - 1]);
        prop_assert!(masked[1..masked.len() - 1].iter().all(|&c| c == MASK_CHAR));
    }

    /// Parsing a fully qualified reference recovers each of its parts.
    #[test]
    fn parse_recovers_components(
        host in host_strategy(),
        repository in repository_strategy(),
        tag in tag_strategy(),
    ) {
        let image = ContainerImage::parse(&format!("{host}/{repository}:{tag}")).unwrap();
        prop_assert_eq!(&image.registry.url, &host);
        prop_assert_eq!(&image.name, &repository);
        prop_assert_eq!(image.tag.as_deref(), Some(tag.as_str()));
        prop_assert_eq!(image.host(), host.as_str());
    }
}
