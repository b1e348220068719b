//! Policies for the reading and coloring application's entity types.

use crate::identity::IdentityAttribute;
use crate::policy::Policy;
use crate::registry::PolicyRegistry;

pub const USER_PROFILE: &str = "UserProfile";
pub const COLORED_ARTWORK: &str = "ColoredArtwork";
pub const USER_ACTIVITY_LOG: &str = "UserActivityLog";
pub const READING_PROGRESS: &str = "ReadingProgress";
pub const USER_BADGE: &str = "UserBadge";
pub const RECOMMENDATION: &str = "Recommendation";
pub const PURCHASE: &str = "Purchase";
pub const SUBSCRIPTION: &str = "Subscription";
pub const FORUM_POST: &str = "ForumPost";
pub const FORUM_COMMENT: &str = "ForumComment";
pub const LIKE: &str = "Like";

pub const SHOWCASE_FLAG: &str = "is_showcased";

pub fn standard_catalog() -> PolicyRegistry {
    let per_profile = [
        USER_ACTIVITY_LOG,
        READING_PROGRESS,
        USER_BADGE,
        RECOMMENDATION,
    ];
    let per_user = [PURCHASE, SUBSCRIPTION];
    let community = [FORUM_POST, FORUM_COMMENT, LIKE];

    let mut builder = PolicyRegistry::builder()
        .register(
            USER_PROFILE,
            Policy::owned_by("parent_account_id", IdentityAttribute::AccountId),
        )
        .register(
            COLORED_ARTWORK,
            Policy::owned_by("profile_id", IdentityAttribute::ProfileId)
                .with_visibility_exception(SHOWCASE_FLAG),
        );

    for entity in per_profile {
        builder = builder.register(
            entity,
            Policy::owned_by("profile_id", IdentityAttribute::ProfileId),
        );
    }
    for entity in per_user {
        builder = builder.register(entity, Policy::owned_by("user_id", IdentityAttribute::UserId));
    }
    for entity in community {
        builder = builder.register(
            entity,
            Policy::public_read("author_id", IdentityAttribute::UserId),
        );
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::identity::CallerIdentity;
    use crate::ownership::OwnershipPredicate;
    use serde_json::json;

    fn caller() -> CallerIdentity {
        CallerIdentity::new("u1")
            .with_account("acct-A")
            .with_profile("p1")
    }

    #[test]
    fn catalog_registers_every_scoped_entity() {
        let registry = standard_catalog();

        for entity in [
            USER_PROFILE,
            COLORED_ARTWORK,
            USER_ACTIVITY_LOG,
            READING_PROGRESS,
            USER_BADGE,
            RECOMMENDATION,
            PURCHASE,
            SUBSCRIPTION,
            FORUM_POST,
            FORUM_COMMENT,
            LIKE,
        ] {
            assert!(registry.contains(entity), "{entity} should be registered");
        }
        assert_eq!(registry.len(), 11);
    }

    #[test]
    fn catalog_leaves_content_entities_public() {
        let registry = standard_catalog();
        assert!(registry.lookup("Book").is_none());
        assert!(registry.lookup("ColoringPage").is_none());
    }

    #[test]
    fn user_profile_is_scoped_by_parent_account() {
        let registry = standard_catalog();
        let policy = registry.lookup(USER_PROFILE).unwrap();

        let scoped = policy.scope_query(&caller(), Document::new());
        assert_eq!(scoped.get("parent_account_id"), Some(&json!("acct-A")));
    }

    #[test]
    fn colored_artwork_declares_showcase_exception() {
        let registry = standard_catalog();
        let policy = registry.lookup(COLORED_ARTWORK).unwrap();

        assert!(policy.is_visibility_exception(SHOWCASE_FLAG));
        assert_eq!(
            OwnershipPredicate::derive(policy, &caller()).guard(),
            Some(&serde_json::from_value::<Document>(json!({"profile_id": "p1"})).unwrap())
        );
    }

    #[test]
    fn community_entities_are_unconstrained_for_reads() {
        let registry = standard_catalog();
        for entity in [FORUM_POST, FORUM_COMMENT, LIKE] {
            let policy = registry.lookup(entity).unwrap();
            assert_eq!(
                OwnershipPredicate::derive(policy, &caller()),
                OwnershipPredicate::Unconstrained
            );
            let data = policy.scope_write(&caller(), Document::new());
            assert_eq!(data.get("author_id"), Some(&json!("u1")));
        }
    }

    #[test]
    fn purchases_are_scoped_by_user() {
        let registry = standard_catalog();
        let policy = registry.lookup(PURCHASE).unwrap();

        let data = policy.scope_write(
            &caller(),
            serde_json::from_value(json!({"user_id": "spoofed", "item": "sub"})).unwrap(),
        );
        assert_eq!(data.get("user_id"), Some(&json!("u1")));
        assert_eq!(data.get("item"), Some(&json!("sub")));
    }
}
