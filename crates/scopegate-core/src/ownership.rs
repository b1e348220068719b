//! Record ownership derived from a policy's read scope.
//!
//! The caller's ownership predicate is `read_scope(identity, {})` with every
//! declared visibility exception key removed. An empty predicate means the policy
//! places no ownership constraint on the record (public read, scoped write).
//!
//! When more than one key survives, ownership requires all of them to match.
//! A `null` reference value, which is what policies inject for identity
//! attributes the caller does not have, never matches.

use crate::document::Document;
use crate::identity::CallerIdentity;
use crate::policy::Policy;

#[derive(Debug, Clone, PartialEq)]
pub enum OwnershipPredicate {
    Unconstrained,
    Owned(Document),
}

impl OwnershipPredicate {
    pub fn derive(policy: &Policy, identity: &CallerIdentity) -> Self {
        let mut reference = policy.read_scope(identity, Document::new());
        reference.retain(|key, _| !policy.is_visibility_exception(key));

        if reference.is_empty() {
            OwnershipPredicate::Unconstrained
        } else {
            OwnershipPredicate::Owned(reference)
        }
    }

    pub fn is_satisfied_by(&self, record: &Document) -> bool {
        match self {
            OwnershipPredicate::Unconstrained => true,
            OwnershipPredicate::Owned(expected) => expected
                .iter()
                .all(|(key, value)| !value.is_null() && record.get(key) == Some(value)),
        }
    }

    /// False when the caller lacks an identity attribute the predicate needs.
    pub fn is_resolvable(&self) -> bool {
        match self {
            OwnershipPredicate::Unconstrained => true,
            OwnershipPredicate::Owned(expected) => expected.values().all(|v| !v.is_null()),
        }
    }

    /// Precondition a store must re-check atomically with a mutation.
    pub fn guard(&self) -> Option<&Document> {
        match self {
            OwnershipPredicate::Unconstrained => None,
            OwnershipPredicate::Owned(expected) => Some(expected),
        }
    }
}

pub fn verify_ownership(policy: &Policy, identity: &CallerIdentity, record: &Document) -> bool {
    OwnershipPredicate::derive(policy, identity).is_satisfied_by(record)
}
