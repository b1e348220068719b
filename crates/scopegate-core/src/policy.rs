use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::document::{Document, is_truthy};
use crate::identity::{CallerIdentity, IdentityAttribute};

pub type ScopeFn = Arc<dyn Fn(&CallerIdentity, Document) -> Document + Send + Sync>;

/// Read and write scoping rules for one entity type.
///
/// Both scope functions must be pure. `read_scope` applied to an empty query is
/// also the caller's ownership predicate: whatever keys it injects (minus the
/// declared visibility exception fields) are the keys a record must carry with
/// the same values for the caller to own it. See [`crate::ownership`].
#[derive(Clone)]
pub struct Policy {
    read_scope: ScopeFn,
    write_scope: ScopeFn,
    visibility_exceptions: BTreeSet<String>,
}

impl Policy {
    pub fn new<R, W>(read_scope: R, write_scope: W) -> Self
    where
        R: Fn(&CallerIdentity, Document) -> Document + Send + Sync + 'static,
        W: Fn(&CallerIdentity, Document) -> Document + Send + Sync + 'static,
    {
        Self {
            read_scope: Arc::new(read_scope),
            write_scope: Arc::new(write_scope),
            visibility_exceptions: BTreeSet::new(),
        }
    }

    /// Reads and writes are both pinned to `field = identity[attribute]`.
    pub fn owned_by(field: impl Into<String>, attribute: IdentityAttribute) -> Self {
        let inject = scope_injector(field.into(), attribute);
        Self::new(inject.clone(), inject)
    }

    /// Anyone may read; writes are stamped with the author's `field`.
    pub fn public_read(field: impl Into<String>, attribute: IdentityAttribute) -> Self {
        Self::new(
            |_: &CallerIdentity, query: Document| query,
            scope_injector(field.into(), attribute),
        )
    }

    pub fn with_visibility_exception(mut self, field: impl Into<String>) -> Self {
        self.visibility_exceptions.insert(field.into());
        self
    }

    pub fn visibility_exceptions(&self) -> impl Iterator<Item = &str> {
        self.visibility_exceptions.iter().map(String::as_str)
    }

    pub fn is_visibility_exception(&self, key: &str) -> bool {
        self.visibility_exceptions.contains(key)
    }

    /// True when any declared exception field is present and truthy in `doc`.
    pub fn visibility_exception_applies(&self, doc: &Document) -> bool {
        self.visibility_exceptions
            .iter()
            .any(|field| doc.get(field).is_some_and(is_truthy))
    }

    /// The raw read-scope function, without the visibility exception short-circuit.
    pub fn read_scope(&self, identity: &CallerIdentity, query: Document) -> Document {
        (self.read_scope)(identity, query)
    }

    pub fn scope_query(&self, identity: &CallerIdentity, query: Document) -> Document {
        if self.visibility_exception_applies(&query) {
            return query;
        }
        self.read_scope(identity, query)
    }

    pub fn scope_write(&self, identity: &CallerIdentity, data: Document) -> Document {
        (self.write_scope)(identity, data)
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("visibility_exceptions", &self.visibility_exceptions)
            .finish_non_exhaustive()
    }
}

// A caller without the attribute gets `null`, which no ownership check accepts.
fn scope_injector(
    field: String,
    attribute: IdentityAttribute,
) -> impl Fn(&CallerIdentity, Document) -> Document + Clone + Send + Sync + 'static {
    move |identity: &CallerIdentity, mut doc: Document| {
        let value = identity
            .attribute(attribute)
            .map_or(Value::Null, |v| Value::String(v.to_string()));
        doc.insert(field.clone(), value);
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn artwork_policy() -> Policy {
        Policy::owned_by("profile_id", IdentityAttribute::ProfileId)
            .with_visibility_exception("is_showcased")
    }

    #[test]
    fn scope_query_injects_scoping_field() {
        let identity = CallerIdentity::new("u1").with_profile("p1");

        let scoped = artwork_policy().scope_query(&identity, Document::new());

        assert_eq!(scoped, doc(json!({"profile_id": "p1"})));
    }

    #[test]
    fn scope_query_overrides_client_supplied_scoping_value() {
        let identity = CallerIdentity::new("u1").with_profile("p1");

        let scoped =
            artwork_policy().scope_query(&identity, doc(json!({"profile_id": "p2", "page": 3})));

        assert_eq!(scoped, doc(json!({"profile_id": "p1", "page": 3})));
    }

    #[test]
    fn truthy_visibility_exception_skips_scoping() {
        let identity = CallerIdentity::new("u1").with_profile("p1");
        let query = doc(json!({"is_showcased": true}));

        let scoped = artwork_policy().scope_query(&identity, query.clone());

        assert_eq!(scoped, query);
    }

    #[test]
    fn falsy_visibility_exception_keeps_scoping() {
        let identity = CallerIdentity::new("u1").with_profile("p1");

        let scoped =
            artwork_policy().scope_query(&identity, doc(json!({"is_showcased": false})));

        assert_eq!(
            scoped,
            doc(json!({"is_showcased": false, "profile_id": "p1"}))
        );
    }

    #[test]
    fn scope_write_forces_owner_value() {
        let identity = CallerIdentity::new("u1");
        let policy = Policy::owned_by("user_id", IdentityAttribute::UserId);

        let scoped = policy.scope_write(
            &identity,
            doc(json!({"user_id": "spoofed", "item": "sub"})),
        );

        assert_eq!(scoped, doc(json!({"user_id": "u1", "item": "sub"})));
    }

    #[test]
    fn missing_identity_attribute_injects_null() {
        let identity = CallerIdentity::new("u1");

        let scoped = artwork_policy().scope_query(&identity, Document::new());

        assert_eq!(scoped, doc(json!({"profile_id": null})));
    }

    #[test]
    fn public_read_leaves_queries_untouched_but_scopes_writes() {
        let identity = CallerIdentity::new("u1");
        let policy = Policy::public_read("author_id", IdentityAttribute::UserId);
        let query = doc(json!({"topic": "dragons"}));

        assert_eq!(policy.scope_query(&identity, query.clone()), query);
        assert_eq!(
            policy.scope_write(&identity, doc(json!({"body": "hi"}))),
            doc(json!({"body": "hi", "author_id": "u1"}))
        );
    }

    #[test]
    fn scoping_is_idempotent() {
        let identity = CallerIdentity::new("u1").with_profile("p1");
        let policy = artwork_policy();
        let input = doc(json!({"profile_id": "p9", "title": "Cat"}));

        let once = policy.scope_write(&identity, input.clone());
        let twice = policy.scope_write(&identity, once.clone());
        assert_eq!(once, twice);

        let once = policy.scope_query(&identity, input);
        let twice = policy.scope_query(&identity, once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn custom_scope_functions_are_used_verbatim() {
        let policy = Policy::new(
            |identity: &CallerIdentity, mut query: Document| {
                query.insert("owner".to_string(), json!(identity.user_id));
                query
            },
            |_: &CallerIdentity, data: Document| data,
        );
        let identity = CallerIdentity::new("u7");

        assert_eq!(
            policy.scope_query(&identity, Document::new()),
            doc(json!({"owner": "u7"}))
        );
        assert_eq!(
            policy.scope_write(&identity, doc(json!({"owner": "x"}))),
            doc(json!({"owner": "x"}))
        );
    }
}
