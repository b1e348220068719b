use serde::{Deserialize, Serialize};

use crate::identity::IdentityAttribute;
use crate::policy::Policy;

/// Configuration-friendly description of a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    pub entity: String,
    pub field: String,
    pub attribute: IdentityAttribute,
    #[serde(default)]
    pub read: ReadVisibility,
    #[serde(default)]
    pub visibility_exceptions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadVisibility {
    #[default]
    Scoped,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyDefinitionError {
    #[error("policy entity name must not be empty")]
    EmptyEntity,

    #[error("policy for '{entity}' has an empty scoping field")]
    EmptyField { entity: String },

    #[error("policy for '{entity}' declares its scoping field '{field}' as a visibility exception")]
    ExceptionShadowsField { entity: String, field: String },

    #[error("policy for '{entity}' is defined more than once")]
    Duplicate { entity: String },
}

impl PolicyDefinition {
    pub fn validate(&self) -> Result<(), PolicyDefinitionError> {
        if self.entity.trim().is_empty() {
            return Err(PolicyDefinitionError::EmptyEntity);
        }
        if self.field.trim().is_empty() {
            return Err(PolicyDefinitionError::EmptyField {
                entity: self.entity.clone(),
            });
        }
        if self.visibility_exceptions.iter().any(|f| f == &self.field) {
            return Err(PolicyDefinitionError::ExceptionShadowsField {
                entity: self.entity.clone(),
                field: self.field.clone(),
            });
        }
        Ok(())
    }

    pub fn to_policy(&self) -> Policy {
        let base = match self.read {
            ReadVisibility::Scoped => Policy::owned_by(&self.field, self.attribute),
            ReadVisibility::Public => Policy::public_read(&self.field, self.attribute),
        };
        self.visibility_exceptions
            .iter()
            .fold(base, |policy, field| policy.with_visibility_exception(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::identity::CallerIdentity;
    use serde_json::json;

    fn artwork() -> PolicyDefinition {
        PolicyDefinition {
            entity: "ColoredArtwork".to_string(),
            field: "profile_id".to_string(),
            attribute: IdentityAttribute::ProfileId,
            read: ReadVisibility::Scoped,
            visibility_exceptions: vec!["is_showcased".to_string()],
        }
    }

    #[test]
    fn parses_from_toml_with_defaults() {
        let def: PolicyDefinition = toml::from_str(
            r#"
entity = "Purchase"
field = "user_id"
attribute = "user_id"
"#,
        )
        .unwrap();

        assert_eq!(def.read, ReadVisibility::Scoped);
        assert!(def.visibility_exceptions.is_empty());
        assert!(def.validate().is_ok());
    }

    #[test]
    fn parses_public_read_definition() {
        let def: PolicyDefinition = toml::from_str(
            r#"
entity = "ForumPost"
field = "author_id"
attribute = "user_id"
read = "public"
"#,
        )
        .unwrap();

        assert_eq!(def.read, ReadVisibility::Public);
    }

    #[test]
    fn to_policy_carries_visibility_exceptions() {
        let policy = artwork().to_policy();
        let identity = CallerIdentity::new("u1").with_profile("p1");

        assert!(policy.is_visibility_exception("is_showcased"));
        assert_eq!(
            policy.scope_query(&identity, Document::new()).get("profile_id"),
            Some(&json!("p1"))
        );
    }

    #[test]
    fn validate_rejects_empty_entity() {
        let mut def = artwork();
        def.entity = "  ".to_string();
        assert_eq!(def.validate(), Err(PolicyDefinitionError::EmptyEntity));
    }

    #[test]
    fn validate_rejects_empty_field() {
        let mut def = artwork();
        def.field = String::new();
        assert!(matches!(
            def.validate(),
            Err(PolicyDefinitionError::EmptyField { ref entity }) if entity == "ColoredArtwork"
        ));
    }

    #[test]
    fn validate_rejects_exception_equal_to_scoping_field() {
        let mut def = artwork();
        def.visibility_exceptions.push("profile_id".to_string());
        assert!(matches!(
            def.validate(),
            Err(PolicyDefinitionError::ExceptionShadowsField { .. })
        ));
    }
}
