use std::fmt;

use serde::{Deserialize, Serialize};

/// Attributes of an authenticated caller that policies may scope records by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub profile_id: Option<String>,
}

impl CallerIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            account_id: None,
            profile_id: None,
        }
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_profile(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    pub fn attribute(&self, attribute: IdentityAttribute) -> Option<&str> {
        match attribute {
            IdentityAttribute::UserId => Some(self.user_id.as_str()),
            IdentityAttribute::AccountId => self.account_id.as_deref(),
            IdentityAttribute::ProfileId => self.profile_id.as_deref(),
        }
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.user_id)?;
        if let Some(ref account) = self.account_id {
            write!(f, "/account:{account}")?;
        }
        if let Some(ref profile) = self.profile_id {
            write!(f, "/profile:{profile}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityAttribute {
    UserId,
    AccountId,
    ProfileId,
}

impl fmt::Display for IdentityAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentityAttribute::UserId => "user_id",
            IdentityAttribute::AccountId => "account_id",
            IdentityAttribute::ProfileId => "profile_id",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_lookup_returns_configured_values() {
        let identity = CallerIdentity::new("u1")
            .with_account("acct-A")
            .with_profile("p1");

        assert_eq!(identity.attribute(IdentityAttribute::UserId), Some("u1"));
        assert_eq!(
            identity.attribute(IdentityAttribute::AccountId),
            Some("acct-A")
        );
        assert_eq!(identity.attribute(IdentityAttribute::ProfileId), Some("p1"));
    }

    #[test]
    fn missing_attributes_are_none() {
        let identity = CallerIdentity::new("u1");

        assert_eq!(identity.attribute(IdentityAttribute::AccountId), None);
        assert_eq!(identity.attribute(IdentityAttribute::ProfileId), None);
    }

    #[test]
    fn display_includes_present_attributes() {
        let identity = CallerIdentity::new("u1").with_profile("p1");
        assert_eq!(identity.to_string(), "user:u1/profile:p1");
    }

    #[test]
    fn attribute_deserializes_from_snake_case() {
        let attr: IdentityAttribute = serde_json::from_str("\"profile_id\"").unwrap();
        assert_eq!(attr, IdentityAttribute::ProfileId);
        assert_eq!(attr.to_string(), "profile_id");
    }
}
