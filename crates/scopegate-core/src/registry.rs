use std::collections::HashMap;

use crate::definition::{PolicyDefinition, PolicyDefinitionError};
use crate::policy::Policy;

/// Immutable map from entity type to its policy.
///
/// There is no way to change a registry once built; a different policy table
/// means building a new registry. Entity types without an entry are public.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, Policy>,
}

impl PolicyRegistry {
    pub fn builder() -> PolicyRegistryBuilder {
        PolicyRegistryBuilder::default()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_definitions(
        definitions: &[PolicyDefinition],
    ) -> Result<Self, PolicyDefinitionError> {
        let mut builder = Self::builder();
        for def in definitions {
            def.validate()?;
            if builder.policies.contains_key(&def.entity) {
                return Err(PolicyDefinitionError::Duplicate {
                    entity: def.entity.clone(),
                });
            }
            builder = builder.register(&def.entity, def.to_policy());
        }
        Ok(builder.build())
    }

    pub fn lookup(&self, entity_type: &str) -> Option<&Policy> {
        self.policies.get(entity_type)
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.policies.contains_key(entity_type)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn entity_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, Default)]
pub struct PolicyRegistryBuilder {
    policies: HashMap<String, Policy>,
}

impl PolicyRegistryBuilder {
    pub fn register(mut self, entity_type: impl Into<String>, policy: Policy) -> Self {
        let entity_type = entity_type.into();
        if self.policies.insert(entity_type.clone(), policy).is_some() {
            tracing::warn!(entity_type = %entity_type, "replacing previously registered policy");
        }
        self
    }

    pub fn build(self) -> PolicyRegistry {
        PolicyRegistry {
            policies: self.policies,
        }
    }
}
