use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use scopegate_core::ownership::OwnershipPredicate;
use scopegate_core::{CallerIdentity, Document, Policy, PolicyRegistry};
use scopegate_storage::{EntityStore, ListOptions, Record};
use serde_json::Value;

use crate::error::GatewayError;
use crate::metrics::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Filter,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::List,
        Operation::Filter,
        Operation::Get,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Filter => "filter",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl FromStr for Operation {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| GatewayError::InvalidOperation(s.to_string()))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub entity_type: String,
    pub operation: Operation,
    pub query: Option<Document>,
    pub data: Option<Document>,
    pub id: Option<String>,
    pub options: ListOptions,
}

impl GatewayRequest {
    pub fn new(entity_type: impl Into<String>, operation: Operation) -> Self {
        Self {
            entity_type: entity_type.into(),
            operation,
            query: None,
            data: None,
            id: None,
            options: ListOptions::default(),
        }
    }

    pub fn with_query(mut self, query: Document) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_data(mut self, data: Document) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_options(mut self, options: ListOptions) -> Self {
        self.options = options;
        self
    }
}

/// Runs entity requests against the store through the policy registry.
///
/// `list` is forwarded unscoped even for entity types with a policy; only
/// `filter` applies the read scope. `get` skips the ownership check when the
/// fetched record itself has a truthy visibility-exception field, so a
/// showcased record is readable by id to anyone who could already find it
/// through `filter`. Update and delete pass the caller's ownership predicate
/// to the store as a guard, so ownership is re-checked atomically with the
/// mutation.
pub struct GatewayService<S: EntityStore> {
    store: Arc<S>,
    registry: Arc<PolicyRegistry>,
    metrics: Option<Arc<Metrics>>,
}

impl<S: EntityStore> GatewayService<S> {
    pub fn new(store: Arc<S>, registry: Arc<PolicyRegistry>) -> Self {
        Self {
            store,
            registry,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub async fn execute(
        &self,
        identity: &CallerIdentity,
        request: GatewayRequest,
    ) -> Result<Value, GatewayError> {
        let entity = request.entity_type.trim();
        if entity.is_empty() {
            return Err(GatewayError::MissingParameter("entity_name"));
        }
        if let Some(ref metrics) = self.metrics {
            metrics.record_operation(request.operation);
        }

        let query = request.query.unwrap_or_default();
        let data = request.data.unwrap_or_default();
        let id = request.id.as_deref();

        match request.operation {
            Operation::List => self
                .list(entity, &request.options)
                .await
                .map(records_to_value),
            Operation::Filter => self
                .filter(identity, entity, query, &request.options)
                .await
                .map(records_to_value),
            Operation::Get => self.get(identity, entity, id).await.map(Value::Object),
            Operation::Create => self.create(identity, entity, data).await.map(Value::Object),
            Operation::Update => self
                .update(identity, entity, id, data)
                .await
                .map(Value::Object),
            Operation::Delete => self.delete(identity, entity, id).await.map(|()| Value::Null),
        }
    }

    pub async fn list(
        &self,
        entity: &str,
        options: &ListOptions,
    ) -> Result<Vec<Record>, GatewayError> {
        Ok(self.store.list(entity, options).await?)
    }

    pub async fn filter(
        &self,
        identity: &CallerIdentity,
        entity: &str,
        query: Document,
        options: &ListOptions,
    ) -> Result<Vec<Record>, GatewayError> {
        let query = match self.registry.lookup(entity) {
            Some(policy) => {
                if !policy.visibility_exception_applies(&query)
                    && !OwnershipPredicate::derive(policy, identity).is_resolvable()
                {
                    tracing::debug!(
                        entity_type = entity,
                        caller = %identity,
                        "caller lacks the identity attribute this entity is scoped by"
                    );
                    return Ok(Vec::new());
                }
                policy.scope_query(identity, query)
            }
            None => query,
        };

        Ok(self.store.filter(entity, &query, options).await?)
    }

    pub async fn get(
        &self,
        identity: &CallerIdentity,
        entity: &str,
        id: Option<&str>,
    ) -> Result<Record, GatewayError> {
        let id = require_id(id)?;
        let record = self.store.get(entity, id).await?;

        if let Some(policy) = self.registry.lookup(entity)
            && !policy.visibility_exception_applies(&record)
        {
            let predicate = OwnershipPredicate::derive(policy, identity);
            self.authorize(&predicate, identity, entity, id, &record)?;
        }

        Ok(record)
    }

    pub async fn create(
        &self,
        identity: &CallerIdentity,
        entity: &str,
        data: Document,
    ) -> Result<Record, GatewayError> {
        let data = match self.registry.lookup(entity) {
            Some(policy) => {
                if !OwnershipPredicate::derive(policy, identity).is_resolvable() {
                    return Err(self.deny(identity, entity, "", "missing identity attribute"));
                }
                policy.scope_write(identity, data)
            }
            None => data,
        };

        let created = self.store.create(entity, data).await?;
        tracing::debug!(entity_type = entity, caller = %identity, "record created");
        Ok(created)
    }

    pub async fn update(
        &self,
        identity: &CallerIdentity,
        entity: &str,
        id: Option<&str>,
        data: Document,
    ) -> Result<Record, GatewayError> {
        let id = require_id(id)?;

        let updated = match self.registry.lookup(entity) {
            Some(policy) => {
                let predicate = self.verify_current_owner(policy, identity, entity, id).await?;
                let data = policy.scope_write(identity, data);
                self.store
                    .update(entity, id, data, predicate.guard())
                    .await
                    .map_err(|e| self.guard_failure(e, identity, entity, id))?
            }
            None => self.store.update(entity, id, data, None).await?,
        };

        tracing::debug!(entity_type = entity, record_id = id, caller = %identity, "record updated");
        Ok(updated)
    }

    pub async fn delete(
        &self,
        identity: &CallerIdentity,
        entity: &str,
        id: Option<&str>,
    ) -> Result<(), GatewayError> {
        let id = require_id(id)?;

        match self.registry.lookup(entity) {
            Some(policy) => {
                let predicate = self.verify_current_owner(policy, identity, entity, id).await?;
                self.store
                    .delete(entity, id, predicate.guard())
                    .await
                    .map_err(|e| self.guard_failure(e, identity, entity, id))?;
            }
            None => self.store.delete(entity, id, None).await?,
        }

        tracing::debug!(entity_type = entity, record_id = id, caller = %identity, "record deleted");
        Ok(())
    }

    async fn verify_current_owner(
        &self,
        policy: &Policy,
        identity: &CallerIdentity,
        entity: &str,
        id: &str,
    ) -> Result<OwnershipPredicate, GatewayError> {
        let current = self.store.get(entity, id).await?;
        let predicate = OwnershipPredicate::derive(policy, identity);
        self.authorize(&predicate, identity, entity, id, &current)?;
        Ok(predicate)
    }

    fn authorize(
        &self,
        predicate: &OwnershipPredicate,
        identity: &CallerIdentity,
        entity: &str,
        id: &str,
        record: &Record,
    ) -> Result<(), GatewayError> {
        if predicate.is_satisfied_by(record) {
            return Ok(());
        }
        Err(self.deny(identity, entity, id, "ownership mismatch"))
    }

    fn guard_failure(
        &self,
        err: scopegate_storage::StorageError,
        identity: &CallerIdentity,
        entity: &str,
        id: &str,
    ) -> GatewayError {
        match GatewayError::from(err) {
            GatewayError::Forbidden { .. } => {
                self.deny(identity, entity, id, "ownership changed before write")
            }
            other => other,
        }
    }

    fn deny(
        &self,
        identity: &CallerIdentity,
        entity: &str,
        id: &str,
        reason: &'static str,
    ) -> GatewayError {
        if let Some(ref metrics) = self.metrics {
            metrics.record_forbidden();
        }
        tracing::warn!(
            entity_type = entity,
            record_id = id,
            caller = %identity,
            reason,
            "request denied"
        );
        GatewayError::forbidden(entity, id)
    }
}

fn require_id(id: Option<&str>) -> Result<&str, GatewayError> {
    match id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(GatewayError::MissingParameter("id")),
    }
}

fn records_to_value(records: Vec<Record>) -> Value {
    Value::Array(records.into_iter().map(Value::Object).collect())
}
