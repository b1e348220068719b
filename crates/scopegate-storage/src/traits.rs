use std::future::Future;

use scopegate_core::document::Document;

use crate::record::Record;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} record '{id}' not found")]
    NotFound { entity: String, id: String },
    #[error("precondition failed for {entity} record '{id}'")]
    PreconditionFailed { entity: String, id: String },
    #[error("internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        StorageError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn precondition_failed(entity: &str, id: &str) -> Self {
        StorageError::PreconditionFailed {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Field name to order by; a leading `-` sorts descending. Missing and
    /// null values come first ascending. Values of different JSON types order
    /// by a backend-specific type rank.
    pub sort: Option<String>,
    pub limit: Option<usize>,
}

/// Per-record CRUD over entity collections.
///
/// `guard`, when given to `update` or `delete`, is checked atomically with the
/// mutation: the record must match it (see [`scopegate_core::document::matches_query`])
/// or the call fails with [`StorageError::PreconditionFailed`] and nothing changes.
pub trait EntityStore: Send + Sync {
    fn list(
        &self,
        entity: &str,
        options: &ListOptions,
    ) -> impl Future<Output = Result<Vec<Record>, StorageError>> + Send;

    fn filter(
        &self,
        entity: &str,
        query: &Document,
        options: &ListOptions,
    ) -> impl Future<Output = Result<Vec<Record>, StorageError>> + Send;

    fn get(&self, entity: &str, id: &str)
    -> impl Future<Output = Result<Record, StorageError>> + Send;

    fn create(
        &self,
        entity: &str,
        data: Document,
    ) -> impl Future<Output = Result<Record, StorageError>> + Send;

    fn update(
        &self,
        entity: &str,
        id: &str,
        data: Document,
        guard: Option<&Document>,
    ) -> impl Future<Output = Result<Record, StorageError>> + Send;

    fn delete(
        &self,
        entity: &str,
        id: &str,
        guard: Option<&Document>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}
