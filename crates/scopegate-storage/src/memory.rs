use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use scopegate_core::document::{Document, matches_query};

use crate::record::{self, Record, SortKey};
use crate::traits::{EntityStore, ListOptions, StorageError};

#[derive(Debug, Default)]
struct InnerState {
    // Insertion order is the default listing order.
    collections: HashMap<String, Vec<Record>>,
}

impl InnerState {
    fn position(&self, entity: &str, id: &str) -> Option<usize> {
        self.collections
            .get(entity)?
            .iter()
            .position(|r| record::record_id(r) == Some(id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InnerState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InnerState>, StorageError> {
        self.state
            .lock()
            .map_err(|_| StorageError::Internal("in-memory store lock poisoned".to_string()))
    }

    fn select(
        &self,
        entity: &str,
        query: Option<&Document>,
        options: &ListOptions,
    ) -> Result<Vec<Record>, StorageError> {
        let state = self.lock()?;
        let Some(records) = state.collections.get(entity) else {
            return Ok(Vec::new());
        };

        let mut selected: Vec<Record> = records
            .iter()
            .filter(|r| query.is_none_or(|q| matches_query(r, q)))
            .cloned()
            .collect();
        drop(state);

        if let Some(key) = options.sort.as_deref().and_then(SortKey::parse) {
            selected.sort_by(|a, b| key.compare(a, b));
        }
        if let Some(limit) = options.limit {
            selected.truncate(limit);
        }
        Ok(selected)
    }
}

impl EntityStore for InMemoryStore {
    async fn list(&self, entity: &str, options: &ListOptions) -> Result<Vec<Record>, StorageError> {
        self.select(entity, None, options)
    }

    async fn filter(
        &self,
        entity: &str,
        query: &Document,
        options: &ListOptions,
    ) -> Result<Vec<Record>, StorageError> {
        self.select(entity, Some(query), options)
    }

    async fn get(&self, entity: &str, id: &str) -> Result<Record, StorageError> {
        let state = self.lock()?;
        let idx = state
            .position(entity, id)
            .ok_or_else(|| StorageError::not_found(entity, id))?;
        Ok(state.collections[entity][idx].clone())
    }

    async fn create(&self, entity: &str, data: Document) -> Result<Record, StorageError> {
        let created = record::new_record(data);
        let mut state = self.lock()?;
        state
            .collections
            .entry(entity.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        entity: &str,
        id: &str,
        data: Document,
        guard: Option<&Document>,
    ) -> Result<Record, StorageError> {
        let patch = record::update_patch(data);
        let mut state = self.lock()?;
        let idx = state
            .position(entity, id)
            .ok_or_else(|| StorageError::not_found(entity, id))?;

        let Some(existing) = state
            .collections
            .get_mut(entity)
            .and_then(|records| records.get_mut(idx))
        else {
            return Err(StorageError::not_found(entity, id));
        };
        if guard.is_some_and(|g| !matches_query(existing, g)) {
            return Err(StorageError::precondition_failed(entity, id));
        }

        existing.extend(patch);
        Ok(existing.clone())
    }

    async fn delete(
        &self,
        entity: &str,
        id: &str,
        guard: Option<&Document>,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let idx = state
            .position(entity, id)
            .ok_or_else(|| StorageError::not_found(entity, id))?;

        let Some(records) = state.collections.get_mut(entity) else {
            return Err(StorageError::not_found(entity, id));
        };
        if guard.is_some_and(|g| !matches_query(&records[idx], g)) {
            return Err(StorageError::precondition_failed(entity, id));
        }

        records.remove(idx);
        Ok(())
    }
}
