//! Schema registry
//!
//! Schemas are provisioned by identifier (e.g. `"ifc2x3tc1"`). A project
//! names its schema once at creation; every batch of the project is
//! validated against it.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use bimstore_core::{ChangeError, ChangeResult, Schema};

/// Registered schemas by identifier
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` under its identifier
    ///
    /// Replaces an earlier schema with the same identifier; projects created
    /// before keep the schema they were created with.
    pub fn register(&self, schema: Schema) -> Arc<Schema> {
        let schema = Arc::new(schema);
        let previous = self
            .schemas
            .insert(schema.id().to_string(), Arc::clone(&schema));
        info!(
            target: "bimstore::batch",
            schema = schema.id(),
            types = schema.entity_types().len(),
            replaced = previous.is_some(),
            "schema registered"
        );
        schema
    }

    /// Schema registered under `id`
    pub fn get(&self, id: &str) -> ChangeResult<Arc<Schema>> {
        self.schemas
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ChangeError::SchemaNotFound {
                schema: id.to_string(),
            })
    }

    /// Whether a schema is registered under `id`
    pub fn contains(&self, id: &str) -> bool {
        self.schemas.contains_key(id)
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.schemas.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of registered schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether no schema is registered
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
