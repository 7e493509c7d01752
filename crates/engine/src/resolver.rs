//! Attribute handle cache
//!
//! Resolves `(entity type, attribute name)` once per batch. Later changes
//! naming the same attribute reuse the handle without a schema lookup.

use rustc_hash::FxHashMap;

use bimstore_core::{AttributeHandle, ChangeError, ChangeResult, Schema, TypeId};

/// Per-batch cache of resolved attribute handles
#[derive(Debug, Default)]
pub struct HandleCache {
    handles: FxHashMap<TypeId, FxHashMap<String, AttributeHandle>>,
    hits: u64,
    misses: u64,
}

impl HandleCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` on `type_id`, consulting the schema on first use
    ///
    /// Unknown names are never cached; each attempt fails with
    /// `ChangeError::AttributeNotFound`.
    pub fn resolve(
        &mut self,
        schema: &Schema,
        type_id: TypeId,
        name: &str,
    ) -> ChangeResult<AttributeHandle> {
        if let Some(handle) = self.handles.get(&type_id).and_then(|names| names.get(name)) {
            self.hits += 1;
            return Ok(*handle);
        }
        self.misses += 1;
        let handle = schema
            .resolve(type_id, name)
            .ok_or_else(|| ChangeError::AttributeNotFound {
                type_name: schema.type_name(type_id).unwrap_or("<unknown>").to_string(),
                attribute: name.to_string(),
            })?;
        self.handles
            .entry(type_id)
            .or_default()
            .insert(name.to_string(), handle);
        Ok(handle)
    }

    /// Lookups answered from the cache
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that went to the schema
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Number of cached handles
    pub fn len(&self) -> usize {
        self.handles.values().map(FxHashMap::len).sum()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
