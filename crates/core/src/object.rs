//! Virtual objects
//!
//! A [`VirtualObject`] is the in-memory, schema-typed staging copy of one
//! entity: one value slot per attribute of its entity type. Mutation
//! primitives check every value against the attribute's declared element type
//! and keep float shadow attributes in step, so each successful primitive
//! leaves `len(X) == len(XAsString)` and `XAsString[i] == render(X[i])`.
//!
//! [`ObjectState`] is the persisted form: the same slots without the schema
//! attached.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ChangeError, ChangeResult};
use crate::schema::{Attribute, AttributeHandle, Cardinality, EntityType};
use crate::types::{Oid, TypeId};
use crate::value::{render_decimal, Value};

/// Persisted state of one object version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    /// Object id (encodes the type id)
    pub oid: Oid,
    /// One value per attribute slot, in schema order
    pub values: Vec<Value>,
}

/// In-memory, schema-typed object staged for a new revision
#[derive(Debug, Clone)]
pub struct VirtualObject {
    oid: Oid,
    entity: Arc<EntityType>,
    values: Vec<Value>,
}

enum ShadowUpdate {
    Element(usize, Value),
    Whole(Value),
}

fn shadow_text(value: &Value) -> Value {
    match value {
        Value::Float(f) => Value::String(render_decimal(*f)),
        _ => Value::Null,
    }
}

impl VirtualObject {
    /// Create an object with every single slot `Null` and every list empty
    pub fn new(oid: Oid, entity: Arc<EntityType>) -> Self {
        let values = entity
            .attributes()
            .iter()
            .map(Attribute::default_value)
            .collect();
        Self {
            oid,
            entity,
            values,
        }
    }

    /// Materialize a persisted state under its entity type
    ///
    /// Returns None when the state does not fit the entity type (wrong type
    /// id, wrong slot count or a list slot holding a scalar).
    pub fn from_state(entity: Arc<EntityType>, state: &ObjectState) -> Option<Self> {
        if state.oid.type_id() != entity.id() || state.values.len() != entity.attribute_count() {
            return None;
        }
        let shapes_match = entity
            .attributes()
            .iter()
            .zip(&state.values)
            .all(|(attribute, value)| attribute.is_many() == value.is_sequence());
        if !shapes_match {
            return None;
        }
        Some(Self {
            oid: state.oid,
            entity,
            values: state.values.clone(),
        })
    }

    /// Persisted form of the current values
    pub fn to_state(&self) -> ObjectState {
        ObjectState {
            oid: self.oid,
            values: self.values.clone(),
        }
    }

    /// Object id
    pub fn oid(&self) -> Oid {
        self.oid
    }

    /// Entity type id
    pub fn type_id(&self) -> TypeId {
        self.entity.id()
    }

    /// Entity type name
    pub fn type_name(&self) -> &str {
        self.entity.name()
    }

    /// Entity type this object was materialized under
    pub fn entity(&self) -> &Arc<EntityType> {
        &self.entity
    }

    /// Resolve an attribute name on this object's type
    pub fn handle(&self, name: &str) -> ChangeResult<AttributeHandle> {
        self.entity
            .handle(name)
            .ok_or_else(|| ChangeError::AttributeNotFound {
                type_name: self.entity.name().to_string(),
                attribute: name.to_string(),
            })
    }

    /// Current value of an attribute by name
    pub fn get(&self, name: &str) -> ChangeResult<&Value> {
        let handle = self.handle(name)?;
        Ok(&self.values[handle.index()])
    }

    /// Current value of an attribute by handle
    pub fn get_handle(&self, handle: AttributeHandle) -> Option<&Value> {
        self.entity.attribute_at(handle)?;
        self.values.get(handle.index())
    }

    /// Number of positional slots of an attribute
    ///
    /// A single-valued attribute always has exactly one slot.
    pub fn slot_count(&self, handle: AttributeHandle) -> ChangeResult<usize> {
        let attribute = self.attribute(handle)?;
        Ok(match &self.values[attribute.handle().index()] {
            Value::List(items) if attribute.is_many() => items.len(),
            _ => 1,
        })
    }

    /// Set a single-valued attribute; `Null` clears it
    pub fn set_scalar(&mut self, handle: AttributeHandle, value: Value) -> ChangeResult<()> {
        let entity = Arc::clone(&self.entity);
        let attribute = writable(&entity, handle)?;
        if attribute.is_many() {
            return Err(ChangeError::CardinalityMismatch {
                attribute: attribute.name().to_string(),
                expected: Cardinality::Many,
                got_many: false,
            });
        }
        if value.is_sequence() {
            return Err(ChangeError::CardinalityMismatch {
                attribute: attribute.name().to_string(),
                expected: Cardinality::Single,
                got_many: true,
            });
        }
        if !value.is_null() {
            check_element(attribute, &value)?;
        }
        self.values[handle.index()] = value;
        self.sync_shadow(attribute, None);
        Ok(())
    }

    /// Replace the element at `index`
    ///
    /// List attributes accept any index below their length. A single-valued
    /// attribute has one slot, so only index 0 is in range; `Null` clears it.
    pub fn set_list_element(
        &mut self,
        handle: AttributeHandle,
        index: usize,
        value: Value,
    ) -> ChangeResult<()> {
        let entity = Arc::clone(&self.entity);
        let attribute = writable(&entity, handle)?;
        let slot = handle.index();

        match attribute.cardinality() {
            Cardinality::Many => {
                let current_length = list_len(&self.values[slot]);
                if index >= current_length {
                    return Err(out_of_range(attribute, index, current_length));
                }
                check_element(attribute, &value)?;
                if let Value::List(items) = &mut self.values[slot] {
                    items[index] = value;
                }
            }
            Cardinality::Single => {
                if index != 0 {
                    return Err(out_of_range(attribute, index, 1));
                }
                if !value.is_null() {
                    check_element(attribute, &value)?;
                }
                self.values[slot] = value;
            }
        }
        self.sync_shadow(attribute, Some(index));
        Ok(())
    }

    /// Replace a list attribute with `items`, in order
    ///
    /// Every element is checked before the stored list is touched.
    pub fn replace_list(&mut self, handle: AttributeHandle, items: Vec<Value>) -> ChangeResult<()> {
        let entity = Arc::clone(&self.entity);
        let attribute = writable(&entity, handle)?;
        if !attribute.is_many() {
            return Err(ChangeError::CardinalityMismatch {
                attribute: attribute.name().to_string(),
                expected: Cardinality::Single,
                got_many: true,
            });
        }
        for item in &items {
            check_element(attribute, item)?;
        }
        self.values[handle.index()] = Value::List(items);
        self.sync_shadow(attribute, None);
        Ok(())
    }

    /// Append an element to a list attribute
    pub fn push(&mut self, handle: AttributeHandle, value: Value) -> ChangeResult<()> {
        let entity = Arc::clone(&self.entity);
        let attribute = writable(&entity, handle)?;
        if !attribute.is_many() {
            return Err(ChangeError::CardinalityMismatch {
                attribute: attribute.name().to_string(),
                expected: Cardinality::Single,
                got_many: true,
            });
        }
        check_element(attribute, &value)?;
        if let Value::List(items) = &mut self.values[handle.index()] {
            items.push(value);
        }
        self.sync_shadow(attribute, None);
        Ok(())
    }

    /// Remove and return the element at `index` of a list attribute
    pub fn remove_at(&mut self, handle: AttributeHandle, index: usize) -> ChangeResult<Value> {
        let entity = Arc::clone(&self.entity);
        let attribute = writable(&entity, handle)?;
        if !attribute.is_many() {
            return Err(ChangeError::CardinalityMismatch {
                attribute: attribute.name().to_string(),
                expected: Cardinality::Single,
                got_many: true,
            });
        }
        let current_length = list_len(&self.values[handle.index()]);
        if index >= current_length {
            return Err(out_of_range(attribute, index, current_length));
        }
        let removed = match &mut self.values[handle.index()] {
            Value::List(items) => items.remove(index),
            _ => Value::Null,
        };
        self.sync_shadow(attribute, None);
        Ok(removed)
    }

    /// Whole-value write: sequences go to list attributes, scalars to single ones
    pub fn set(&mut self, handle: AttributeHandle, value: Value) -> ChangeResult<()> {
        let attribute = self.attribute(handle)?;
        match (attribute.is_many(), value) {
            (true, Value::List(items)) => self.replace_list(handle, items),
            (true, _) => Err(ChangeError::CardinalityMismatch {
                attribute: attribute.name().to_string(),
                expected: Cardinality::Many,
                got_many: false,
            }),
            (false, value) => self.set_scalar(handle, value),
        }
    }

    fn attribute(&self, handle: AttributeHandle) -> ChangeResult<&Attribute> {
        self.entity
            .attribute_at(handle)
            .ok_or_else(|| foreign_handle(&self.entity, handle))
    }

    fn sync_shadow(&mut self, attribute: &Attribute, index: Option<usize>) {
        let Some(shadow) = attribute.shadow() else {
            return;
        };
        let update = {
            let source = &self.values[attribute.handle().index()];
            let mirrored = &self.values[shadow.index()];
            match (source, index) {
                (Value::List(items), Some(i))
                    if i < items.len()
                        && matches!(mirrored, Value::List(texts) if texts.len() == items.len()) =>
                {
                    ShadowUpdate::Element(i, shadow_text(&items[i]))
                }
                (Value::List(items), _) => {
                    ShadowUpdate::Whole(Value::List(items.iter().map(shadow_text).collect()))
                }
                (single, _) => ShadowUpdate::Whole(shadow_text(single)),
            }
        };
        match update {
            ShadowUpdate::Element(i, text) => {
                if let Value::List(texts) = &mut self.values[shadow.index()] {
                    texts[i] = text;
                }
            }
            ShadowUpdate::Whole(value) => self.values[shadow.index()] = value,
        }
    }
}

fn writable(entity: &EntityType, handle: AttributeHandle) -> ChangeResult<&Attribute> {
    let attribute = entity
        .attribute_at(handle)
        .ok_or_else(|| foreign_handle(entity, handle))?;
    if attribute.shadow_of().is_some() {
        return Err(ChangeError::ReadOnlyAttribute {
            type_name: entity.name().to_string(),
            attribute: attribute.name().to_string(),
        });
    }
    Ok(attribute)
}

fn foreign_handle(entity: &EntityType, handle: AttributeHandle) -> ChangeError {
    ChangeError::AttributeNotFound {
        type_name: entity.name().to_string(),
        attribute: format!("<{} slot {}>", handle.type_id(), handle.index()),
    }
}

fn check_element(attribute: &Attribute, value: &Value) -> ChangeResult<()> {
    if attribute.element().accepts(value) {
        return Ok(());
    }
    Err(ChangeError::TypeMismatch {
        attribute: attribute.name().to_string(),
        expected: attribute.element().value_kind(),
        got: value.kind(),
    })
}

fn list_len(value: &Value) -> usize {
    value.as_list().map_or(0, <[Value]>::len)
}

fn out_of_range(attribute: &Attribute, index: usize, current_length: usize) -> ChangeError {
    ChangeError::IndexOutOfRange {
        attribute: attribute.name().to_string(),
        index: index as i64,
        current_length,
    }
}
