//! Attribute writes

use serde::{Deserialize, Serialize};

use bimstore_core::{Cardinality, ChangeError, ChangeResult, Oid, Value};

use super::{slot_index, ApplyChange};
use crate::context::ChangeContext;

/// Write one positional slot of an attribute, or replace a whole list
///
/// A sequence value against a list attribute replaces the list element by
/// element. Any other value writes slot `index`: single-valued attributes
/// have exactly one slot. Enumeration text is upper-cased and resolved to
/// its literal; float attributes update their string shadow at the same
/// index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetAttributeAtIndex {
    /// Target object
    pub oid: Oid,
    /// Attribute name
    pub attribute: String,
    /// Slot position; ignored for whole-list replacement
    pub index: i32,
    /// Scalar or sequence value
    pub value: Value,
}

impl ApplyChange for SetAttributeAtIndex {
    fn apply(&self, ctx: &mut ChangeContext<'_>) -> ChangeResult<()> {
        let mut object = ctx.resolve_target(self.oid)?;
        let (handle, attribute) = ctx.resolve_attribute(&object, &self.attribute)?;

        match (self.value.is_sequence(), attribute.is_many()) {
            (true, true) => {
                let Value::List(items) = ctx.prepare_value(attribute, self.value.clone())? else {
                    return Err(ChangeError::InvalidState(format!(
                        "sequence for \"{}\" lost its shape during coercion",
                        self.attribute
                    )));
                };
                object.replace_list(handle, items)?;
            }
            (true, false) => {
                return Err(ChangeError::CardinalityMismatch {
                    attribute: attribute.name().to_string(),
                    expected: Cardinality::Single,
                    got_many: true,
                })
            }
            (false, true) => {
                return Err(ChangeError::CardinalityMismatch {
                    attribute: attribute.name().to_string(),
                    expected: Cardinality::Many,
                    got_many: false,
                })
            }
            (false, false) => {
                let index = slot_index(&object, handle, attribute, self.index)?;
                let value = ctx.prepare_value(attribute, self.value.clone())?;
                object.set_list_element(handle, index, value)?;
            }
        }

        ctx.persist(object)
    }

    fn target(&self) -> Oid {
        self.oid
    }
}

/// Write a whole attribute value
///
/// List attributes take a sequence, single-valued attributes a scalar
/// (`Null` clears).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetAttribute {
    /// Target object
    pub oid: Oid,
    /// Attribute name
    pub attribute: String,
    /// New value
    pub value: Value,
}

impl ApplyChange for SetAttribute {
    fn apply(&self, ctx: &mut ChangeContext<'_>) -> ChangeResult<()> {
        let mut object = ctx.resolve_target(self.oid)?;
        let (handle, attribute) = ctx.resolve_attribute(&object, &self.attribute)?;
        let value = ctx.prepare_value(attribute, self.value.clone())?;
        object.set(handle, value)?;
        ctx.persist(object)
    }

    fn target(&self) -> Oid {
        self.oid
    }
}
