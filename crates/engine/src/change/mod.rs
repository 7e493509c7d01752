//! Change variants
//!
//! A [`Change`] is one atomic mutation request. Every variant implements
//! [`ApplyChange`]: it resolves its target through the [`ChangeContext`],
//! validates against the schema, mutates a staging copy and persists it
//! into the batch's concrete revision. A variant either succeeds completely
//! or leaves the context untouched.
//!
//! Changes are plain serde data so callers can ship them over any
//! transport.

use serde::{Deserialize, Serialize};

use bimstore_core::{Attribute, AttributeHandle, ChangeError, ChangeResult, Oid, Value, VirtualObject};

use crate::context::ChangeContext;

pub mod attribute;
pub mod object;
pub mod reference;

pub use attribute::{SetAttribute, SetAttributeAtIndex};
pub use object::{CreateObject, RemoveObject};
pub use reference::{AddReference, RemoveReference, SetReference};

/// Capability shared by every change variant
pub trait ApplyChange {
    /// Apply this change to the batch carried by `ctx`
    fn apply(&self, ctx: &mut ChangeContext<'_>) -> ChangeResult<()>;

    /// Object the change targets
    fn target(&self) -> Oid;
}

/// Closed set of change variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Change {
    /// Create an object with a pre-allocated oid
    CreateObject(CreateObject),
    /// Remove an object
    RemoveObject(RemoveObject),
    /// Write a whole attribute value
    SetAttribute(SetAttribute),
    /// Write one positional slot of an attribute, or replace a whole list
    SetAttributeAtIndex(SetAttributeAtIndex),
    /// Set or clear a single reference
    SetReference(SetReference),
    /// Append to a reference list
    AddReference(AddReference),
    /// Remove one element of a reference list
    RemoveReference(RemoveReference),
}

impl Change {
    /// Create an object of `type_name` under `oid`
    pub fn create_object(oid: Oid, type_name: impl Into<String>) -> Self {
        Change::CreateObject(CreateObject {
            oid,
            type_name: type_name.into(),
        })
    }

    /// Remove `oid`
    pub fn remove_object(oid: Oid) -> Self {
        Change::RemoveObject(RemoveObject { oid })
    }

    /// Set `attribute` of `oid` to `value`
    pub fn set_attribute(oid: Oid, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Change::SetAttribute(SetAttribute {
            oid,
            attribute: attribute.into(),
            value: value.into(),
        })
    }

    /// Set slot `index` of `attribute`, or replace the list when `value` is a sequence
    pub fn set_attribute_at_index(
        oid: Oid,
        attribute: impl Into<String>,
        index: i32,
        value: impl Into<Value>,
    ) -> Self {
        Change::SetAttributeAtIndex(SetAttributeAtIndex {
            oid,
            attribute: attribute.into(),
            index,
            value: value.into(),
        })
    }

    /// Point `reference` of `oid` at `target`, or clear it with `None`
    pub fn set_reference(oid: Oid, reference: impl Into<String>, target: Option<Oid>) -> Self {
        Change::SetReference(SetReference {
            oid,
            reference: reference.into(),
            target,
        })
    }

    /// Append `target` to list reference `reference` of `oid`
    pub fn add_reference(oid: Oid, reference: impl Into<String>, target: Oid) -> Self {
        Change::AddReference(AddReference {
            oid,
            reference: reference.into(),
            target,
        })
    }

    /// Drop element `index` of list reference `reference` of `oid`
    pub fn remove_reference(oid: Oid, reference: impl Into<String>, index: i32) -> Self {
        Change::RemoveReference(RemoveReference {
            oid,
            reference: reference.into(),
            index,
        })
    }

    /// Variant name, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Change::CreateObject(_) => "create_object",
            Change::RemoveObject(_) => "remove_object",
            Change::SetAttribute(_) => "set_attribute",
            Change::SetAttributeAtIndex(_) => "set_attribute_at_index",
            Change::SetReference(_) => "set_reference",
            Change::AddReference(_) => "add_reference",
            Change::RemoveReference(_) => "remove_reference",
        }
    }

    fn as_apply(&self) -> &dyn ApplyChange {
        match self {
            Change::CreateObject(c) => c,
            Change::RemoveObject(c) => c,
            Change::SetAttribute(c) => c,
            Change::SetAttributeAtIndex(c) => c,
            Change::SetReference(c) => c,
            Change::AddReference(c) => c,
            Change::RemoveReference(c) => c,
        }
    }
}

impl ApplyChange for Change {
    fn apply(&self, ctx: &mut ChangeContext<'_>) -> ChangeResult<()> {
        self.as_apply().apply(ctx)
    }

    fn target(&self) -> Oid {
        self.as_apply().target()
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Change {
                fn from(change: $variant) -> Self {
                    Change::$variant(change)
                }
            }
        )*
    };
}

impl_from_variant!(
    CreateObject,
    RemoveObject,
    SetAttribute,
    SetAttributeAtIndex,
    SetReference,
    AddReference,
    RemoveReference,
);

/// Convert a caller index to a slot position
///
/// Negative indices are out of range for every attribute.
pub(crate) fn slot_index(
    object: &VirtualObject,
    handle: AttributeHandle,
    attribute: &Attribute,
    index: i32,
) -> ChangeResult<usize> {
    match usize::try_from(index) {
        Ok(slot) => Ok(slot),
        Err(_) => Err(ChangeError::IndexOutOfRange {
            attribute: attribute.name().to_string(),
            index: i64::from(index),
            current_length: object.slot_count(handle)?,
        }),
    }
}
