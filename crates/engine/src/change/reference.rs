//! Reference edits
//!
//! References are `Value::Ref` slots of reference attributes. The declared
//! target type is enforced by the object primitives; live targets are only
//! required when the context runs with strict references.

use serde::{Deserialize, Serialize};

use bimstore_core::{
    Attribute, AttributeHandle, ChangeError, ChangeResult, Oid, Value, ValueKind, VirtualObject,
};

use super::{slot_index, ApplyChange};
use crate::context::ChangeContext;

/// Set a single-valued reference, or clear it with `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetReference {
    /// Referencing object
    pub oid: Oid,
    /// Reference attribute name
    pub reference: String,
    /// New target
    pub target: Option<Oid>,
}

impl ApplyChange for SetReference {
    fn apply(&self, ctx: &mut ChangeContext<'_>) -> ChangeResult<()> {
        let (mut object, handle, _) = resolve_reference(ctx, self.oid, &self.reference)?;
        let value = match self.target {
            Some(target) => {
                ctx.check_target(target)?;
                Value::Ref(target)
            }
            None => Value::Null,
        };
        object.set_scalar(handle, value)?;
        ctx.persist(object)
    }

    fn target(&self) -> Oid {
        self.oid
    }
}

/// Append a target to a list reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddReference {
    /// Referencing object
    pub oid: Oid,
    /// Reference attribute name
    pub reference: String,
    /// Target to append
    pub target: Oid,
}

impl ApplyChange for AddReference {
    fn apply(&self, ctx: &mut ChangeContext<'_>) -> ChangeResult<()> {
        let (mut object, handle, _) = resolve_reference(ctx, self.oid, &self.reference)?;
        ctx.check_target(self.target)?;
        object.push(handle, Value::Ref(self.target))?;
        ctx.persist(object)
    }

    fn target(&self) -> Oid {
        self.oid
    }
}

/// Remove one element of a list reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveReference {
    /// Referencing object
    pub oid: Oid,
    /// Reference attribute name
    pub reference: String,
    /// Position of the element to drop
    pub index: i32,
}

impl ApplyChange for RemoveReference {
    fn apply(&self, ctx: &mut ChangeContext<'_>) -> ChangeResult<()> {
        let (mut object, handle, attribute) = resolve_reference(ctx, self.oid, &self.reference)?;
        let index = slot_index(&object, handle, attribute, self.index)?;
        object.remove_at(handle, index)?;
        ctx.persist(object)
    }

    fn target(&self) -> Oid {
        self.oid
    }
}

fn resolve_reference<'a>(
    ctx: &mut ChangeContext<'a>,
    oid: Oid,
    name: &str,
) -> ChangeResult<(VirtualObject, AttributeHandle, &'a Attribute)> {
    let object = ctx.resolve_target(oid)?;
    let (handle, attribute) = ctx.resolve_attribute(&object, name)?;
    if attribute.element().value_kind() != ValueKind::Ref {
        return Err(ChangeError::TypeMismatch {
            attribute: attribute.name().to_string(),
            expected: attribute.element().value_kind(),
            got: ValueKind::Ref,
        });
    }
    Ok((object, handle, attribute))
}
