//! Object creation and removal

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use bimstore_core::{ChangeError, ChangeResult, Oid, VirtualObject};

use super::ApplyChange;
use crate::context::ChangeContext;

/// Create an object under a pre-allocated oid
///
/// The new object has every single-valued slot `Null` and every list empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateObject {
    /// Oid allocated for `type_name`
    pub oid: Oid,
    /// Entity type name
    pub type_name: String,
}

impl ApplyChange for CreateObject {
    fn apply(&self, ctx: &mut ChangeContext<'_>) -> ChangeResult<()> {
        let entity = ctx.entity_type(&self.type_name)?;
        if self.oid.type_id() != entity.id() {
            return Err(ChangeError::OidTypeMismatch {
                oid: self.oid,
                type_name: self.type_name.clone(),
            });
        }
        if ctx.is_live(self.oid) || ctx.is_foreign(self.oid) {
            return Err(ChangeError::ObjectAlreadyExists { oid: self.oid });
        }
        ctx.persist_created(VirtualObject::new(self.oid, Arc::clone(entity)))
    }

    fn target(&self) -> Oid {
        self.oid
    }
}

/// Remove an object from the new revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveObject {
    /// Object to remove
    pub oid: Oid,
}

impl ApplyChange for RemoveObject {
    fn apply(&self, ctx: &mut ChangeContext<'_>) -> ChangeResult<()> {
        ctx.resolve_target(self.oid)?;
        ctx.persist_removal(self.oid)
    }

    fn target(&self) -> Oid {
        self.oid
    }
}
