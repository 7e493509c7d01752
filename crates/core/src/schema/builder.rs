//! Schema assembly
//!
//! The builder is the only place the `X` / `XAsString` naming convention is
//! applied: every float attribute gets a string shadow of the same cardinality
//! declared right after it, and both sides are linked by handle.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::{
    Attribute, AttributeHandle, Cardinality, ElementType, EntityType, Enumeration, PrimitiveType,
    Schema, SHADOW_SUFFIX,
};
use crate::error::SchemaError;
use crate::types::TypeId;

#[derive(Debug, Clone)]
enum PendingElement {
    Resolved(ElementType),
    /// Reference target named by type; resolved at build time
    ReferenceTo(Option<String>),
}

#[derive(Debug, Clone)]
struct PendingAttribute {
    name: String,
    cardinality: Cardinality,
    element: PendingElement,
}

#[derive(Debug, Clone)]
struct PendingEntity {
    name: String,
    attributes: Vec<PendingAttribute>,
}

/// Builder for [`Schema`]
///
/// ```
/// use bimstore_core::schema::{Cardinality, ElementType, PrimitiveType, SchemaBuilder};
///
/// let schema = SchemaBuilder::new("ifc2x3tc1")
///     .entity("IfcCartesianPoint")
///     .attribute("Coordinates", Cardinality::Many, ElementType::Primitive(PrimitiveType::Float))
///     .build()
///     .unwrap();
/// assert!(schema.entity_type_by_name("IfcCartesianPoint").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    id: String,
    enumerations: Vec<(String, Vec<String>)>,
    entities: Vec<PendingEntity>,
    orphans: Vec<String>,
}

impl SchemaBuilder {
    /// Start a schema with the given schema/version identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enumerations: Vec::new(),
            entities: Vec::new(),
            orphans: Vec::new(),
        }
    }

    /// Declare an enumeration; literals are stored upper case
    pub fn enumeration(mut self, name: impl Into<String>, literals: &[&str]) -> Self {
        let literals = literals.iter().map(|l| l.to_uppercase()).collect();
        self.enumerations.push((name.into(), literals));
        self
    }

    /// Start a new entity type; following attribute calls belong to it
    pub fn entity(mut self, name: impl Into<String>) -> Self {
        self.entities.push(PendingEntity {
            name: name.into(),
            attributes: Vec::new(),
        });
        self
    }

    /// Add a primitive or enumerated attribute to the current entity type
    pub fn attribute(
        self,
        name: impl Into<String>,
        cardinality: Cardinality,
        element: ElementType,
    ) -> Self {
        self.push_attribute(name.into(), cardinality, PendingElement::Resolved(element))
    }

    /// Add a reference attribute to the current entity type
    ///
    /// `target` names the referenced entity type; `None` accepts any type.
    pub fn reference(
        self,
        name: impl Into<String>,
        cardinality: Cardinality,
        target: Option<&str>,
    ) -> Self {
        self.push_attribute(
            name.into(),
            cardinality,
            PendingElement::ReferenceTo(target.map(str::to_string)),
        )
    }

    fn push_attribute(
        mut self,
        name: String,
        cardinality: Cardinality,
        element: PendingElement,
    ) -> Self {
        match self.entities.last_mut() {
            Some(entity) => entity.attributes.push(PendingAttribute {
                name,
                cardinality,
                element,
            }),
            None => self.orphans.push(name),
        }
        self
    }

    /// Validate and freeze the schema
    pub fn build(self) -> Result<Schema, SchemaError> {
        if let Some(attribute) = self.orphans.into_iter().next() {
            return Err(SchemaError::AttributeOutsideEntity { attribute });
        }

        let mut enumerations = FxHashMap::default();
        for (name, literals) in self.enumerations {
            if enumerations.contains_key(&name) {
                return Err(SchemaError::DuplicateEnumeration { name });
            }
            enumerations.insert(
                name.clone(),
                Enumeration {
                    name,
                    literals,
                },
            );
        }

        let mut type_by_name = FxHashMap::default();
        for (index, entity) in self.entities.iter().enumerate() {
            let id = u16::try_from(index).map_err(|_| SchemaError::TooManyTypes {
                count: self.entities.len(),
            })?;
            if type_by_name.insert(entity.name.clone(), TypeId(id)).is_some() {
                return Err(SchemaError::DuplicateEntityType {
                    name: entity.name.clone(),
                });
            }
        }

        let mut types = Vec::with_capacity(self.entities.len());
        for (index, entity) in self.entities.into_iter().enumerate() {
            let type_id = TypeId(index as u16);
            let mut attributes: Vec<Attribute> = Vec::new();
            let mut by_name: FxHashMap<String, u16> = FxHashMap::default();

            for pending in entity.attributes {
                let element = match pending.element {
                    PendingElement::Resolved(ElementType::Reference(target)) => {
                        ElementType::Reference(target)
                    }
                    PendingElement::Resolved(ElementType::Enumeration(name)) => {
                        if !enumerations.contains_key(&name) {
                            return Err(SchemaError::UnknownEnumeration {
                                type_name: entity.name.clone(),
                                attribute: pending.name,
                                enumeration: name,
                            });
                        }
                        ElementType::Enumeration(name)
                    }
                    PendingElement::Resolved(element) => element,
                    PendingElement::ReferenceTo(None) => ElementType::Reference(None),
                    PendingElement::ReferenceTo(Some(target)) => match type_by_name.get(&target) {
                        Some(target_id) => ElementType::Reference(Some(*target_id)),
                        None => {
                            return Err(SchemaError::UnknownEntityType {
                                type_name: entity.name.clone(),
                                attribute: pending.name,
                                target,
                            })
                        }
                    },
                };

                let shadowed = element.is_float();
                let handle = add_slot(
                    &entity.name,
                    type_id,
                    &mut attributes,
                    &mut by_name,
                    pending.name.clone(),
                    pending.cardinality,
                    element,
                )?;

                if shadowed {
                    let shadow = add_slot(
                        &entity.name,
                        type_id,
                        &mut attributes,
                        &mut by_name,
                        format!("{}{}", pending.name, SHADOW_SUFFIX),
                        pending.cardinality,
                        ElementType::Primitive(PrimitiveType::String),
                    )?;
                    attributes[handle.index()].shadow = Some(shadow);
                    attributes[shadow.index()].shadow_of = Some(handle);
                }
            }

            types.push(Arc::new(EntityType {
                id: type_id,
                name: entity.name,
                attributes,
                by_name,
            }));
        }

        Ok(Schema {
            id: self.id,
            types,
            type_by_name,
            enumerations,
        })
    }
}

fn add_slot(
    type_name: &str,
    type_id: TypeId,
    attributes: &mut Vec<Attribute>,
    by_name: &mut FxHashMap<String, u16>,
    name: String,
    cardinality: Cardinality,
    element: ElementType,
) -> Result<AttributeHandle, SchemaError> {
    if by_name.contains_key(&name) {
        return Err(SchemaError::DuplicateAttribute {
            type_name: type_name.to_string(),
            attribute: name,
        });
    }
    let index = u16::try_from(attributes.len()).map_err(|_| SchemaError::TooManyAttributes {
        type_name: type_name.to_string(),
    })?;
    let handle = AttributeHandle::new(type_id, index);
    by_name.insert(name.clone(), index);
    attributes.push(Attribute {
        name,
        handle,
        cardinality,
        element,
        shadow: None,
        shadow_of: None,
    });
    Ok(handle)
}
