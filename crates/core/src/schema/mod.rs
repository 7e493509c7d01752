//! Schema descriptor
//!
//! Immutable, in-memory description of entity types, their attributes and
//! enumerations. Schemas are assembled with [`SchemaBuilder`]; nothing in this
//! crate parses schema definitions.
//!
//! Attribute lookup by name happens once: callers resolve
//! `(type, attribute name)` to an [`AttributeHandle`] and use the handle from
//! then on. A float attribute `X` carries an explicit link to its string shadow
//! `XAsString`, wired when the schema is built.

mod builder;

pub use builder::SchemaBuilder;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::types::TypeId;
use crate::value::{EnumLiteral, Value, ValueKind};

/// Suffix of the string attribute that mirrors a float attribute
pub const SHADOW_SUFFIX: &str = "AsString";

/// Whether an attribute holds one value or an ordered list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// One value (possibly `Null`)
    Single,
    /// Ordered list of values
    Many,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Single => f.write_str("single"),
            Cardinality::Many => f.write_str("many"),
        }
    }
}

/// Primitive element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    /// Boolean
    Boolean,
    /// 64-bit signed integer
    Integer,
    /// 64-bit float
    Float,
    /// UTF-8 text
    String,
}

/// Declared element type of an attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// Primitive value
    Primitive(PrimitiveType),
    /// Literal of the named enumeration
    Enumeration(String),
    /// Reference to an object; `None` accepts any entity type
    Reference(Option<TypeId>),
}

impl ElementType {
    /// Value kind an element of this type must have
    pub fn value_kind(&self) -> ValueKind {
        match self {
            ElementType::Primitive(PrimitiveType::Boolean) => ValueKind::Bool,
            ElementType::Primitive(PrimitiveType::Integer) => ValueKind::Int,
            ElementType::Primitive(PrimitiveType::Float) => ValueKind::Float,
            ElementType::Primitive(PrimitiveType::String) => ValueKind::String,
            ElementType::Enumeration(_) => ValueKind::Enum,
            ElementType::Reference(_) => ValueKind::Ref,
        }
    }

    /// Check if this is the floating-point primitive
    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::Primitive(PrimitiveType::Float))
    }

    /// Check whether a (non-null) element value is compatible with this type
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ElementType::Primitive(PrimitiveType::Boolean), Value::Bool(_)) => true,
            (ElementType::Primitive(PrimitiveType::Integer), Value::Int(_)) => true,
            (ElementType::Primitive(PrimitiveType::Float), Value::Float(_)) => true,
            (ElementType::Primitive(PrimitiveType::String), Value::String(_)) => true,
            (ElementType::Enumeration(name), Value::Enum(literal)) => literal.enumeration == *name,
            (ElementType::Reference(None), Value::Ref(_)) => true,
            (ElementType::Reference(Some(type_id)), Value::Ref(oid)) => oid.type_id() == *type_id,
            _ => false,
        }
    }
}

/// Resolved attribute of an entity type
///
/// Cheap to copy; resolve through [`Schema::attribute`] or
/// [`EntityType::attribute_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeHandle {
    type_id: TypeId,
    index: u16,
}

impl AttributeHandle {
    pub(crate) fn new(type_id: TypeId, index: u16) -> Self {
        Self { type_id, index }
    }

    /// Entity type that declares the attribute
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Slot position of the attribute within its entity type
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Attribute descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    handle: AttributeHandle,
    cardinality: Cardinality,
    element: ElementType,
    shadow: Option<AttributeHandle>,
    shadow_of: Option<AttributeHandle>,
}

impl Attribute {
    /// Attribute name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle of this attribute
    pub fn handle(&self) -> AttributeHandle {
        self.handle
    }

    /// Declared cardinality
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Check if the attribute is list-valued
    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }

    /// Declared element type
    pub fn element(&self) -> &ElementType {
        &self.element
    }

    /// String attribute mirroring this float attribute, if any
    pub fn shadow(&self) -> Option<AttributeHandle> {
        self.shadow
    }

    /// Float attribute this attribute mirrors, if it is a shadow
    pub fn shadow_of(&self) -> Option<AttributeHandle> {
        self.shadow_of
    }

    /// Value stored for a freshly created object
    pub fn default_value(&self) -> Value {
        match self.cardinality {
            Cardinality::Single => Value::Null,
            Cardinality::Many => Value::List(Vec::new()),
        }
    }
}

/// Entity type descriptor
#[derive(Debug, Clone)]
pub struct EntityType {
    id: TypeId,
    name: String,
    attributes: Vec<Attribute>,
    by_name: FxHashMap<String, u16>,
}

impl EntityType {
    /// Type id
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in declaration order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Number of attribute slots
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Resolve an attribute name to its handle
    pub fn handle(&self, name: &str) -> Option<AttributeHandle> {
        self.by_name
            .get(name)
            .map(|index| AttributeHandle::new(self.id, *index))
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.by_name
            .get(name)
            .map(|index| &self.attributes[*index as usize])
    }

    /// Look up an attribute by handle
    ///
    /// Returns None if the handle belongs to another type.
    pub fn attribute_at(&self, handle: AttributeHandle) -> Option<&Attribute> {
        if handle.type_id != self.id {
            return None;
        }
        self.attributes.get(handle.index())
    }
}

/// Enumeration descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    name: String,
    literals: Vec<String>,
}

impl Enumeration {
    /// Enumeration name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Literals in declaration order
    pub fn literals(&self) -> &[String] {
        &self.literals
    }

    /// Resolve literal text, case-normalized to upper case
    pub fn literal(&self, text: &str) -> Option<EnumLiteral> {
        let wanted = text.to_uppercase();
        self.literals
            .iter()
            .position(|literal| *literal == wanted)
            .map(|ordinal| EnumLiteral {
                enumeration: self.name.clone(),
                literal: wanted,
                ordinal: ordinal as u32,
            })
    }
}

/// Complete schema descriptor, identified by a schema/version id
#[derive(Debug, Clone)]
pub struct Schema {
    id: String,
    types: Vec<Arc<EntityType>>,
    type_by_name: FxHashMap<String, TypeId>,
    enumerations: FxHashMap<String, Enumeration>,
}

impl Schema {
    /// Schema identifier (e.g. `"ifc2x3tc1"`)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// All entity types, ordered by type id
    pub fn entity_types(&self) -> &[Arc<EntityType>] {
        &self.types
    }

    /// Look up an entity type by id
    pub fn entity_type(&self, id: TypeId) -> Option<&Arc<EntityType>> {
        self.types.get(id.index())
    }

    /// Look up an entity type by name
    pub fn entity_type_by_name(&self, name: &str) -> Option<&Arc<EntityType>> {
        self.type_by_name
            .get(name)
            .and_then(|id| self.entity_type(*id))
    }

    /// Name of an entity type, if the id is known
    pub fn type_name(&self, id: TypeId) -> Option<&str> {
        self.entity_type(id).map(|t| t.name())
    }

    /// Resolve `(type, attribute name)` to a handle
    pub fn resolve(&self, type_id: TypeId, attribute: &str) -> Option<AttributeHandle> {
        self.entity_type(type_id).and_then(|t| t.handle(attribute))
    }

    /// Look up an attribute by handle
    pub fn attribute(&self, handle: AttributeHandle) -> Option<&Attribute> {
        self.entity_type(handle.type_id)
            .and_then(|t| t.attribute_at(handle))
    }

    /// Look up an enumeration by name
    pub fn enumeration(&self, name: &str) -> Option<&Enumeration> {
        self.enumerations.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Oid;

    fn schema() -> Schema {
        SchemaBuilder::new("test")
            .enumeration("IfcStatus", &["PENDING", "DONE"])
            .entity("IfcCartesianPoint")
            .attribute("Coordinates", Cardinality::Many, ElementType::Primitive(PrimitiveType::Float))
            .entity("IfcTask")
            .attribute("Name", Cardinality::Single, ElementType::Primitive(PrimitiveType::String))
            .attribute("Status", Cardinality::Single, ElementType::Enumeration("IfcStatus".into()))
            .attribute("Duration", Cardinality::Single, ElementType::Primitive(PrimitiveType::Float))
            .build()
            .unwrap()
    }

    #[test]
    fn test_resolve_attribute_handle() {
        let schema = schema();
        let task = schema.entity_type_by_name("IfcTask").unwrap();
        let handle = schema.resolve(task.id(), "Status").unwrap();
        let attribute = schema.attribute(handle).unwrap();
        assert_eq!(attribute.name(), "Status");
        assert_eq!(attribute.cardinality(), Cardinality::Single);
        assert_eq!(attribute.handle(), handle);
    }

    #[test]
    fn test_unknown_attribute_is_none() {
        let schema = schema();
        let task = schema.entity_type_by_name("IfcTask").unwrap();
        assert!(schema.resolve(task.id(), "Colour").is_none());
        assert!(task.attribute("Colour").is_none());
    }

    #[test]
    fn test_float_attributes_are_shadowed() {
        let schema = schema();
        let point = schema.entity_type_by_name("IfcCartesianPoint").unwrap();
        let coords = point.attribute("Coordinates").unwrap();
        let shadow = schema.attribute(coords.shadow().unwrap()).unwrap();
        assert_eq!(shadow.name(), "CoordinatesAsString");
        assert_eq!(shadow.cardinality(), Cardinality::Many);
        assert_eq!(shadow.element(), &ElementType::Primitive(PrimitiveType::String));
        assert_eq!(shadow.shadow_of(), Some(coords.handle()));
    }

    #[test]
    fn test_handle_from_other_type_rejected() {
        let schema = schema();
        let point = schema.entity_type_by_name("IfcCartesianPoint").unwrap();
        let task = schema.entity_type_by_name("IfcTask").unwrap();
        let name = task.handle("Name").unwrap();
        assert!(point.attribute_at(name).is_none());
    }

    #[test]
    fn test_enum_literal_normalized() {
        let schema = schema();
        let status = schema.enumeration("IfcStatus").unwrap();
        let literal = status.literal("pending").unwrap();
        assert_eq!(literal.literal, "PENDING");
        assert_eq!(literal.ordinal, 0);
        assert!(status.literal("not_a_literal").is_none());
    }

    #[test]
    fn test_element_type_accepts() {
        let float = ElementType::Primitive(PrimitiveType::Float);
        assert!(float.accepts(&Value::Float(1.0)));
        assert!(!float.accepts(&Value::Int(1)));

        let any_ref = ElementType::Reference(None);
        assert!(any_ref.accepts(&Value::Ref(Oid::new(TypeId(3), 1))));

        let typed_ref = ElementType::Reference(Some(TypeId(2)));
        assert!(typed_ref.accepts(&Value::Ref(Oid::new(TypeId(2), 1))));
        assert!(!typed_ref.accepts(&Value::Ref(Oid::new(TypeId(3), 1))));
    }

    #[test]
    fn test_default_values() {
        let schema = schema();
        let task = schema.entity_type_by_name("IfcTask").unwrap();
        assert_eq!(task.attribute("Name").unwrap().default_value(), Value::Null);
        let point = schema.entity_type_by_name("IfcCartesianPoint").unwrap();
        assert_eq!(
            point.attribute("Coordinates").unwrap().default_value(),
            Value::List(vec![])
        );
    }
}
