//! Value normalization before a write
//!
//! Enumeration attributes accept literal text from callers: the text is
//! upper-cased and resolved to the enumeration's literal. Every other
//! value passes through untouched; kind checks happen in the object
//! primitives.

use bimstore_core::{Attribute, ChangeError, ChangeResult, ElementType, Schema, Value};

/// Normalize `value` for a write to `attribute`
///
/// Applies element-wise to sequences.
pub fn coerce_value(schema: &Schema, attribute: &Attribute, value: Value) -> ChangeResult<Value> {
    let ElementType::Enumeration(enumeration) = attribute.element() else {
        return Ok(value);
    };
    match value {
        Value::List(items) => items
            .into_iter()
            .map(|item| coerce_literal(schema, attribute, enumeration, item))
            .collect::<ChangeResult<Vec<_>>>()
            .map(Value::List),
        single => coerce_literal(schema, attribute, enumeration, single),
    }
}

fn coerce_literal(
    schema: &Schema,
    attribute: &Attribute,
    enumeration: &str,
    value: Value,
) -> ChangeResult<Value> {
    let Value::String(text) = value else {
        return Ok(value);
    };
    schema
        .enumeration(enumeration)
        .and_then(|e| e.literal(&text))
        .map(Value::Enum)
        .ok_or_else(|| ChangeError::InvalidEnumLiteral {
            attribute: attribute.name().to_string(),
            literal: text,
        })
}
