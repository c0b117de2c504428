//! Record payload validators.
//!
//! These check shape only: names, value kinds, enum membership and string
//! patterns. Uniqueness and existence of related records need the graph
//! and are the write path's concern.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::primitive_types::{PrimitiveOptions, get_primitive_types};
use super::string_validator::{StringValidator, get_string_validator};
use super::types::{PropertyView, TypeOptions, TypeView, get_type, is_meta_field};
use crate::document::SchemaDocument;
use crate::error::{Result, SchemaError};

/// Type view options the validators read properties through.
pub const VALIDATION_TYPE_OPTIONS: TypeOptions = TypeOptions {
    primitive_types: None,
    group_properties: false,
    include_meta_fields: true,
    use_minimum_viable_record: false,
};

/// Derived views [`validate_property`] needs.
///
/// [`crate::SchemaSdk`] answers from its memoized accessors;
/// [`DocumentLookup`] computes them from a document on every call.
pub trait ValidationLookup {
    /// The type view for `type_name` under [`VALIDATION_TYPE_OPTIONS`].
    fn type_view(&self, type_name: &str) -> Result<Arc<TypeView>>;

    /// Primitive name to GraphQL scalar.
    fn primitive_scalars(&self) -> Result<Arc<IndexMap<String, String>>>;

    fn string_validator(&self, pattern: &str) -> Result<Arc<StringValidator>>;
}

/// Unmemoized lookups over one document.
#[derive(Debug, Clone, Copy)]
pub struct DocumentLookup<'a>(pub &'a SchemaDocument);

impl ValidationLookup for DocumentLookup<'_> {
    fn type_view(&self, type_name: &str) -> Result<Arc<TypeView>> {
        get_type(self.0, type_name, VALIDATION_TYPE_OPTIONS).map(Arc::new)
    }

    fn primitive_scalars(&self) -> Result<Arc<IndexMap<String, String>>> {
        Ok(Arc::new(get_primitive_types(
            &self.0.schema.primitive_types,
            PrimitiveOptions::default(),
        )))
    }

    fn string_validator(&self, pattern: &str) -> Result<Arc<StringValidator>> {
        get_string_validator(self.0, pattern).map(Arc::new)
    }
}

/// Checks that `type_name` names a record type.
pub fn validate_type_name(document: &SchemaDocument, type_name: &str) -> Result<()> {
    document
        .find_type(type_name)
        .map(|_| ())
        .ok_or_else(|| SchemaError::InvalidType(type_name.to_string()))
}

/// Checks that `property` exists on `type_name`. Meta fields always do.
pub fn validate_property_name(
    document: &SchemaDocument,
    type_name: &str,
    property: &str,
) -> Result<()> {
    let def = document
        .find_type(type_name)
        .ok_or_else(|| SchemaError::InvalidType(type_name.to_string()))?;
    if def.properties.contains_key(property) || is_meta_field(property) {
        Ok(())
    } else {
        Err(SchemaError::InvalidProperty {
            type_name: type_name.to_string(),
            property: property.to_string(),
        })
    }
}

/// Checks `value` against the definition of `type_name.property`.
///
/// `null` is always accepted; it deletes the property. Type views,
/// primitive scalars and pattern validators come from `lookup`.
///
/// # Errors
///
/// `InvalidType` and `InvalidProperty` for unknown names, `InvalidValue`
/// for a value of the wrong shape, and whatever `lookup` returns for a
/// view it cannot provide.
pub fn validate_property<L>(
    document: &SchemaDocument,
    lookup: &L,
    type_name: &str,
    property: &str,
    value: &Value,
) -> Result<()>
where
    L: ValidationLookup + ?Sized,
{
    validate_property_name(document, type_name, property)?;
    if value.is_null() {
        return Ok(());
    }

    let view = lookup.type_view(type_name)?;
    let Some(def) = view.properties.get(property) else {
        return Err(SchemaError::InvalidProperty {
            type_name: type_name.to_string(),
            property: property.to_string(),
        });
    };
    let invalid = |reason: String| SchemaError::invalid_value(type_name, property, reason);

    if def.is_relationship {
        return validate_relationship(def, value).map_err(invalid);
    }

    if let Some(enum_def) = document.schema.enums.get(&def.property_type) {
        let Some(option) = value.as_str() else {
            return Err(invalid(format!("expected one of the {} options", def.property_type)));
        };
        if !enum_def.options.contains(option) {
            return Err(invalid(format!(
                "`{option}` is not a valid {} option",
                def.property_type
            )));
        }
        return Ok(());
    }

    let primitives = lookup.primitive_scalars()?;
    let scalar = primitives
        .get(&def.property_type)
        .map(String::as_str)
        .unwrap_or("String");

    match scalar {
        "Int" => {
            if !(value.is_i64() || value.is_u64()) {
                return Err(invalid(format!("expected an integer, got {value}")));
            }
        }
        "Float" => {
            if !value.is_number() {
                return Err(invalid(format!("expected a number, got {value}")));
            }
        }
        "Boolean" => {
            if !value.is_boolean() {
                return Err(invalid(format!("expected a boolean, got {value}")));
            }
        }
        _ => {
            let Some(text) = value.as_str() else {
                return Err(invalid(format!("expected a string, got {value}")));
            };
            if let Some(pattern) = &def.validator {
                let validator = lookup.string_validator(pattern)?;
                if !validator.is_match(text) {
                    return Err(invalid(format!("`{text}` does not match pattern {pattern}")));
                }
            }
        }
    }

    Ok(())
}

/// Related records are referenced by code.
fn validate_relationship(def: &PropertyView, value: &Value) -> std::result::Result<(), String> {
    match value {
        Value::String(_) => Ok(()),
        Value::Array(items) if def.has_many => {
            if items.iter().all(Value::is_string) {
                Ok(())
            } else {
                Err(format!("expected {} codes", def.property_type))
            }
        }
        Value::Array(_) => Err(format!("expects a single {} code", def.property_type)),
        other => Err(format!("expected a {} code, got {other}", def.property_type)),
    }
}
