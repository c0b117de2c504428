//! Data accessors.
//!
//! Pure functions deriving consumer-facing views from a [`SchemaDocument`]
//! snapshot. None of them caches; [`crate::SchemaSdk`] memoizes each one
//! through [`crate::Cache`].
//!
//! [`SchemaDocument`]: crate::SchemaDocument

mod enums;
mod graphql_defs;
mod primitive_types;
mod string_validator;
mod types;
mod validation;

pub use enums::{EnumOptions, EnumValue, EnumView, get_enums};
pub use graphql_defs::get_graphql_defs;
pub use primitive_types::{
    PrimitiveOptions, PrimitiveOutput, ResolvedPrimitive, get_primitive_types, resolve_primitives,
};
pub use string_validator::{StringValidator, get_string_validator};
pub use types::{
    CategoryView, FieldsetView, META_FIELDS, META_FIELDSET, MISC_FIELDSET, MetaField, PropertyView,
    TypeOptions, TypeView, get_relationship_types, get_type, get_type_hierarchy, get_types,
    is_meta_field,
};
pub use validation::{
    DocumentLookup, VALIDATION_TYPE_OPTIONS, ValidationLookup, validate_property,
    validate_property_name, validate_type_name,
};
