//! GraphQL SDL composition.
//!
//! Produces one SDL fragment per definition: custom scalars, enums, one
//! object type per record type and a `Query` root. The joined fragments
//! are parsed before being returned, so a schema that composes to invalid
//! SDL fails here rather than in the GraphQL server.

use std::fmt::Write as _;

use indexmap::IndexSet;

use super::enums::{EnumOptions, get_enums};
use super::primitive_types::{GRAPHQL_BUILTIN_SCALARS, PrimitiveOutput, resolve_primitives};
use super::types::{PropertyView, TypeOptions, TypeView, get_types};
use crate::document::SchemaDocument;
use crate::error::{Result, SchemaError};

const INDENT: &str = "  ";
const PAGINATION_ARGS: &str = "(first: Int, offset: Int)";

/// Composes and validates the GraphQL definitions of the schema.
///
/// # Errors
///
/// Returns `SchemaError::Parse` with the parser message when the composed
/// SDL is invalid, e.g. an enum option that is not a GraphQL name.
pub fn get_graphql_defs(document: &SchemaDocument) -> Result<Vec<String>> {
    let types = get_types(
        document,
        TypeOptions {
            primitive_types: Some(PrimitiveOutput::Graphql),
            include_meta_fields: true,
            ..Default::default()
        },
    )?;

    let mut defs = Vec::new();
    defs.extend(scalar_defs(document));
    for (name, view) in get_enums(document, EnumOptions { with_meta: true }) {
        let mut def = String::new();
        push_description(&mut def, "", view.description.as_deref());
        let _ = writeln!(def, "enum {name} {{");
        for option in &view.options {
            push_description(&mut def, INDENT, option.description.as_deref());
            let _ = writeln!(def, "{INDENT}{}", option.value);
        }
        def.push('}');
        defs.push(def);
    }
    defs.extend(types.iter().map(type_def));
    if !types.is_empty() {
        defs.push(query_def(&types));
    }

    if defs.is_empty() {
        return Ok(defs);
    }

    async_graphql_parser::parse_schema(defs.join("\n\n"))
        .map_err(|e| SchemaError::parse(format!("invalid GraphQL definitions: {e}")))?;
    Ok(defs)
}

/// `scalar` declarations for every non-built-in GraphQL target.
fn scalar_defs(document: &SchemaDocument) -> Vec<String> {
    resolve_primitives(&document.schema.primitive_types)
        .into_values()
        .map(|primitive| primitive.graphql)
        .filter(|scalar| !GRAPHQL_BUILTIN_SCALARS.contains(&scalar.as_str()))
        .collect::<IndexSet<_>>()
        .into_iter()
        .map(|scalar| format!("scalar {scalar}"))
        .collect()
}

fn type_def(view: &TypeView) -> String {
    let mut def = String::new();
    push_description(&mut def, "", view.description.as_deref());
    let _ = writeln!(def, "type {} {{", view.name);
    for (name, property) in view.all_properties() {
        push_description(&mut def, INDENT, property.description.as_deref());
        let _ = write!(def, "{INDENT}{name}");
        if property.is_relationship && property.has_many {
            def.push_str(PAGINATION_ARGS);
        }
        let _ = write!(def, ": {}", field_type(property));
        if let Some(reason) = &property.deprecation_reason {
            let _ = write!(def, " @deprecated(reason: {})", string_literal(reason));
        }
        def.push('\n');
    }
    def.push('}');
    def
}

fn field_type(property: &PropertyView) -> String {
    if property.has_many {
        format!("[{}]", property.property_type)
    } else {
        property.property_type.clone()
    }
}

/// One singular field (looked up by unique properties) and one plural
/// field per type.
fn query_def(types: &[TypeView]) -> String {
    let mut def = String::from("type Query {\n");
    for view in types {
        let args: Vec<String> = view
            .properties
            .iter()
            .filter(|(_, p)| p.unique && !p.is_relationship && !p.has_many)
            .map(|(name, p)| format!("{name}: {}", p.property_type))
            .collect();
        if args.is_empty() {
            let _ = writeln!(def, "{INDENT}{}: {}", view.name, view.name);
        } else {
            let _ = writeln!(
                def,
                "{INDENT}{}({}): {}",
                view.name,
                args.join(", "),
                view.name
            );
        }
        let _ = writeln!(
            def,
            "{INDENT}{}{PAGINATION_ARGS}: [{}]",
            view.plural_name, view.name
        );
    }
    def.push('}');
    def
}

fn push_description(def: &mut String, indent: &str, description: Option<&str>) {
    if let Some(text) = description.filter(|text| !text.trim().is_empty()) {
        let escaped = text.replace("\"\"\"", "\\\"\"\"");
        let _ = writeln!(def, "{indent}\"\"\"{escaped}\"\"\"");
    }
}

/// A GraphQL string literal. JSON string escaping is a subset of GraphQL's.
fn string_literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
