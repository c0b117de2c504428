//! Primitive type resolution.
//!
//! Every property type that is neither an enum nor a record type is a
//! primitive. Each primitive maps to a GraphQL scalar and to a form
//! component name. The built-in table can be overridden per field, or
//! extended, by the schema's `primitiveTypes` section.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::document::PrimitiveDef;

/// Built-in primitives: (name, GraphQL scalar, component).
const BUILTIN_PRIMITIVES: &[(&str, &str, &str)] = &[
    ("Code", "String", "Text"),
    ("Word", "String", "Text"),
    ("Paragraph", "String", "LargeText"),
    ("Document", "String", "LargeText"),
    ("Url", "String", "Url"),
    ("Email", "String", "Email"),
    ("Date", "Date", "Temporal"),
    ("Time", "Time", "Temporal"),
    ("DateTime", "DateTime", "Temporal"),
    ("Int", "Int", "Number"),
    ("Float", "Float", "Number"),
    ("Boolean", "Boolean", "Boolean"),
    ("String", "String", "Text"),
];

const FALLBACK_GRAPHQL: &str = "String";
const FALLBACK_COMPONENT: &str = "Text";

/// Scalars every GraphQL schema already has.
pub(crate) const GRAPHQL_BUILTIN_SCALARS: &[&str] = &["String", "Int", "Float", "Boolean", "ID"];

/// Which mapping of a primitive to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveOutput {
    #[default]
    Graphql,
    Component,
}

impl std::str::FromStr for PrimitiveOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "graphql" => Ok(Self::Graphql),
            "component" => Ok(Self::Component),
            other => Err(format!("output must be `graphql` or `component`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimitiveOptions {
    pub output: PrimitiveOutput,
}

/// A primitive with both mappings resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPrimitive {
    pub graphql: String,
    pub component: String,
}

impl ResolvedPrimitive {
    pub fn get(&self, output: PrimitiveOutput) -> &str {
        match output {
            PrimitiveOutput::Graphql => &self.graphql,
            PrimitiveOutput::Component => &self.component,
        }
    }
}

/// Merges the built-ins with `overrides`; an override wins per field.
pub fn resolve_primitives(
    overrides: &IndexMap<String, PrimitiveDef>,
) -> IndexMap<String, ResolvedPrimitive> {
    let mut resolved: IndexMap<String, ResolvedPrimitive> = BUILTIN_PRIMITIVES
        .iter()
        .map(|(name, graphql, component)| {
            (
                name.to_string(),
                ResolvedPrimitive {
                    graphql: graphql.to_string(),
                    component: component.to_string(),
                },
            )
        })
        .collect();

    for (name, def) in overrides {
        let entry = resolved
            .entry(name.clone())
            .or_insert_with(|| ResolvedPrimitive {
                graphql: FALLBACK_GRAPHQL.to_string(),
                component: FALLBACK_COMPONENT.to_string(),
            });
        if let Some(graphql) = &def.graphql {
            entry.graphql = graphql.clone();
        }
        if let Some(component) = &def.component {
            entry.component = component.clone();
        }
    }

    resolved
}

/// Primitive name to its GraphQL scalar or component name.
pub fn get_primitive_types(
    overrides: &IndexMap<String, PrimitiveDef>,
    options: PrimitiveOptions,
) -> IndexMap<String, String> {
    resolve_primitives(overrides)
        .into_iter()
        .map(|(name, primitive)| {
            let mapped = primitive.get(options.output).to_string();
            (name, mapped)
        })
        .collect()
}
