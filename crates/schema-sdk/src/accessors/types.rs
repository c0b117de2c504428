//! Type views.
//!
//! A [`TypeView`] is a [`TypeDef`] as consumers want to see it: relationship
//! properties resolved through `relationshipTypes`, optional meta fields,
//! optional fieldset grouping and primitive mapping.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::primitive_types::{PrimitiveOutput, resolve_primitives};
use crate::document::{Direction, PropertyDef, RelationshipTypeDef, SchemaDocument, TypeDef};
use crate::error::{Result, SchemaError};

/// Fieldset receiving properties without a declared fieldset.
pub const MISC_FIELDSET: &str = "misc";
/// Fieldset receiving the meta fields.
pub const META_FIELDSET: &str = "meta";

/// A system-maintained property present on every record.
#[derive(Debug, Clone, Copy)]
pub struct MetaField {
    pub name: &'static str,
    pub property_type: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub const META_FIELDS: &[MetaField] = &[
    MetaField {
        name: "_createdByClient",
        property_type: "Word",
        label: "Created by client",
        description: "The client that created this record",
    },
    MetaField {
        name: "_createdByUser",
        property_type: "Word",
        label: "Created by user",
        description: "The user that created this record",
    },
    MetaField {
        name: "_createdTimestamp",
        property_type: "DateTime",
        label: "Created timestamp",
        description: "When this record was created",
    },
    MetaField {
        name: "_updatedByClient",
        property_type: "Word",
        label: "Last updated by client",
        description: "The client that last updated this record",
    },
    MetaField {
        name: "_updatedByUser",
        property_type: "Word",
        label: "Last updated by user",
        description: "The user that last updated this record",
    },
    MetaField {
        name: "_updatedTimestamp",
        property_type: "DateTime",
        label: "Last updated timestamp",
        description: "When this record was last updated",
    },
    MetaField {
        name: "_lockedFields",
        property_type: "Document",
        label: "Locked fields",
        description: "Properties only the locking client may change",
    },
];

pub fn is_meta_field(name: &str) -> bool {
    META_FIELDS.iter().any(|meta| meta.name == name)
}

/// Options for [`get_type`], [`get_types`] and [`get_type_hierarchy`].
///
/// Every field has a default, so omitted and explicitly defaulted options
/// produce the same memoization key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeOptions {
    /// Rewrites primitive property types to their GraphQL or component name.
    pub primitive_types: Option<PrimitiveOutput>,
    /// Moves properties into fieldsets; `properties` is left empty.
    pub group_properties: bool,
    pub include_meta_fields: bool,
    /// Marks the minimum viable record properties as required.
    pub use_minimum_viable_record: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyView {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub required: bool,
    pub unique: bool,
    pub has_many: bool,
    pub is_relationship: bool,
    /// Graph relationship label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Name of the relationship type the property was declared with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,
    pub is_recursive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fieldset: Option<String>,
    pub is_meta_field: bool,
}

impl PropertyView {
    fn from_def(def: &PropertyDef) -> Self {
        Self {
            property_type: def.property_type.clone(),
            description: def.description.clone(),
            label: def.label.clone(),
            required: def.required,
            unique: def.unique,
            has_many: def.has_many,
            is_relationship: def.is_relationship,
            relationship: def.relationship.clone(),
            direction: def.direction,
            relationship_type: None,
            is_recursive: def.is_recursive,
            validator: def.validator.clone(),
            deprecation_reason: def.deprecation_reason.clone(),
            fieldset: def.fieldset.clone(),
            is_meta_field: false,
        }
    }

    fn from_meta(meta: &MetaField) -> Self {
        Self {
            property_type: meta.property_type.to_string(),
            description: Some(meta.description.to_string()),
            label: Some(meta.label.to_string()),
            required: false,
            unique: false,
            has_many: false,
            is_relationship: false,
            relationship: None,
            direction: None,
            relationship_type: None,
            is_recursive: false,
            validator: None,
            deprecation_reason: None,
            fieldset: Some(META_FIELDSET.to_string()),
            is_meta_field: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsetView {
    pub name: String,
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub properties: IndexMap<String, PropertyView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub plural_name: String,
    /// Empty when grouped; see `fieldsets`.
    pub properties: IndexMap<String, PropertyView>,
    /// Non-empty fieldsets, declared ones first. Empty unless grouped.
    pub fieldsets: Vec<FieldsetView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive_rule: Option<serde_json::Value>,
    pub minimum_viable_record: Vec<String>,
}

impl TypeView {
    /// Iterates every property, whether grouped or not.
    pub fn all_properties(&self) -> impl Iterator<Item = (&String, &PropertyView)> {
        self.properties
            .iter()
            .chain(self.fieldsets.iter().flat_map(|fs| fs.properties.iter()))
    }
}

/// A type hierarchy category with its resolved types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryView {
    pub name: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub types: Vec<TypeView>,
}

/// Builds the view of type `name`.
///
/// # Errors
///
/// Returns `SchemaError::InvalidType` if the schema has no such type.
pub fn get_type(document: &SchemaDocument, name: &str, options: TypeOptions) -> Result<TypeView> {
    let def = document
        .find_type(name)
        .ok_or_else(|| SchemaError::InvalidType(name.to_string()))?;

    let mut properties: IndexMap<String, PropertyView> = def
        .properties
        .iter()
        .map(|(prop_name, prop)| {
            let mut view = property_view(document, def, prop);
            if options.use_minimum_viable_record
                && def.minimum_viable_record.iter().any(|p| p == prop_name)
            {
                view.required = true;
            }
            (prop_name.clone(), view)
        })
        .collect();

    if options.include_meta_fields {
        for meta in META_FIELDS {
            properties.insert(meta.name.to_string(), PropertyView::from_meta(meta));
        }
    }

    if let Some(output) = options.primitive_types {
        let primitives = resolve_primitives(&document.schema.primitive_types);
        for view in properties.values_mut() {
            if !view.is_relationship
                && let Some(primitive) = primitives.get(&view.property_type)
            {
                view.property_type = primitive.get(output).to_string();
            }
        }
    }

    let fieldsets = if options.group_properties {
        group_properties(def, std::mem::take(&mut properties))
    } else {
        Vec::new()
    };

    Ok(TypeView {
        name: def.name.clone(),
        description: def.description.clone(),
        plural_name: plural_name(def),
        properties,
        fieldsets,
        inactive_rule: def.inactive_rule.clone(),
        minimum_viable_record: def.minimum_viable_record.clone(),
    })
}

/// Every type, in type hierarchy order when one is declared.
///
/// Types absent from the hierarchy follow in document order.
pub fn get_types(document: &SchemaDocument, options: TypeOptions) -> Result<Vec<TypeView>> {
    ordered_type_names(document)
        .into_iter()
        .map(|name| get_type(document, name, options))
        .collect()
}

/// Hierarchy categories with their types resolved.
///
/// Names listed in a category without a matching type are skipped.
pub fn get_type_hierarchy(
    document: &SchemaDocument,
    options: TypeOptions,
) -> Result<IndexMap<String, CategoryView>> {
    let mut categories = IndexMap::with_capacity(document.schema.type_hierarchy.len());
    for (name, category) in &document.schema.type_hierarchy {
        let mut types = Vec::with_capacity(category.types.len());
        for type_name in &category.types {
            match get_type(document, type_name, options) {
                Ok(view) => types.push(view),
                Err(SchemaError::InvalidType(missing)) => {
                    debug!(category = %name, type_name = %missing, "Skipping unknown type in hierarchy");
                }
                Err(e) => return Err(e),
            }
        }
        categories.insert(
            name.clone(),
            CategoryView {
                name: name.clone(),
                label: category.label.clone().unwrap_or_else(|| name.clone()),
                description: category.description.clone(),
                types,
            },
        );
    }
    Ok(categories)
}

pub fn get_relationship_types(document: &SchemaDocument) -> Vec<RelationshipTypeDef> {
    document.schema.relationship_types.clone()
}

fn plural_name(def: &TypeDef) -> String {
    def.plural_name
        .clone()
        .unwrap_or_else(|| format!("{}s", def.name))
}

fn ordered_type_names(document: &SchemaDocument) -> Vec<&str> {
    let mut names: IndexSet<&str> = IndexSet::with_capacity(document.schema.types.len());
    for category in document.schema.type_hierarchy.values() {
        for name in &category.types {
            if document.find_type(name).is_some() {
                names.insert(name.as_str());
            }
        }
    }
    for def in &document.schema.types {
        names.insert(def.name.as_str());
    }
    names.into_iter().collect()
}

/// Resolves a property declared on `owner`.
///
/// A property typed with a relationship type name points at the other end
/// of that relationship; each end's `hasMany` describes the property on
/// that end's type. A property typed with a record type name is a direct
/// relationship.
fn property_view(document: &SchemaDocument, owner: &TypeDef, def: &PropertyDef) -> PropertyView {
    let mut view = PropertyView::from_def(def);

    if let Some(rel) = document.find_relationship_type(&def.property_type) {
        let from_owner = rel.from.type_name == owner.name;
        let to_owner = rel.to.type_name == owner.name;
        let outgoing = match (from_owner, to_owner) {
            (true, true) => def.direction != Some(Direction::Incoming),
            (false, true) => false,
            (true, false) => true,
            (false, false) => {
                debug!(
                    type_name = %owner.name,
                    relationship_type = %rel.name,
                    "Relationship type does not involve its declaring type"
                );
                true
            }
        };
        let (near, far) = if outgoing {
            (&rel.from, &rel.to)
        } else {
            (&rel.to, &rel.from)
        };

        view.property_type = far.type_name.clone();
        view.relationship = Some(rel.relationship.clone());
        view.direction = Some(if outgoing {
            Direction::Outgoing
        } else {
            Direction::Incoming
        });
        view.has_many = def.has_many || near.has_many;
        view.is_relationship = true;
        view.relationship_type = Some(rel.name.clone());
    } else if document.find_type(&def.property_type).is_some() {
        view.is_relationship = true;
        view.direction.get_or_insert(Direction::Outgoing);
    }

    view
}

fn group_properties(def: &TypeDef, properties: IndexMap<String, PropertyView>) -> Vec<FieldsetView> {
    let mut fieldsets: IndexMap<String, FieldsetView> = def
        .fieldsets
        .iter()
        .map(|(name, fieldset)| {
            (
                name.clone(),
                FieldsetView {
                    name: name.clone(),
                    heading: fieldset.heading.clone().unwrap_or_else(|| name.clone()),
                    description: fieldset.description.clone(),
                    properties: IndexMap::new(),
                },
            )
        })
        .collect();

    for (prop_name, view) in properties {
        let target = if view.is_meta_field {
            META_FIELDSET.to_string()
        } else {
            match view.fieldset.as_deref() {
                Some(name) if def.fieldsets.contains_key(name) => name.to_string(),
                _ => MISC_FIELDSET.to_string(),
            }
        };
        fieldsets
            .entry(target.clone())
            .or_insert_with(|| builtin_fieldset(&target))
            .properties
            .insert(prop_name, view);
    }

    fieldsets
        .into_values()
        .filter(|fieldset| !fieldset.properties.is_empty())
        .collect()
}

fn builtin_fieldset(name: &str) -> FieldsetView {
    let (heading, description) = if name == META_FIELDSET {
        ("Metadata", Some("Who changed this record and when"))
    } else {
        ("Miscellaneous", None)
    };
    FieldsetView {
        name: name.to_string(),
        heading: heading.to_string(),
        description: description.map(str::to_string),
        properties: IndexMap::new(),
    }
}
