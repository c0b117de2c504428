//! Schema document model.
//!
//! A [`SchemaDocument`] is the unit the schema store serves. It is immutable
//! once received: a newer document replaces the previous one wholesale.
//! Maps use [`IndexMap`] so declaration order survives into generated
//! GraphQL SDL and form layouts.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{content_hash, value_hash};
use crate::error::Result;

/// A versioned schema document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// Version published by the store. When absent, a content hash is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub schema: SchemaData,

    /// Digest of the canonical form of the JSON this document was parsed
    /// from, including fields the model does not declare.
    #[serde(skip)]
    pub(crate) source_digest: Option<String>,
}

impl SchemaDocument {
    /// Parses a document from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    /// Parses a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Builds a document from parsed JSON, remembering the digest of the
    /// full input for [`Self::effective_version`].
    pub fn from_value(value: Value) -> Result<Self> {
        let digest = value_hash(&value);
        let mut document: Self = serde_json::from_value(value)?;
        document.source_digest = Some(digest);
        Ok(document)
    }

    /// Returns the authoritative version of this document.
    ///
    /// The explicit `version` field wins. Without one, the version is the
    /// digest of the canonical serialization of the whole document as
    /// received, so content-identical documents always share a version and
    /// a change to any field, modelled or not, yields a new one. Documents
    /// built in code hash their serialized model.
    pub fn effective_version(&self) -> Result<String> {
        match (self.version.as_deref(), &self.source_digest) {
            (Some(version), _) if !version.is_empty() => Ok(version.to_string()),
            (_, Some(digest)) => Ok(digest.clone()),
            _ => content_hash(self),
        }
    }

    /// Looks up a type definition by name.
    pub fn find_type(&self, name: &str) -> Option<&TypeDef> {
        self.schema.types.iter().find(|t| t.name == name)
    }

    /// Looks up a relationship type by name.
    pub fn find_relationship_type(&self, name: &str) -> Option<&RelationshipTypeDef> {
        self.schema.relationship_types.iter().find(|r| r.name == name)
    }
}

/// The schema body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaData {
    #[serde(default)]
    pub types: Vec<TypeDef>,

    #[serde(default)]
    pub relationship_types: Vec<RelationshipTypeDef>,

    #[serde(default)]
    pub enums: IndexMap<String, EnumDef>,

    #[serde(default)]
    pub string_patterns: IndexMap<String, StringPattern>,

    /// Overrides and additions to the built-in primitive types.
    #[serde(default)]
    pub primitive_types: IndexMap<String, PrimitiveDef>,

    /// Category name to the types it contains.
    #[serde(default)]
    pub type_hierarchy: IndexMap<String, TypeCategory>,
}

/// A record type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural_name: Option<String>,

    #[serde(default)]
    pub properties: IndexMap<String, PropertyDef>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fieldsets: IndexMap<String, FieldsetDef>,

    /// Rule deciding when a record is inactive; opaque to the SDK.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive_rule: Option<serde_json::Value>,

    /// Properties a record must carry to be considered complete.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub minimum_viable_record: Vec<String>,
}

/// A property of a [`TypeDef`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDef {
    /// Primitive type, enum name, type name or relationship type name.
    #[serde(rename = "type")]
    pub property_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub has_many: bool,

    #[serde(default)]
    pub is_relationship: bool,

    /// Graph relationship label for direct type references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,

    #[serde(default)]
    pub is_recursive: bool,

    /// Name of the string pattern values must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fieldset: Option<String>,
}

/// Direction of a relationship, seen from the owning type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldsetDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named relationship between two types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipTypeDef {
    pub name: String,

    /// Graph relationship label.
    pub relationship: String,

    pub from: RelationshipEnd,

    pub to: RelationshipEnd,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, PropertyDef>,
}

/// One end of a [`RelationshipTypeDef`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEnd {
    #[serde(rename = "type")]
    pub type_name: String,

    /// Whether the property on this end's type holds many related records.
    #[serde(default)]
    pub has_many: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub options: EnumOptionsDef,
}

/// Enum options, either a plain list or value to description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumOptionsDef {
    Values(Vec<String>),
    Described(IndexMap<String, String>),
}

impl Default for EnumOptionsDef {
    fn default() -> Self {
        Self::Values(Vec::new())
    }
}

impl EnumOptionsDef {
    /// Iterates `(value, description)` pairs in declaration order.
    pub fn entries(&self) -> Vec<(&str, Option<&str>)> {
        match self {
            Self::Values(values) => values.iter().map(|v| (v.as_str(), None)).collect(),
            Self::Described(map) => map
                .iter()
                .map(|(v, d)| (v.as_str(), Some(d.as_str())))
                .collect(),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::Values(values) => values.iter().any(|v| v == value),
            Self::Described(map) => map.contains_key(value),
        }
    }
}

/// A named string pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringPattern {
    Simple(String),
    WithFlags {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flags: Option<String>,
    },
}

impl StringPattern {
    pub fn pattern(&self) -> &str {
        match self {
            Self::Simple(pattern) | Self::WithFlags { pattern, .. } => pattern,
        }
    }

    pub fn flags(&self) -> Option<&str> {
        match self {
            Self::Simple(_) => None,
            Self::WithFlags { flags, .. } => flags.as_deref(),
        }
    }
}

/// Schema-declared primitive type; unset fields fall back to the built-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphql: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeCategory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub types: Vec<String>,
}
