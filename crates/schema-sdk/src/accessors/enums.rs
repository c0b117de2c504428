use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::document::SchemaDocument;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnumOptions {
    /// Include enum and option descriptions.
    pub with_meta: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValue {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub options: Vec<EnumValue>,
}

impl EnumView {
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|option| option.value.as_str())
    }
}

/// Enum name to its options, in declaration order.
pub fn get_enums(document: &SchemaDocument, options: EnumOptions) -> IndexMap<String, EnumView> {
    document
        .schema
        .enums
        .iter()
        .map(|(name, def)| {
            let values = def
                .options
                .entries()
                .into_iter()
                .map(|(value, description)| EnumValue {
                    value: value.to_string(),
                    description: description
                        .filter(|_| options.with_meta)
                        .map(str::to_string),
                })
                .collect();
            let view = EnumView {
                description: def.description.clone().filter(|_| options.with_meta),
                options: values,
            };
            (name.clone(), view)
        })
        .collect()
}
