//! Holder for the current schema document.
//!
//! The document sits behind an `ArcSwapOption`: replacing it is a single
//! atomic pointer store, so readers see either the old document or the new
//! one, never a mix. Readers take a snapshot once and work from it.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use indexmap::IndexMap;

use crate::document::{
    EnumDef, PrimitiveDef, RelationshipTypeDef, SchemaDocument, StringPattern, TypeCategory,
    TypeDef,
};
use crate::error::{Result, SchemaError};

/// Owns the current [`SchemaDocument`] and exposes typed getters over it.
///
/// No memoization happens here; that is the job of [`crate::Cache`].
#[derive(Default)]
pub struct RawDataWrapper {
    document: ArcSwapOption<SchemaDocument>,
}

impl RawDataWrapper {
    /// Creates an empty, unhydrated wrapper.
    pub fn new() -> Self {
        Self {
            document: ArcSwapOption::empty(),
        }
    }

    /// Creates a wrapper hydrated with `document`.
    pub fn with_document(document: SchemaDocument) -> Self {
        Self {
            document: ArcSwapOption::from_pointee(document),
        }
    }

    /// Returns `true` once a document has been set.
    pub fn is_hydrated(&self) -> bool {
        self.document.load().is_some()
    }

    /// Atomically replaces the document, returning the previous one.
    pub fn hydrate(&self, document: Arc<SchemaDocument>) -> Option<Arc<SchemaDocument>> {
        self.document.swap(Some(document))
    }

    /// Returns the current document.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotHydrated` before the first document is set.
    pub fn snapshot(&self) -> Result<Arc<SchemaDocument>> {
        self.document.load_full().ok_or(SchemaError::NotHydrated)
    }

    /// Returns the version field of the current document, if any.
    pub fn get_version(&self) -> Option<String> {
        self.document
            .load()
            .as_ref()
            .and_then(|doc| doc.version.clone())
    }

    pub fn get_types(&self) -> Result<Vec<TypeDef>> {
        Ok(self.snapshot()?.schema.types.clone())
    }

    pub fn get_relationship_types(&self) -> Result<Vec<RelationshipTypeDef>> {
        Ok(self.snapshot()?.schema.relationship_types.clone())
    }

    pub fn get_enums(&self) -> Result<IndexMap<String, EnumDef>> {
        Ok(self.snapshot()?.schema.enums.clone())
    }

    pub fn get_string_patterns(&self) -> Result<IndexMap<String, StringPattern>> {
        Ok(self.snapshot()?.schema.string_patterns.clone())
    }

    /// Returns the schema-declared primitive types.
    ///
    /// An empty map is a valid answer, so this never fails: before
    /// hydration there are simply no overrides.
    pub fn get_primitive_types(&self) -> IndexMap<String, PrimitiveDef> {
        self.document
            .load()
            .as_ref()
            .map(|doc| doc.schema.primitive_types.clone())
            .unwrap_or_default()
    }

    pub fn get_type_hierarchy(&self) -> Result<IndexMap<String, TypeCategory>> {
        Ok(self.snapshot()?.schema.type_hierarchy.clone())
    }
}

impl std::fmt::Debug for RawDataWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawDataWrapper")
            .field("is_hydrated", &self.is_hydrated())
            .field("version", &self.get_version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(version: &str) -> SchemaDocument {
        SchemaDocument::from_json(&format!(
            r#"{{"version":"{version}","schema":{{"types":[{{"name":"It"}}],
                "primitiveTypes":{{"Word":{{"component":"Short"}}}}}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_not_hydrated() {
        let raw = RawDataWrapper::new();
        assert!(!raw.is_hydrated());
        assert_eq!(raw.get_types().unwrap_err(), SchemaError::NotHydrated);
        assert_eq!(raw.get_enums().unwrap_err(), SchemaError::NotHydrated);
        assert!(raw.get_primitive_types().is_empty());
        assert!(raw.get_version().is_none());
    }

    #[test]
    fn test_hydrate_replaces_wholesale() {
        let raw = RawDataWrapper::new();
        assert!(raw.hydrate(Arc::new(doc("v1"))).is_none());
        assert!(raw.is_hydrated());
        assert_eq!(raw.get_version().as_deref(), Some("v1"));
        assert_eq!(raw.get_types().unwrap()[0].name, "It");
        assert_eq!(
            raw.get_primitive_types()["Word"].component.as_deref(),
            Some("Short")
        );

        let previous = raw.hydrate(Arc::new(SchemaDocument::default())).unwrap();
        assert_eq!(previous.version.as_deref(), Some("v1"));
        assert!(raw.get_types().unwrap().is_empty());
        assert!(raw.get_primitive_types().is_empty());
    }

    #[test]
    fn test_snapshot_survives_swap() {
        let raw = RawDataWrapper::with_document(doc("v1"));
        let snapshot = raw.snapshot().unwrap();
        raw.hydrate(Arc::new(doc("v2")));
        assert_eq!(snapshot.version.as_deref(), Some("v1"));
        assert_eq!(raw.get_version().as_deref(), Some("v2"));
    }
}
