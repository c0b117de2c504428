use std::path::Path;

use anyhow::{Context, Result};
use schema_sdk::{SchemaDocument, SchemaSdk, TypeOptions};

use crate::output::print_success;

/// Summary of a document that passed every check.
#[derive(Debug)]
pub struct CheckReport {
    pub version: String,
    pub types: usize,
    pub enums: usize,
    pub graphql_defs: usize,
}

/// Loads a schema document and runs every derivation over it.
pub fn check_document(path: &Path) -> Result<CheckReport> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let document = SchemaDocument::from_slice(&bytes)
        .with_context(|| format!("{} is not a schema document", path.display()))?;
    let version = document.effective_version()?;

    let sdk = SchemaSdk::builder().raw_data(document).build()?;
    let types = sdk.get_types(TypeOptions {
        group_properties: true,
        include_meta_fields: true,
        ..Default::default()
    })?;
    for name in sdk.raw_data().get_string_patterns()?.keys() {
        sdk.get_string_validator(name)?;
    }
    let enums = sdk.get_enums(Default::default())?;
    let defs = sdk.get_graphql_defs()?;

    Ok(CheckReport {
        version,
        types: types.len(),
        enums: enums.len(),
        graphql_defs: defs.len(),
    })
}

pub fn check(file: &str) -> Result<()> {
    let report = check_document(Path::new(file))?;
    print_success(&format!(
        "{file} is valid: version {}, {} types, {} enums, {} GraphQL definitions",
        report.version, report.types, report.enums, report.graphql_defs
    ));
    Ok(())
}
