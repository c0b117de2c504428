//! Local directory source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::SchemaSource;
use crate::document::SchemaDocument;
use crate::error::{FetchError, Result};

/// Fallback file read when the versioned file is absent.
const FALLBACK_FILE_NAME: &str = "schema.json";

/// Reads `{directory}/{file_name}`, falling back to `{directory}/schema.json`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    directory: PathBuf,
    file_name: String,
}

impl DirectorySource {
    pub fn new(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[async_trait]
impl SchemaSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    async fn fetch(&self) -> Result<SchemaDocument> {
        let primary = self.directory.join(&self.file_name);
        let bytes = match tokio::fs::read(&primary).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let fallback = self.directory.join(FALLBACK_FILE_NAME);
                tracing::debug!(
                    "{} not found, reading {}",
                    primary.display(),
                    fallback.display()
                );
                tokio::fs::read(&fallback)
                    .await
                    .map_err(|e| FetchError::Io(format!("{}: {e}", fallback.display())))?
            }
            Err(e) => return Err(FetchError::Io(format!("{}: {e}", primary.display())).into()),
        };

        SchemaDocument::from_slice(&bytes)
    }
}
