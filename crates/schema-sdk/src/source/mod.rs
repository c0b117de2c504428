//! Schema sources.
//!
//! A source knows how to produce the current [`SchemaDocument`]. The
//! updater decides *when* to ask; sources only decide *how*.

mod directory;
mod http;

pub use directory::DirectorySource;
pub use http::HttpSource;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SdkOptions;
use crate::document::SchemaDocument;
use crate::error::Result;

/// Trait for schema document providers.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Get the source name, used in logs.
    fn name(&self) -> &str;

    /// Fetch the current document.
    async fn fetch(&self) -> Result<SchemaDocument>;
}

/// Builds the source described by `options`.
///
/// The remote store wins when both a base URL and a directory are set.
/// Returns `None` when neither is configured.
pub fn from_options(options: &SdkOptions) -> Result<Option<Arc<dyn SchemaSource>>> {
    let file_name = options.version_file_name()?;

    if let Some(base_url) = &options.schema_base_url {
        let source = HttpSource::new(
            base_url,
            &file_name,
            options.fetch_timeout(),
            options.max_response_bytes,
        )?;
        return Ok(Some(Arc::new(source)));
    }

    if let Some(directory) = &options.schema_directory {
        return Ok(Some(Arc::new(DirectorySource::new(directory, file_name))));
    }

    Ok(None)
}
