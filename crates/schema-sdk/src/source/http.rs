//! Remote schema store source.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::SchemaSource;
use crate::document::SchemaDocument;
use crate::error::{FetchError, Result, SchemaError};

/// Fetches `GET {base_url}/{file_name}` from the schema store.
pub struct HttpSource {
    http_client: reqwest::Client,
    url: Url,
    max_response_size: usize,
}

impl HttpSource {
    /// Creates a source for `file_name` under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidConfiguration` if the URL cannot be
    /// built or the HTTP client cannot be created.
    pub fn new(
        base_url: &Url,
        file_name: &str,
        request_timeout: Duration,
        max_response_size: usize,
    ) -> Result<Self> {
        let url = document_url(base_url, file_name)?;
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                SchemaError::invalid_configuration(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            http_client,
            url,
            max_response_size,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SchemaSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self) -> Result<SchemaDocument> {
        tracing::debug!("Fetching schema from {}", self.url);

        let response = self
            .http_client
            .get(self.url.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch schema from {}: {}", self.url, e);
                FetchError::Network(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Http {
                status: response.status().as_u16(),
                url: self.url.to_string(),
            }
            .into());
        }

        if let Some(len) = response.content_length()
            && usize::try_from(len).map_or(true, |len| len > self.max_response_size)
        {
            return Err(FetchError::ResponseTooLarge {
                max_size: self.max_response_size,
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        if body.len() > self.max_response_size {
            return Err(FetchError::ResponseTooLarge {
                max_size: self.max_response_size,
            }
            .into());
        }

        SchemaDocument::from_slice(&body).map_err(|e| {
            tracing::warn!("Failed to parse schema from {}: {}", self.url, e);
            e
        })
    }
}

impl std::fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSource")
            .field("url", &self.url.as_str())
            .finish()
    }
}

/// Joins the base URL and file name, tolerating a missing or extra trailing slash.
fn document_url(base_url: &Url, file_name: &str) -> Result<Url> {
    let joined = format!("{}/{}", base_url.as_str().trim_end_matches('/'), file_name);
    Url::parse(&joined)
        .map_err(|e| SchemaError::invalid_configuration(format!("invalid schema URL: {e}")))
}
