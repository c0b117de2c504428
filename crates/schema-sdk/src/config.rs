//! SDK options.
//!
//! Options can be assembled in code through [`crate::SchemaSdkBuilder`] or
//! loaded with [`loader::load_options`] from an optional TOML file layered
//! under `SCHEMA_SDK__*` environment variables.
//!
//! # Example Configuration
//!
//! ```toml
//! schema_base_url = "https://schema.example.com/schemas"
//! update_mode = "poll"
//! ttl_ms = 60000
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SchemaError};

/// Refresh policy of the schema updater.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Fetch on demand, at most once per TTL; serve the current document otherwise.
    #[default]
    Stale,
    /// Fetch on a fixed timer regardless of callers.
    Poll,
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateMode::Stale => write!(f, "stale"),
            UpdateMode::Poll => write!(f, "poll"),
        }
    }
}

impl std::str::FromStr for UpdateMode {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stale" => Ok(UpdateMode::Stale),
            "poll" => Ok(UpdateMode::Poll),
            other => Err(SchemaError::invalid_configuration(format!(
                "update_mode must be `stale` or `poll`, got `{other}`"
            ))),
        }
    }
}

/// Options recognised by the SDK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkOptions {
    /// Base URL of the remote schema store.
    #[serde(default)]
    pub schema_base_url: Option<Url>,

    /// Local directory holding schema documents, used instead of the store.
    #[serde(default)]
    pub schema_directory: Option<PathBuf>,

    #[serde(default)]
    pub update_mode: UpdateMode,

    /// Minimum time between two fetches in stale mode; poll interval in poll mode.
    /// Default: 60000
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Upper bound on a single fetch.
    /// Default: 10000
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Largest document accepted from the store.
    /// Default: 10 MiB
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,

    /// Version of the consuming package; selects the schema file to fetch.
    #[serde(default = "default_package_version")]
    pub package_version: String,
}

fn default_ttl_ms() -> u64 {
    60_000
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_max_response_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_package_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for SdkOptions {
    fn default() -> Self {
        Self {
            schema_base_url: None,
            schema_directory: None,
            update_mode: UpdateMode::default(),
            ttl_ms: default_ttl_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            package_version: default_package_version(),
        }
    }
}

impl SdkOptions {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Sets `ttl_ms`, saturating at `u64::MAX` milliseconds.
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl_ms = millis(ttl);
    }

    /// Sets `fetch_timeout_ms`, saturating at `u64::MAX` milliseconds.
    pub fn set_fetch_timeout(&mut self, timeout: Duration) {
        self.fetch_timeout_ms = millis(timeout);
    }

    /// Name of the schema file for the configured package version.
    pub fn version_file_name(&self) -> Result<String> {
        version_file_name(&self.package_version)
    }

    /// Checks the options for consistency.
    ///
    /// `has_data` tells whether the caller can provide a schema another way
    /// (pre-seeded document or injected source), in which case neither a
    /// base URL nor a directory is required.
    pub fn validate(&self, has_data: bool) -> Result<()> {
        if self.schema_base_url.is_none() && self.schema_directory.is_none() && !has_data {
            return Err(SchemaError::invalid_configuration(
                "either schema_base_url or schema_directory must be set",
            ));
        }
        if let Some(url) = &self.schema_base_url
            && !matches!(url.scheme(), "http" | "https")
        {
            return Err(SchemaError::invalid_configuration(format!(
                "schema_base_url must use http or https, got `{}`",
                url.scheme()
            )));
        }
        if self.ttl_ms == 0 {
            return Err(SchemaError::invalid_configuration("ttl_ms must be > 0"));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(SchemaError::invalid_configuration(
                "fetch_timeout_ms must be > 0",
            ));
        }
        if self.max_response_bytes == 0 {
            return Err(SchemaError::invalid_configuration(
                "max_response_bytes must be > 0",
            ));
        }
        version_file_name(&self.package_version)?;
        Ok(())
    }
}

/// Computes the schema file name for a semantic version.
///
/// `1.4.2` → `v1.json`; `2.0.0-beta.3` → `v2-prerelease.json`. Build
/// metadata is ignored. One file per major version lets the store serve a
/// different snapshot to each API generation.
pub fn version_file_name(package_version: &str) -> Result<String> {
    let invalid = || {
        SchemaError::invalid_configuration(format!(
            "package_version `{package_version}` is not a semantic version"
        ))
    };

    let version = package_version.trim().trim_start_matches('v');
    let version = version.split('+').next().unwrap_or_default();
    let (core, prerelease) = match version.split_once('-') {
        Some((core, pre)) if !pre.is_empty() => (core, true),
        Some(_) => return Err(invalid()),
        None => (version, false),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.parse::<u64>().is_err()) {
        return Err(invalid());
    }
    let major = parts[0].parse::<u64>().map_err(|_| invalid())?;

    Ok(if prerelease {
        format!("v{major}-prerelease.json")
    } else {
        format!("v{major}.json")
    })
}

pub mod loader {
    use super::SdkOptions;
    use crate::error::{Result, SchemaError};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Loads options from an optional TOML file and the environment.
    ///
    /// Environment variables override the file, e.g.
    /// `SCHEMA_SDK__UPDATE_MODE=poll`. A missing file is not an error.
    /// The result is not validated; the SDK builder does that.
    pub fn load_options(path: Option<&str>) -> Result<SdkOptions> {
        let mut builder = Config::builder();
        if let Some(p) = path {
            let pathbuf = PathBuf::from(p);
            if pathbuf.exists() {
                builder = builder.add_source(File::from(pathbuf));
            }
        }
        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_SDK")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder.build().map_err(|e| {
            SchemaError::invalid_configuration(format!("config build error: {e}"))
        })?;
        cfg.try_deserialize().map_err(|e| {
            SchemaError::invalid_configuration(format!("config deserialize error: {e}"))
        })
    }
}

/// Whole milliseconds in `duration`, saturating instead of truncating.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
