pub mod check;
pub mod schema;
pub mod watch;

use anyhow::{Context, Result};
use schema_sdk::config::loader;
use schema_sdk::{SchemaSdk, SdkOptions};
use url::Url;

use crate::cli::Cli;

/// Options from the config file and environment, overridden by flags.
pub fn resolve_options(cli: &Cli) -> Result<SdkOptions> {
    let mut options = loader::load_options(cli.config.as_deref())?;
    if let Some(base_url) = &cli.base_url {
        options.schema_base_url =
            Some(Url::parse(base_url).with_context(|| format!("invalid base URL `{base_url}`"))?);
    }
    if let Some(dir) = &cli.dir {
        options.schema_directory = Some(dir.into());
    }
    if let Some(version) = &cli.package_version {
        options.package_version = version.clone();
    }
    Ok(options)
}

/// Builds an SDK and waits for the first document.
pub async fn ready_sdk(cli: &Cli) -> Result<SchemaSdk> {
    let options = resolve_options(cli)?;
    tracing::debug!(
        base_url = ?options.schema_base_url,
        directory = ?options.schema_directory,
        "loading schema"
    );
    let sdk = SchemaSdk::new(options)?;
    sdk.ready().await.context("failed to load schema")?;
    Ok(sdk)
}
