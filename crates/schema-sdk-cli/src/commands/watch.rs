use anyhow::Result;
use colored::Colorize;
use schema_sdk::{SchemaSdk, SdkOptions, UpdateMode};
use tokio::sync::broadcast::error::RecvError;

use crate::output::print_warning;

/// Polls the store and prints every change until interrupted.
pub async fn watch(mut options: SdkOptions, ttl_ms: Option<u64>) -> Result<()> {
    options.update_mode = UpdateMode::Poll;
    if let Some(ttl_ms) = ttl_ms {
        options.ttl_ms = ttl_ms;
    }
    let sdk = SchemaSdk::new(options)?;
    let mut changes = sdk.subscribe();

    println!(
        "{} every {} ms (Ctrl-C to stop)",
        "Watching schema".cyan(),
        sdk.options().ttl_ms
    );
    if let Err(e) = sdk.start_polling().await {
        print_warning(&format!("first fetch failed, still polling: {e}"));
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = changes.recv() => match received {
                Ok(change) => println!(
                    "{} {} -> {} ({} types)",
                    "changed".green(),
                    change.old_version.as_deref().unwrap_or("(none)"),
                    change.new_version.bold(),
                    change.schema_data.schema.types.len()
                ),
                Err(RecvError::Lagged(skipped)) => {
                    print_warning(&format!("missed {skipped} changes"));
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    sdk.stop_polling();
    tracing::debug!(fetches = sdk.updater().fetch_count(), "watch stopped");
    Ok(())
}
