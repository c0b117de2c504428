mod cli;
mod commands;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    observability::init_tracing_with_level(&cli.log_level);

    if let Err(e) = run(&cli).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let format = cli.format.unwrap_or_default();

    match &cli.command {
        Commands::Version => {
            let sdk = commands::ready_sdk(cli).await?;
            commands::schema::version(&sdk, format)?;
        }
        Commands::Types => {
            let sdk = commands::ready_sdk(cli).await?;
            commands::schema::types(&sdk, format)?;
        }
        Commands::Type(args) => {
            let sdk = commands::ready_sdk(cli).await?;
            commands::schema::type_view(&sdk, args, format)?;
        }
        Commands::Enums(args) => {
            let sdk = commands::ready_sdk(cli).await?;
            commands::schema::enums(&sdk, args, format)?;
        }
        Commands::Graphql => {
            let sdk = commands::ready_sdk(cli).await?;
            commands::schema::graphql(&sdk)?;
        }
        Commands::Primitives(args) => {
            let sdk = commands::ready_sdk(cli).await?;
            commands::schema::primitives(&sdk, args, format)?;
        }
        Commands::Watch(args) => {
            let options = commands::resolve_options(cli)?;
            commands::watch::watch(options, args.ttl_ms).await?;
        }
        Commands::Check(args) => {
            commands::check::check(&args.file)?;
        }
    }

    Ok(())
}
