use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "schema-sdk")]
#[command(about = "Inspect, watch and check schemas served by a schema store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Schema store base URL (overrides config file)
    #[arg(short, long, global = true, env = "SCHEMA_SDK_BASE_URL")]
    pub base_url: Option<String>,

    /// Local schema directory, used instead of a store
    #[arg(short, long, global = true, env = "SCHEMA_SDK_DIR")]
    pub dir: Option<String>,

    /// Path to a TOML options file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Package version selecting the schema file (e.g. 2.0.0 fetches v2.json)
    #[arg(long, global = true)]
    pub package_version: Option<String>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum PrimitiveOutputArg {
    #[default]
    Graphql,
    Component,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the schema version being served
    Version,
    /// List every type
    Types,
    /// Show one type
    Type(TypeArgs),
    /// List enums and their options
    Enums(EnumsArgs),
    /// Print the composed GraphQL SDL
    Graphql,
    /// List primitive types and their mapping
    Primitives(PrimitivesArgs),
    /// Poll the store and print every schema change until Ctrl-C
    Watch(WatchArgs),
    /// Validate a local schema document
    Check(CheckArgs),
}

#[derive(clap::Args)]
pub struct TypeArgs {
    /// Type name (e.g. System)
    pub name: String,
    /// Group properties into fieldsets
    #[arg(long)]
    pub group: bool,
    /// Include meta fields
    #[arg(long)]
    pub meta: bool,
    /// Mark minimum viable record properties as required
    #[arg(long)]
    pub mvr: bool,
    /// Show GraphQL scalars instead of primitive names
    #[arg(long)]
    pub graphql_primitives: bool,
}

#[derive(clap::Args)]
pub struct EnumsArgs {
    /// Include descriptions
    #[arg(long)]
    pub meta: bool,
}

#[derive(clap::Args)]
pub struct PrimitivesArgs {
    /// Mapping to show
    #[arg(long, default_value = "graphql")]
    pub output: PrimitiveOutputArg,
}

#[derive(clap::Args)]
pub struct WatchArgs {
    /// Poll interval in milliseconds (overrides config)
    #[arg(long)]
    pub ttl_ms: Option<u64>,
}

#[derive(clap::Args)]
pub struct CheckArgs {
    /// Path to a schema document (JSON)
    pub file: String,
}
