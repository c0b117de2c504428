//! # schema-sdk
//!
//! Client for a versioned schema document served by a remote schema store.
//!
//! This crate provides:
//! - Fetching from an HTTP store or a local directory
//! - Two refresh policies: on-demand with a TTL (`stale`) or timer-driven (`poll`)
//! - Single-flight fetching: concurrent refreshes share one request
//! - Version-change detection with explicit or content-derived versions
//! - Memoized data accessors, invalidated exactly when the version changes
//! - Change notifications delivered after the new schema is in place
//!
//! ## Architecture
//!
//! ```text
//!   consumer ──get_type()──▶ Cache ──miss──▶ accessor ──▶ RawDataWrapper
//!      │                        ▲                              ▲
//!      └──refresh()/timer──▶ SchemaUpdater ──fetch──▶ SchemaSource
//!                               │  on new version: swap ───────┘
//!                               │                  clear cache
//!                               └──────────────▶ ChangeListeners
//! ```
//!
//! ## Modules
//!
//! - [`raw_data`] - Holder of the current document
//! - [`cache`] - Memoization with bulk invalidation
//! - [`updater`] - Fetch scheduling and version-change detection
//! - [`accessors`] - Views derived from the document
//! - [`source`] - HTTP and directory sources
//! - [`events`] - Change listeners
//! - [`config`] - Options and their loader

pub mod accessors;
pub mod cache;
pub mod canonical;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod raw_data;
pub mod sdk;
pub mod source;
pub mod updater;

pub use accessors::{
    CategoryView, EnumOptions, EnumValue, EnumView, FieldsetView, PrimitiveOptions,
    PrimitiveOutput, PropertyView, StringValidator, TypeOptions, TypeView, ValidationLookup,
};
pub use cache::{Cache, CacheKey, CacheStatsSnapshot, Memoized};
pub use config::{SdkOptions, UpdateMode};
pub use document::{
    Direction, EnumDef, PropertyDef, RelationshipTypeDef, SchemaData, SchemaDocument,
    StringPattern, TypeDef,
};
pub use error::{FetchError, Result, SchemaError};
pub use events::{ChangeListeners, ListenerId, SchemaChange};
pub use raw_data::RawDataWrapper;
pub use sdk::{SchemaSdk, SchemaSdkBuilder};
pub use source::{DirectorySource, HttpSource, SchemaSource};
pub use updater::{SchemaUpdater, UpdaterSettings, UpdaterState};
