//! The SDK facade.
//!
//! A [`SchemaSdk`] owns one document holder, one cache, one updater and
//! one listener registry. Consumers receive the instance explicitly;
//! independent instances share nothing, which is how tests isolate.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::broadcast;
use url::Url;

use crate::accessors::{
    self, CategoryView, EnumOptions, EnumView, PrimitiveOptions, StringValidator, TypeOptions,
    TypeView, VALIDATION_TYPE_OPTIONS, ValidationLookup,
};
use crate::cache::{Cache, Memoized};
use crate::config::{SdkOptions, UpdateMode};
use crate::document::{RelationshipTypeDef, SchemaDocument};
use crate::error::Result;
use crate::events::{ChangeListeners, ListenerId, SchemaChange};
use crate::raw_data::RawDataWrapper;
use crate::source::{self, SchemaSource};
use crate::updater::{SchemaUpdater, UpdaterSettings, UpdaterState};

/// Memoized accessors, one cache slot family each.
struct Accessors {
    type_view: Memoized<(String, TypeOptions), TypeView>,
    types: Memoized<TypeOptions, Vec<TypeView>>,
    type_hierarchy: Memoized<TypeOptions, IndexMap<String, CategoryView>>,
    relationship_types: Memoized<(), Vec<RelationshipTypeDef>>,
    enums: Memoized<EnumOptions, IndexMap<String, EnumView>>,
    primitive_types: Memoized<PrimitiveOptions, IndexMap<String, String>>,
    string_validator: Memoized<String, StringValidator>,
    graphql_defs: Memoized<(), Vec<String>>,
}

impl Accessors {
    fn new(cache: &Arc<Cache>, raw: &Arc<RawDataWrapper>) -> Self {
        let r = Arc::clone(raw);
        let type_view = cache.add_cache_to_function(
            "get_type",
            move |(name, options): &(String, TypeOptions)| {
                accessors::get_type(&*r.snapshot()?, name, *options)
            },
        );

        let r = Arc::clone(raw);
        let types = cache.add_cache_to_function("get_types", move |options: &TypeOptions| {
            accessors::get_types(&*r.snapshot()?, *options)
        });

        let r = Arc::clone(raw);
        let type_hierarchy =
            cache.add_cache_to_function("get_type_hierarchy", move |options: &TypeOptions| {
                accessors::get_type_hierarchy(&*r.snapshot()?, *options)
            });

        let r = Arc::clone(raw);
        let relationship_types = cache.add_cache_to_function("get_relationship_types", move |_: &()| {
            Ok(accessors::get_relationship_types(&*r.snapshot()?))
        });

        let r = Arc::clone(raw);
        let enums = cache.add_cache_to_function("get_enums", move |options: &EnumOptions| {
            Ok(accessors::get_enums(&*r.snapshot()?, *options))
        });

        let r = Arc::clone(raw);
        let primitive_types =
            cache.add_cache_to_function("get_primitive_types", move |options: &PrimitiveOptions| {
                Ok(accessors::get_primitive_types(
                    &r.get_primitive_types(),
                    *options,
                ))
            });

        let r = Arc::clone(raw);
        let string_validator =
            cache.add_cache_to_function("get_string_validator", move |name: &String| {
                accessors::get_string_validator(&*r.snapshot()?, name)
            });

        let r = Arc::clone(raw);
        let graphql_defs = cache.add_cache_to_function("get_graphql_defs", move |_: &()| {
            accessors::get_graphql_defs(&*r.snapshot()?)
        });

        Self {
            type_view,
            types,
            type_hierarchy,
            relationship_types,
            enums,
            primitive_types,
            string_validator,
            graphql_defs,
        }
    }
}

struct SdkInner {
    options: SdkOptions,
    raw: Arc<RawDataWrapper>,
    cache: Arc<Cache>,
    listeners: Arc<ChangeListeners>,
    updater: SchemaUpdater,
    accessors: Accessors,
}

/// Schema client: fetches, caches and serves the schema.
///
/// Cheap to clone; clones share everything.
///
/// ```no_run
/// # async fn example() -> schema_sdk::Result<()> {
/// use schema_sdk::{SchemaSdk, TypeOptions};
///
/// let sdk = SchemaSdk::builder()
///     .schema_base_url("https://schema.example.com/schemas".parse().unwrap())
///     .build()?;
/// sdk.ready().await?;
/// let system = sdk.get_type("System", TypeOptions::default())?;
/// println!("{} has {} properties", system.name, system.properties.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SchemaSdk {
    inner: Arc<SdkInner>,
}

impl SchemaSdk {
    pub fn builder() -> SchemaSdkBuilder {
        SchemaSdkBuilder::default()
    }

    /// Creates an SDK from `options` alone.
    pub fn new(options: SdkOptions) -> Result<Self> {
        Self::builder().options(options).build()
    }

    /// Starts the configured update policy.
    ///
    /// Poll mode starts polling; stale mode waits for the first document.
    /// Either way it resolves once the schema is ready.
    pub async fn init(&self) -> Result<()> {
        match self.inner.options.update_mode {
            UpdateMode::Poll => self.start_polling().await,
            UpdateMode::Stale => self.ready().await,
        }
    }

    /// See [`SchemaUpdater::ready`].
    pub async fn ready(&self) -> Result<()> {
        self.inner.updater.ready().await
    }

    /// See [`SchemaUpdater::refresh`].
    pub async fn refresh(&self) -> Result<()> {
        self.inner.updater.refresh().await
    }

    /// See [`SchemaUpdater::start_polling`].
    pub async fn start_polling(&self) -> Result<()> {
        self.inner.updater.start_polling().await
    }

    pub fn stop_polling(&self) {
        self.inner.updater.stop_polling();
    }

    pub fn is_polling(&self) -> bool {
        self.inner.updater.is_polling()
    }

    /// Registers a change handler.
    ///
    /// With `replay`, a handler registered after hydration is called once
    /// right away with the current document (`old_version` is `None`).
    pub fn on_change<F>(&self, handler: F, replay: bool) -> ListenerId
    where
        F: Fn(&SchemaChange) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let registered = Arc::clone(&handler);
        let id = self.inner.listeners.add(move |change| registered(change));

        if replay
            && let (Some(new_version), Ok(schema_data)) =
                (self.version(), self.inner.raw.snapshot())
        {
            handler(&SchemaChange {
                old_version: None,
                new_version,
                schema_data,
            });
        }
        id
    }

    /// Unregisters a change handler. Returns `false` if it was unknown.
    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Receives changes from async code.
    pub fn subscribe(&self) -> broadcast::Receiver<SchemaChange> {
        self.inner.listeners.subscribe()
    }

    pub fn get_type(&self, name: &str, options: TypeOptions) -> Result<Arc<TypeView>> {
        self.inner
            .accessors
            .type_view
            .call(&(name.to_string(), options))
    }

    pub fn get_types(&self, options: TypeOptions) -> Result<Arc<Vec<TypeView>>> {
        self.inner.accessors.types.call(&options)
    }

    pub fn get_type_hierarchy(
        &self,
        options: TypeOptions,
    ) -> Result<Arc<IndexMap<String, CategoryView>>> {
        self.inner.accessors.type_hierarchy.call(&options)
    }

    pub fn get_relationship_types(&self) -> Result<Arc<Vec<RelationshipTypeDef>>> {
        self.inner.accessors.relationship_types.call(&())
    }

    pub fn get_enums(&self, options: EnumOptions) -> Result<Arc<IndexMap<String, EnumView>>> {
        self.inner.accessors.enums.call(&options)
    }

    /// Built-in primitives merged with the schema's overrides.
    ///
    /// Works before hydration, returning the built-ins.
    pub fn get_primitive_types(
        &self,
        options: PrimitiveOptions,
    ) -> Result<Arc<IndexMap<String, String>>> {
        self.inner.accessors.primitive_types.call(&options)
    }

    pub fn get_string_validator(&self, name: &str) -> Result<Arc<StringValidator>> {
        self.inner
            .accessors
            .string_validator
            .call(&name.to_string())
    }

    pub fn get_graphql_defs(&self) -> Result<Arc<Vec<String>>> {
        self.inner.accessors.graphql_defs.call(&())
    }

    pub fn validate_type_name(&self, type_name: &str) -> Result<()> {
        accessors::validate_type_name(&*self.inner.raw.snapshot()?, type_name)
    }

    pub fn validate_property_name(&self, type_name: &str, property: &str) -> Result<()> {
        accessors::validate_property_name(&*self.inner.raw.snapshot()?, type_name, property)
    }

    /// Validates a value for `type_name.property` against memoized type
    /// views, primitive scalars and pattern validators.
    pub fn validate_property(&self, type_name: &str, property: &str, value: &Value) -> Result<()> {
        let document = self.inner.raw.snapshot()?;
        accessors::validate_property(&document, self, type_name, property, value)
    }

    /// Version of the document being served.
    pub fn version(&self) -> Option<String> {
        self.inner.updater.current_version()
    }

    pub fn state(&self) -> UpdaterState {
        self.inner.updater.state()
    }

    pub fn options(&self) -> &SdkOptions {
        &self.inner.options
    }

    pub fn raw_data(&self) -> &Arc<RawDataWrapper> {
        &self.inner.raw
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.inner.cache
    }

    pub fn updater(&self) -> &SchemaUpdater {
        &self.inner.updater
    }
}

impl std::fmt::Debug for SchemaSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaSdk")
            .field("updater", &self.inner.updater)
            .field("cache", &self.inner.cache)
            .field("listeners", &self.inner.listeners)
            .finish()
    }
}

impl ValidationLookup for SchemaSdk {
    fn type_view(&self, type_name: &str) -> Result<Arc<TypeView>> {
        self.get_type(type_name, VALIDATION_TYPE_OPTIONS)
    }

    fn primitive_scalars(&self) -> Result<Arc<IndexMap<String, String>>> {
        self.get_primitive_types(PrimitiveOptions::default())
    }

    fn string_validator(&self, pattern: &str) -> Result<Arc<StringValidator>> {
        self.get_string_validator(pattern)
    }
}

/// Builder for [`SchemaSdk`].
#[derive(Default)]
pub struct SchemaSdkBuilder {
    options: SdkOptions,
    raw_data: Option<SchemaDocument>,
    source: Option<Arc<dyn SchemaSource>>,
}

impl SchemaSdkBuilder {
    /// Replaces every option set so far.
    pub fn options(mut self, options: SdkOptions) -> Self {
        self.options = options;
        self
    }

    pub fn schema_base_url(mut self, url: Url) -> Self {
        self.options.schema_base_url = Some(url);
        self
    }

    pub fn schema_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.options.schema_directory = Some(directory.into());
        self
    }

    pub fn update_mode(mut self, mode: UpdateMode) -> Self {
        self.options.update_mode = mode;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.options.set_ttl(ttl);
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.options.set_fetch_timeout(timeout);
        self
    }

    pub fn package_version(mut self, version: impl Into<String>) -> Self {
        self.options.package_version = version.into();
        self
    }

    /// Pre-seeds the document; the SDK is ready without fetching.
    pub fn raw_data(mut self, document: SchemaDocument) -> Self {
        self.raw_data = Some(document);
        self
    }

    /// Uses `source` instead of the one described by the options.
    pub fn source(mut self, source: Arc<dyn SchemaSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Validates the options and assembles the SDK.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidConfiguration` for inconsistent options.
    pub fn build(self) -> Result<SchemaSdk> {
        let Self {
            options,
            raw_data,
            source,
        } = self;
        options.validate(raw_data.is_some() || source.is_some())?;

        let source = match source {
            Some(source) => Some(source),
            None => source::from_options(&options)?,
        };
        let raw = Arc::new(match raw_data {
            Some(document) => RawDataWrapper::with_document(document),
            None => RawDataWrapper::new(),
        });
        let cache = Arc::new(Cache::new());
        let listeners = Arc::new(ChangeListeners::new());
        let updater = SchemaUpdater::new(
            UpdaterSettings::from(&options),
            source,
            Arc::clone(&raw),
            Arc::clone(&cache),
            Arc::clone(&listeners),
        )?;
        let accessors = Accessors::new(&cache, &raw);

        tracing::debug!(
            update_mode = %options.update_mode,
            ttl_ms = options.ttl_ms,
            "Created schema SDK"
        );

        Ok(SchemaSdk {
            inner: Arc::new(SdkInner {
                options,
                raw,
                cache,
                listeners,
                updater,
                accessors,
            }),
        })
    }
}
