//! Services: named bundles of actions bound to a storage collection
//!
//! A [`ServiceDescriptor`] is the declarative input: settings, actions,
//! custom methods and optional overrides for the three extension points
//! (`serialize`, `get_by_id`, `resolve_model`). [`Service::new`] normalizes
//! it once at load time into a [`Service`].
//!
//! # Example
//!
//! ```rust,ignore
//! use svcrest::prelude::*;
//!
//! fn find(ctx: &mut Context) -> ActionFuture<'_> {
//!     Box::pin(async move {
//!         let service = ctx.service().clone();
//!         let options = ctx.apply_page_sort(FindOptions::default());
//!         let docs = service.require_collection()?.find(&json!({}), options).await?;
//!         Ok(service.serialize(Value::Array(docs), None))
//!     })
//! }
//!
//! let descriptor = ServiceDescriptor::new(ServiceSettings::new("widgets").rest("widgets"))
//!     .action("find", find);
//! ```

use crate::core::action::{Action, ActionFuture, ActionSource};
use crate::core::collection::Collection;
use crate::core::context::Context;
use crate::core::error::{ConfigError, ServiceError, ServiceResult};
use crate::core::lookup::ServiceLookup;
use crate::core::settings::{PropFilter, ServiceSettings};
use futures::future::{BoxFuture, try_join_all};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Replacement for [`Service::default_serialize`]
pub type SerializeHook =
    Arc<dyn Fn(&Service, Value, Option<&PropFilter>) -> Value + Send + Sync>;

/// Replacement for [`Service::default_get_by_id`]
pub type GetByIdHook =
    Arc<dyn for<'a> Fn(&'a Service, Value) -> BoxFuture<'a, ServiceResult<Value>> + Send + Sync>;

/// Replacement for [`Service::default_resolve_model`]
pub type ResolveModelHook =
    Arc<dyn for<'a> Fn(&'a Service, &'a mut Context, Value) -> ActionFuture<'a> + Send + Sync>;

/// Custom service method, invoked through [`Service::call_method`]
pub type MethodFn =
    Arc<dyn for<'a> Fn(&'a Service, &'a mut Context, Value) -> ActionFuture<'a> + Send + Sync>;

/// One-time startup hook, run after every service of the registry exists
pub type InitHook = Arc<
    dyn for<'a> Fn(&'a Service, &'a mut Context) -> BoxFuture<'a, ServiceResult<()>> + Send + Sync,
>;

/// Names a custom method may not take
const RESERVED_NAMES: &[&str] = &["name", "version", "namespace", "collection", "actions"];

/// Extension points that are overridden at the descriptor root, not as methods
const OVERRIDE_NAMES: &[&str] = &["serialize", "get_by_id", "resolve_model"];

/// Declarative description of a service
#[derive(Clone, Default)]
pub struct ServiceDescriptor {
    pub settings: Option<ServiceSettings>,
    pub actions: IndexMap<String, ActionSource>,
    pub methods: IndexMap<String, MethodFn>,
    pub serialize: Option<SerializeHook>,
    pub get_by_id: Option<GetByIdHook>,
    pub resolve_model: Option<ResolveModelHook>,
    pub init: Option<InitHook>,
}

impl ServiceDescriptor {
    pub fn new(settings: ServiceSettings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }

    /// Register a bare handler under `name`
    pub fn action<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> ActionFuture<'a> + Send + Sync + 'static,
    {
        self.actions
            .insert(name.into(), ActionSource::function(handler));
        self
    }

    /// Register an explicit action declaration under `name`
    pub fn action_with(mut self, name: impl Into<String>, source: impl Into<ActionSource>) -> Self {
        self.actions.insert(name.into(), source.into());
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: for<'a> Fn(&'a Service, &'a mut Context, Value) -> ActionFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    pub fn serialize_with<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Service, Value, Option<&PropFilter>) -> Value + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(hook));
        self
    }

    pub fn get_by_id_with<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a Service, Value) -> BoxFuture<'a, ServiceResult<Value>>
            + Send
            + Sync
            + 'static,
    {
        self.get_by_id = Some(Arc::new(hook));
        self
    }

    pub fn resolve_model_with<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a Service, &'a mut Context, Value) -> ActionFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.resolve_model = Some(Arc::new(hook));
        self
    }

    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a Service, &'a mut Context) -> BoxFuture<'a, ServiceResult<()>>
            + Send
            + Sync
            + 'static,
    {
        self.init = Some(Arc::new(hook));
        self
    }

    /// Service name, if settings are present
    pub fn name(&self) -> Option<&str> {
        self.settings.as_ref().map(|s| s.name.as_str())
    }
}

/// A loaded service
pub struct Service {
    settings: ServiceSettings,
    actions: IndexMap<String, Arc<Action>>,
    methods: IndexMap<String, MethodFn>,
    serialize_hook: Option<SerializeHook>,
    get_by_id_hook: Option<GetByIdHook>,
    resolve_model_hook: Option<ResolveModelHook>,
    init: Option<InitHook>,
    lookup: ServiceLookup,
}

impl Service {
    /// Normalize a descriptor
    ///
    /// Fails with a configuration error when settings are absent, the name is
    /// missing, or an exposed service has no usable namespace. Custom methods
    /// using a reserved name are skipped with a warning.
    pub fn new(descriptor: ServiceDescriptor, lookup: ServiceLookup) -> ServiceResult<Self> {
        let settings = descriptor
            .settings
            .ok_or_else(|| ConfigError::MissingSettings {
                service: "<unnamed>".to_string(),
            })?;
        settings.validate()?;

        let actions = descriptor
            .actions
            .into_iter()
            .map(|(key, source)| {
                let action = Action::normalize(&key, source);
                (key, Arc::new(action))
            })
            .collect();

        let mut methods = IndexMap::new();
        for (name, method) in descriptor.methods {
            if RESERVED_NAMES.contains(&name.as_str()) {
                tracing::warn!(
                    service = %settings.name,
                    "Invalid method name '{}', skipping",
                    name
                );
                continue;
            }
            if OVERRIDE_NAMES.contains(&name.as_str()) {
                tracing::warn!(
                    service = %settings.name,
                    "Method name '{}' is an override point; declare it on the descriptor root instead. Skipping",
                    name
                );
                continue;
            }
            methods.insert(name, method);
        }

        Ok(Self {
            settings,
            actions,
            methods,
            serialize_hook: descriptor.serialize,
            get_by_id_hook: descriptor.get_by_id,
            resolve_model_hook: descriptor.resolve_model,
            init: descriptor.init,
            lookup,
        })
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn version(&self) -> Option<u32> {
        self.settings.version
    }

    pub fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn id_param_name(&self) -> &str {
        &self.settings.id_param_name
    }

    /// Actions keyed by registration key, in declaration order
    pub fn actions(&self) -> &IndexMap<String, Arc<Action>> {
        &self.actions
    }

    pub fn action(&self, key: &str) -> Option<Arc<Action>> {
        self.actions.get(key).cloned()
    }

    pub fn collection(&self) -> Option<&Arc<dyn Collection>> {
        self.settings.collection.as_ref()
    }

    /// The bound collection, or an internal error when there is none
    pub fn require_collection(&self) -> ServiceResult<&Arc<dyn Collection>> {
        self.collection().ok_or_else(|| {
            ServiceError::internal(format!("Service '{}' has no collection", self.name()))
        })
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Invoke a custom method
    pub fn call_method<'a>(
        &'a self,
        name: &str,
        ctx: &'a mut Context,
        args: Value,
    ) -> ActionFuture<'a> {
        match self.methods.get(name) {
            Some(method) => method(self, ctx, args),
            None => {
                let err = ServiceError::internal(format!(
                    "Service '{}' has no method '{}'",
                    self.name(),
                    name
                ));
                Box::pin(async move { Err(err) })
            }
        }
    }

    /// Another service of the same registry
    pub fn lookup_service(&self, name: &str) -> Option<Arc<Service>> {
        self.lookup.get(name)
    }

    /// Run the init hook, if any
    pub async fn run_init(&self, ctx: &mut Context) -> ServiceResult<()> {
        match &self.init {
            Some(init) => init(self, ctx).await,
            None => Ok(()),
        }
    }

    // ---------------------------------------------------------------------
    // serialize
    // ---------------------------------------------------------------------

    /// Convert one entity or a list of entities into plain records
    pub fn serialize(&self, docs: Value, filter: Option<&PropFilter>) -> Value {
        match &self.serialize_hook {
            Some(hook) => hook(self, docs, filter),
            None => self.default_serialize(docs, filter),
        }
    }

    /// Keep only the filtered fields; the configured `model_prop_filter`
    /// applies when no filter is given
    pub fn default_serialize(&self, docs: Value, filter: Option<&PropFilter>) -> Value {
        let filter = filter.or(self.settings.model_prop_filter.as_ref());

        match docs {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(map) => Value::Object(pick(map, filter)),
                        other => other,
                    })
                    .collect(),
            ),
            Value::Object(map) => Value::Object(pick(map, filter)),
            _ => Value::Null,
        }
    }

    // ---------------------------------------------------------------------
    // populate
    // ---------------------------------------------------------------------

    /// Replace related-id fields with the related service's entities
    ///
    /// `spec` maps field names to service names and defaults to the
    /// configured `model_populates`. Every lookup runs concurrently; the
    /// entities are only modified once all of them have succeeded.
    pub fn populate_related<'a>(
        &'a self,
        mut docs: Value,
        spec: Option<&'a IndexMap<String, String>>,
    ) -> BoxFuture<'a, ServiceResult<Value>> {
        Box::pin(async move {
            let Some(spec) = spec.or(self.settings.model_populates.as_ref()) else {
                return Ok(docs);
            };
            if docs.is_null() {
                return Ok(docs);
            }

            let mut jobs = Vec::new();
            for (field, service_name) in spec {
                let Some(related) = self.lookup_service(service_name) else {
                    continue;
                };
                let items: Vec<&Value> = match &docs {
                    Value::Array(items) => items.iter().collect(),
                    single => vec![single],
                };
                for (index, item) in items.into_iter().enumerate() {
                    if let Some(id) = item.get(field) {
                        jobs.push((index, field.clone(), related.clone(), id.clone()));
                    }
                }
            }

            if jobs.is_empty() {
                return Ok(docs);
            }

            let resolved = try_join_all(
                jobs.iter()
                    .map(|(_, _, related, id)| related.get_by_id(id.clone())),
            )
            .await?;

            for ((index, field, _, _), value) in jobs.into_iter().zip(resolved) {
                let target = match &mut docs {
                    Value::Array(items) => items.get_mut(index),
                    single => Some(single),
                };
                if let Some(Value::Object(map)) = target {
                    map.insert(field, value);
                }
            }

            Ok(docs)
        })
    }

    // ---------------------------------------------------------------------
    // get_by_id
    // ---------------------------------------------------------------------

    /// Fetch one entity (scalar id) or several (list of ids), serialized and
    /// populated
    pub fn get_by_id(&self, id: Value) -> BoxFuture<'_, ServiceResult<Value>> {
        match &self.get_by_id_hook {
            Some(hook) => hook(self, id),
            None => self.default_get_by_id(id),
        }
    }

    pub fn default_get_by_id(&self, id: Value) -> BoxFuture<'_, ServiceResult<Value>> {
        Box::pin(async move {
            let Some(collection) = self.collection() else {
                return Ok(Value::Null);
            };

            let found = match id {
                Value::Null => return Ok(Value::Null),
                Value::Array(ids) if ids.is_empty() => return Ok(Value::Array(Vec::new())),
                Value::Array(ids) => Value::Array(collection.find_by_ids(&ids).await?),
                id => collection.find_by_id(&id).await?.unwrap_or(Value::Null),
            };

            let json = self.serialize(found, None);
            self.populate_related(json, None).await
        })
    }

    // ---------------------------------------------------------------------
    // resolve_model
    // ---------------------------------------------------------------------

    /// Resolve the target entity of a request from its id
    pub fn resolve_model<'a>(&'a self, ctx: &'a mut Context, id: Value) -> ActionFuture<'a> {
        match &self.resolve_model_hook {
            Some(hook) => hook(self, ctx, id),
            None => self.default_resolve_model(ctx, id),
        }
    }

    /// Records the id on `ctx.model_id`, rejects a blank id with `InvalidId`
    /// and delegates to [`get_by_id`](Self::get_by_id)
    pub fn default_resolve_model<'a>(
        &'a self,
        ctx: &'a mut Context,
        id: Value,
    ) -> ActionFuture<'a> {
        Box::pin(async move {
            if self.collection().is_none() {
                return Ok(Value::Null);
            }

            ctx.model_id = Some(id.clone());

            if is_blank(&id) {
                return Err(ServiceError::invalid_id("InvalidId"));
            }

            self.get_by_id(id).await
        })
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.settings.name)
            .field("version", &self.settings.version)
            .field("namespace", &self.settings.namespace)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn pick(map: Map<String, Value>, filter: Option<&PropFilter>) -> Map<String, Value> {
    let Some(filter) = filter else {
        return map;
    };
    let mut map = map;
    filter
        .fields()
        .iter()
        .filter_map(|field| map.remove(field).map(|value| (field.clone(), value)))
        .collect()
}

fn is_blank(id: &Value) -> bool {
    match id {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ErrorKind, StorageError, StorageResult};
    use crate::core::lookup::ServiceDirectory;
    use crate::core::query::FindOptions;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records keyed by `id`, counting every storage call
    #[derive(Default)]
    struct CountingCollection {
        records: Vec<Value>,
        calls: AtomicUsize,
    }

    impl CountingCollection {
        fn with(records: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                records,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Collection for CountingCollection {
        async fn find_by_id(&self, id: &Value) -> StorageResult<Option<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.iter().find(|r| r.get("id") == Some(id)).cloned())
        }

        async fn find_by_ids(&self, ids: &[Value]) -> StorageResult<Vec<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .records
                .iter()
                .filter(|r| r.get("id").is_some_and(|id| ids.contains(id)))
                .cloned()
                .collect())
        }

        async fn find(&self, _filter: &Value, options: FindOptions) -> StorageResult<Vec<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(options.apply(self.records.clone()))
        }

        async fn save(&self, entity: Value) -> StorageResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(entity)
        }

        async fn remove(&self, _filter: &Value) -> StorageResult<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    struct FailingCollection;

    #[async_trait]
    impl Collection for FailingCollection {
        async fn find_by_id(&self, _id: &Value) -> StorageResult<Option<Value>> {
            Err(StorageError::Unavailable {
                backend: "failing".to_string(),
            })
        }

        async fn find_by_ids(&self, _ids: &[Value]) -> StorageResult<Vec<Value>> {
            Err(StorageError::Unavailable {
                backend: "failing".to_string(),
            })
        }

        async fn find(&self, _filter: &Value, _options: FindOptions) -> StorageResult<Vec<Value>> {
            Ok(Vec::new())
        }

        async fn save(&self, entity: Value) -> StorageResult<Value> {
            Ok(entity)
        }

        async fn remove(&self, _filter: &Value) -> StorageResult<usize> {
            Ok(0)
        }
    }

    fn standalone(settings: ServiceSettings) -> Service {
        Service::new(ServiceDescriptor::new(settings), ServiceLookup::detached()).unwrap()
    }

    /// Load services into a shared directory, returning it with the services
    fn load(descriptors: Vec<ServiceDescriptor>) -> (Arc<ServiceDirectory>, Vec<Arc<Service>>) {
        let directory = Arc::new(ServiceDirectory::new());
        let lookup = ServiceLookup::new(&directory);
        let mut map = IndexMap::new();
        for descriptor in descriptors {
            let service = Arc::new(Service::new(descriptor, lookup.clone()).unwrap());
            map.insert(service.name().to_string(), service);
        }
        let services = map.values().cloned().collect();
        directory.publish(map).unwrap();
        (directory, services)
    }

    fn noop(_ctx: &mut Context) -> ActionFuture<'_> {
        Box::pin(async { Ok(Value::Null) })
    }

    fn echo<'a>(_service: &'a Service, _ctx: &'a mut Context, args: Value) -> ActionFuture<'a> {
        Box::pin(async move { Ok(args) })
    }

    #[test]
    fn test_missing_settings_fails() {
        let err = Service::new(ServiceDescriptor::default(), ServiceLookup::detached()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(
            err,
            ServiceError::Config(ConfigError::MissingSettings { .. })
        ));
    }

    #[test]
    fn test_missing_name_or_namespace_fails() {
        let err = Service::new(
            ServiceDescriptor::new(ServiceSettings::default()),
            ServiceLookup::detached(),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Config(ConfigError::MissingName)));

        let settings = ServiceSettings {
            rest: true,
            ..ServiceSettings::new("widgets")
        };
        let err = Service::new(ServiceDescriptor::new(settings), ServiceLookup::detached())
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Config(ConfigError::MissingNamespace { .. })
        ));
    }

    #[test]
    fn test_actions_keep_declaration_order() {
        let descriptor = ServiceDescriptor::new(ServiceSettings::new("widgets").rest("widgets"))
            .action("find", noop)
            .action("create", noop)
            .action("get", noop);
        let service = Service::new(descriptor, ServiceLookup::detached()).unwrap();

        let keys: Vec<_> = service.actions().keys().cloned().collect();
        assert_eq!(keys, vec!["find", "create", "get"]);
        assert_eq!(service.action("get").unwrap().name, "get");
    }

    #[tokio::test]
    async fn test_reserved_method_names_are_skipped() {
        let descriptor = ServiceDescriptor::new(ServiceSettings::new("widgets"))
            .method("name", echo)
            .method("get_by_id", echo)
            .method("greet", echo);
        let service = Arc::new(Service::new(descriptor, ServiceLookup::detached()).unwrap());

        assert!(!service.has_method("name"));
        assert!(!service.has_method("get_by_id"));
        assert!(service.has_method("greet"));

        let mut ctx = Context::for_init(service.clone());
        let out = service.call_method("greet", &mut ctx, json!("hi")).await.unwrap();
        assert_eq!(out, json!("hi"));

        let err = service.call_method("name", &mut ctx, Value::Null).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_serialize_applies_filter_in_order() {
        let service = standalone(ServiceSettings::new("users").with_prop_filter("id name"));
        let docs = json!([
            {"id": 1, "name": "a", "password": "x"},
            {"id": 2, "name": "b", "password": "y"}
        ]);

        assert_eq!(
            service.serialize(docs.clone(), None),
            json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}])
        );

        let only_id = PropFilter::parse("id");
        assert_eq!(
            service.serialize(docs, Some(&only_id)),
            json!([{"id": 1}, {"id": 2}])
        );
    }

    #[test]
    fn test_serialize_without_filter_keeps_everything() {
        let service = standalone(ServiceSettings::new("users"));
        let doc = json!({"id": 1, "name": "a"});
        assert_eq!(service.serialize(doc.clone(), None), doc);
        assert_eq!(service.serialize(json!(5), None), Value::Null);
    }

    #[test]
    fn test_serialize_override_keeps_default_reachable() {
        let descriptor = ServiceDescriptor::new(ServiceSettings::new("users"))
            .serialize_with(|service, docs, filter| {
                let mut json = service.default_serialize(docs, filter);
                if let Value::Object(map) = &mut json {
                    map.insert("kind".to_string(), json!("user"));
                }
                json
            });
        let service = Service::new(descriptor, ServiceLookup::detached()).unwrap();

        assert_eq!(
            service.serialize(json!({"id": 1}), None),
            json!({"id": 1, "kind": "user"})
        );
        assert_eq!(service.default_serialize(json!({"id": 1}), None), json!({"id": 1}));
    }

    #[tokio::test]
    async fn test_get_by_id_empty_list_skips_storage() {
        let collection = CountingCollection::with(vec![json!({"id": 1})]);
        let service = standalone(ServiceSettings::new("a").with_collection(collection.clone()));

        assert_eq!(service.get_by_id(json!([])).await.unwrap(), json!([]));
        assert_eq!(service.get_by_id(Value::Null).await.unwrap(), Value::Null);
        assert_eq!(collection.calls(), 0);
    }

    #[tokio::test]
    async fn test_get_by_id_single_and_many() {
        let collection = CountingCollection::with(vec![
            json!({"id": 1, "name": "a"}),
            json!({"id": 2, "name": "b"}),
        ]);
        let service = standalone(
            ServiceSettings::new("a")
                .with_collection(collection.clone())
                .with_prop_filter("name"),
        );

        assert_eq!(service.get_by_id(json!(2)).await.unwrap(), json!({"name": "b"}));
        assert_eq!(service.get_by_id(json!(9)).await.unwrap(), Value::Null);
        assert_eq!(
            service.get_by_id(json!([1, 2])).await.unwrap(),
            json!([{"name": "a"}, {"name": "b"}])
        );
        assert_eq!(collection.calls(), 3);
    }

    #[tokio::test]
    async fn test_get_by_id_without_collection_is_empty() {
        let service = standalone(ServiceSettings::new("a"));
        assert_eq!(service.get_by_id(json!(1)).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_get_by_id_override() {
        let descriptor = ServiceDescriptor::new(ServiceSettings::new("a"))
            .get_by_id_with(|_service, id| Box::pin(async move { Ok(json!({"id": id})) }));
        let service = Service::new(descriptor, ServiceLookup::detached()).unwrap();

        assert_eq!(service.get_by_id(json!(7)).await.unwrap(), json!({"id": 7}));
        assert_eq!(service.default_get_by_id(json!(7)).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_populate_related_replaces_ids() {
        let providers = CountingCollection::with(vec![
            json!({"id": 10, "name": "github", "secret": "s"}),
            json!({"id": 11, "name": "google", "secret": "s"}),
        ]);
        let (_directory, services) = load(vec![
            ServiceDescriptor::new(
                ServiceSettings::new("providers")
                    .with_collection(providers)
                    .with_prop_filter("id name"),
            ),
            ServiceDescriptor::new(ServiceSettings::new("users").with_populate("providers", "providers")),
        ]);
        let users = &services[1];

        let docs = json!([
            {"id": 1, "providers": [10, 11]},
            {"id": 2, "providers": [11]}
        ]);
        let populated = users.populate_related(docs, None).await.unwrap();

        assert_eq!(
            populated,
            json!([
                {"id": 1, "providers": [{"id": 10, "name": "github"}, {"id": 11, "name": "google"}]},
                {"id": 2, "providers": [{"id": 11, "name": "google"}]}
            ])
        );
    }

    #[tokio::test]
    async fn test_populate_related_unknown_service_is_noop() {
        let (_directory, services) = load(vec![ServiceDescriptor::new(
            ServiceSettings::new("users").with_populate("owner", "missing"),
        )]);
        let doc = json!({"id": 1, "owner": 3});
        assert_eq!(services[0].populate_related(doc.clone(), None).await.unwrap(), doc);
    }

    #[tokio::test]
    async fn test_populate_related_is_all_or_nothing() {
        let good = CountingCollection::with(vec![json!({"id": 10})]);
        let (_directory, services) = load(vec![
            ServiceDescriptor::new(ServiceSettings::new("good").with_collection(good)),
            ServiceDescriptor::new(
                ServiceSettings::new("bad").with_collection(Arc::new(FailingCollection)),
            ),
            ServiceDescriptor::new(
                ServiceSettings::new("users")
                    .with_populate("owner", "good")
                    .with_populate("team", "bad"),
            ),
        ]);

        let docs = json!([{"owner": 10, "team": 1}, {"owner": 10, "team": 2}]);
        let err = services[2].populate_related(docs, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[tokio::test]
    async fn test_resolve_model_blank_id_is_invalid() {
        let collection = CountingCollection::with(vec![]);
        let service = Arc::new(standalone(ServiceSettings::new("a").with_collection(collection.clone())));
        let mut ctx = Context::for_init(service.clone());

        let err = service.resolve_model(&mut ctx, json!("")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidId);
        assert_eq!(ctx.model_id, Some(json!("")));
        assert_eq!(collection.calls(), 0);
    }

    #[tokio::test]
    async fn test_resolve_model_without_collection_is_noop() {
        let service = Arc::new(standalone(ServiceSettings::new("a")));
        let mut ctx = Context::for_init(service.clone());

        assert_eq!(service.resolve_model(&mut ctx, json!(1)).await.unwrap(), Value::Null);
        assert!(ctx.model_id.is_none());
    }
}
