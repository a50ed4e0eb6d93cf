//! Service settings
//!
//! Settings can be built in code or loaded from YAML:
//!
//! ```yaml
//! name: users
//! version: 1
//! namespace: users
//! rest: true
//! model_prop_filter: "id username email phone providers"
//! model_populates:
//!   providers: providers
//! ```
//!
//! Missing keys take the documented defaults (`version: 1`,
//! `id_param_name: id`). The storage collection is attached in code with
//! [`ServiceSettings::with_collection`].

use crate::core::collection::Collection;
use crate::core::error::ConfigError;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::{Arc, LazyLock};

static NAMESPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.~-]+(/[A-Za-z0-9_.~-]+)*$").expect("namespace regex is valid")
});

/// Allow-list of entity fields kept by `Service::serialize`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropFilter(Vec<String>);

impl PropFilter {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// Split a whitespace-separated field list
    pub fn parse(fields: &str) -> Self {
        Self::new(fields.split_whitespace())
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|f| f == field)
    }
}

impl From<&str> for PropFilter {
    fn from(fields: &str) -> Self {
        Self::parse(fields)
    }
}

impl From<Vec<String>> for PropFilter {
    fn from(fields: Vec<String>) -> Self {
        Self(fields)
    }
}

impl<'de> Deserialize<'de> for PropFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Spaced(String),
            List(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Spaced(s) => Self::parse(&s),
            Raw::List(list) => Self(list),
        })
    }
}

impl Serialize for PropFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Settings of one service
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Registry key of the service (required)
    pub name: String,

    /// Adds an `/api/v<version>/<namespace>` route alias when set
    pub version: Option<u32>,

    /// URL namespace; required when any exposure flag is set
    pub namespace: String,

    /// Parameter carrying the id used to resolve the target entity
    pub id_param_name: String,

    /// Exposed over REST
    pub rest: bool,

    /// Exposed over websocket transports
    pub websocket: bool,

    /// Exposed over GraphQL transports
    pub graphql: bool,

    /// Storage collection backing the service
    #[serde(skip)]
    pub collection: Option<Arc<dyn Collection>>,

    /// Default field allow-list for serialization
    pub model_prop_filter: Option<PropFilter>,

    /// Field name to related service name
    pub model_populates: Option<IndexMap<String, String>>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: Some(1),
            namespace: String::new(),
            id_param_name: "id".to_string(),
            rest: false,
            websocket: false,
            graphql: false,
            collection: None,
            model_prop_filter: None,
            model_populates: None,
        }
    }
}

impl ServiceSettings {
    /// Settings for a service with the given name, everything else defaulted
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load settings from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Set the namespace and mark the service as exposed over REST
    pub fn rest(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self.rest = true;
        self
    }

    pub fn with_version(mut self, version: Option<u32>) -> Self {
        self.version = version;
        self
    }

    pub fn with_id_param_name(mut self, name: impl Into<String>) -> Self {
        self.id_param_name = name.into();
        self
    }

    pub fn with_collection(mut self, collection: Arc<dyn Collection>) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn with_prop_filter(mut self, filter: impl Into<PropFilter>) -> Self {
        self.model_prop_filter = Some(filter.into());
        self
    }

    pub fn with_populate(mut self, field: impl Into<String>, service: impl Into<String>) -> Self {
        self.model_populates
            .get_or_insert_with(IndexMap::new)
            .insert(field.into(), service.into());
        self
    }

    /// Whether any transport exposure flag is set
    pub fn is_exposed(&self) -> bool {
        self.rest || self.websocket || self.graphql
    }

    /// Check the invariants a service is constructed under
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingName);
        }

        if self.namespace.is_empty() {
            if self.is_exposed() {
                return Err(ConfigError::MissingNamespace {
                    service: self.name.clone(),
                });
            }
        } else if !NAMESPACE_RE.is_match(&self.namespace) {
            return Err(ConfigError::InvalidNamespace {
                service: self.name.clone(),
                namespace: self.namespace.clone(),
            });
        }

        if self.id_param_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "id_param_name".to_string(),
                message: format!("service '{}' needs a non-empty id parameter name", self.name),
            });
        }

        Ok(())
    }
}

impl fmt::Debug for ServiceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceSettings")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("namespace", &self.namespace)
            .field("id_param_name", &self.id_param_name)
            .field("rest", &self.rest)
            .field("websocket", &self.websocket)
            .field("graphql", &self.graphql)
            .field("collection", &self.collection.is_some())
            .field("model_prop_filter", &self.model_prop_filter)
            .field("model_populates", &self.model_populates)
            .finish()
    }
}
