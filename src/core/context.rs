//! Per-call request context
//!
//! A [`Context`] is created once per inbound call (or per internal sub-call
//! through [`Context::fork`]) and handed to the action handler. It carries
//! the merged request parameters, the caller identity, the resolved target
//! entity and the validation state of the call.

use crate::core::action::Action;
use crate::core::error::{ErrorKind, ServiceError, ServiceResult, ValidationError};
use crate::core::identity::Identity;
use crate::core::query::{PagedQuery, parse_count, parse_sort};
use crate::core::service::Service;
use crate::core::validation::ParamValidator;
use crate::server::dispatch::TransportRequest;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Where a call came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// An inbound transport request
    Rest,
    /// A sub-call forked from another context
    Internal,
    /// Service initialization
    None,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Rest => "rest",
            Provider::Internal => "internal",
            Provider::None => "",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work
#[derive(Debug, Clone)]
pub struct Context {
    id: Uuid,
    created_at: DateTime<Utc>,
    service: Arc<Service>,
    action: Option<Arc<Action>>,
    provider: Provider,
    validation_errors: Vec<String>,

    /// Caller identity resolved upstream, if any
    pub identity: Option<Identity>,

    /// Request parameters (query over path over body)
    pub params: Map<String, Value>,

    /// Resolved target entity, as plain data
    pub model: Option<Value>,

    /// Raw id the model was resolved from
    pub model_id: Option<Value>,
}

impl Context {
    fn blank(service: Arc<Service>, provider: Provider) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            service,
            action: None,
            provider,
            validation_errors: Vec::new(),
            identity: None,
            params: Map::new(),
            model: None,
            model_id: None,
        }
    }

    /// Build the context of an inbound transport call
    ///
    /// Parameters are the union of body, path and query parameters; on a key
    /// collision query wins over path, and path wins over body.
    pub fn from_request(
        service: Arc<Service>,
        action: Arc<Action>,
        request: TransportRequest,
    ) -> Self {
        let mut params = request.body;
        params.extend(request.path_params);
        params.extend(request.query);

        Self {
            action: Some(action),
            identity: request.identity,
            params,
            ..Self::blank(service, Provider::Rest)
        }
    }

    /// Minimal context used to run a service's init hook
    pub fn for_init(service: Arc<Service>) -> Self {
        Self::blank(service, Provider::None)
    }

    /// Fork an internal sub-call context
    ///
    /// The fork keeps service, action and identity, and gets a fresh id, no
    /// model and no validation errors. With `merge`, existing parameters
    /// are kept and `params` only fills in missing keys; otherwise `params`
    /// replaces them entirely.
    pub fn fork(&self, params: Map<String, Value>, merge: bool) -> Self {
        let params = if merge {
            let mut merged = self.params.clone();
            for (key, value) in params {
                merged.entry(key).or_insert(value);
            }
            merged
        } else {
            params
        };

        Self {
            action: self.action.clone(),
            identity: self.identity.clone(),
            params,
            ..Self::blank(self.service.clone(), Provider::Internal)
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    pub fn action(&self) -> Option<&Arc<Action>> {
        self.action.as_ref()
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn validation_errors(&self) -> &[String] {
        &self.validation_errors
    }

    pub(crate) fn push_validation_error(&mut self, message: String) {
        self.validation_errors.push(message);
    }

    /// Milliseconds since the context was created
    pub fn elapsed(&self) -> i64 {
        (Utc::now() - self.created_at).num_milliseconds()
    }

    /// Another service of the same registry
    pub fn lookup_service(&self, name: &str) -> Option<Arc<Service>> {
        self.service.lookup_service(name)
    }

    /// Resolve `model` from the id parameter, if the call carries one
    pub async fn resolve_entity(&mut self) -> ServiceResult<Option<Value>> {
        let service = self.service.clone();
        let Some(id) = self
            .params
            .get(service.id_param_name())
            .filter(|id| !id.is_null())
            .cloned()
        else {
            return Ok(None);
        };

        let model = service.resolve_model(self, id).await?;
        self.model = (!model.is_null()).then_some(model);
        Ok(self.model.clone())
    }

    /// The resolved model, or a `ModelNotFound` error carrying `message`
    pub fn assert_entity_exists(&self, message: &str) -> ServiceResult<&Value> {
        self.model
            .as_ref()
            .ok_or_else(|| ServiceError::model_not_found(message))
    }

    /// Start a validation chain on `params[name]`
    pub fn validate(&mut self, name: &str) -> ParamValidator<'_> {
        ParamValidator::new(self, name)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.get(name).is_some_and(|value| !value.is_null())
    }

    pub fn has_validation_errors(&self) -> bool {
        !self.validation_errors.is_empty()
    }

    /// Fail with every validation message accumulated so far
    pub fn ensure_valid(&self) -> ServiceResult<()> {
        if self.has_validation_errors() {
            Err(ValidationError::new(self.validation_errors.clone()).into())
        } else {
            Ok(())
        }
    }

    /// Fail with a bad-request error of the given kind
    pub fn fail_bad_request<T>(&self, kind: ErrorKind, message: impl Into<String>) -> ServiceResult<T> {
        Err(ServiceError::bad_request(kind, message))
    }

    /// Apply `limit`, `offset` and `sort` parameters to a query builder
    ///
    /// Each one is applied only when present and parseable.
    pub fn apply_page_sort<Q: PagedQuery>(&self, mut query: Q) -> Q {
        if let Some(limit) = self.params.get("limit").and_then(parse_count) {
            query = query.limit(limit);
        }
        if let Some(skip) = self.params.get("offset").and_then(parse_count) {
            query = query.skip(skip);
        }
        if let Some(Value::String(sort)) = self.params.get("sort") {
            let keys = parse_sort(sort);
            if !keys.is_empty() {
                query = query.sort(keys);
            }
        }
        query
    }
}
