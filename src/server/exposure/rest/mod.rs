//! REST API exposure
//!
//! Adapts axum to the transport-agnostic dispatch pipeline: each synthesized
//! route gets a handler that turns the axum request into a
//! [`TransportRequest`] and hands it to the route's [`Dispatcher`].
//!
//! The REST exposure consumes a `ServiceRegistry` and produces an Axum `Router`.

use crate::core::error::{ErrorKind, ServiceError, ServiceResult};
use crate::core::identity::Identity;
use crate::server::dispatch::{Dispatcher, TransportRequest, TransportResponse};
use crate::server::registry::ServiceRegistry;
use crate::server::routes::check_conflicts;
use axum::extract::{FromRequestParts, Path, Query, Request};
use axum::http::header;
use axum::routing::{MethodRouter, get, on};
use axum::{Json, Router};
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// A request the adapter could not fully read
#[derive(Debug)]
pub struct Rejection {
    /// Everything that could be read before the failure
    pub request: TransportRequest,
    pub error: ServiceError,
}

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the complete REST router
    ///
    /// Returns a router with:
    /// - Health check routes
    /// - Every synthesized service route
    /// - Custom routes
    /// - An HTTP trace layer
    pub fn build_router(
        registry: Arc<ServiceRegistry>,
        custom_routes: Vec<Router>,
    ) -> ServiceResult<Router> {
        let mut app = Self::health_routes().merge(Self::service_routes(&registry)?);

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app.layer(TraceLayer::new_for_http()))
    }

    /// Build a router serving the registry's route table
    ///
    /// Routes are grouped per path so each path gets one method router. A
    /// `(method, path)` pair claimed twice keeps its first handler. Paths
    /// ending in `/` are also served without the trailing slash. Routes that
    /// differ only in an id segment name are a configuration error.
    pub fn service_routes(registry: &ServiceRegistry) -> ServiceResult<Router> {
        let routes = registry.route_table();
        check_conflicts(&routes)?;

        let body_limit = registry.config().body_limit;
        let mut paths: IndexMap<String, MethodRouter> = IndexMap::new();
        let mut claimed = HashSet::new();

        for route in routes {
            let Some(service) = registry.get(&route.service) else {
                continue;
            };
            let Some(action) = service.action(&route.action) else {
                continue;
            };

            let dispatcher = Arc::new(Dispatcher::new(
                service,
                action,
                registry.events().clone(),
            ));
            let handler = move |request: Request| async move {
                Self::handle(dispatcher, request, body_limit).await
            };

            for path in path_variants(&route.path) {
                if !claimed.insert((path.clone(), route.method)) {
                    tracing::warn!(
                        method = %route.method,
                        path = %path,
                        service = %route.service,
                        action = %route.action,
                        "Route already registered, skipping"
                    );
                    continue;
                }

                tracing::debug!(method = %route.method, path = %path, "Register route");
                let filter = route.method.filter();
                match paths.get_mut(&path) {
                    Some(method_router) => {
                        *method_router = std::mem::take(method_router).on(filter, handler.clone());
                    }
                    None => {
                        paths.insert(path, on(filter, handler.clone()));
                    }
                }
            }
        }

        tracing::info!(paths = paths.len(), "Service routes registered");
        Ok(paths
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                router.route(&path, method_router)
            }))
    }

    async fn handle(
        dispatcher: Arc<Dispatcher>,
        request: Request,
        body_limit: usize,
    ) -> TransportResponse {
        match read_request(request, body_limit).await {
            Ok(request) => dispatcher.dispatch(request).await,
            Err(rejection) => dispatcher.reject(rejection.request, rejection.error).await,
        }
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME")
        }))
    }
}

/// Read an axum request into a transport request
///
/// Query and path parameters arrive as strings. A form-encoded body
/// (`application/x-www-form-urlencoded`) yields string params too; any other
/// non-empty body must be a JSON object.
pub async fn read_request(request: Request, body_limit: usize) -> Result<TransportRequest, Rejection> {
    let (mut parts, body) = request.into_parts();

    let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map(|Query(query)| query)
        .unwrap_or_default();
    let path_params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
        .await
        .map(|Path(params)| params)
        .unwrap_or_default();

    let form = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(is_form_content_type);

    let mut request = TransportRequest {
        method: parts.method.clone(),
        path: parts.uri.path().to_string(),
        query: strings_to_map(query),
        path_params: strings_to_map(path_params),
        body: Map::new(),
        identity: Identity::from_extensions(&parts.extensions),
    };

    let bytes = match axum::body::to_bytes(body, body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return Err(Rejection {
                request,
                error: ServiceError::bad_request(ErrorKind::InvalidBody, e.to_string()),
            });
        }
    };

    let parsed = if form {
        parse_form(&bytes)
    } else {
        parse_body(&bytes)
    };
    match parsed {
        Ok(body) => {
            request.body = body;
            Ok(request)
        }
        Err(error) => Err(Rejection { request, error }),
    }
}

fn parse_body(bytes: &[u8]) -> Result<Map<String, Value>, ServiceError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(ServiceError::bad_request(
            ErrorKind::InvalidBody,
            "Request body must be a JSON object",
        )),
    }
}

fn parse_form(bytes: &[u8]) -> Result<Map<String, Value>, ServiceError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)
        .map_err(|e| ServiceError::bad_request(ErrorKind::InvalidBody, e.to_string()))?;
    Ok(strings_to_map(pairs))
}

fn is_form_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
}

fn strings_to_map(values: impl IntoIterator<Item = (String, String)>) -> Map<String, Value> {
    values
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

fn path_variants(path: &str) -> Vec<String> {
    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => vec![path.to_string(), trimmed.to_string()],
        _ => vec![path.to_string()],
    }
}
