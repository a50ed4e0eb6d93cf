//! The dispatch pipeline
//!
//! Every inbound call runs the same fixed sequence:
//!
//! 1. build a [`Context`] from the transport request
//! 2. emit a `request` event
//! 3. resolve the target entity
//! 4. run the action handler
//! 5. write the success envelope (with the `Request-Id` header) or the
//!    failure envelope
//! 6. emit a `response` event, whatever happened before
//!
//! Errors and panics from steps 3 and 4 are caught here, exactly once.

use crate::core::action::Action;
use crate::core::context::Context;
use crate::core::error::{ServiceError, ServiceResult};
use crate::core::events::{EventBus, LifecycleEvent};
use crate::core::identity::Identity;
use crate::core::response::{Envelope, REQUEST_ID_HEADER};
use crate::core::service::Service;
use axum::Json;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// An inbound call, as delivered by a transport
#[derive(Debug, Clone, Default)]
pub struct TransportRequest {
    pub method: Method,
    pub path: String,
    pub query: Map<String, Value>,
    pub path_params: Map<String, Value>,
    pub body: Map<String, Value>,
    pub identity: Option<Identity>,
}

/// What the pipeline answers
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status_code: StatusCode,
    pub headers: HeaderMap,
    pub body: Envelope,
}

impl TransportResponse {
    fn success(ctx: &Context, data: Value) -> Self {
        let mut headers = HeaderMap::new();
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(REQUEST_ID_HEADER),
            HeaderValue::from_str(&ctx.id().to_string()),
        ) {
            headers.insert(name, value);
        }

        Self {
            status_code: StatusCode::OK,
            headers,
            body: Envelope::success(data),
        }
    }

    fn failure(err: &ServiceError) -> Self {
        Self {
            status_code: err.status_code(),
            headers: HeaderMap::new(),
            body: err.to_envelope(),
        }
    }
}

impl IntoResponse for TransportResponse {
    fn into_response(self) -> Response {
        (self.status_code, self.headers, Json(self.body)).into_response()
    }
}

/// Runs the pipeline for one action of one service
#[derive(Debug, Clone)]
pub struct Dispatcher {
    service: Arc<Service>,
    action: Arc<Action>,
    events: EventBus,
}

impl Dispatcher {
    pub fn new(service: Arc<Service>, action: Arc<Action>, events: EventBus) -> Self {
        Self {
            service,
            action,
            events,
        }
    }

    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    pub fn action(&self) -> &Arc<Action> {
        &self.action
    }

    /// Run the full pipeline
    pub async fn dispatch(&self, request: TransportRequest) -> TransportResponse {
        let mut ctx = self.begin(request);
        let action = self.action.clone();

        let outcome = AssertUnwindSafe(async {
            ctx.resolve_entity().await?;
            action.invoke(&mut ctx).await
        })
        .catch_unwind()
        .await;

        let result = outcome.unwrap_or_else(|panic| {
            Err(ServiceError::internal(format!(
                "handler panicked: {}",
                panic_message(panic.as_ref())
            )))
        });

        self.finish(ctx, result)
    }

    /// Answer a call the transport already rejected (e.g. an unreadable
    /// body), still emitting both lifecycle events
    pub async fn reject(&self, request: TransportRequest, err: ServiceError) -> TransportResponse {
        let ctx = self.begin(request);
        self.finish(ctx, Err(err))
    }

    fn begin(&self, request: TransportRequest) -> Context {
        let method = request.method.clone();
        let path = request.path.clone();
        let ctx = Context::from_request(self.service.clone(), self.action.clone(), request);

        tracing::debug!(
            request_id = %ctx.id(),
            service = %self.service.name(),
            action = %self.action.name,
            %method,
            %path,
            "Request via REST"
        );
        self.events.publish(LifecycleEvent::Request {
            context: Arc::new(ctx.clone()),
        });
        ctx
    }

    fn finish(&self, ctx: Context, result: ServiceResult<Value>) -> TransportResponse {
        let response = match result {
            Ok(data) => TransportResponse::success(&ctx, data),
            Err(err) => {
                tracing::error!(
                    request_id = %ctx.id(),
                    service = %self.service.name(),
                    action = %self.action.name,
                    kind = %err.kind(),
                    error = %err,
                    "Request failed"
                );
                TransportResponse::failure(&err)
            }
        };

        let elapsed_ms = ctx.elapsed();
        tracing::debug!(
            request_id = %ctx.id(),
            status = response.status_code.as_u16(),
            elapsed_ms,
            "Response sent"
        );
        self.events.publish(LifecycleEvent::Response {
            context: Arc::new(ctx),
            status: response.status_code.as_u16(),
            elapsed_ms,
        });

        response
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::{ActionFuture, ActionSource};
    use crate::core::error::ErrorKind;
    use crate::core::lookup::ServiceLookup;
    use crate::core::service::ServiceDescriptor;
    use crate::core::settings::ServiceSettings;
    use serde_json::json;

    fn echo_name(ctx: &mut Context) -> ActionFuture<'_> {
        Box::pin(async move {
            let name = ctx.validate("name").trim().not_empty(Some("NameCannotBeEmpty")).end();
            ctx.ensure_valid()?;
            Ok(json!({ "name": name }))
        })
    }

    fn explode(_ctx: &mut Context) -> ActionFuture<'_> {
        Box::pin(async {
            let missing: Option<Value> = None;
            Ok(missing.expect("boom"))
        })
    }

    fn dispatcher(handler: fn(&mut Context) -> ActionFuture<'_>) -> Dispatcher {
        let service = Service::new(
            ServiceDescriptor::new(ServiceSettings::new("users").rest("users")),
            ServiceLookup::detached(),
        )
        .unwrap();
        let action = Action::normalize("run", ActionSource::function(handler));
        Dispatcher::new(Arc::new(service), Arc::new(action), EventBus::new(16))
    }

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn test_success_sets_request_id() {
        let dispatcher = dispatcher(echo_name);
        let mut rx = dispatcher.events.subscribe();

        let response = dispatcher
            .dispatch(TransportRequest {
                body: body(json!({"name": "  ann "})),
                ..TransportRequest::default()
            })
            .await;

        assert_eq!(response.status_code, StatusCode::OK);
        assert_eq!(response.body, Envelope::success(json!({"name": "ann"})));

        let request_id = response.headers.get("request-id").unwrap().to_str().unwrap();
        let request_event = rx.recv().await.unwrap();
        assert_eq!(request_event.event.kind(), "request");
        assert_eq!(request_event.event.context().id().to_string(), request_id);

        let response_event = rx.recv().await.unwrap();
        assert!(matches!(
            response_event.event,
            LifecycleEvent::Response { status: 200, .. }
        ));
    }

    #[tokio::test]
    async fn test_validation_failure_envelope() {
        let dispatcher = dispatcher(echo_name);
        let response = dispatcher.dispatch(TransportRequest::default()).await;

        assert_eq!(response.status_code, StatusCode::BAD_REQUEST);
        assert!(response.headers.get("request-id").is_none());
        let error = response.body.error.unwrap();
        assert_eq!(error.kind, "ValidationError");
        assert_eq!(error.message, "NameCannotBeEmpty");
    }

    #[tokio::test]
    async fn test_panic_becomes_server_error() {
        let dispatcher = dispatcher(explode);
        let mut rx = dispatcher.events.subscribe();
        let response = dispatcher.dispatch(TransportRequest::default()).await;

        assert_eq!(response.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body.error.unwrap().kind, ErrorKind::Internal.as_str());

        rx.recv().await.unwrap();
        assert_eq!(rx.recv().await.unwrap().event.kind(), "response");
    }

    #[tokio::test]
    async fn test_reject_still_emits_response() {
        let dispatcher = dispatcher(echo_name);
        let mut rx = dispatcher.events.subscribe();
        let response = dispatcher
            .reject(
                TransportRequest::default(),
                ServiceError::bad_request(ErrorKind::InvalidBody, "bad json"),
            )
            .await;

        assert_eq!(response.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(rx.recv().await.unwrap().event.kind(), "request");
        assert_eq!(rx.recv().await.unwrap().event.kind(), "response");
    }
}
