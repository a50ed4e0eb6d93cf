//! Action descriptors
//!
//! An action is one named operation a service exposes. Authors declare it
//! either as a bare handler or as an [`ActionDescriptor`] with a name override
//! and free-form config; both normalize to the same [`Action`] when the
//! service is built.

use crate::core::context::Context;
use crate::core::error::ServiceResult;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Future returned by action handlers and service hooks
pub type ActionFuture<'a> = BoxFuture<'a, ServiceResult<Value>>;

/// Shared action handler
///
/// Handlers reach their service through `ctx.service()`.
pub type HandlerFn = Arc<dyn for<'a> Fn(&'a mut Context) -> ActionFuture<'a> + Send + Sync>;

/// Explicit action declaration
#[derive(Clone)]
pub struct ActionDescriptor {
    /// Overrides the registration key as the action name
    pub name: Option<String>,
    pub handler: HandlerFn,
    pub config: Map<String, Value>,
}

impl ActionDescriptor {
    pub fn new<F>(handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> ActionFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: None,
            handler: Arc::new(handler),
            config: Map::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }
}

/// The two accepted ways of declaring an action
#[derive(Clone)]
pub enum ActionSource {
    /// A bare handler; name and config take their defaults
    Function(HandlerFn),
    /// A handler with explicit name and config
    Descriptor(ActionDescriptor),
}

impl ActionSource {
    pub fn function<F>(handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> ActionFuture<'a> + Send + Sync + 'static,
    {
        ActionSource::Function(Arc::new(handler))
    }
}

impl From<ActionDescriptor> for ActionSource {
    fn from(descriptor: ActionDescriptor) -> Self {
        ActionSource::Descriptor(descriptor)
    }
}

/// A normalized action: exactly one handler and a name
#[derive(Clone)]
pub struct Action {
    pub name: String,
    pub handler: HandlerFn,
    pub config: Map<String, Value>,
}

impl Action {
    /// Normalize a declaration registered under `key`
    pub fn normalize(key: &str, source: ActionSource) -> Self {
        match source {
            ActionSource::Function(handler) => Self {
                name: key.to_string(),
                handler,
                config: Map::new(),
            },
            ActionSource::Descriptor(descriptor) => Self {
                name: descriptor
                    .name
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| key.to_string()),
                handler: descriptor.handler,
                config: descriptor.config,
            },
        }
    }

    /// Run the handler against a context
    pub fn invoke<'a>(&'a self, ctx: &'a mut Context) -> ActionFuture<'a> {
        (self.handler)(ctx)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
