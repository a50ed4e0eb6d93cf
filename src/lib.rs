//! # svcrest
//!
//! A framework for building REST APIs out of declarative service descriptors.
//!
//! ## Features
//!
//! - **Declarative Services**: settings, actions and custom methods described once
//! - **Route Synthesis**: `find`/`get`/`create`/`update`/`remove` map to REST
//!   verbs, every other action gets its own path
//! - **Uniform Dispatch**: every call builds a context, resolves the target
//!   entity, runs the handler and answers with the same envelope
//! - **Fluent Validation**: chained parameter rules with accumulated messages
//! - **Population**: related-id fields replaced by entities of sibling services
//! - **Lifecycle Events**: `request` / `response` events on a broadcast bus
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use svcrest::prelude::*;
//!
//! fn find(ctx: &mut Context) -> ActionFuture<'_> {
//!     Box::pin(async move {
//!         let service = ctx.service().clone();
//!         let options = ctx.apply_page_sort(FindOptions::default());
//!         let docs = service.require_collection()?.find(&Value::Null, options).await?;
//!         Ok(service.serialize(Value::Array(docs), None))
//!     })
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let widgets = ServiceSettings::new("widgets")
//!         .rest("widgets")
//!         .with_collection(Arc::new(InMemoryCollection::new("widgets")));
//!
//!     ServerBuilder::new()
//!         .register_service(ServiceDescriptor::new(widgets).action("find", find))
//!         .serve()
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        action::{Action, ActionDescriptor, ActionFuture, ActionSource},
        collection::Collection,
        context::{Context, Provider},
        error::{
            ConfigError, ErrorKind, ServiceError, ServiceResult, StorageError, StorageResult,
            ValidationError,
        },
        events::{EventBus, EventEnvelope, LifecycleEvent},
        identity::Identity,
        module::Module,
        query::{FindOptions, PagedQuery, SortKey},
        response::Envelope,
        service::{Service, ServiceDescriptor},
        settings::{PropFilter, ServiceSettings},
    };

    // === Storage ===
    pub use crate::storage::InMemoryCollection;

    // === Config ===
    pub use crate::config::{AppConfig, init_tracing};

    // === Server ===
    pub use crate::server::{ServerBuilder, ServiceRegistry};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use futures::future::BoxFuture;
    pub use serde_json::{Map, Value, json};
    pub use std::sync::Arc;
}
