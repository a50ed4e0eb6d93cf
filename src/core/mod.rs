//! Core module containing the context, service and validation machinery

pub mod action;
pub mod collection;
pub mod context;
pub mod error;
pub mod events;
pub mod identity;
pub mod lookup;
pub mod module;
pub mod query;
pub mod response;
pub mod service;
pub mod settings;
pub mod validation;

pub use action::{Action, ActionDescriptor, ActionFuture, ActionSource, HandlerFn};
pub use collection::Collection;
pub use context::{Context, Provider};
pub use error::{
    ConfigError, ErrorKind, ServiceError, ServiceResult, StorageError, StorageResult,
    ValidationError,
};
pub use events::{EventBus, EventEnvelope, LifecycleEvent};
pub use identity::Identity;
pub use lookup::{ServiceDirectory, ServiceLookup};
pub use module::Module;
pub use query::{FindOptions, PagedQuery, SortDirection, SortKey};
pub use response::{Envelope, ErrorBody, REQUEST_ID_HEADER};
pub use service::{Service, ServiceDescriptor};
pub use settings::{PropFilter, ServiceSettings};
pub use validation::ParamValidator;
