//! Typed error handling for service dispatch
//!
//! Every failure a service can produce is a [`ServiceError`]. Each error
//! carries a stable [`ErrorKind`] tag that ends up as `error.type` in the
//! response envelope, so clients can branch on it without parsing messages.
//!
//! # Error Categories
//!
//! - [`ConfigError`]: invalid service descriptors or application config. These
//!   are fatal at load time and never reach a request.
//! - [`ValidationError`]: accumulated parameter validation failures
//! - `BadRequest`: domain-level client errors (`ModelNotFound`, `InvalidId`,
//!   `AlreadyExists`, ...)
//! - [`StorageError`]: failures reported by a storage collection
//! - `Internal`: anything unclassified
//!
//! # Example
//!
//! ```rust,ignore
//! use svcrest::prelude::*;
//!
//! fn get(ctx: &mut Context) -> ActionFuture<'_> {
//!     Box::pin(async move {
//!         let model = ctx.assert_entity_exists("WidgetNotFound")?;
//!         Ok(model.clone())
//!     })
//! }
//! ```

use crate::core::response::Envelope;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;
use thiserror::Error;

/// Stable, machine-readable error tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Validation,
    ModelNotFound,
    InvalidId,
    AlreadyExists,
    InvalidBody,
    Storage,
    Internal,
}

impl ErrorKind {
    /// The tag written into `error.type`
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::ModelNotFound => "ModelNotFound",
            ErrorKind::InvalidId => "InvalidId",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::InvalidBody => "InvalidBody",
            ErrorKind::Storage => "StorageError",
            ErrorKind::Internal => "ServerError",
        }
    }

    /// Whether errors of this kind are the caller's fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::Validation
                | ErrorKind::ModelNotFound
                | ErrorKind::InvalidId
                | ErrorKind::AlreadyExists
                | ErrorKind::InvalidBody
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main error type of the framework
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Descriptor or application configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Accumulated parameter validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A client error tagged with a domain kind
    #[error("{message}")]
    BadRequest { kind: ErrorKind, message: String },

    /// Storage backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Internal errors (unclassified handler failures, panics)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Build a bad-request error of the given kind
    pub fn bad_request(kind: ErrorKind, message: impl Into<String>) -> Self {
        ServiceError::BadRequest {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a `ModelNotFound` bad request
    pub fn model_not_found(message: impl Into<String>) -> Self {
        Self::bad_request(ErrorKind::ModelNotFound, message)
    }

    /// Shorthand for an `InvalidId` bad request
    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::bad_request(ErrorKind::InvalidId, message)
    }

    /// Shorthand for an `AlreadyExists` bad request
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::bad_request(ErrorKind::AlreadyExists, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }

    /// The stable tag of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Config(_) => ErrorKind::Configuration,
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::BadRequest { kind, .. } => *kind,
            ServiceError::Storage(_) => ErrorKind::Storage,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        if self.kind().is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Convert to the failure envelope
    pub fn to_envelope(&self) -> Envelope {
        Envelope::failure(self.kind().as_str(), self.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.to_envelope())).into_response()
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors raised while loading descriptors or application configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The descriptor carries no settings at all
    #[error("No settings for service '{service}'! Please create a settings object in the service descriptor")]
    MissingSettings { service: String },

    /// The settings carry no service name
    #[error("No name for service! Please set it in the service settings")]
    MissingName,

    /// A transport exposure flag is set but the namespace is empty
    #[error("No namespace for service '{service}'! Please set it in the service settings")]
    MissingNamespace { service: String },

    /// The namespace cannot be used as a URL path
    #[error("Invalid namespace '{namespace}' for service '{service}'")]
    InvalidNamespace { service: String, namespace: String },

    /// Two descriptors share a service name
    #[error("Service '{name}' is registered more than once")]
    DuplicateService { name: String },

    /// Two routes bind differently named id segments at the same place
    #[error("Route '{path}' of service '{service}' conflicts with '{existing}' of service '{existing_service}'")]
    ConflictingRoutes {
        path: String,
        service: String,
        existing: String,
        existing_service: String,
    },

    /// `load_services` was called on a registry that is already loaded
    #[error("Services are already loaded")]
    AlreadyLoaded,

    /// Failed to parse a configuration document
    #[error("Failed to parse config{}: {message}", file_suffix(.file))]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// A configuration value failed validation
    #[error("Invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// IO error while reading configuration
    #[error("IO error: {message}")]
    IoError { message: String },
}

fn file_suffix(file: &Option<String>) -> String {
    file.as_ref()
        .map(|f| format!(" file '{}'", f))
        .unwrap_or_default()
}

// =============================================================================
// Validation Errors
// =============================================================================

/// All messages accumulated while validating request parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .messages.join(" "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

impl ValidationError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors reported by a storage collection
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend refused or failed a query
    #[error("{backend} query error: {message}")]
    QueryError { backend: String, message: String },

    /// A stored record is not in the shape the collection expects
    #[error("Data integrity error: {message}")]
    IntegrityError { message: String },

    /// A lock guarding in-process state was poisoned
    #[error("Failed to acquire {0} lock")]
    LockPoisoned(&'static str),

    /// Backend not available
    #[error("Storage backend '{backend}' is unavailable")]
    Unavailable { backend: String },
}

/// A specialized Result type for storage collections
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::bad_request(ErrorKind::InvalidBody, err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError {
            message: err.to_string(),
        }
    }
}

/// Recover a wrapped `ServiceError`, otherwise classify as internal
impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ServiceError>() {
            Ok(service_err) => service_err,
            Err(err) => ServiceError::Internal(err.to_string()),
        }
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_tags() {
        assert_eq!(ErrorKind::Validation.as_str(), "ValidationError");
        assert_eq!(ErrorKind::ModelNotFound.as_str(), "ModelNotFound");
        assert_eq!(ErrorKind::InvalidId.as_str(), "InvalidId");
        assert_eq!(ErrorKind::AlreadyExists.as_str(), "AlreadyExists");
        assert_eq!(ErrorKind::Configuration.as_str(), "ConfigurationError");
    }

    #[test]
    fn test_bad_request_kinds_are_400() {
        for err in [
            ServiceError::model_not_found("UserNotFound"),
            ServiceError::invalid_id("InvalidId"),
            ServiceError::already_exists("Duplicate"),
            ServiceError::from(ValidationError::new(vec!["x".into()])),
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_server_side_kinds_are_500() {
        let err = ServiceError::internal("boom");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err: ServiceError = StorageError::LockPoisoned("read").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), ErrorKind::Storage);

        let err: ServiceError = ConfigError::MissingName.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_error_joins_messages() {
        let err = ValidationError::new(vec![
            "UserNameCannotBeEmpty".to_string(),
            "EmailCannotBeEmpty".to_string(),
        ]);
        assert_eq!(err.to_string(), "UserNameCannotBeEmpty EmailCannotBeEmpty");
    }

    #[test]
    fn test_envelope_carries_kind_and_message() {
        let envelope = ServiceError::model_not_found("ProviderNotFound").to_envelope();
        assert!(!envelope.status);
        let error = envelope.error.unwrap();
        assert_eq!(error.kind, "ModelNotFound");
        assert_eq!(error.message, "ProviderNotFound");
    }

    #[test]
    fn test_anyhow_roundtrip_preserves_service_error() {
        let wrapped = anyhow::Error::new(ServiceError::already_exists("dup"));
        let err: ServiceError = wrapped.into();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let plain: ServiceError = anyhow::anyhow!("socket closed").into();
        assert_eq!(plain.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_parse_error_display() {
        let err = ConfigError::ParseError {
            file: Some("app.yaml".to_string()),
            message: "bad indent".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to parse config file 'app.yaml': bad indent"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: ServiceError = json_err.into();
        assert_eq!(err.kind(), ErrorKind::InvalidBody);
    }
}
