//! Server module for building HTTP servers from service descriptors
//!
//! This module provides:
//! - `ServiceRegistry`, the owner of every loaded service
//! - route synthesis from action names
//! - the dispatch pipeline every route goes through
//! - `ServerBuilder`, the fluent entry point

pub mod builder;
pub mod dispatch;
pub mod exposure;
pub mod registry;
pub mod routes;

pub use builder::ServerBuilder;
pub use dispatch::{Dispatcher, TransportRequest, TransportResponse};
pub use exposure::RestExposure;
pub use registry::ServiceRegistry;
pub use routes::{RouteMethod, RouteSpec, check_conflicts, synthesize_routes};
