//! API exposure modules
//!
//! Each exposure consumes the `ServiceRegistry` and produces a router for its
//! protocol.

pub mod rest;

pub use rest::RestExposure;
