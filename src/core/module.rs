//! Module system
//!
//! A module is a static registration list of service descriptors. The
//! server builder loads every module's services in registration order.

use crate::core::service::ServiceDescriptor;

/// A named group of services
pub trait Module: Send + Sync {
    /// Unique name for this module
    fn name(&self) -> &str;

    /// Module version
    fn version(&self) -> &str {
        "1.0.0"
    }

    /// Descriptors of the services this module provides, in load order
    fn services(&self) -> Vec<ServiceDescriptor>;
}
