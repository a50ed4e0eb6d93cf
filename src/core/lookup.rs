//! Sibling service lookup
//!
//! The registry owns every service through a [`ServiceDirectory`]. Each
//! service only receives a [`ServiceLookup`], a weak handle onto that
//! directory, so services can reach each other without owning the registry.

use crate::core::service::Service;
use indexmap::IndexMap;
use std::sync::{Arc, OnceLock, Weak};

/// Name-keyed set of loaded services, filled exactly once
#[derive(Debug, Default)]
pub struct ServiceDirectory {
    services: OnceLock<IndexMap<String, Arc<Service>>>,
}

impl ServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the loaded services; returns them back if already published
    pub fn publish(
        &self,
        services: IndexMap<String, Arc<Service>>,
    ) -> Result<(), IndexMap<String, Arc<Service>>> {
        self.services.set(services)
    }

    pub fn is_loaded(&self) -> bool {
        self.services.get().is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Service>> {
        self.services.get()?.get(name).cloned()
    }

    /// All services in load order
    pub fn all(&self) -> Vec<Arc<Service>> {
        self.services
            .get()
            .map(|services| services.values().cloned().collect())
            .unwrap_or_default()
    }
}

/// Capability handle for looking up sibling services by name
#[derive(Debug, Clone, Default)]
pub struct ServiceLookup {
    directory: Weak<ServiceDirectory>,
}

impl ServiceLookup {
    pub fn new(directory: &Arc<ServiceDirectory>) -> Self {
        Self {
            directory: Arc::downgrade(directory),
        }
    }

    /// A lookup that never finds anything, for standalone services
    pub fn detached() -> Self {
        Self::default()
    }

    /// Returns `None` when the service is unknown, the directory has not
    /// been published yet, or the registry has been dropped
    pub fn get(&self, name: &str) -> Option<Arc<Service>> {
        self.directory.upgrade()?.get(name)
    }
}
