//! Service registry
//!
//! The registry owns every loaded service. It is filled once by
//! [`ServiceRegistry::load_services`] and is read-only afterwards, so many
//! in-flight requests can read it concurrently without locking.

use super::exposure::RestExposure;
use super::routes::{RouteSpec, check_conflicts, synthesize_routes};
use crate::config::ApiConfig;
use crate::core::context::Context;
use crate::core::error::{ConfigError, ServiceResult};
use crate::core::events::{EventBus, EventEnvelope};
use crate::core::lookup::{ServiceDirectory, ServiceLookup};
use crate::core::service::{Service, ServiceDescriptor};
use axum::Router;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Owner of all services of an application
#[derive(Debug)]
pub struct ServiceRegistry {
    config: ApiConfig,
    directory: Arc<ServiceDirectory>,
    events: EventBus,
}

impl ServiceRegistry {
    pub fn new(config: ApiConfig) -> Self {
        let events = EventBus::new(config.event_bus_capacity);
        Self {
            config,
            directory: Arc::new(ServiceDirectory::new()),
            events,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Build every service, then run their init hooks in load order
    ///
    /// Init hooks run once all services exist, so they can look up their
    /// siblings. Fails on the first configuration error, on a duplicate
    /// service name, on conflicting routes, or when called twice.
    pub async fn load_services(&self, descriptors: Vec<ServiceDescriptor>) -> ServiceResult<()> {
        if self.directory.is_loaded() {
            return Err(ConfigError::AlreadyLoaded.into());
        }

        let lookup = ServiceLookup::new(&self.directory);
        let mut services = IndexMap::new();

        for descriptor in descriptors {
            let service = Service::new(descriptor, lookup.clone())?;
            let name = service.name().to_string();
            if services.contains_key(&name) {
                return Err(ConfigError::DuplicateService { name }.into());
            }

            tracing::info!(
                service = %name,
                version = ?service.version(),
                namespace = %service.namespace(),
                actions = service.actions().len(),
                "Load service"
            );
            services.insert(name, Arc::new(service));
        }

        let routes: Vec<RouteSpec> = services
            .values()
            .flat_map(|service| synthesize_routes(service, &self.config.prefix))
            .collect();
        check_conflicts(&routes)?;

        self.directory
            .publish(services)
            .map_err(|_| ConfigError::AlreadyLoaded)?;

        for service in self.directory.all() {
            let mut ctx = Context::for_init(service.clone());
            service.run_init(&mut ctx).await?;
        }

        Ok(())
    }

    /// Plain lookup by service name
    pub fn get(&self, name: &str) -> Option<Arc<Service>> {
        self.directory.get(name)
    }

    /// All services in load order
    pub fn services(&self) -> Vec<Arc<Service>> {
        self.directory.all()
    }

    /// Every synthesized route, service by service
    pub fn route_table(&self) -> Vec<RouteSpec> {
        self.services()
            .iter()
            .flat_map(|service| synthesize_routes(service, &self.config.prefix))
            .collect()
    }

    /// Router serving every synthesized route
    pub fn register_routes(&self) -> ServiceResult<Router> {
        RestExposure::service_routes(self)
    }

    /// Subscribe to `request` / `response` lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new(ApiConfig::default())
    }
}
