//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::RestExposure;
use super::registry::ServiceRegistry;
use crate::config::AppConfig;
use crate::core::module::Module;
use crate::core::service::ServiceDescriptor;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for creating HTTP servers with auto-registered service routes
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(AppConfig::load("config.yaml")?)
///     .register_module(MyModule)
///     .build()
///     .await?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    descriptors: Vec<ServiceDescriptor>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with the default configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            descriptors: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Register a single service descriptor
    pub fn register_service(mut self, descriptor: ServiceDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Register every service of a module, in the module's order
    pub fn register_module(mut self, module: impl Module + 'static) -> Self {
        let services = module.services();
        tracing::info!(
            module = module.name(),
            version = module.version(),
            services = services.len(),
            "Register module"
        );
        self.descriptors.extend(services);
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this for endpoints that are not service actions, such as
    /// authentication flows or webhooks.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use axum::{Router, routing::post};
    ///
    /// let auth_routes = Router::new().route("/login", post(login_handler));
    ///
    /// ServerBuilder::new()
    ///     .with_custom_routes(auth_routes)
    ///     .register_module(module)
    ///     .build()
    ///     .await?;
    /// ```
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Load every registered service and run their init hooks
    pub async fn build_registry(self) -> Result<Arc<ServiceRegistry>> {
        let registry = ServiceRegistry::new(self.config.api.clone());
        registry.load_services(self.descriptors).await?;

        for route in registry.route_table() {
            tracing::debug!("{}", route);
        }

        Ok(Arc::new(registry))
    }

    /// Build the final REST router
    pub async fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let registry = self.build_registry().await?;
        Ok(RestExposure::build_router(registry, custom_routes)?)
    }

    /// Build the registry and the router, keeping a handle on the registry
    pub async fn build_with_registry(mut self) -> Result<(Router, Arc<ServiceRegistry>)> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let registry = self.build_registry().await?;
        let router = RestExposure::build_router(registry.clone(), custom_routes)?;
        Ok((router, registry))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Binds to the configured `server.host:server.port` and handles
    /// SIGTERM and SIGINT (Ctrl+C) for graceful shutdown.
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.addr();
        let app = self.build().await?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
