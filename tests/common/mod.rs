//! Shared fixtures for the integration tests
//!
//! The demo services are compiled into every test binary that declares
//! `mod common;`, so the tests exercise exactly what the demo serves.

#![allow(dead_code)]

#[path = "../../demos/user_provider/providers.rs"]
pub mod providers;

#[path = "../../demos/user_provider/users.rs"]
pub mod users;

#[path = "../../demos/user_provider/module.rs"]
pub mod module;

use axum_test::TestServer;
use module::UserProviderModule;
use svcrest::prelude::*;

/// A running test server over the demo module, plus handles on its state
pub struct TestApp {
    pub server: TestServer,
    pub module: UserProviderModule,
    pub registry: Arc<ServiceRegistry>,
}

pub async fn create_test_app() -> TestApp {
    let module = UserProviderModule::new();

    let (app, registry) = ServerBuilder::new()
        .register_module(module.clone())
        .build_with_registry()
        .await
        .expect("Failed to build app");

    let server = TestServer::try_new(app).expect("Failed to create test server");

    TestApp {
        server,
        module,
        registry,
    }
}

pub async fn seed_provider(module: &UserProviderModule, name: &str) -> Value {
    module
        .providers()
        .save(json!({ "name": name }))
        .await
        .expect("Failed to seed provider")
}

pub async fn seed_user(module: &UserProviderModule, username: &str, providers: Value) -> Value {
    module
        .users()
        .save(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "phone": 5550100,
            "providers": providers,
        }))
        .await
        .expect("Failed to seed user")
}
