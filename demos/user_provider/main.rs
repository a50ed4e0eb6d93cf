//! User/provider example
//!
//! Two REST services backed by in-memory collections:
//! - `providers`: plain CRUD
//! - `users`: CRUD plus `addProvider` / `removeProvider`, with the linked
//!   providers populated into every user
//!
//! Run with `cargo run --example user_provider [config.yaml]`.

mod module;
mod providers;
mod users;

use module::UserProviderModule;
use svcrest::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| {
        concat!(env!("CARGO_MANIFEST_DIR"), "/demos/user_provider/config.yaml").to_string()
    });
    let config = AppConfig::load(&config_path)?;
    init_tracing(&config.logging);

    let module = UserProviderModule::new();
    let github = module
        .providers()
        .save(json!({ "name": "github" }))
        .await?;
    tracing::info!(provider = %github["id"], "Seeded provider");

    ServerBuilder::new()
        .with_config(config)
        .register_module(module)
        .serve()
        .await
}
