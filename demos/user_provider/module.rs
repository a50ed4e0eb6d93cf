//! Module definition for the user/provider demo
//!
//! Both services keep their records in memory. The collections are held by
//! the module so callers can seed or inspect them.

use svcrest::prelude::*;

use super::{providers, users};

/// Users and the identity providers they are linked to
#[derive(Clone, Default)]
pub struct UserProviderModule {
    providers: Arc<InMemoryCollection>,
    users: Arc<InMemoryCollection>,
}

impl UserProviderModule {
    pub fn new() -> Self {
        Self {
            providers: Arc::new(InMemoryCollection::new(providers::NAME)),
            users: Arc::new(InMemoryCollection::new(users::NAME)),
        }
    }

    pub fn providers(&self) -> &Arc<InMemoryCollection> {
        &self.providers
    }

    pub fn users(&self) -> &Arc<InMemoryCollection> {
        &self.users
    }
}

impl Module for UserProviderModule {
    fn name(&self) -> &str {
        "user-provider"
    }

    fn services(&self) -> Vec<ServiceDescriptor> {
        vec![
            providers::descriptor(self.providers.clone()),
            users::descriptor(self.users.clone()),
        ]
    }
}
