//! Caller identity carried on a request context
//!
//! Authentication happens upstream of the framework. An auth layer that has
//! resolved the caller inserts an [`Identity`] into the request extensions;
//! the dispatch pipeline copies it onto the [`Context`](crate::core::Context)
//! untouched. No policy is evaluated here.

use axum::http::Extensions;
use serde::{Deserialize, Serialize};

/// An already-authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable identifier of the caller
    pub id: String,

    /// Display name, if the auth layer knows one
    #[serde(default)]
    pub name: Option<String>,

    /// Roles granted to the caller
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            roles: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Read the identity an auth layer left in the request extensions
    pub fn from_extensions(extensions: &Extensions) -> Option<Self> {
        extensions.get::<Identity>().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extensions() {
        let mut extensions = Extensions::new();
        assert!(Identity::from_extensions(&extensions).is_none());

        extensions.insert(Identity::new("42").with_name("alice").with_role("admin"));
        let identity = Identity::from_extensions(&extensions).unwrap();
        assert_eq!(identity.id, "42");
        assert_eq!(identity.name.as_deref(), Some("alice"));
        assert!(identity.has_role("admin"));
        assert!(!identity.has_role("guest"));
    }
}
