//! Route synthesis
//!
//! Every action of a service gets direct-name routes, and the conventional
//! action names get RESTful routes on top:
//!
//! | action   | routes                                   |
//! |----------|------------------------------------------|
//! | *any*    | `GET`/`POST` `/<action>` and `/{id}/<action>` |
//! | `find`   | `GET /`                                  |
//! | `get`    | `GET /{id}`                              |
//! | `create` | `POST /`, `POST /{id}`                   |
//! | `update` | `PUT /`, `PATCH /`, `PUT /{id}`, `PATCH /{id}` |
//! | `remove` | `DELETE /`, `DELETE /{id}`               |
//!
//! The `/{id}` convention routes come after every direct-name route of the
//! service, so a literal action name never competes with the id segment.
//! The whole table is mounted at `<prefix>/<namespace>` and, when the
//! service has a non-zero version, again at `<prefix>/v<version>/<namespace>`.

use crate::core::error::ConfigError;
use crate::core::service::Service;
use axum::routing::MethodFilter;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// HTTP methods used by synthesized routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RouteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Patch => "PATCH",
            RouteMethod::Delete => "DELETE",
        }
    }

    pub fn filter(&self) -> MethodFilter {
        match self {
            RouteMethod::Get => MethodFilter::GET,
            RouteMethod::Post => MethodFilter::POST,
            RouteMethod::Put => MethodFilter::PUT,
            RouteMethod::Patch => MethodFilter::PATCH,
            RouteMethod::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One synthesized route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSpec {
    pub method: RouteMethod,
    /// Full path in axum syntax, e.g. `/api/users/{id}`
    pub path: String,
    /// Owning service name
    pub service: String,
    /// Registration key of the action
    pub action: String,
}

impl fmt::Display for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}.{}",
            self.method, self.path, self.service, self.action
        )
    }
}

/// Build the route table of one service
///
/// Services without actions or without a namespace get no routes.
pub fn synthesize_routes(service: &Service, prefix: &str) -> Vec<RouteSpec> {
    if service.actions().is_empty() || service.namespace().is_empty() {
        return Vec::new();
    }

    let id = format!("{{{}}}", service.id_param_name());
    let mut routes = Vec::new();
    let mut deferred = Vec::new();

    for key in service.actions().keys() {
        for method in [RouteMethod::Get, RouteMethod::Post] {
            routes.push((method, format!("/{}", key), key));
            routes.push((method, format!("/{}/{}", id, key), key));
        }

        match key.as_str() {
            "find" => routes.push((RouteMethod::Get, "/".to_string(), key)),
            "get" => deferred.push((RouteMethod::Get, format!("/{}", id), key)),
            "create" => {
                deferred.push((RouteMethod::Post, format!("/{}", id), key));
                routes.push((RouteMethod::Post, "/".to_string(), key));
            }
            "update" => {
                deferred.push((RouteMethod::Put, format!("/{}", id), key));
                deferred.push((RouteMethod::Patch, format!("/{}", id), key));
                routes.push((RouteMethod::Put, "/".to_string(), key));
                routes.push((RouteMethod::Patch, "/".to_string(), key));
            }
            "remove" => {
                deferred.push((RouteMethod::Delete, format!("/{}", id), key));
                routes.push((RouteMethod::Delete, "/".to_string(), key));
            }
            _ => {}
        }
    }
    routes.extend(deferred);

    mount_points(service, prefix)
        .into_iter()
        .flat_map(|base| {
            routes.iter().map(move |(method, path, key)| RouteSpec {
                method: *method,
                path: format!("{}{}", base, path),
                service: service.name().to_string(),
                action: key.to_string(),
            })
        })
        .collect()
}

/// Fail when two routes differ only in the name of a `{param}` segment
///
/// The router cannot tell `/things/{id}` from `/things/{code}`, so services
/// sharing a namespace must share their id param name.
pub fn check_conflicts(routes: &[RouteSpec]) -> Result<(), ConfigError> {
    let mut shapes: HashMap<String, &RouteSpec> = HashMap::new();
    for route in routes {
        let existing = *shapes.entry(path_shape(&route.path)).or_insert(route);
        if existing.path != route.path {
            return Err(ConfigError::ConflictingRoutes {
                path: route.path.clone(),
                service: route.service.clone(),
                existing: existing.path.clone(),
                existing_service: existing.service.clone(),
            });
        }
    }
    Ok(())
}

fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn mount_points(service: &Service, prefix: &str) -> Vec<String> {
    let prefix = prefix.trim_end_matches('/');
    let mut bases = vec![format!("{}/{}", prefix, service.namespace())];
    if let Some(version) = service.version().filter(|version| *version > 0) {
        bases.push(format!("{}/v{}/{}", prefix, version, service.namespace()));
    }
    bases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::ActionFuture;
    use crate::core::context::Context;
    use crate::core::lookup::ServiceLookup;
    use crate::core::service::ServiceDescriptor;
    use crate::core::settings::ServiceSettings;
    use serde_json::Value;

    fn noop(_ctx: &mut Context) -> ActionFuture<'_> {
        Box::pin(async { Ok(Value::Null) })
    }

    fn widgets(settings: ServiceSettings) -> Service {
        let descriptor = ["find", "get", "create", "update", "remove"]
            .into_iter()
            .fold(ServiceDescriptor::new(settings), |d, name| d.action(name, noop));
        Service::new(descriptor, ServiceLookup::detached()).unwrap()
    }

    fn has(routes: &[RouteSpec], method: RouteMethod, path: &str, action: &str) -> bool {
        routes
            .iter()
            .any(|r| r.method == method && r.path == path && r.action == action)
    }

    #[test]
    fn test_conventional_routes() {
        let routes = synthesize_routes(&widgets(ServiceSettings::new("widgets").rest("widgets")), "/api");

        for base in ["/api/widgets", "/api/v1/widgets"] {
            assert!(has(&routes, RouteMethod::Get, &format!("{base}/"), "find"));
            assert!(has(&routes, RouteMethod::Get, &format!("{base}/{{id}}"), "get"));
            assert!(has(&routes, RouteMethod::Post, &format!("{base}/"), "create"));
            assert!(has(&routes, RouteMethod::Post, &format!("{base}/{{id}}"), "create"));
            assert!(has(&routes, RouteMethod::Put, &format!("{base}/"), "update"));
            assert!(has(&routes, RouteMethod::Patch, &format!("{base}/"), "update"));
            assert!(has(&routes, RouteMethod::Put, &format!("{base}/{{id}}"), "update"));
            assert!(has(&routes, RouteMethod::Patch, &format!("{base}/{{id}}"), "update"));
            assert!(has(&routes, RouteMethod::Delete, &format!("{base}/"), "remove"));
            assert!(has(&routes, RouteMethod::Delete, &format!("{base}/{{id}}"), "remove"));
        }
    }

    #[test]
    fn test_direct_name_routes() {
        let routes = synthesize_routes(&widgets(ServiceSettings::new("widgets").rest("widgets")), "/api");
        for method in [RouteMethod::Get, RouteMethod::Post] {
            assert!(has(&routes, method, "/api/widgets/find", "find"));
            assert!(has(&routes, method, "/api/widgets/{id}/remove", "remove"));
        }
    }

    #[test]
    fn test_id_routes_come_last_per_mount() {
        let routes = synthesize_routes(
            &widgets(ServiceSettings::new("widgets").rest("widgets").with_version(None)),
            "/api",
        );
        let first_id_route = routes
            .iter()
            .position(|r| r.path == "/api/widgets/{id}")
            .unwrap();

        assert!(routes[first_id_route..]
            .iter()
            .all(|r| r.path == "/api/widgets/{id}"));
        assert!(routes.iter().all(|r| !r.path.starts_with("/api/v")));
    }

    #[test]
    fn test_version_zero_has_no_alias() {
        let routes = synthesize_routes(
            &widgets(ServiceSettings::new("widgets").rest("widgets").with_version(Some(0))),
            "/api",
        );
        assert!(has(&routes, RouteMethod::Get, "/api/widgets/", "find"));
        assert!(routes.iter().all(|r| !r.path.starts_with("/api/v0")));

        let routes = synthesize_routes(
            &widgets(ServiceSettings::new("widgets").rest("widgets").with_version(Some(2))),
            "/api",
        );
        assert!(has(&routes, RouteMethod::Get, "/api/v2/widgets/", "find"));
    }

    #[test]
    fn test_custom_id_param_name() {
        let routes = synthesize_routes(
            &widgets(ServiceSettings::new("widgets").rest("widgets").with_id_param_name("code")),
            "/api/",
        );
        assert!(has(&routes, RouteMethod::Get, "/api/widgets/{code}", "get"));
        assert!(has(&routes, RouteMethod::Get, "/api/widgets/{code}/find", "find"));
    }

    #[test]
    fn test_no_routes_without_namespace_or_actions() {
        assert!(synthesize_routes(&widgets(ServiceSettings::new("widgets")), "/api").is_empty());

        let bare = Service::new(
            ServiceDescriptor::new(ServiceSettings::new("widgets").rest("widgets")),
            ServiceLookup::detached(),
        )
        .unwrap();
        assert!(synthesize_routes(&bare, "/api").is_empty());
    }

    #[test]
    fn test_shared_namespace_with_different_id_names_conflicts() {
        let mut routes = synthesize_routes(&widgets(ServiceSettings::new("widgets").rest("things")), "/api");
        let gadgets = widgets(
            ServiceSettings::new("gadgets")
                .rest("things")
                .with_id_param_name("code"),
        );
        routes.extend(synthesize_routes(&gadgets, "/api"));

        match check_conflicts(&routes).unwrap_err() {
            ConfigError::ConflictingRoutes { service, existing_service, .. } => {
                assert_eq!(service, "gadgets");
                assert_eq!(existing_service, "widgets");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_shared_namespace_with_same_id_name_is_allowed() {
        let mut routes = synthesize_routes(&widgets(ServiceSettings::new("widgets").rest("things")), "/api");
        routes.extend(synthesize_routes(
            &widgets(ServiceSettings::new("gadgets").rest("things")),
            "/api",
        ));
        assert!(check_conflicts(&routes).is_ok());
        assert_eq!(path_shape("/api/v1/things/{code}/find"), "/api/v1/things/{}/find");
    }

    #[test]
    fn test_display() {
        let spec = RouteSpec {
            method: RouteMethod::Delete,
            path: "/api/widgets/{id}".to_string(),
            service: "widgets".to_string(),
            action: "remove".to_string(),
        };
        assert_eq!(spec.to_string(), "DELETE /api/widgets/{id} -> widgets.remove");
    }
}
