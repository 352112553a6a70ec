//! Resolution of an application's public hostname.
//!
//! Three lookups chain into each other: the app is found by name inside the
//! targeted space, its first route is read from the routes collection, and the
//! route's domain supplies the rest of the hostname.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::form_urlencoded;

use crate::error::{OrchestrationError, PlatformError, ResolutionError};
use crate::platform::{PlatformClient, Target};

type ResolveResult<T> = std::result::Result<T, OrchestrationError>;

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Page<T> {
    #[serde(default)]
    resources: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AppResource {
    metadata: Metadata,
    entity: AppEntity,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    guid: String,
}

#[derive(Debug, Deserialize)]
struct AppEntity {
    #[serde(default)]
    routes_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RouteResource {
    entity: RouteEntity,
}

#[derive(Debug, Deserialize)]
struct RouteEntity {
    #[serde(default)]
    host: String,
    domain_url: String,
}

#[derive(Debug, Deserialize)]
struct DomainRecord {
    entity: DomainEntity,
}

#[derive(Debug, Deserialize)]
struct DomainEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_code: String,
    #[serde(default)]
    description: String,
}

/// Resolve `app_name` in `target` to its hostname, without scheme.
///
/// When several apps share the name, the first search result wins; likewise
/// the first route of the app is used.
///
/// # Errors
///
/// Returns an error when a lookup fails, the platform reports an error, a
/// response does not match its schema, the app is missing, or it has no
/// routes.
pub fn resolve_route(
    client: &dyn PlatformClient,
    target: &Target,
    app_name: &str,
) -> ResolveResult<String> {
    let space_guid = client.space_guid(target)?;
    let search: Page<AppResource> =
        fetch(client, &app_search_path(&space_guid, app_name), "app search")?;
    let Some(app) = search.resources.into_iter().next() else {
        return Err(ResolutionError::AppNotFound {
            app: app_name.to_string(),
            target: target.to_string(),
        }
        .into());
    };

    let routes_url = match app.entity.routes_url.filter(|url| !url.is_empty()) {
        Some(url) => url,
        None => {
            let detail: AppResource =
                fetch(client, &format!("/v2/apps/{}", app.metadata.guid), "app detail")?;
            detail
                .entity
                .routes_url
                .filter(|url| !url.is_empty())
                .ok_or_else(|| ResolutionError::MissingRoutesUrl {
                    app: app_name.to_string(),
                })?
        }
    };

    let routes: Page<RouteResource> = fetch(client, &routes_url, "routes")?;
    let Some(route) = routes.resources.into_iter().next() else {
        return Err(ResolutionError::NoRoutes {
            app: app_name.to_string(),
        }
        .into());
    };

    let domain: DomainRecord = fetch(client, &route.entity.domain_url, "domain")?;
    let hostname = compose_hostname(&route.entity.host, &domain.entity.name);
    debug!(app = app_name, %hostname, "resolved app route");
    Ok(hostname)
}

fn app_search_path(space_guid: &str, app_name: &str) -> String {
    let name: String = form_urlencoded::byte_serialize(app_name.as_bytes()).collect();
    format!("/v2/spaces/{space_guid}/apps?q=name:{name}&inline-relations-depth=1")
}

fn compose_hostname(host: &str, domain: &str) -> String {
    if host.is_empty() {
        domain.to_string()
    } else {
        format!("{host}.{domain}")
    }
}

fn fetch<T: DeserializeOwned>(
    client: &dyn PlatformClient,
    request: &str,
    step: &'static str,
) -> ResolveResult<T> {
    debug!(step, request, "querying platform");
    let body = client.query(request)?;

    if let Ok(error) = serde_json::from_slice::<ApiErrorBody>(&body) {
        return Err(PlatformError::Reported {
            request: request.to_string(),
            error_code: error.error_code,
            description: error.description,
        }
        .into());
    }

    serde_json::from_slice(&body).map_err(|source| {
        ResolutionError::Decode {
            step,
            request: request.to_string(),
            source,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::{app_search_path, compose_hostname, resolve_route};
    use crate::error::{OrchestrationError, PlatformError, ResolutionError};
    use crate::platform::Target;
    use crate::test_support::{
        Call, DOMAIN_PATH, ROUTES_PATH, RecordingClient, app_page, app_search, domain_record,
        routes_page,
    };

    fn target() -> Target {
        Target::space("acme", "dev")
    }

    #[test]
    fn composes_host_and_domain() {
        let client = RecordingClient::new()
            .respond(&app_search("api"), &app_page(Some(ROUTES_PATH)))
            .respond(ROUTES_PATH, &routes_page(&["myapp-abc123"]))
            .respond(DOMAIN_PATH, &domain_record("example.com"));

        let route = resolve_route(&client, &target(), "api").expect("resolve route");
        assert_eq!(route, "myapp-abc123.example.com");
        assert_eq!(
            client.calls(),
            vec![
                Call::Query(app_search("api")),
                Call::Query(ROUTES_PATH.to_string()),
                Call::Query(DOMAIN_PATH.to_string()),
            ]
        );
    }

    #[test]
    fn empty_host_yields_bare_domain() {
        let client = RecordingClient::new()
            .respond(&app_search("api"), &app_page(Some(ROUTES_PATH)))
            .respond(ROUTES_PATH, &routes_page(&[""]))
            .respond(DOMAIN_PATH, &domain_record("apps.example.com"));

        let route = resolve_route(&client, &target(), "api").expect("resolve route");
        assert_eq!(route, "apps.example.com");
    }

    #[test]
    fn first_route_wins() {
        let client = RecordingClient::new()
            .respond(&app_search("api"), &app_page(Some(ROUTES_PATH)))
            .respond(ROUTES_PATH, &routes_page(&["first", "second"]))
            .respond(DOMAIN_PATH, &domain_record("example.com"));

        let route = resolve_route(&client, &target(), "api").expect("resolve route");
        assert_eq!(route, "first.example.com");
    }

    #[test]
    fn no_routes_names_the_app() {
        let client = RecordingClient::new()
            .respond(&app_search("api"), &app_page(Some(ROUTES_PATH)))
            .respond(ROUTES_PATH, &routes_page(&[]))
            .respond(DOMAIN_PATH, &domain_record("example.com"));

        let error = resolve_route(&client, &target(), "api").expect_err("no routes");
        assert!(matches!(
            error,
            OrchestrationError::Resolution(ResolutionError::NoRoutes { .. })
        ));
        assert_eq!(error.to_string(), "app 'api' has no routes");
        assert!(!client.queries().contains(&DOMAIN_PATH.to_string()));
    }

    #[test]
    fn missing_app_is_a_resolution_error() {
        let client = RecordingClient::new().respond(&app_search("api"), r#"{"resources": []}"#);

        let error = resolve_route(&client, &target(), "api").expect_err("no app");
        assert_eq!(error.to_string(), "app 'api' not found in acme/dev");
    }

    #[test]
    fn falls_back_to_app_detail_for_routes_url() {
        let client = RecordingClient::new()
            .respond(&app_search("api"), &app_page(None))
            .respond(
                "/v2/apps/app-guid",
                &format!(
                    r#"{{"metadata": {{"guid": "app-guid"}}, "entity": {{"routes_url": "{ROUTES_PATH}"}}}}"#
                ),
            )
            .respond(ROUTES_PATH, &routes_page(&["api"]))
            .respond(DOMAIN_PATH, &domain_record("example.com"));

        let route = resolve_route(&client, &target(), "api").expect("resolve route");
        assert_eq!(route, "api.example.com");
        assert_eq!(client.queries().len(), 4);
    }

    #[test]
    fn platform_error_body_is_reported() {
        let client = RecordingClient::new().respond(
            &app_search("api"),
            r#"{"code": 10000, "description": "Unknown request", "error_code": "CF-NotFound"}"#,
        );

        let error = resolve_route(&client, &target(), "api").expect_err("platform error");
        assert!(matches!(
            error,
            OrchestrationError::Platform(PlatformError::Reported { .. })
        ));
        assert!(error.to_string().contains("CF-NotFound"));
    }

    #[test]
    fn malformed_response_names_the_step() {
        let client = RecordingClient::new()
            .respond(&app_search("api"), &app_page(Some(ROUTES_PATH)))
            .respond(ROUTES_PATH, "not json");

        let error = resolve_route(&client, &target(), "api").expect_err("decode failure");
        assert!(matches!(
            error,
            OrchestrationError::Resolution(ResolutionError::Decode { step: "routes", .. })
        ));
    }

    #[test]
    fn app_name_is_percent_encoded() {
        assert_eq!(
            app_search_path("s1", "my app&co"),
            "/v2/spaces/s1/apps?q=name:my+app%26co&inline-relations-depth=1"
        );
    }

    #[test]
    fn host_composition() {
        assert_eq!(compose_hostname("www", "example.com"), "www.example.com");
        assert_eq!(compose_hostname("", "example.com"), "example.com");
    }
}
