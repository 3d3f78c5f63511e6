//! End-to-end registration: manifest, container and processor together

mod common;

use common::capture::LogCapture;
use common::controllers::UserController;
use http::Method;
use routeforge::config::AppConfig;
use routeforge::container::Container;
use routeforge::dispatcher::{Dispatcher, HandlerRequest};
use routeforge::filter::FilterFactoryRegistry;
use routeforge::metadata::{parse_manifest, ManifestFormat, MetadataRegistry};
use routeforge::middleware::ACCESS_LOG_TARGET;
use routeforge::registration::{AnnotationProcessor, RegistrationError};
use routeforge::router::RouteTable;
use std::sync::Arc;

const MANIFEST: &str = r#"
controllers:
  - class: UserController
    prefix: /users
    filters:
      - kind: access_log
        priority: 10
    methods:
      - name: list
        mappings:
          - method: GET
            path: /
            name: users.list
        filters:
          - kind: login_only
            priority: 5
      - name: show
        mappings:
          - method: GET
            path: /{id}
            name: users.show
      - name: helper
        visibility: private
        mappings:
          - method: GET
            path: /helper
"#;

fn metadata(manifest: &str) -> MetadataRegistry {
    parse_manifest(
        manifest,
        ManifestFormat::Yaml,
        &FilterFactoryRegistry::with_builtins(),
    )
    .unwrap()
}

fn container(config: &AppConfig) -> Container {
    let mut container = Container::new();
    container.insert_controller("UserController", Arc::new(UserController));
    config.register_services(&mut container);
    container
}

fn register(config: &AppConfig, manifest: &str) -> Result<RouteTable, RegistrationError> {
    let metadata = metadata(manifest);
    let container = container(config);
    let mut table = RouteTable::new();
    AnnotationProcessor::new(&metadata, &container)
        .with_context_url(config.context_url.clone())
        .process(&mut table)?;
    Ok(table)
}

fn api_config() -> AppConfig {
    AppConfig {
        context_url: Some("/api".to_string()),
        ..AppConfig::default()
    }
}

#[test]
fn test_context_url_and_priorities() {
    let table = register(&api_config(), MANIFEST).unwrap();
    assert_eq!(table.len(), 2);

    let list = table.named("users.list").unwrap();
    assert_eq!(list.pattern(), "/api/users/");
    assert_eq!(list.group(), Some("/api/users"));
    let names: Vec<&str> = list.middlewares().iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["login_only", "access_log"]);

    let show = table.named("users.show").unwrap();
    let names: Vec<&str> = show.middlewares().iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["access_log"]);
}

#[test]
fn test_private_methods_are_not_routed() {
    let table = register(&AppConfig::default(), MANIFEST).unwrap();
    assert!(table.routes().iter().all(|r| !r.pattern().contains("helper")));
    assert!(table.route(&Method::GET, "/users/helper").is_some());
    // `/users/{id}` catches the path instead
    let matched = table.route(&Method::GET, "/users/helper").unwrap();
    assert_eq!(matched.route.name(), Some("users.show"));
}

#[test]
fn test_url_for_named_route() {
    let table = register(&api_config(), MANIFEST).unwrap();
    assert_eq!(
        table.url_for("users.show", &[("id", "7")]).unwrap(),
        "/api/users/7"
    );
    assert_eq!(table.url_for("users.list", &[]).unwrap(), "/api/users");
}

#[test]
fn test_login_redirect_through_dispatcher() {
    let table = register(&api_config(), MANIFEST).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(table));

    let capture = LogCapture::new();
    let resp = tracing::subscriber::with_default(capture.subscriber(), || {
        dispatcher
            .dispatch(HandlerRequest::new(Method::GET, "/api/users?page=2"))
            .unwrap()
            .unwrap()
    });

    assert_eq!(resp.status, 302);
    let location = resp.get_header("location").unwrap();
    assert!(location.starts_with("/login?redirect="));
    assert!(location.contains("%2Fapi%2Fusers"));
    // login_only short-circuits ahead of access_log
    assert!(capture.for_target(ACCESS_LOG_TARGET).is_empty());
}

#[test]
fn test_logged_in_request_reaches_controller() {
    let table = register(&api_config(), MANIFEST).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(table));

    let capture = LogCapture::new();
    let resp = tracing::subscriber::with_default(capture.subscriber(), || {
        let req = HandlerRequest::new(Method::GET, "/api/users")
            .with_header("cookie", "theme=dark; session=abc123");
        dispatcher.dispatch_or_not_found(req).unwrap()
    });

    assert_eq!(resp.status, 200);
    let logs = capture.for_target(ACCESS_LOG_TARGET);
    assert_eq!(logs.len(), 1);
    assert!(logs[0].message.contains("\"GET /api/users HTTP/1.1\" 200"));
}

#[test]
fn test_path_params_reach_controller() {
    let table = register(&AppConfig::default(), MANIFEST).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(table));
    let resp = dispatcher
        .dispatch_or_not_found(HandlerRequest::new(Method::GET, "/users/42"))
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["id"], "42");
}

#[test]
fn test_disabled_access_log_declines() {
    let mut config = AppConfig::default();
    config.access_log.enabled = false;
    let table = register(&config, MANIFEST).unwrap();
    let show = table.named("users.show").unwrap();
    assert!(show.middlewares().is_empty());
}

#[test]
fn test_ambiguous_route_name_leaves_table_untouched() {
    let manifest = r#"
controllers:
  - class: UserController
    methods:
      - name: list
        mappings:
          - method: GET
            path: [/users, /people]
            name: users.list
"#;
    let metadata = metadata(manifest);
    let container = container(&AppConfig::default());
    let mut table = RouteTable::new();
    let err = AnnotationProcessor::new(&metadata, &container)
        .process(&mut table)
        .unwrap_err();

    assert!(matches!(
        err,
        RegistrationError::AmbiguousRouteName { ref name, .. } if name == "users.list"
    ));
    assert!(err
        .to_string()
        .contains("Cannot set route name 'users.list' when there are multiple routes for method UserController::list"));
    assert!(table.is_empty());
}

#[test]
fn test_unresolvable_controller_fails() {
    let manifest = "controllers:\n  - class: Missing\n";
    let metadata = metadata(manifest);
    let container = Container::new();
    let mut table = RouteTable::new();
    let err = AnnotationProcessor::new(&metadata, &container)
        .process(&mut table)
        .unwrap_err();
    assert!(matches!(err, RegistrationError::Resolve(_)));
}
