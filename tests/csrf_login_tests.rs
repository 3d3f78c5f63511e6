//! CSRF and login filters wired through a manifest and dispatched

mod common;

use common::controllers::UserController;
use http::Method;
use routeforge::config::{AppConfig, CSRF_STORE, LOGIN_URL_BUILDER};
use routeforge::container::Container;
use routeforge::dispatcher::{Dispatcher, HandlerRequest};
use routeforge::filter::FilterFactoryRegistry;
use routeforge::login::LoginUrlBuilder;
use routeforge::metadata::{parse_manifest, ManifestFormat};
use routeforge::middleware::{CsrfTokenStore, InMemoryCsrfTokenStore};
use routeforge::registration::AnnotationProcessor;
use routeforge::router::RouteTable;
use std::sync::{Arc, Barrier};

const MANIFEST: &str = r#"
{
  "controllers": [
    {
      "class": "UserController",
      "prefix": "/users",
      "filters": [{ "kind": "login_only" }],
      "methods": [
        {
          "name": "list",
          "mappings": [{ "method": "GET", "path": "/" }],
          "filters": [{ "kind": "csrf_token" }]
        },
        {
          "name": "create",
          "mappings": [{ "method": "POST", "path": "/" }],
          "filters": [{ "kind": "csrf_token" }]
        },
        {
          "name": "show",
          "mappings": [{ "method": "PUT", "path": "/{id}" }],
          "filters": [{ "kind": "csrf_token", "repeat_ok": false }]
        }
      ]
    }
  ]
}
"#;

struct Fixture {
    dispatcher: Dispatcher,
    store: Arc<InMemoryCsrfTokenStore>,
}

fn fixture(container: Container) -> Fixture {
    fixture_with(container, AppConfig::default())
}

fn fixture_with(container: Container, config: AppConfig) -> Fixture {
    let store = Arc::new(InMemoryCsrfTokenStore::new());
    let shared: Arc<dyn CsrfTokenStore> = store.clone();
    Fixture {
        dispatcher: dispatcher(container, config, shared),
        store,
    }
}

fn dispatcher(
    mut container: Container,
    config: AppConfig,
    store: Arc<dyn CsrfTokenStore>,
) -> Dispatcher {
    container.insert_service(CSRF_STORE, store);
    container.insert_controller("UserController", Arc::new(UserController));
    config.register_services(&mut container);

    let metadata = parse_manifest(
        MANIFEST,
        ManifestFormat::Json,
        &FilterFactoryRegistry::with_builtins(),
    )
    .unwrap();
    let mut table = RouteTable::new();
    AnnotationProcessor::new(&metadata, &container)
        .process(&mut table)
        .unwrap();
    Dispatcher::new(Arc::new(table))
}

fn with_session(req: HandlerRequest) -> HandlerRequest {
    req.with_header("cookie", "session=s1")
}

#[test]
fn test_chain_order_follows_priority() {
    let f = fixture(Container::new());
    for route in f.dispatcher.routes().routes() {
        let names: Vec<&str> = route.middlewares().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["login_only", "csrf_token"]);
    }
}

#[test]
fn test_anonymous_request_redirects_to_login() {
    let f = fixture(Container::new());
    let resp = f
        .dispatcher
        .dispatch_or_not_found(HandlerRequest::new(Method::POST, "/users"))
        .unwrap();
    assert_eq!(resp.status, 302);
    assert_eq!(
        resp.get_header("location"),
        Some("/login?redirect=%2Fusers")
    );
}

#[test]
fn test_login_url_from_config() {
    let mut config = AppConfig::default();
    config.login.url = "/auth/sign-in?lang=en".to_string();
    config.login.redirect_param = Some("next".to_string());
    let f = fixture_with(Container::new(), config);

    let req = HandlerRequest::new(Method::GET, "/users").with_header("host", "example.com");
    let resp = f.dispatcher.dispatch_or_not_found(req).unwrap();
    assert_eq!(
        resp.get_header("location"),
        Some("/auth/sign-in?lang=en&next=http%3A%2F%2Fexample.com%2Fusers")
    );
}

#[test]
fn test_custom_login_url_builder() {
    struct Fixed;
    impl LoginUrlBuilder for Fixed {
        fn build(&self, req: &HandlerRequest) -> String {
            format!("https://sso.example.com/?from={}", req.path)
        }
    }

    let mut container = Container::new();
    let builder: Arc<dyn LoginUrlBuilder> = Arc::new(Fixed);
    container.insert_service(LOGIN_URL_BUILDER, builder);
    let f = fixture(container);

    let resp = f
        .dispatcher
        .dispatch_or_not_found(HandlerRequest::new(Method::GET, "/users"))
        .unwrap();
    assert_eq!(
        resp.get_header("location"),
        Some("https://sso.example.com/?from=/users")
    );
}

#[test]
fn test_safe_methods_skip_csrf_check() {
    let f = fixture(Container::new());
    let resp = f
        .dispatcher
        .dispatch_or_not_found(with_session(HandlerRequest::new(Method::GET, "/users")))
        .unwrap();
    assert_eq!(resp.status, 200);
}

#[test]
fn test_missing_token_is_forbidden() {
    let f = fixture(Container::new());
    let resp = f
        .dispatcher
        .dispatch_or_not_found(with_session(HandlerRequest::new(Method::POST, "/users")))
        .unwrap();
    assert_eq!(resp.status, 403);
    assert_eq!(resp.body["error"], "Invalid CSRF token");
}

#[test]
fn test_token_from_header_or_query() {
    let f = fixture(Container::new());
    let token = f.store.issue("s1");

    let req = with_session(HandlerRequest::new(Method::POST, "/users"))
        .with_header("X-CSRF-Token", token.as_str());
    let resp = f.dispatcher.dispatch_or_not_found(req).unwrap();
    assert_eq!(resp.status, 201);

    // repeat_ok defaults to true, so the same token works again
    let target = format!("/users?_token={token}");
    let req = with_session(HandlerRequest::new(Method::POST, &target));
    let resp = f.dispatcher.dispatch_or_not_found(req).unwrap();
    assert_eq!(resp.status, 201);
}

#[test]
fn test_token_for_other_session_is_rejected() {
    let f = fixture(Container::new());
    let token = f.store.issue("someone-else");
    let req = with_session(HandlerRequest::new(Method::POST, "/users"))
        .with_header("x-csrf-token", token.as_str());
    let resp = f.dispatcher.dispatch_or_not_found(req).unwrap();
    assert_eq!(resp.status, 403);
}

#[test]
fn test_single_use_token_is_consumed() {
    let f = fixture(Container::new());
    let token = f.store.issue("s1");
    let request = || {
        with_session(HandlerRequest::new(Method::PUT, "/users/9"))
            .with_header("x-csrf-token", token.as_str())
    };

    let first = f.dispatcher.dispatch_or_not_found(request()).unwrap();
    assert_eq!(first.status, 200);
    assert_eq!(first.body["id"], "9");
    assert!(!f.store.validate("s1", &token));
    assert_eq!(f.store.sessions(), 0);

    let second = f.dispatcher.dispatch_or_not_found(request()).unwrap();
    assert_eq!(second.status, 403);
}

/// Holds every `consume` call until both requests have reached it
struct LockstepStore {
    inner: InMemoryCsrfTokenStore,
    barrier: Barrier,
}

impl CsrfTokenStore for LockstepStore {
    fn issue(&self, session: &str) -> String {
        self.inner.issue(session)
    }

    fn validate(&self, session: &str, token: &str) -> bool {
        self.inner.validate(session, token)
    }

    fn consume(&self, session: &str, token: &str) -> bool {
        self.barrier.wait();
        self.inner.consume(session, token)
    }
}

#[test]
fn test_single_use_token_accepted_once_under_concurrency() {
    let store = Arc::new(LockstepStore {
        inner: InMemoryCsrfTokenStore::new(),
        barrier: Barrier::new(2),
    });
    let token = store.issue("s1");
    let shared: Arc<dyn CsrfTokenStore> = store.clone();
    let d = dispatcher(Container::new(), AppConfig::default(), shared);

    let statuses: Vec<u16> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    let req = with_session(HandlerRequest::new(Method::PUT, "/users/9"))
                        .with_header("x-csrf-token", token.as_str());
                    d.dispatch_or_not_found(req).unwrap().status
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut sorted = statuses;
    sorted.sort_unstable();
    assert_eq!(sorted, vec![200, 403]);
    assert!(!store.validate("s1", &token));
}
