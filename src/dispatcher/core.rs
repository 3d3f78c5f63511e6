//! Dispatcher core module - request/response types and route execution.

use http::{Method, Version};
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;
use std::net::IpAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::middleware::{Middleware, Next};
use crate::router::{ParamVec, RouteTable};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage
///
/// Header names use `Arc<str>` so repeated names (`Content-Type`,
/// `Authorization`) are cheap to clone between request copies.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Request data handed to middleware and controllers
///
/// Only the pieces the pipeline needs are kept: the request line, query
/// parameters, headers, the raw body bytes and the peer address. Path
/// parameters are filled in by the [`Dispatcher`] once a route matched.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Path parameters extracted from the matched route pattern
    pub path_params: ParamVec,
    /// Query string parameters in the order they appeared
    pub query_params: ParamVec,
    /// HTTP headers, repeated names kept as separate entries
    pub headers: HeaderVec,
    /// Raw request body
    pub body: Vec<u8>,
    /// Socket peer address
    pub remote_addr: Option<IpAddr>,
    /// URI scheme, `http` unless a TLS terminator said otherwise
    pub scheme: String,
    /// `user[:password]` part of the request URI, if any
    pub user_info: Option<String>,
    /// Protocol version of the request line
    pub version: Version,
}

impl HandlerRequest {
    /// Build a request from a method and a request target (`/path?query`).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        let query_params = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            method,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            path_params: ParamVec::new(),
            query_params,
            headers: HeaderVec::new(),
            body: Vec::new(),
            remote_addr: None,
            scheme: "http".to_string(),
            user_info: None,
            version: Version::HTTP_11,
        }
    }

    /// Append a header (repeated names are allowed).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    #[must_use]
    pub fn with_user_info(mut self, user_info: impl Into<String>) -> Self {
        self.user_info = Some(user_info.into());
        self
    }

    /// Get a path parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get the first header with this name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a header joined with `", "`; empty when absent.
    #[must_use]
    pub fn header_line(&self, name: &str) -> String {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Look up a cookie in the `Cookie` header(s).
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("cookie"))
            .flat_map(|(_, v)| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// Host taken from the `Host` header.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.get_header("host")
    }

    /// Re-encoded query string, empty when there are no parameters.
    #[must_use]
    pub fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query_params.iter().map(|(k, v)| (k.as_ref(), v.as_str())))
            .finish()
    }

    /// Full request URI: `scheme://[user@]host/path?query` when the host is
    /// known, otherwise the origin-form `/path?query`.
    #[must_use]
    pub fn uri(&self) -> String {
        let mut uri = String::new();
        if let Some(host) = self.host() {
            uri.push_str(&self.scheme);
            uri.push_str("://");
            if let Some(user) = &self.user_info {
                uri.push_str(user);
                uri.push('@');
            }
            uri.push_str(host);
        }
        uri.push_str(&self.path);
        let query = self.query_string();
        if !query.is_empty() {
            uri.push('?');
            uri.push_str(&query);
        }
        uri
    }

    /// Protocol version as it appears after `HTTP/` in the request line.
    #[must_use]
    pub fn protocol_version(&self) -> &'static str {
        match self.version {
            Version::HTTP_09 => "0.9",
            Version::HTTP_10 => "1.0",
            Version::HTTP_2 => "2",
            Version::HTTP_3 => "3",
            _ => "1.1",
        }
    }
}

/// Response produced by a controller or a short-circuiting middleware
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// `302 Found` pointing at `location`
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("location"), location.into()));
        Self {
            status: 302,
            headers,
            body: Value::Null,
        }
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Size of the serialized body in bytes; a `null` body counts as empty.
    #[must_use]
    pub fn body_size(&self) -> usize {
        if self.body.is_null() {
            return 0;
        }
        serde_json::to_vec(&self.body).map(|b| b.len()).unwrap_or(0)
    }
}

/// Failure raised by a controller or by the dispatcher while running one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The controller does not expose the method a route is bound to
    UnknownMethod { controller: String, method: String },
    /// The handler failed with a message
    Failed(String),
    /// The handler panicked; the payload is rendered as text
    Panicked(String),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::UnknownMethod { controller, method } => {
                write!(f, "controller '{controller}' has no method '{method}'")
            }
            HandlerError::Failed(message) => write!(f, "handler failed: {message}"),
            HandlerError::Panicked(message) => write!(f, "handler panicked: {message}"),
        }
    }
}

impl std::error::Error for HandlerError {}

pub type HandlerResult = Result<HandlerResponse, HandlerError>;

/// A resolved controller instance that routes are bound to
///
/// A route stores the controller together with the name of the method the
/// route maps to; the dispatcher calls [`Controller::invoke`] with that name.
pub trait Controller: Send + Sync {
    fn invoke(&self, method: &str, req: &HandlerRequest) -> HandlerResult;
}

/// Runs matched routes through their middleware chain
///
/// Global middleware runs first, in the order it was added, followed by the
/// route's own chain as fixed at registration time.
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self {
            table,
            middlewares: Vec::new(),
        }
    }

    /// Add middleware that wraps every route
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    /// Dispatch a request to the matching route.
    ///
    /// Returns `None` when no route matches. Handler panics are caught and
    /// surfaced as [`HandlerError::Panicked`] after middleware has unwound.
    #[must_use]
    pub fn dispatch(&self, mut req: HandlerRequest) -> Option<HandlerResult> {
        let Some(matched) = self.table.route(&req.method, &req.path) else {
            debug!(method = %req.method, path = %req.path, "No route matched");
            return None;
        };
        req.path_params = matched.path_params;
        let route = matched.route;

        let chain: Vec<Arc<dyn Middleware>> = self
            .middlewares
            .iter()
            .chain(route.middlewares())
            .map(Arc::clone)
            .collect();
        debug!(
            method = %req.method,
            pattern = %route.pattern(),
            middleware_count = chain.len(),
            "Dispatching request"
        );

        let handler = route.handler();
        let endpoint = |r: &HandlerRequest| handler.call(r);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            Next::new(&chain, &endpoint).run(&req)
        }));

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    pattern = %route.pattern(),
                    handler = %handler.method(),
                    panic_message = %message,
                    "Handler panicked"
                );
                Err(HandlerError::Panicked(message))
            }
        };
        if let Err(e) = &result {
            info!(pattern = %route.pattern(), error = %e, "Request failed");
        }
        Some(result)
    }

    /// Like [`Dispatcher::dispatch`], rendering a missing route as `404`.
    #[must_use]
    pub fn dispatch_or_not_found(&self, req: HandlerRequest) -> HandlerResult {
        self.dispatch(req)
            .unwrap_or_else(|| Ok(HandlerResponse::error(404, "Not Found")))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
