//! Router core module - route storage, grouping and path matching.

use http::Method;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::dispatcher::{Controller, HandlerRequest, HandlerResult};
use crate::middleware::Middleware;

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage.
///
/// Param names use `Arc<str>` because they come from the route patterns
/// known at startup.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Handler reference: a resolved controller instance plus the method name
#[derive(Clone)]
pub struct RouteHandler {
    controller: Arc<dyn Controller>,
    method: String,
}

impl RouteHandler {
    #[must_use]
    pub fn new(controller: Arc<dyn Controller>, method: impl Into<String>) -> Self {
        Self {
            controller,
            method: method.into(),
        }
    }

    #[must_use]
    pub fn controller(&self) -> &Arc<dyn Controller> {
        &self.controller
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn call(&self, req: &HandlerRequest) -> HandlerResult {
        self.controller.invoke(&self.method, req)
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandler")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(Arc<str>),
}

fn compile_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            match segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
            {
                Some(name) => Segment::Param(Arc::from(name)),
                None => Segment::Literal(segment.to_string()),
            }
        })
        .collect()
}

/// A registered route
///
/// The middleware list is appended to only while the route is being
/// registered; once the table is shared the order is fixed.
pub struct Route {
    method: Method,
    pattern: String,
    group: Option<String>,
    handler: RouteHandler,
    middlewares: Vec<Arc<dyn Middleware>>,
    name: Option<String>,
    segments: Vec<Segment>,
}

impl Route {
    fn new(method: Method, pattern: String, group: Option<String>, handler: RouteHandler) -> Self {
        let segments = compile_pattern(&pattern);
        Self {
            method,
            pattern,
            group,
            handler,
            middlewares: Vec::new(),
            name: None,
            segments,
        }
    }

    /// Append a middleware; it runs after the ones added before it.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) -> &mut Self {
        self.middlewares.push(mw);
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full pattern including any group prefixes
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Prefix of the enclosing group, `None` for routes mapped directly
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    #[must_use]
    pub fn handler(&self) -> &RouteHandler {
        &self.handler
    }

    #[must_use]
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn match_path(&self, path: &str) -> Option<ParamVec> {
        let mut params = ParamVec::new();
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    // Invalid UTF-8 escapes are kept as sent
                    let value = urlencoding::decode(part)
                        .map_or_else(|_| part.to_string(), |v| v.into_owned());
                    params.push((Arc::clone(name), value));
                }
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("group", &self.group)
            .field("name", &self.name)
            .field("handler", &self.handler)
            .field(
                "middlewares",
                &self.middlewares.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Result of matching a request against the table
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    /// Path parameters extracted from the URL (e.g., `{id}` → `("id", "123")`)
    pub path_params: ParamVec,
}

/// Error returned by [`RouteTable::url_for`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    UnknownRoute { name: String },
    MissingParam { name: String, param: String },
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlError::UnknownRoute { name } => write!(f, "no route named '{name}'"),
            UrlError::MissingParam { name, param } => {
                write!(f, "route '{name}' requires parameter '{param}'")
            }
        }
    }
}

impl std::error::Error for UrlError {}

/// Registration surface shared by the top-level table and nested groups
pub trait RouteCollector {
    /// Register a route for `pattern`, relative to this collector's prefix.
    fn map(&mut self, method: Method, pattern: &str, handler: RouteHandler) -> &mut Route;

    /// Open a nested group; routes mapped into it get `prefix` prepended.
    fn group(&mut self, prefix: &str) -> RouteGroup<'_>;

    /// Open a group and run `register` inside it.
    fn group_with<T, E, F>(&mut self, prefix: &str, register: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&mut RouteGroup<'_>) -> Result<T, E>,
    {
        let mut group = self.group(prefix);
        register(&mut group)
    }
}

/// The route table
///
/// Routes are matched in registration order; the first route whose verb and
/// pattern match wins.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Look up a route by its name
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name() == Some(name))
    }

    /// First name that is used more than once across `self` and `other`.
    #[must_use]
    pub fn conflicting_name(&self, other: &RouteTable) -> Option<String> {
        let mut names = HashSet::new();
        self.routes
            .iter()
            .chain(other.routes.iter())
            .filter_map(Route::name)
            .find(|name| !names.insert(*name))
            .map(str::to_string)
    }

    /// Move every route of `other` to the end of this table.
    pub fn extend(&mut self, other: RouteTable) {
        self.routes.extend(other.routes);
    }

    /// Match a request method and path
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let found = self
            .routes
            .iter()
            .filter(|r| r.method() == method)
            .find_map(|r| r.match_path(path).map(|params| (r, params)));
        match found {
            Some((route, path_params)) => {
                debug!(
                    method = %method,
                    path = %path,
                    route_pattern = %route.pattern(),
                    path_params = ?path_params,
                    "Route matched"
                );
                Some(RouteMatch { route, path_params })
            }
            None => None,
        }
    }

    /// Build a path for a named route, substituting `{param}` placeholders.
    ///
    /// Values are percent-encoded as path segments (a space becomes `%20`).
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, UrlError> {
        let route = self.named(name).ok_or_else(|| UrlError::UnknownRoute {
            name: name.to_string(),
        })?;
        let mut url = String::new();
        for segment in &route.segments {
            url.push('/');
            match segment {
                Segment::Literal(lit) => url.push_str(lit),
                Segment::Param(param) => {
                    let value = params
                        .iter()
                        .find(|(k, _)| *k == param.as_ref())
                        .map(|(_, v)| *v)
                        .ok_or_else(|| UrlError::MissingParam {
                            name: name.to_string(),
                            param: param.to_string(),
                        })?;
                    url.push_str(&urlencoding::encode(value));
                }
            }
        }
        if url.is_empty() {
            url.push('/');
        }
        Ok(url)
    }

    fn push(&mut self, route: Route) -> &mut Route {
        info!(
            method = %route.method(),
            pattern = %route.pattern(),
            group = ?route.group(),
            "Route registered"
        );
        self.routes.push(route);
        let last = self.routes.len() - 1;
        &mut self.routes[last]
    }
}

impl RouteCollector for RouteTable {
    fn map(&mut self, method: Method, pattern: &str, handler: RouteHandler) -> &mut Route {
        self.push(Route::new(method, pattern.to_string(), None, handler))
    }

    fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup {
            table: self,
            prefix: prefix.to_string(),
        }
    }
}

/// A group of routes sharing a path prefix
pub struct RouteGroup<'a> {
    table: &'a mut RouteTable,
    prefix: String,
}

impl RouteGroup<'_> {
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl RouteCollector for RouteGroup<'_> {
    fn map(&mut self, method: Method, pattern: &str, handler: RouteHandler) -> &mut Route {
        let full = format!("{}{}", self.prefix, pattern);
        self.table
            .push(Route::new(method, full, Some(self.prefix.clone()), handler))
    }

    fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup {
            table: &mut *self.table,
            prefix: format!("{}{}", self.prefix, prefix),
        }
    }
}
