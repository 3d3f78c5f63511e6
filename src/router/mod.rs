//! # Router Module
//!
//! The route table that registration populates and the dispatcher reads.
//!
//! ## Overview
//!
//! - [`RouteCollector`] is the registration surface: `map` a verb and
//!   pattern to a handler, or open a nested [`RouteGroup`] that prepends a
//!   prefix to everything mapped inside it
//! - [`Route`] carries the handler reference, its ordered middleware chain
//!   and an optional name
//! - [`RouteTable::route`] matches a request; `{name}` segments capture
//!   path parameters
//!
//! ## Example
//!
//! ```rust,ignore
//! use routeforge::router::{RouteCollector, RouteHandler, RouteTable};
//! use http::Method;
//!
//! let mut table = RouteTable::new();
//! table.group_with("/api", |group| {
//!     group
//!         .map(Method::GET, "/users/{id}", RouteHandler::new(controller, "show"))
//!         .set_name("users.show");
//!     Ok::<_, ()>(())
//! })?;
//!
//! let matched = table.route(&Method::GET, "/api/users/42").unwrap();
//! assert_eq!(matched.path_params[0].1, "42");
//! ```
//!
//! Empty segments are ignored when matching, so `/api/users` and
//! `/api/users/` resolve to the same route.

mod core;

pub use core::{
    ParamVec, Route, RouteCollector, RouteGroup, RouteHandler, RouteMatch, RouteTable, UrlError,
    MAX_INLINE_PARAMS,
};
