//! # Filter Module
//!
//! Filters are the declarative side of middleware: a controller or method
//! carries filter descriptors, and the registration pass turns each one into
//! at most one middleware per route.
//!
//! A filter's concrete type is its identity. When a method and its class both
//! declare the same filter type, only the method's descriptor is used.
//! Surviving filters are ordered by ascending [`Filter::priority`], then
//! materialized against the dependency resolver; a filter may decline by
//! returning `Ok(None)`.
//!
//! ## Built-in filters
//!
//! | kind         | type               | priority |
//! |--------------|--------------------|----------|
//! | `access_log` | [`AccessLogFilter`]| 10       |
//! | `login_only` | [`LoginOnly`]      | 50       |
//! | `csrf_token` | [`CsrfToken`]      | 100      |
//!
//! Manifests refer to filters by kind; [`FilterFactoryRegistry`] maps kinds
//! to constructors and can be extended with application filters.

mod builtin;
mod core;
mod factory;

pub use builtin::{AccessLogFilter, CsrfToken, LoginOnly};
pub use core::Filter;
pub use factory::{FilterFactory, FilterFactoryRegistry};
