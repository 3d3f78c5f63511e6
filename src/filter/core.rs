use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::container::{ResolveError, Resolver};
use crate::middleware::Middleware;

/// A cross-cutting concern that turns into route middleware
///
/// The concrete type is the concern's identity: two filters of the same
/// type are the same concern, and a method-level one replaces a class-level
/// one when a route's chain is built.
pub trait Filter: Any + Send + Sync + fmt::Debug {
    /// Execution order; lower values run earlier.
    fn priority(&self) -> i32;

    /// Build the middleware for one route.
    ///
    /// `Ok(None)` means the filter declined (for example because it is
    /// disabled by configuration) and nothing is attached.
    fn materialize(
        &self,
        resolver: &dyn Resolver,
    ) -> Result<Option<Arc<dyn Middleware>>, ResolveError>;

    /// Deduplication key.
    fn concern(&self) -> TypeId {
        Any::type_id(self)
    }
}
