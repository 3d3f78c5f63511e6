//! # Container Module
//!
//! Dependency resolution for controllers and for the services filter
//! factories need while materializing middleware.
//!
//! [`Resolver`] is the capability the registration pass consumes;
//! [`Container`] is a plain in-process implementation of it. Services are
//! stored type-erased and recovered with [`resolve`]:
//!
//! ```rust,ignore
//! use routeforge::container::{resolve, Container};
//!
//! let mut container = Container::new();
//! container.insert_service("greeting", String::from("hello"));
//! let greeting = resolve::<String>(&container, "greeting")?;
//! ```
//!
//! Trait-object services are stored as `Arc<dyn Trait>` values, so they are
//! recovered with `resolve::<Arc<dyn Trait>>`.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::dispatcher::Controller;

/// Error raised when a controller or service cannot be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Nothing is registered under this identifier
    NotFound { id: String },
    /// A service exists but has a different type than requested
    TypeMismatch { id: String, expected: &'static str },
    /// A factory ran and failed
    Factory { id: String, message: String },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound { id } => write!(f, "no entry registered for '{id}'"),
            ResolveError::TypeMismatch { id, expected } => {
                write!(f, "entry '{id}' is not of type {expected}")
            }
            ResolveError::Factory { id, message } => {
                write!(f, "factory for '{id}' failed: {message}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Shared, type-erased service instance
pub type Service = Arc<dyn Any + Send + Sync>;

/// Dependency resolver consumed by registration and filter factories
pub trait Resolver: Send + Sync {
    /// Produce the controller instance for a class name.
    fn controller(&self, class: &str) -> Result<Arc<dyn Controller>, ResolveError>;

    /// Look up a named service.
    fn service(&self, id: &str) -> Result<Service, ResolveError>;
}

/// Resolve a service and downcast it to `T`.
pub fn resolve<T: Any + Send + Sync>(
    resolver: &dyn Resolver,
    id: &str,
) -> Result<Arc<T>, ResolveError> {
    resolver
        .service(id)?
        .downcast::<T>()
        .map_err(|_| ResolveError::TypeMismatch {
            id: id.to_string(),
            expected: type_name::<T>(),
        })
}

/// Like [`resolve`], but a missing entry yields `Ok(None)`.
pub fn resolve_optional<T: Any + Send + Sync>(
    resolver: &dyn Resolver,
    id: &str,
) -> Result<Option<Arc<T>>, ResolveError> {
    match resolve::<T>(resolver, id) {
        Ok(value) => Ok(Some(value)),
        Err(ResolveError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Builds a controller instance; receives the container for its own lookups
pub type ControllerFactory =
    Arc<dyn Fn(&Container) -> Result<Arc<dyn Controller>, ResolveError> + Send + Sync>;

/// Builds a controller for any class name without an explicit registration
pub type FallbackFactory = Arc<dyn Fn(&str) -> Arc<dyn Controller> + Send + Sync>;

/// In-process resolver holding controller factories and named services
#[derive(Default, Clone)]
pub struct Container {
    controllers: HashMap<String, ControllerFactory>,
    fallback: Option<FallbackFactory>,
    services: HashMap<String, Service>,
}

impl Container {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory invoked every time the class is resolved.
    pub fn register_controller<F>(&mut self, class: &str, factory: F)
    where
        F: Fn(&Container) -> Result<Arc<dyn Controller>, ResolveError> + Send + Sync + 'static,
    {
        self.controllers.insert(class.to_string(), Arc::new(factory));
    }

    /// Register an existing controller instance.
    pub fn insert_controller(&mut self, class: &str, controller: Arc<dyn Controller>) {
        self.register_controller(class, move |_| Ok(Arc::clone(&controller)));
    }

    /// Factory used for classes that have no explicit registration.
    pub fn set_fallback_controller<F>(&mut self, factory: F)
    where
        F: Fn(&str) -> Arc<dyn Controller> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(factory));
    }

    pub fn insert_service<T: Any + Send + Sync>(&mut self, id: &str, value: T) {
        self.services.insert(id.to_string(), Arc::new(value));
    }

    #[must_use]
    pub fn has_service(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }
}

impl Resolver for Container {
    fn controller(&self, class: &str) -> Result<Arc<dyn Controller>, ResolveError> {
        if let Some(factory) = self.controllers.get(class) {
            debug!(class = %class, "Resolving controller");
            return factory(self);
        }
        match &self.fallback {
            Some(fallback) => {
                debug!(class = %class, "Resolving controller through fallback");
                Ok(fallback(class))
            }
            None => Err(ResolveError::NotFound {
                id: class.to_string(),
            }),
        }
    }

    fn service(&self, id: &str) -> Result<Service, ResolveError> {
        self.services
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| ResolveError::NotFound { id: id.to_string() })
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("controllers", &self.controllers.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}
