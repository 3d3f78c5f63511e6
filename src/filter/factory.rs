use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::builtin::{AccessLogFilter, CsrfToken, LoginOnly};
use super::Filter;
use crate::metadata::MetadataError;

/// Builds a filter from the options of a manifest entry
pub type FilterFactory =
    Arc<dyn Fn(Map<String, Value>) -> Result<Arc<dyn Filter>, String> + Send + Sync>;

/// Filter constructors keyed by the `kind` used in controller manifests
#[derive(Clone, Default)]
pub struct FilterFactoryRegistry {
    factories: HashMap<String, FilterFactory>,
}

impl FilterFactoryRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `csrf_token`, `login_only` and `access_log`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_deserialize::<CsrfToken>("csrf_token");
        registry.register_deserialize::<LoginOnly>("login_only");
        registry.register_deserialize::<AccessLogFilter>("access_log");
        registry
    }

    pub fn register<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(Map<String, Value>) -> Result<Arc<dyn Filter>, String> + Send + Sync + 'static,
    {
        self.factories.insert(kind.to_string(), Arc::new(factory));
    }

    /// Register a filter type whose options deserialize straight into it.
    pub fn register_deserialize<T>(&mut self, kind: &str)
    where
        T: Filter + DeserializeOwned,
    {
        self.register(kind, |options| {
            serde_json::from_value::<T>(Value::Object(options))
                .map(|f| Arc::new(f) as Arc<dyn Filter>)
                .map_err(|e| e.to_string())
        });
    }

    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Build the filter for `kind`; `location` names the manifest entry in errors.
    pub fn build(
        &self,
        kind: &str,
        options: Map<String, Value>,
        location: &str,
    ) -> Result<Arc<dyn Filter>, MetadataError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| MetadataError::UnknownFilter {
                location: location.to_string(),
                kind: kind.to_string(),
            })?;
        factory(options).map_err(|message| MetadataError::InvalidFilter {
            location: location.to_string(),
            kind: kind.to_string(),
            message,
        })
    }
}

impl fmt::Debug for FilterFactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("FilterFactoryRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
