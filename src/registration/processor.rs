use std::collections::HashSet;
use tracing::{debug, info};

use super::error::RegistrationError;
use super::registrar::RouteRegistrar;
use crate::container::Resolver;
use crate::metadata::{AnnotationKind, MetadataStore};
use crate::router::{RouteCollector, RouteTable};

/// Builds the route table from every discovered controller
pub struct AnnotationProcessor<'a> {
    store: &'a dyn MetadataStore,
    resolver: &'a dyn Resolver,
    context_url: Option<String>,
}

impl<'a> AnnotationProcessor<'a> {
    pub fn new(store: &'a dyn MetadataStore, resolver: &'a dyn Resolver) -> Self {
        Self {
            store,
            resolver,
            context_url: None,
        }
    }

    /// Prefix applied in front of every controller's own prefix.
    #[must_use]
    pub fn with_context_url(mut self, context_url: Option<String>) -> Self {
        self.context_url = context_url;
        self
    }

    /// Register all controllers into `table`.
    ///
    /// Each class is processed once, in discovery order. Routes are staged
    /// and only merged into `table` when every controller registered and no
    /// route name is taken twice. Returns the number of routes added.
    pub fn process(&self, table: &mut RouteTable) -> Result<usize, RegistrationError> {
        let registrar = RouteRegistrar::new(self.store, self.resolver);
        let mut staging = RouteTable::new();
        let mut seen = HashSet::new();

        for class in self.store.controllers() {
            if !seen.insert(class.clone()) {
                debug!(class = %class, "Controller already processed");
                continue;
            }
            let mut prefix = self.context_url.clone().unwrap_or_default();
            if let Some(annotation) = self
                .store
                .class_annotation(&class, AnnotationKind::UrlPrefix)?
            {
                prefix.push_str(annotation.as_url_prefix().unwrap_or_default());
            }

            let routes = if prefix.is_empty() {
                registrar.add_mapping(&mut staging, &class)?
            } else {
                staging.group_with(&prefix, |group| registrar.add_mapping(group, &class))?
            };
            info!(class = %class, prefix = %prefix, routes, "Controller registered");
        }

        if let Some(name) = table.conflicting_name(&staging) {
            return Err(RegistrationError::DuplicateRouteName { name });
        }
        let added = staging.len();
        table.extend(staging);
        info!(routes = added, total = table.len(), "Route registration complete");
        Ok(added)
    }
}
