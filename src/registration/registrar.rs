use std::sync::Arc;
use tracing::debug;

use super::chain::ChainBuilder;
use super::error::RegistrationError;
use crate::container::Resolver;
use crate::metadata::{MetadataStore, RequestMapping};
use crate::router::{RouteCollector, RouteHandler};

/// Registers the routes of one controller class
pub struct RouteRegistrar<'a> {
    store: &'a dyn MetadataStore,
    resolver: &'a dyn Resolver,
}

impl<'a> RouteRegistrar<'a> {
    pub fn new(store: &'a dyn MetadataStore, resolver: &'a dyn Resolver) -> Self {
        Self { store, resolver }
    }

    /// Map every routable method of `class` into `collector`.
    ///
    /// The controller is resolved once, before any method is inspected, and
    /// shared by all of its routes. Returns the number of routes mapped.
    pub fn add_mapping(
        &self,
        collector: &mut dyn RouteCollector,
        class: &str,
    ) -> Result<usize, RegistrationError> {
        let controller = self.resolver.controller(class)?;
        let chains = ChainBuilder::new(self.store, self.resolver);
        let mut mapped = 0;

        for method in self.store.methods(class)? {
            if !method.is_routable() {
                debug!(method = %method, "Skipping non-public or static method");
                continue;
            }
            let mappings: Vec<RequestMapping> = self
                .store
                .method_annotations(&method)?
                .iter()
                .filter_map(|a| a.as_request_mapping().cloned())
                .collect();

            for mapping in mappings {
                if let Some(name) = &mapping.name {
                    if mapping.patterns.is_many() {
                        return Err(RegistrationError::AmbiguousRouteName {
                            class: self.store.declaring_class(&method).to_string(),
                            method: method.name.clone(),
                            name: name.clone(),
                        });
                    }
                }
                for pattern in mapping.patterns.iter() {
                    let chain = chains.build_chain(&method)?;
                    let handler = RouteHandler::new(Arc::clone(&controller), method.name.as_str());
                    let route = collector.map(mapping.method.clone(), pattern, handler);
                    for middleware in chain {
                        route.add_middleware(middleware);
                    }
                    if let Some(name) = &mapping.name {
                        route.set_name(name.as_str());
                    }
                    mapped += 1;
                }
            }
        }
        Ok(mapped)
    }
}
