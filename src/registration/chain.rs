use std::any::TypeId;
use std::sync::Arc;
use tracing::debug;

use super::error::RegistrationError;
use crate::container::Resolver;
use crate::filter::Filter;
use crate::metadata::{MetadataError, MetadataStore, MethodRef};
use crate::middleware::Middleware;

/// Turns the filters declared for a method into its middleware chain
pub struct ChainBuilder<'a> {
    store: &'a dyn MetadataStore,
    resolver: &'a dyn Resolver,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(store: &'a dyn MetadataStore, resolver: &'a dyn Resolver) -> Self {
        Self { store, resolver }
    }

    /// Effective filters of `method`, in execution order.
    ///
    /// Method-level filters come first, keyed by concern; a later duplicate
    /// replaces an earlier one in place. Class-level filters are added only
    /// for concerns not seen yet. The result is stably sorted by priority,
    /// so equal priorities keep method-before-class order.
    pub fn filters(&self, method: &MethodRef) -> Result<Vec<Arc<dyn Filter>>, MetadataError> {
        let mut keyed: Vec<(TypeId, Arc<dyn Filter>)> = Vec::new();
        for annotation in self.store.method_annotations(method)? {
            let Some(filter) = annotation.as_filter() else {
                continue;
            };
            let concern = filter.concern();
            match keyed.iter_mut().find(|(k, _)| *k == concern) {
                Some(slot) => slot.1 = Arc::clone(filter),
                None => keyed.push((concern, Arc::clone(filter))),
            }
        }

        let class = self.store.declaring_class(method);
        for annotation in self.store.class_annotations(class)? {
            let Some(filter) = annotation.as_filter() else {
                continue;
            };
            let concern = filter.concern();
            if !keyed.iter().any(|(k, _)| *k == concern) {
                keyed.push((concern, Arc::clone(filter)));
            }
        }

        let mut filters: Vec<Arc<dyn Filter>> = keyed.into_iter().map(|(_, f)| f).collect();
        filters.sort_by_key(|f| f.priority());
        Ok(filters)
    }

    /// Materialize the chain for one route bound to `method`.
    pub fn build_chain(
        &self,
        method: &MethodRef,
    ) -> Result<Vec<Arc<dyn Middleware>>, RegistrationError> {
        let filters = self.filters(method)?;
        let mut chain = Vec::with_capacity(filters.len());
        for filter in filters {
            match filter.materialize(self.resolver)? {
                Some(middleware) => {
                    debug!(
                        method = %method,
                        filter = ?filter,
                        priority = filter.priority(),
                        "Filter materialized"
                    );
                    chain.push(middleware);
                }
                None => debug!(method = %method, filter = ?filter, "Filter declined"),
            }
        }
        Ok(chain)
    }
}
