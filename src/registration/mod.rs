//! # Registration Module
//!
//! The startup pass that turns controller metadata into routes.
//!
//! ## Flow
//!
//! 1. [`AnnotationProcessor::process`] walks the discovered controllers,
//!    skipping classes it has already handled, and computes each class's
//!    prefix (context URL followed by the class prefix)
//! 2. [`RouteRegistrar::add_mapping`] resolves the controller once and maps
//!    one route per (mapping, pattern) of each public instance method,
//!    inside a group when the prefix is non-empty
//! 3. [`ChainBuilder::build_chain`] merges method and class filters by
//!    concern, orders them by priority and materializes the middleware
//!    attached to each route
//!
//! ## Errors
//!
//! Everything here is fatal configuration: a route name on a multi-pattern
//! mapping, a route name used twice, unreadable metadata, or a controller
//! or filter dependency the resolver cannot produce. On error the target
//! table is left as it was.
//!
//! ## Example
//!
//! ```rust,ignore
//! use routeforge::registration::AnnotationProcessor;
//! use routeforge::router::RouteTable;
//!
//! let mut table = RouteTable::new();
//! AnnotationProcessor::new(&metadata, &container)
//!     .with_context_url(Some("/api".into()))
//!     .process(&mut table)?;
//! ```

mod chain;
mod error;
mod processor;
mod registrar;

pub use chain::ChainBuilder;
pub use error::RegistrationError;
pub use processor::AnnotationProcessor;
pub use registrar::RouteRegistrar;
