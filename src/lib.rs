//! # routeforge
//!
//! **routeforge** turns declarative controller metadata into a route table and
//! composes, per route, an ordered chain of cross-cutting middleware derived
//! from the same metadata.
//!
//! ## Overview
//!
//! Controllers are named classes whose methods carry request mappings and
//! filter annotations. A single registration pass reads that metadata,
//! resolves each controller once, maps one route per pattern, and attaches
//! the middleware built from the method's and class's filters. The pass is
//! deterministic and all-or-nothing: on any configuration error the target
//! table is left untouched.
//!
//! ## Architecture
//!
//! - **[`metadata`]** - Controller/method annotations, the [`MetadataStore`]
//!   lookup and the YAML/JSON controller manifest loader
//! - **[`filter`]** - Filter descriptors (concern identity, priority,
//!   materialization) and the built-in `csrf_token`, `login_only` and
//!   `access_log` filters
//! - **[`registration`]** - Annotation processor, route registrar and
//!   middleware chain builder
//! - **[`router`]** - Route table, groups, path matching and named URLs
//! - **[`dispatcher`]** - Request/response types and chain execution
//! - **[`middleware`]** - The middleware capability plus access logging,
//!   CSRF token checks and login redirects
//! - **[`container`]** - Dependency resolution for controllers and services
//! - **[`config`]** / **[`logging`]** - Application settings and the tracing
//!   subscriber
//!
//! ### Registration Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant App
//!     participant Proc as AnnotationProcessor
//!     participant Store as MetadataStore
//!     participant Reg as RouteRegistrar
//!     participant Res as Resolver
//!     participant Chain as ChainBuilder
//!     participant Table as RouteTable
//!
//!     App->>Proc: process(&mut table)
//!     loop each discovered class (first occurrence only)
//!         Proc->>Store: class_annotation(class, UrlPrefix)
//!         Proc->>Reg: add_mapping(collector or group, class)
//!         Reg->>Res: controller(class)
//!         loop each public instance method
//!             Reg->>Store: method_annotations(method)
//!             loop each mapping x pattern
//!                 Reg->>Chain: build_chain(method)
//!                 Chain->>Store: method + class filters
//!                 Chain->>Res: filter.materialize(resolver)
//!                 Chain-->>Reg: Vec<Arc<dyn Middleware>>
//!                 Reg->>Table: map(verb, pattern, handler)
//!             end
//!         end
//!     end
//!     Proc->>Table: merge staged routes
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use routeforge::config::AppConfig;
//! use routeforge::container::Container;
//! use routeforge::dispatcher::{Dispatcher, HandlerRequest};
//! use routeforge::filter::FilterFactoryRegistry;
//! use routeforge::metadata::load_manifest;
//! use routeforge::registration::AnnotationProcessor;
//! use routeforge::router::RouteTable;
//! use std::sync::Arc;
//!
//! let config = AppConfig::load("app.yaml".as_ref())?.with_env_overrides();
//! let metadata = load_manifest("controllers.yaml".as_ref(), &FilterFactoryRegistry::with_builtins())?;
//!
//! let mut container = Container::new();
//! container.insert_controller("UserController", Arc::new(UserController::default()));
//! config.register_services(&mut container);
//!
//! let mut table = RouteTable::new();
//! AnnotationProcessor::new(&metadata, &container)
//!     .with_context_url(config.context_url.clone())
//!     .process(&mut table)?;
//!
//! let dispatcher = Dispatcher::new(Arc::new(table));
//! let response = dispatcher.dispatch_or_not_found(HandlerRequest::new(http::Method::GET, "/users"));
//! ```

pub mod cli;
pub mod config;
pub mod container;
pub mod dispatcher;
pub mod echo;
pub mod filter;
pub mod logging;
pub mod login;
pub mod metadata;
pub mod middleware;
pub mod registration;
pub mod router;

pub use container::{Container, ResolveError, Resolver};
pub use dispatcher::{Controller, Dispatcher, HandlerRequest, HandlerResponse};
pub use filter::Filter;
pub use metadata::{MetadataRegistry, MetadataStore};
pub use middleware::Middleware;
pub use registration::{AnnotationProcessor, RegistrationError};
pub use router::RouteTable;
