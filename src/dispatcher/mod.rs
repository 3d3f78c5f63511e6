//! # Dispatcher Module
//!
//! Request/response types shared by every layer of the pipeline, the
//! [`Controller`] capability routes are bound to, and the [`Dispatcher`]
//! that executes a matched route.
//!
//! ## Request Flow
//!
//! 1. [`RouteTable::route`](crate::router::RouteTable::route) matches the
//!    request method and path
//! 2. Path parameters are copied onto the request
//! 3. Global middleware runs, then the route's chain in registration order
//! 4. The controller method bound to the route produces the response
//!
//! ## Error Handling
//!
//! - Missing routes return `None` (or `404` via `dispatch_or_not_found`)
//! - Controller failures propagate unchanged as [`HandlerError`]
//! - Panics are caught after middleware has unwound and surface as
//!   [`HandlerError::Panicked`]

mod core;

pub use core::{
    Controller, Dispatcher, HandlerError, HandlerRequest, HandlerResponse, HandlerResult,
    HeaderVec, MAX_INLINE_HEADERS,
};
