use std::sync::Arc;

use crate::dispatcher::{HandlerRequest, HandlerResult};

/// A request/response transformer wrapped around the downstream handler
///
/// Implementations either call `next.run(req)` exactly once and return (or
/// adapt) its result, or short-circuit by returning their own response.
pub trait Middleware: Send + Sync {
    fn process(&self, req: &HandlerRequest, next: Next<'_>) -> HandlerResult;

    /// Name used when listing a route's chain.
    fn name(&self) -> &str {
        std::any::type_name_of_val(self)
    }
}

/// Terminal handler at the end of a chain
pub type Endpoint<'a> = dyn Fn(&HandlerRequest) -> HandlerResult + 'a;

/// The remainder of a middleware chain
///
/// Consumed by [`Next::run`], so a middleware can continue the chain at
/// most once.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    endpoint: &'a Endpoint<'a>,
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Middleware>], endpoint: &'a Endpoint<'a>) -> Self {
        Self { chain, endpoint }
    }

    /// Invoke the next middleware, or the endpoint once the chain is exhausted.
    pub fn run(self, req: &HandlerRequest) -> HandlerResult {
        match self.chain.split_first() {
            Some((head, rest)) => head.process(
                req,
                Next {
                    chain: rest,
                    endpoint: self.endpoint,
                },
            ),
            None => (self.endpoint)(req),
        }
    }

    /// Number of middleware still ahead of the endpoint.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }
}
