use dashmap::DashMap;
use http::Method;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use ulid::Ulid;

use super::{Middleware, Next};
use crate::config::CsrfConfig;
use crate::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};

/// Issued CSRF tokens keyed by session
pub trait CsrfTokenStore: Send + Sync {
    /// Create a fresh token for `session`.
    fn issue(&self, session: &str) -> String;

    fn validate(&self, session: &str, token: &str) -> bool;

    /// Invalidate a token; returns whether it existed.
    fn consume(&self, session: &str, token: &str) -> bool;
}

/// Process-local token store
#[derive(Debug, Clone, Default)]
pub struct InMemoryCsrfTokenStore {
    tokens: Arc<DashMap<String, HashSet<String>>>,
}

impl InMemoryCsrfTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions holding at least one token
    #[must_use]
    pub fn sessions(&self) -> usize {
        self.tokens.len()
    }
}

impl CsrfTokenStore for InMemoryCsrfTokenStore {
    fn issue(&self, session: &str) -> String {
        let token = Ulid::new().to_string();
        self.tokens
            .entry(session.to_string())
            .or_default()
            .insert(token.clone());
        token
    }

    fn validate(&self, session: &str, token: &str) -> bool {
        self.tokens
            .get(session)
            .is_some_and(|tokens| tokens.contains(token))
    }

    fn consume(&self, session: &str, token: &str) -> bool {
        let removed = self
            .tokens
            .get_mut(session)
            .is_some_and(|mut tokens| tokens.remove(token));
        self.tokens.remove_if(session, |_, tokens| tokens.is_empty());
        removed
    }
}

/// Rejects unsafe requests that do not carry a token issued for their session
pub struct CsrfTokenMiddleware {
    store: Arc<dyn CsrfTokenStore>,
    repeat_ok: bool,
    config: CsrfConfig,
}

impl CsrfTokenMiddleware {
    pub fn new(store: Arc<dyn CsrfTokenStore>, repeat_ok: bool, config: CsrfConfig) -> Self {
        Self {
            store,
            repeat_ok,
            config,
        }
    }

    fn token<'r>(&self, req: &'r HandlerRequest) -> Option<&'r str> {
        req.get_header(&self.config.header)
            .or_else(|| req.get_query_param(&self.config.field))
            .filter(|t| !t.is_empty())
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

impl Middleware for CsrfTokenMiddleware {
    fn process(&self, req: &HandlerRequest, next: Next<'_>) -> HandlerResult {
        if is_safe(&req.method) {
            return next.run(req);
        }
        let session = req.get_cookie(&self.config.session_cookie);
        let token = self.token(req);
        let (Some(session), Some(token)) = (session, token) else {
            debug!(path = %req.path, "CSRF token or session missing");
            return Ok(HandlerResponse::error(403, "Invalid CSRF token"));
        };
        // A single-use token is checked and removed in one step
        let accepted = if self.repeat_ok {
            self.store.validate(session, token)
        } else {
            self.store.consume(session, token)
        };
        if !accepted {
            warn!(path = %req.path, "CSRF token rejected");
            return Ok(HandlerResponse::error(403, "Invalid CSRF token"));
        }
        next.run(req)
    }

    fn name(&self) -> &str {
        "csrf_token"
    }
}
