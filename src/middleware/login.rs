use std::sync::Arc;
use tracing::debug;

use super::{Middleware, Next};
use crate::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
use crate::login::LoginUrlBuilder;

/// Redirects requests without a session cookie to the login page
pub struct LoginOnlyMiddleware {
    url_builder: Arc<dyn LoginUrlBuilder>,
    session_cookie: String,
}

impl LoginOnlyMiddleware {
    pub fn new(url_builder: Arc<dyn LoginUrlBuilder>, session_cookie: impl Into<String>) -> Self {
        Self {
            url_builder,
            session_cookie: session_cookie.into(),
        }
    }
}

impl Middleware for LoginOnlyMiddleware {
    fn process(&self, req: &HandlerRequest, next: Next<'_>) -> HandlerResult {
        match req.get_cookie(&self.session_cookie) {
            Some(session) if !session.is_empty() => next.run(req),
            _ => {
                let location = self.url_builder.build(req);
                debug!(path = %req.path, location = %location, "Redirecting to login");
                Ok(HandlerResponse::redirect(location))
            }
        }
    }

    fn name(&self) -> &str {
        "login_only"
    }
}
