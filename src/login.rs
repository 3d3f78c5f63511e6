//! Login URL construction for redirects to the sign-in page.

use crate::dispatcher::HandlerRequest;

/// Builds the URL an unauthenticated request is redirected to
pub trait LoginUrlBuilder: Send + Sync {
    fn build(&self, req: &HandlerRequest) -> String;
}

/// Appends the current request URI as a redirect parameter
///
/// With `redirect_param = Some("redirect")` a request for `/orders?page=2`
/// against login URL `/login` yields `/login?redirect=%2Forders%3Fpage%3D2`.
/// A login URL that already has a query string gets `&` instead of `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultLoginUrlBuilder {
    login_url: String,
    redirect_param: Option<String>,
}

impl DefaultLoginUrlBuilder {
    #[must_use]
    pub fn new(login_url: impl Into<String>, redirect_param: Option<String>) -> Self {
        Self {
            login_url: login_url.into(),
            redirect_param,
        }
    }
}

impl Default for DefaultLoginUrlBuilder {
    fn default() -> Self {
        Self::new("/login", Some("redirect".to_string()))
    }
}

impl LoginUrlBuilder for DefaultLoginUrlBuilder {
    fn build(&self, req: &HandlerRequest) -> String {
        let Some(param) = &self.redirect_param else {
            return self.login_url.clone();
        };
        let separator = if self.login_url.contains('?') { '&' } else { '?' };
        let target: String = url::form_urlencoded::byte_serialize(req.uri().as_bytes()).collect();
        format!("{}{}{}={}", self.login_url, separator, param, target)
    }
}
