use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::Filter;
use crate::config::{
    AccessLogConfig, CsrfConfig, ACCESS_LOG_CONFIG, CSRF_CONFIG, CSRF_STORE, LOGIN_URL_BUILDER,
};
use crate::container::{resolve_optional, ResolveError, Resolver};
use crate::login::{DefaultLoginUrlBuilder, LoginUrlBuilder};
use crate::middleware::{
    AccessLog, CsrfTokenMiddleware, CsrfTokenStore, LoginOnlyMiddleware, Middleware,
};

/// Requires a valid CSRF token on state-changing requests
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsrfToken {
    /// Keep the token valid after it was accepted once
    pub repeat_ok: bool,
    pub priority: i32,
}

impl Default for CsrfToken {
    fn default() -> Self {
        Self {
            repeat_ok: true,
            priority: 100,
        }
    }
}

impl Filter for CsrfToken {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn materialize(
        &self,
        resolver: &dyn Resolver,
    ) -> Result<Option<Arc<dyn Middleware>>, ResolveError> {
        let Some(store) = resolve_optional::<Arc<dyn CsrfTokenStore>>(resolver, CSRF_STORE)? else {
            debug!("No CSRF token store registered, skipping csrf_token filter");
            return Ok(None);
        };
        let config = resolve_optional::<CsrfConfig>(resolver, CSRF_CONFIG)?
            .map(|c| c.as_ref().clone())
            .unwrap_or_default();
        Ok(Some(Arc::new(CsrfTokenMiddleware::new(
            Arc::clone(&*store),
            self.repeat_ok,
            config,
        ))))
    }
}

/// Redirects anonymous requests to the login page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginOnly {
    pub session_cookie: String,
    pub priority: i32,
}

impl Default for LoginOnly {
    fn default() -> Self {
        Self {
            session_cookie: "session".to_string(),
            priority: 50,
        }
    }
}

impl Filter for LoginOnly {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn materialize(
        &self,
        resolver: &dyn Resolver,
    ) -> Result<Option<Arc<dyn Middleware>>, ResolveError> {
        let builder: Arc<dyn LoginUrlBuilder> =
            match resolve_optional::<Arc<dyn LoginUrlBuilder>>(resolver, LOGIN_URL_BUILDER)? {
                Some(builder) => Arc::clone(&*builder),
                None => Arc::new(DefaultLoginUrlBuilder::default()),
            };
        Ok(Some(Arc::new(LoginOnlyMiddleware::new(
            builder,
            self.session_cookie.as_str(),
        ))))
    }
}

/// Logs every request passing through the route
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessLogFilter {
    pub enabled: bool,
    pub priority: i32,
}

impl Default for AccessLogFilter {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 10,
        }
    }
}

impl Filter for AccessLogFilter {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn materialize(
        &self,
        resolver: &dyn Resolver,
    ) -> Result<Option<Arc<dyn Middleware>>, ResolveError> {
        if !self.enabled {
            return Ok(None);
        }
        let config = resolve_optional::<AccessLogConfig>(resolver, ACCESS_LOG_CONFIG)?
            .map(|c| c.as_ref().clone())
            .unwrap_or_default();
        if !config.enabled {
            debug!("Access log disabled by configuration");
            return Ok(None);
        }
        let access_log = AccessLog::from_config(&config).map_err(|e| ResolveError::Factory {
            id: ACCESS_LOG_CONFIG.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(Arc::new(access_log)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::middleware::InMemoryCsrfTokenStore;

    #[test]
    fn test_csrf_declines_without_store() {
        let container = Container::new();
        assert!(CsrfToken::default().materialize(&container).unwrap().is_none());
    }

    #[test]
    fn test_csrf_with_store() {
        let mut container = Container::new();
        let store: Arc<dyn CsrfTokenStore> = Arc::new(InMemoryCsrfTokenStore::new());
        container.insert_service(CSRF_STORE, store);
        let mw = CsrfToken::default().materialize(&container).unwrap();
        assert_eq!(mw.unwrap().name(), "csrf_token");
    }

    #[test]
    fn test_access_log_declines_when_disabled() {
        let container = Container::new();
        let filter = AccessLogFilter {
            enabled: false,
            ..AccessLogFilter::default()
        };
        assert!(filter.materialize(&container).unwrap().is_none());

        let mut container = Container::new();
        container.insert_service(
            ACCESS_LOG_CONFIG,
            AccessLogConfig {
                enabled: false,
                ..AccessLogConfig::default()
            },
        );
        assert!(AccessLogFilter::default()
            .materialize(&container)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_access_log_rejects_bad_config() {
        let mut container = Container::new();
        container.insert_service(
            ACCESS_LOG_CONFIG,
            AccessLogConfig {
                extra: vec!["pid".to_string()],
                ..AccessLogConfig::default()
            },
        );
        assert!(matches!(
            AccessLogFilter::default().materialize(&container),
            Err(ResolveError::Factory { .. })
        ));
    }

    #[test]
    fn test_login_only_falls_back_to_default_builder() {
        let container = Container::new();
        let mw = LoginOnly::default().materialize(&container).unwrap();
        assert_eq!(mw.unwrap().name(), "login_only");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(CsrfToken::default().priority(), 100);
        assert!(CsrfToken::default().repeat_ok);
        assert_eq!(LoginOnly::default().priority(), 50);
        assert_eq!(AccessLogFilter::default().priority(), 10);
    }
}
