//! # Configuration Module
//!
//! Application settings for registration and the built-in filters, loaded
//! from a YAML, JSON or TOML file and adjusted from the environment.
//!
//! ## Example
//!
//! ```yaml
//! context_url: /app
//! access_log:
//!   format: main          # main | json | any template with $variables
//!   extra: [query, body, header.x-request-id]
//!   body_max_size: 4096
//! login:
//!   url: /login
//!   redirect_param: redirect
//! csrf:
//!   header: x-csrf-token
//! ```
//!
//! ## Environment Variables
//!
//! - `ROUTEFORGE_CONTEXT_URL` replaces `context_url`
//! - `ROUTEFORGE_ACCESS_LOG` (`on`/`off`, `true`/`false`, `1`/`0`) replaces
//!   `access_log.enabled`
//!
//! [`AppConfig::register_services`] publishes the sections into a
//! [`Container`] under the ids the built-in filters look up.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::container::Container;
use crate::login::{DefaultLoginUrlBuilder, LoginUrlBuilder};
use crate::middleware::{CsrfTokenStore, InMemoryCsrfTokenStore};

/// Service id of the [`AccessLogConfig`]
pub const ACCESS_LOG_CONFIG: &str = "access_log.config";
/// Service id of the `Arc<dyn CsrfTokenStore>`
pub const CSRF_STORE: &str = "csrf.store";
/// Service id of the [`CsrfConfig`]
pub const CSRF_CONFIG: &str = "csrf.config";
/// Service id of the `Arc<dyn LoginUrlBuilder>`
pub const LOGIN_URL_BUILDER: &str = "login.url_builder";

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Prefix prepended to every controller's routes
    pub context_url: Option<String>,
    pub access_log: AccessLogConfig,
    pub login: LoginConfig,
    pub csrf: CsrfConfig,
}

/// Request instrumentation settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessLogConfig {
    /// `main`, `json`, or a template with `$variable` placeholders
    pub format: String,
    /// Extra fields: `query`, `body`, `headers`, `cookies`, `jwt`, `header.<name>`
    pub extra: Vec<String>,
    /// Bodies larger than this are summarized instead of logged
    pub body_max_size: usize,
    /// strftime pattern for `$time_local`
    pub date_format: String,
    pub enabled: bool,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            format: "main".to_string(),
            extra: vec!["query".to_string(), "body".to_string()],
            body_max_size: 4096,
            date_format: "%d/%b/%Y:%H:%M:%S %z".to_string(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginConfig {
    pub url: String,
    /// Query parameter carrying the original URI; `null` disables it
    pub redirect_param: Option<String>,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            url: "/login".to_string(),
            redirect_param: Some("redirect".to_string()),
        }
    }
}

/// Where the CSRF middleware looks for tokens
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsrfConfig {
    pub header: String,
    /// Query parameter fallback when the header is absent
    pub field: String,
    /// Cookie whose value keys the token store
    pub session_cookie: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            header: "x-csrf-token".to_string(),
            field: "_token".to_string(),
            session_cookie: "session".to_string(),
        }
    }
}

impl AppConfig {
    /// Load a configuration file, choosing the format by extension.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config: AppConfig = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config {}", path.display()))?,
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config {}", path.display()))?,
            other => bail!("Unsupported config format '{}' for {}", other, path.display()),
        };
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply `ROUTEFORGE_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("ROUTEFORGE_CONTEXT_URL") {
            self.context_url = Some(url);
        }
        if let Ok(value) = env::var("ROUTEFORGE_ACCESS_LOG") {
            match parse_switch(&value) {
                Some(enabled) => self.access_log.enabled = enabled,
                None => warn!(value = %value, "Ignoring invalid ROUTEFORGE_ACCESS_LOG"),
            }
        }
        self
    }

    /// Publish configuration sections and default collaborators.
    ///
    /// A CSRF token store or login URL builder already present in the
    /// container is left in place.
    pub fn register_services(&self, container: &mut Container) {
        container.insert_service(ACCESS_LOG_CONFIG, self.access_log.clone());
        container.insert_service(CSRF_CONFIG, self.csrf.clone());
        if !container.has_service(CSRF_STORE) {
            let store: Arc<dyn CsrfTokenStore> = Arc::new(InMemoryCsrfTokenStore::new());
            container.insert_service(CSRF_STORE, store);
        }
        if !container.has_service(LOGIN_URL_BUILDER) {
            let builder: Arc<dyn LoginUrlBuilder> = Arc::new(DefaultLoginUrlBuilder::new(
                self.login.url.as_str(),
                self.login.redirect_param.clone(),
            ));
            container.insert_service(LOGIN_URL_BUILDER, builder);
        }
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Some(true),
        "0" | "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::resolve;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.context_url, None);
        assert_eq!(config.access_log.body_max_size, 4096);
        assert_eq!(config.access_log.extra, vec!["query", "body"]);
        assert_eq!(config.login.url, "/login");
        assert_eq!(config.csrf.header, "x-csrf-token");
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "context_url: /app\naccess_log:\n  format: json\n  extra: [jwt]\nlogin:\n  redirect_param: null"
        )
        .unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.context_url.as_deref(), Some("/app"));
        assert_eq!(config.access_log.format, "json");
        assert_eq!(config.access_log.extra, vec!["jwt"]);
        assert_eq!(config.access_log.body_max_size, 4096);
        assert_eq!(config.login.redirect_param, None);
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "context_url = \"/v1\"\n[csrf]\nfield = \"csrf\"").unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.context_url.as_deref(), Some("/v1"));
        assert_eq!(config.csrf.field, "csrf");
        assert_eq!(config.csrf.header, "x-csrf-token");
    }

    #[test]
    fn test_rejects_unknown_keys_and_formats() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{{\"contexturl\": \"/x\"}}").unwrap();
        assert!(AppConfig::load(file.path()).is_err());

        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_parse_switch() {
        assert_eq!(parse_switch("ON"), Some(true));
        assert_eq!(parse_switch(" 0 "), Some(false));
        assert_eq!(parse_switch("maybe"), None);
    }

    #[test]
    fn test_register_services_keeps_existing_store() {
        let mut container = Container::new();
        let store: Arc<dyn CsrfTokenStore> = Arc::new(InMemoryCsrfTokenStore::new());
        let token = store.issue("s1");
        container.insert_service(CSRF_STORE, Arc::clone(&store));
        AppConfig::default().register_services(&mut container);

        let kept = resolve::<Arc<dyn CsrfTokenStore>>(&container, CSRF_STORE).unwrap();
        assert!(kept.validate("s1", &token));
        assert!(resolve::<AccessLogConfig>(&container, ACCESS_LOG_CONFIG).is_ok());
        assert!(resolve::<Arc<dyn LoginUrlBuilder>>(&container, LOGIN_URL_BUILDER).is_ok());
    }
}
