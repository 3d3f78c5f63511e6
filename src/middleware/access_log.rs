use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::context::ContextBuilder;
use super::formatter::{JsonFormatter, LogFormatter, LogRecord, TemplateFormatter};
use super::{Middleware, Next};
use crate::config::AccessLogConfig;
use crate::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};

/// Tracing target of access log events
pub const ACCESS_LOG_TARGET: &str = "routeforge::access";

/// Decides whether a finished request is logged; the response is `None`
/// when the handler failed
pub type RequestFilter =
    Arc<dyn Fn(&HandlerRequest, Option<&HandlerResponse>) -> bool + Send + Sync>;

/// Access log configuration error
///
/// Returned by [`AccessLogBuilder::build`] and [`AccessLog::from_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessLogConfigError {
    /// An `extra` entry is not one of the known extraction rules
    UnknownExtra { name: String },
    /// The strftime pattern for `$time_local` does not parse
    InvalidDateFormat { format: String },
    /// The template format is empty
    EmptyTemplate,
}

impl fmt::Display for AccessLogConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLogConfigError::UnknownExtra { name } => write!(
                f,
                "Access log configuration error: unknown extra field '{name}'. \
                Expected query, body, headers, cookies, jwt or header.<name>"
            ),
            AccessLogConfigError::InvalidDateFormat { format } => write!(
                f,
                "Access log configuration error: invalid date format '{format}'"
            ),
            AccessLogConfigError::EmptyTemplate => {
                write!(f, "Access log configuration error: empty log format")
            }
        }
    }
}

impl std::error::Error for AccessLogConfigError {}

/// Request instrumentation middleware
///
/// Times the downstream handler and writes one INFO event per request to
/// [`ACCESS_LOG_TARGET`]. Logging happens in a drop guard, so a handler that
/// returns an error or panics is still logged exactly once, with its
/// response treated as absent. The downstream result is returned untouched.
pub struct AccessLog {
    formatter: Arc<dyn LogFormatter>,
    context: ContextBuilder,
    request_filter: Option<RequestFilter>,
}

impl AccessLog {
    #[must_use]
    pub fn builder() -> AccessLogBuilder {
        AccessLogBuilder::default()
    }

    /// Build from configuration; `format` is `main`, `json` or a template.
    pub fn from_config(config: &AccessLogConfig) -> Result<Self, AccessLogConfigError> {
        let builder = AccessLog::builder()
            .extra(config.extra.iter().map(String::as_str))
            .body_max_size(config.body_max_size)
            .date_format(config.date_format.as_str());
        let builder = match config.format.as_str() {
            "main" => builder.template(TemplateFormatter::MAIN),
            "json" => builder.formatter(JsonFormatter),
            template => builder.template(template),
        };
        builder.build()
    }

    fn emit(&self, req: &HandlerRequest, resp: Option<&HandlerResponse>, start: Instant) {
        if let Some(filter) = &self.request_filter {
            if !filter(req, resp) {
                return;
            }
        }
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let ctx = self.context.build(req, resp, elapsed_ms);
        match self.formatter.format(&ctx) {
            LogRecord::Template { message, extra } if extra.is_empty() => {
                info!(target: ACCESS_LOG_TARGET, "{}", message);
            }
            LogRecord::Template { message, extra } => {
                let extra = Value::Object(extra);
                info!(target: ACCESS_LOG_TARGET, extra = %extra, "{}", message);
            }
            LogRecord::Structured(record) => {
                info!(target: ACCESS_LOG_TARGET, "{}", record);
            }
        }
    }
}

impl fmt::Debug for AccessLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessLog")
            .field("context", &self.context)
            .field("request_filter", &self.request_filter.is_some())
            .finish_non_exhaustive()
    }
}

/// Logs on drop unless [`LogGuard::finish`] already did
struct LogGuard<'a> {
    log: &'a AccessLog,
    req: &'a HandlerRequest,
    start: Instant,
    done: bool,
}

impl<'a> LogGuard<'a> {
    fn new(log: &'a AccessLog, req: &'a HandlerRequest) -> Self {
        Self {
            log,
            req,
            start: Instant::now(),
            done: false,
        }
    }

    fn finish(mut self, resp: Option<&HandlerResponse>) {
        self.done = true;
        self.log.emit(self.req, resp, self.start);
    }
}

impl Drop for LogGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.log.emit(self.req, None, self.start);
        }
    }
}

impl Middleware for AccessLog {
    fn process(&self, req: &HandlerRequest, next: Next<'_>) -> HandlerResult {
        let guard = LogGuard::new(self, req);
        let result = next.run(req);
        guard.finish(result.as_ref().ok());
        result
    }

    fn name(&self) -> &str {
        "access_log"
    }
}

/// Builder for [`AccessLog`]
///
/// Defaults match [`AccessLogConfig::default`]: nginx `main` template,
/// `query` and `body` extras, 4096 byte body cap.
pub struct AccessLogBuilder {
    formatter: Option<Arc<dyn LogFormatter>>,
    template: Option<String>,
    extra: Vec<String>,
    body_max_size: usize,
    date_format: String,
    request_filter: Option<RequestFilter>,
}

impl Default for AccessLogBuilder {
    fn default() -> Self {
        let defaults = AccessLogConfig::default();
        Self {
            formatter: None,
            template: None,
            extra: defaults.extra,
            body_max_size: defaults.body_max_size,
            date_format: defaults.date_format,
            request_filter: None,
        }
    }
}

impl AccessLogBuilder {
    /// Use a `$variable` template.
    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self.formatter = None;
        self
    }

    /// Use a custom formatter.
    #[must_use]
    pub fn formatter(mut self, formatter: impl LogFormatter + 'static) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self.template = None;
        self
    }

    /// Replace the extraction rules.
    #[must_use]
    pub fn extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra = extra.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn body_max_size(mut self, size: usize) -> Self {
        self.body_max_size = size;
        self
    }

    #[must_use]
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Only log requests for which `filter` returns true.
    #[must_use]
    pub fn request_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&HandlerRequest, Option<&HandlerResponse>) -> bool + Send + Sync + 'static,
    {
        self.request_filter = Some(Arc::new(filter));
        self
    }

    pub fn build(self) -> Result<AccessLog, AccessLogConfigError> {
        let formatter: Arc<dyn LogFormatter> = match (self.formatter, self.template) {
            (Some(formatter), _) => formatter,
            (None, Some(template)) if template.trim().is_empty() => {
                return Err(AccessLogConfigError::EmptyTemplate);
            }
            (None, Some(template)) => Arc::new(TemplateFormatter::new(template)),
            (None, None) => Arc::new(TemplateFormatter::main()),
        };
        let context = ContextBuilder::new(&self.extra, self.body_max_size, self.date_format)?;
        Ok(AccessLog {
            formatter,
            context,
            request_filter: self.request_filter,
        })
    }
}
