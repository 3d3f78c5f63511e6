mod access_log;
mod context;
mod core;
mod csrf;
mod formatter;
mod login;
mod remote_address;

pub use access_log::{
    AccessLog, AccessLogBuilder, AccessLogConfigError, RequestFilter, ACCESS_LOG_TARGET,
};
pub use context::{jwt_payload, ContextBuilder, ExtraField, RequestLogContext};
pub use core::{Endpoint, Middleware, Next};
pub use csrf::{CsrfTokenMiddleware, CsrfTokenStore, InMemoryCsrfTokenStore};
pub use formatter::{JsonFormatter, LogFormatter, LogRecord, TemplateFormatter};
pub use login::LoginOnlyMiddleware;
pub use remote_address::client_ips;
