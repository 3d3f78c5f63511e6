use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use super::context::RequestLogContext;

#[allow(clippy::unwrap_used)]
static VARIABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([a-z_]+)").unwrap());

/// What a formatter hands to the logging sink
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    /// A rendered line plus the `extra` map as structured context
    Template {
        message: String,
        extra: Map<String, Value>,
    },
    /// A complete structured record
    Structured(Value),
}

/// Turns a request context into a log record
pub trait LogFormatter: Send + Sync {
    fn format(&self, ctx: &RequestLogContext) -> LogRecord;
}

impl<F> LogFormatter for F
where
    F: Fn(&RequestLogContext) -> LogRecord + Send + Sync,
{
    fn format(&self, ctx: &RequestLogContext) -> LogRecord {
        self(ctx)
    }
}

/// Substitutes `$variable` placeholders with context fields
///
/// Unknown variables are left as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFormatter {
    template: String,
}

impl TemplateFormatter {
    /// nginx's default `main` log format
    pub const MAIN: &'static str = "$remote_addr - $remote_user [$time_local] \"$request\" \
        $status $body_bytes_sent \"$http_referer\" \"$http_user_agent\" \
        \"$http_x_forwarded_for\" rt=$request_time";

    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    #[must_use]
    pub fn main() -> Self {
        Self::new(Self::MAIN)
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn render(&self, ctx: &RequestLogContext) -> String {
        VARIABLE
            .replace_all(&self.template, |caps: &Captures<'_>| {
                ctx.field(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl LogFormatter for TemplateFormatter {
    fn format(&self, ctx: &RequestLogContext) -> LogRecord {
        LogRecord::Template {
            message: self.render(ctx),
            extra: ctx.extra.clone(),
        }
    }
}

/// Emits the whole context, `extra` included, as one JSON object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonFormatter;

impl LogFormatter for JsonFormatter {
    fn format(&self, ctx: &RequestLogContext) -> LogRecord {
        LogRecord::Structured(serde_json::to_value(ctx).unwrap_or(Value::Null))
    }
}
