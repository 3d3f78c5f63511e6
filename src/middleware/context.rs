use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::str::FromStr;

use super::access_log::AccessLogConfigError;
use super::remote_address::client_ips;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Request data copied into the `extra` map of a log context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraField {
    /// Re-encoded query string
    Query,
    /// Request body, or a size summary when it is large or binary
    Body,
    /// All headers as `name -> [values]`
    Headers,
    /// Raw `Cookie` header
    Cookies,
    /// Decoded payload of a `Bearer` token
    Jwt,
    /// One header, stored under its own name
    Header(String),
}

impl FromStr for ExtraField {
    type Err = AccessLogConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(ExtraField::Query),
            "body" => Ok(ExtraField::Body),
            "headers" => Ok(ExtraField::Headers),
            "cookies" => Ok(ExtraField::Cookies),
            "jwt" => Ok(ExtraField::Jwt),
            other => match other.strip_prefix("header.") {
                Some(name) if !name.is_empty() => Ok(ExtraField::Header(name.to_string())),
                _ => Err(AccessLogConfigError::UnknownExtra {
                    name: other.to_string(),
                }),
            },
        }
    }
}

/// Snapshot of one request/response pair handed to a log formatter
///
/// Field names follow the nginx `log_format` variables so templates written
/// for nginx read the same here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestLogContext {
    pub remote_addr: String,
    pub remote_user: String,
    pub time_local: String,
    pub request_method: String,
    pub request_uri: String,
    pub request: String,
    pub status: u16,
    pub body_bytes_sent: usize,
    pub http_referer: String,
    pub http_user_agent: String,
    pub http_x_forwarded_for: String,
    /// Milliseconds, two decimals
    pub request_time: f64,
    pub extra: Map<String, Value>,
    #[serde(skip)]
    response_absent: bool,
}

impl RequestLogContext {
    /// True when the downstream handler produced no response.
    ///
    /// `status` then reads 500, like a server error would.
    #[must_use]
    pub fn response_absent(&self) -> bool {
        self.response_absent
    }

    /// Render a standard field by variable name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<String> {
        let value = match name {
            "remote_addr" => self.remote_addr.clone(),
            "remote_user" => self.remote_user.clone(),
            "time_local" => self.time_local.clone(),
            "request_method" => self.request_method.clone(),
            "request_uri" => self.request_uri.clone(),
            "request" => self.request.clone(),
            "status" => self.status.to_string(),
            "body_bytes_sent" => self.body_bytes_sent.to_string(),
            "http_referer" => self.http_referer.clone(),
            "http_user_agent" => self.http_user_agent.clone(),
            "http_x_forwarded_for" => self.http_x_forwarded_for.clone(),
            "request_time" => self.request_time.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

/// Builds [`RequestLogContext`] values for one access log
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    extra: Vec<ExtraField>,
    body_max_size: usize,
    date_format: String,
}

impl ContextBuilder {
    /// Parse the extraction rules and validate the date format.
    pub fn new<I, S>(
        extra: I,
        body_max_size: usize,
        date_format: impl Into<String>,
    ) -> Result<Self, AccessLogConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra = extra
            .into_iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<ExtraField>, _>>()?;
        let date_format = date_format.into();
        if StrftimeItems::new(&date_format).any(|item| matches!(item, Item::Error)) {
            return Err(AccessLogConfigError::InvalidDateFormat {
                format: date_format,
            });
        }
        Ok(Self {
            extra,
            body_max_size,
            date_format,
        })
    }

    #[must_use]
    pub fn extra(&self) -> &[ExtraField] {
        &self.extra
    }

    #[must_use]
    pub fn build(
        &self,
        req: &HandlerRequest,
        resp: Option<&HandlerResponse>,
        elapsed_ms: f64,
    ) -> RequestLogContext {
        let ips = client_ips(req);
        let remote_user = match req.user_info.as_deref() {
            Some(user) if !user.is_empty() => user.to_string(),
            _ => "-".to_string(),
        };
        RequestLogContext {
            remote_addr: ips.first().cloned().unwrap_or_else(|| "-".to_string()),
            remote_user,
            time_local: self.time_local(),
            request_method: req.method.to_string(),
            request_uri: req.uri(),
            request: format!(
                "{} {} {}/{}",
                req.method.as_str().to_uppercase(),
                req.path,
                req.scheme.to_uppercase(),
                req.protocol_version()
            ),
            status: resp.map_or(500, |r| r.status),
            body_bytes_sent: resp.map_or(0, HandlerResponse::body_size),
            http_referer: req.header_line("referer"),
            http_user_agent: req.header_line("user-agent"),
            http_x_forwarded_for: ips.join(","),
            request_time: (elapsed_ms * 100.0).round() / 100.0,
            extra: self.extract(req),
            response_absent: resp.is_none(),
        }
    }

    fn time_local(&self) -> String {
        let now = Local::now();
        let mut rendered = String::new();
        if write!(rendered, "{}", now.format(&self.date_format)).is_err() {
            return now.to_rfc3339();
        }
        rendered
    }

    fn extract(&self, req: &HandlerRequest) -> Map<String, Value> {
        let mut extra = Map::new();
        for field in &self.extra {
            match field {
                ExtraField::Query => {
                    extra.insert("query".into(), Value::String(req.query_string()));
                }
                ExtraField::Body => {
                    extra.insert("body".into(), Value::String(self.body(&req.body)));
                }
                ExtraField::Headers => {
                    extra.insert("headers".into(), Value::Object(headers(req)));
                }
                ExtraField::Cookies => {
                    extra.insert("cookies".into(), Value::String(req.header_line("cookie")));
                }
                ExtraField::Jwt => {
                    if let Some(payload) = jwt_payload(req.get_header("authorization")) {
                        extra.insert("jwt".into(), payload);
                    }
                }
                ExtraField::Header(name) => {
                    extra.insert(name.clone(), Value::String(req.header_line(name)));
                }
            }
        }
        extra.retain(|_, v| !is_empty(v));
        extra
    }

    fn body(&self, body: &[u8]) -> String {
        if body.len() > self.body_max_size {
            return format!("body with {} bytes", body.len());
        }
        match std::str::from_utf8(body) {
            Ok(text) => text.to_string(),
            Err(_) => format!("binary data with {} bytes", body.len()),
        }
    }
}

fn headers(req: &HandlerRequest) -> Map<String, Value> {
    let mut map = Map::new();
    for (name, value) in &req.headers {
        let entry = map
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(values) = entry {
            values.push(Value::String(value.clone()));
        }
    }
    map
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Decode the payload segment of a `Bearer` token.
///
/// Returns `None` unless the header starts with `Bearer `, has a second
/// segment, and that segment is base64 (URL-safe or standard, padding
/// optional) encoding a JSON object.
#[must_use]
pub fn jwt_payload(authorization: Option<&str>) -> Option<Value> {
    let token = authorization?.strip_prefix("Bearer ")?;
    let segment = token.split('.').nth(1)?.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| STANDARD_NO_PAD.decode(segment))
        .ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        payload @ Value::Object(_) => Some(payload),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;

    fn builder(extra: &[&str]) -> ContextBuilder {
        ContextBuilder::new(extra.iter().copied(), 4096, "%d/%b/%Y:%H:%M:%S %z").unwrap()
    }

    fn bearer(payload: &str) -> String {
        format!("Bearer h.{}.s", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn test_parse_extra_fields() {
        assert_eq!("jwt".parse::<ExtraField>().unwrap(), ExtraField::Jwt);
        assert_eq!(
            "header.x-request-id".parse::<ExtraField>().unwrap(),
            ExtraField::Header("x-request-id".into())
        );
        assert_eq!(
            "header.".parse::<ExtraField>(),
            Err(AccessLogConfigError::UnknownExtra {
                name: "header.".into()
            })
        );
        assert!("pid".parse::<ExtraField>().is_err());
    }

    #[test]
    fn test_invalid_date_format() {
        let err = ContextBuilder::new(["query"], 10, "%Q").unwrap_err();
        assert_eq!(
            err,
            AccessLogConfigError::InvalidDateFormat {
                format: "%Q".into()
            }
        );
    }

    #[test]
    fn test_date_format_without_specifiers_is_literal() {
        let ctx = ContextBuilder::new(["query"], 10, "d/M/Y:H:i:s O")
            .unwrap()
            .build(&HandlerRequest::new(Method::GET, "/"), None, 0.0);
        assert_eq!(ctx.time_local, "d/M/Y:H:i:s O");
    }

    #[test]
    fn test_large_body_is_summarized() {
        let req = HandlerRequest::new(Method::POST, "/upload").with_body(vec![b'a'; 5000]);
        let ctx = builder(&["body"]).build(&req, None, 1.0);
        let body = ctx.extra["body"].as_str().unwrap();
        assert!(body.contains("5000"));
        assert_eq!(body, "body with 5000 bytes");
    }

    #[test]
    fn test_small_and_binary_body() {
        let req = HandlerRequest::new(Method::POST, "/").with_body("name=ada");
        let ctx = builder(&["body"]).build(&req, None, 1.0);
        assert_eq!(ctx.extra["body"], json!("name=ada"));

        let req = HandlerRequest::new(Method::POST, "/").with_body(vec![0xff, 0xfe, 0x00]);
        let ctx = builder(&["body"]).build(&req, None, 1.0);
        assert_eq!(ctx.extra["body"], json!("binary data with 3 bytes"));
    }

    #[test]
    fn test_jwt_payload() {
        let req = HandlerRequest::new(Method::GET, "/")
            .with_header("Authorization", &bearer(r#"{"sub":"42"}"#));
        let ctx = builder(&["jwt"]).build(&req, None, 1.0);
        assert_eq!(ctx.extra["jwt"], json!({"sub": "42"}));
    }

    #[test]
    fn test_jwt_requires_bearer_prefix() {
        let encoded = URL_SAFE_NO_PAD.encode(r#"{"sub":"42"}"#);
        let req = HandlerRequest::new(Method::GET, "/")
            .with_header("Authorization", &format!("Token h.{encoded}.s"));
        let ctx = builder(&["jwt"]).build(&req, None, 1.0);
        assert!(!ctx.extra.contains_key("jwt"));
    }

    #[test]
    fn test_jwt_malformed() {
        assert_eq!(jwt_payload(Some("Bearer abc")), None);
        assert_eq!(jwt_payload(Some("Bearer h.!!!.s")), None);
        assert_eq!(jwt_payload(Some(&bearer("[1,2]"))), None);
        assert_eq!(jwt_payload(None), None);
    }

    #[test]
    fn test_jwt_standard_alphabet_with_padding() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(r#"{"a":"??>"}"#);
        let header = format!("Bearer h.{encoded}.s");
        assert_eq!(jwt_payload(Some(&header)), Some(json!({"a": "??>"})));
    }

    #[test]
    fn test_empty_fields_pruned() {
        let req = HandlerRequest::new(Method::GET, "/");
        let ctx = builder(&["query", "body", "cookies", "header.x-trace", "headers"])
            .build(&req, None, 1.0);
        assert!(ctx.extra.is_empty());
    }

    #[test]
    fn test_header_and_query_fields() {
        let req = HandlerRequest::new(Method::GET, "/search?q=rust&page=2")
            .with_header("X-Trace", "abc")
            .with_header("Accept", "text/html")
            .with_header("Accept", "application/json");
        let ctx = builder(&["query", "header.x-trace", "headers"]).build(&req, None, 1.0);
        assert_eq!(ctx.extra["query"], json!("q=rust&page=2"));
        assert_eq!(ctx.extra["x-trace"], json!("abc"));
        assert_eq!(
            ctx.extra["headers"]["accept"],
            json!(["text/html", "application/json"])
        );
    }

    #[test]
    fn test_standard_fields() {
        let req = HandlerRequest::new(Method::GET, "/users?id=7")
            .with_header("Host", "example.com")
            .with_header("User-Agent", "curl/8")
            .with_header("X-Forwarded-For", "203.0.113.9");
        let resp = HandlerResponse::json(201, json!({"ok": true}));
        let ctx = builder(&[]).build(&req, Some(&resp), 12.3456);
        assert_eq!(ctx.remote_addr, "203.0.113.9");
        assert_eq!(ctx.remote_user, "-");
        assert_eq!(ctx.request, "GET /users HTTP/1.1");
        assert_eq!(ctx.request_uri, "http://example.com/users?id=7");
        assert_eq!(ctx.status, 201);
        assert_eq!(ctx.body_bytes_sent, 11);
        assert_eq!(ctx.http_user_agent, "curl/8");
        assert_eq!(ctx.request_time, 12.35);
        assert!(!ctx.response_absent());
        assert_eq!(ctx.field("status").as_deref(), Some("201"));
        assert_eq!(ctx.field("nope"), None);
    }

    #[test]
    fn test_absent_response() {
        let req = HandlerRequest::new(Method::GET, "/");
        let ctx = builder(&[]).build(&req, None, 0.0);
        assert_eq!(ctx.status, 500);
        assert_eq!(ctx.body_bytes_sent, 0);
        assert_eq!(ctx.remote_addr, "-");
        assert!(ctx.response_absent());
    }
}
