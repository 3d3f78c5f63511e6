use serde_json::json;

use crate::dispatcher::{Controller, HandlerRequest, HandlerResponse, HandlerResult};

/// Controller that echoes the request back
///
/// Stands in for real controllers when a manifest is inspected without the
/// application around it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoController {
    class: String,
}

impl EchoController {
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
        }
    }
}

impl Controller for EchoController {
    fn invoke(&self, method: &str, req: &HandlerRequest) -> HandlerResult {
        let params: serde_json::Map<_, _> = req
            .path_params
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        let query: serde_json::Map<_, _> = req
            .query_params
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        Ok(HandlerResponse::json(
            200,
            json!({
                "handler": format!("{}::{}", self.class, method),
                "method": req.method.to_string(),
                "path": req.path,
                "params": params,
                "query": query,
                "body": String::from_utf8_lossy(&req.body),
            }),
        ))
    }
}
