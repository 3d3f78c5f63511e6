#![allow(dead_code)]

pub mod capture {
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::fmt;
    use std::sync::Arc;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::{Layer, Registry};

    /// One event seen by the capture layer
    #[derive(Debug, Clone)]
    pub struct CapturedEvent {
        pub target: String,
        pub level: Level,
        pub message: String,
        pub fields: HashMap<String, String>,
    }

    #[derive(Default)]
    struct FieldVisitor {
        message: String,
        fields: HashMap<String, String>,
    }

    impl Visit for FieldVisitor {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "message" {
                self.message = value.to_string();
            } else {
                self.fields.insert(field.name().to_string(), value.to_string());
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            let rendered = format!("{:?}", value);
            if field.name() == "message" {
                self.message = rendered;
            } else {
                self.fields.insert(field.name().to_string(), rendered);
            }
        }
    }

    /// Records every event into a shared buffer
    #[derive(Clone, Default)]
    pub struct LogCapture {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    impl LogCapture {
        pub fn new() -> Self {
            Self::default()
        }

        /// A subscriber that feeds this capture; install it with
        /// `tracing::subscriber::with_default`.
        pub fn subscriber(&self) -> impl Subscriber + Send + Sync {
            Registry::default().with(self.clone())
        }

        pub fn events(&self) -> Vec<CapturedEvent> {
            self.events.lock().clone()
        }

        pub fn for_target(&self, target: &str) -> Vec<CapturedEvent> {
            self.events
                .lock()
                .iter()
                .filter(|e| e.target == target)
                .cloned()
                .collect()
        }
    }

    impl<S: Subscriber> Layer<S> for LogCapture {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = FieldVisitor::default();
            event.record(&mut visitor);
            let metadata = event.metadata();
            self.events.lock().push(CapturedEvent {
                target: metadata.target().to_string(),
                level: *metadata.level(),
                message: visitor.message,
                fields: visitor.fields,
            });
        }
    }
}

pub mod controllers {
    use routeforge::dispatcher::{
        Controller, HandlerError, HandlerRequest, HandlerResponse, HandlerResult,
    };
    use serde_json::json;

    /// Answers `list`, `show` and `create`; `fail` errors and `boom` panics
    pub struct UserController;

    impl Controller for UserController {
        fn invoke(&self, method: &str, req: &HandlerRequest) -> HandlerResult {
            match method {
                "list" => Ok(HandlerResponse::json(200, json!([{"id": 1}]))),
                "show" => Ok(HandlerResponse::json(
                    200,
                    json!({ "id": req.get_path_param("id") }),
                )),
                "create" => Ok(HandlerResponse::json(201, json!({"created": true}))),
                "fail" => Err(HandlerError::Failed("database unavailable".to_string())),
                "boom" => panic!("controller exploded"),
                other => Err(HandlerError::UnknownMethod {
                    controller: "UserController".to_string(),
                    method: other.to_string(),
                }),
            }
        }
    }
}

pub mod temp_files {
    use std::io::Write;

    /// Write `content` to a temporary file with the given extension.
    pub fn with_extension(content: &str, ext: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("routeforge_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}
