use std::collections::HashMap;
use tracing::debug;

use super::error::MetadataError;
use super::types::{Annotation, AnnotationKind, ControllerMeta, MethodRef};

/// Read-only lookup of controller and method annotations
///
/// Implementations never scan code themselves; they answer queries against
/// records produced by a separate discovery step.
pub trait MetadataStore: Send + Sync {
    /// Discovered controller annotations in discovery order.
    ///
    /// The same class may appear more than once.
    fn controllers(&self) -> Vec<String>;

    /// Methods declared on a class, in declaration order.
    fn methods(&self, class: &str) -> Result<Vec<MethodRef>, MetadataError>;

    fn class_annotations(&self, class: &str) -> Result<Vec<Annotation>, MetadataError>;

    fn method_annotations(&self, method: &MethodRef) -> Result<Vec<Annotation>, MetadataError>;

    /// Class that declares `method`.
    fn declaring_class<'a>(&self, method: &'a MethodRef) -> &'a str {
        &method.class
    }

    /// First class-level annotation of `kind`.
    fn class_annotation(
        &self,
        class: &str,
        kind: AnnotationKind,
    ) -> Result<Option<Annotation>, MetadataError> {
        Ok(self
            .class_annotations(class)?
            .into_iter()
            .find(|a| a.kind() == kind))
    }

    /// First method-level annotation of `kind`.
    fn method_annotation(
        &self,
        method: &MethodRef,
        kind: AnnotationKind,
    ) -> Result<Option<Annotation>, MetadataError> {
        Ok(self
            .method_annotations(method)?
            .into_iter()
            .find(|a| a.kind() == kind))
    }
}

/// In-memory [`MetadataStore`] populated at startup
#[derive(Debug, Default, Clone)]
pub struct MetadataRegistry {
    classes: HashMap<String, ControllerMeta>,
    discovered: Vec<String>,
}

impl MetadataRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a controller and mark it discovered.
    ///
    /// A class registered twice keeps its first record but is discovered
    /// twice, which is what duplicate discovery looks like to the processor.
    pub fn register(&mut self, meta: ControllerMeta) {
        let name = meta.name.clone();
        if self.classes.contains_key(&name) {
            debug!(class = %name, "Controller already registered, keeping first record");
        } else {
            self.classes.insert(name.clone(), meta);
        }
        self.discovered.push(name);
    }

    /// Mark a class discovered without adding a record.
    pub fn discover(&mut self, class: &str) {
        self.discovered.push(class.to_string());
    }

    #[must_use]
    pub fn get(&self, class: &str) -> Option<&ControllerMeta> {
        self.classes.get(class)
    }

    fn class(&self, class: &str) -> Result<&ControllerMeta, MetadataError> {
        self.classes
            .get(class)
            .ok_or_else(|| MetadataError::UnknownClass {
                class: class.to_string(),
            })
    }
}

impl MetadataStore for MetadataRegistry {
    fn controllers(&self) -> Vec<String> {
        self.discovered.clone()
    }

    fn methods(&self, class: &str) -> Result<Vec<MethodRef>, MetadataError> {
        Ok(self
            .class(class)?
            .methods
            .iter()
            .map(|m| MethodRef {
                class: class.to_string(),
                name: m.name.clone(),
                visibility: m.visibility,
                receiver: m.receiver,
            })
            .collect())
    }

    fn class_annotations(&self, class: &str) -> Result<Vec<Annotation>, MetadataError> {
        let meta = self.class(class)?;
        let prefixes = meta
            .annotations
            .iter()
            .filter(|a| a.kind() == AnnotationKind::UrlPrefix)
            .count();
        if prefixes > 1 {
            return Err(MetadataError::ConflictingPrefix {
                class: class.to_string(),
            });
        }
        Ok(meta.annotations.clone())
    }

    fn method_annotations(&self, method: &MethodRef) -> Result<Vec<Annotation>, MetadataError> {
        self.class(&method.class)?
            .methods
            .iter()
            .find(|m| m.name == method.name)
            .map(|m| m.annotations.clone())
            .ok_or_else(|| MetadataError::UnknownMethod {
                method: method.to_string(),
            })
    }
}
