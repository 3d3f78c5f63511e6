use http::Method;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use crate::filter::Filter;

/// Path pattern(s) of a mapping
///
/// A single pattern and a list of patterns are distinct shapes: a route name
/// is only accepted on the single form, even for one-element lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Patterns {
    One(String),
    Many(Vec<String>),
}

impl Patterns {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Patterns::One(p) => std::slice::from_ref(p),
            Patterns::Many(ps) => ps,
        };
        slice.iter().map(String::as_str)
    }

    #[must_use]
    pub fn is_many(&self) -> bool {
        matches!(self, Patterns::Many(_))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Patterns::One(_) => 1,
            Patterns::Many(ps) => ps.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Patterns {
    fn from(p: &str) -> Self {
        Patterns::One(p.to_string())
    }
}

impl From<Vec<&str>> for Patterns {
    fn from(ps: Vec<&str>) -> Self {
        Patterns::Many(ps.into_iter().map(str::to_string).collect())
    }
}

/// Route mapping declared on a method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMapping {
    pub method: Method,
    pub patterns: Patterns,
    pub name: Option<String>,
}

impl RequestMapping {
    #[must_use]
    pub fn new(method: Method, patterns: impl Into<Patterns>) -> Self {
        Self {
            method,
            patterns: patterns.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A metadata record attached to a controller or one of its methods
#[derive(Debug, Clone)]
pub enum Annotation {
    /// Class-level URL prefix
    UrlPrefix(String),
    /// Method-level route mapping
    RequestMapping(RequestMapping),
    /// Cross-cutting concern turned into middleware
    Filter(Arc<dyn Filter>),
}

impl Annotation {
    #[must_use]
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::UrlPrefix(_) => AnnotationKind::UrlPrefix,
            Annotation::RequestMapping(_) => AnnotationKind::RequestMapping,
            Annotation::Filter(_) => AnnotationKind::Filter,
        }
    }

    #[must_use]
    pub fn as_request_mapping(&self) -> Option<&RequestMapping> {
        match self {
            Annotation::RequestMapping(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_filter(&self) -> Option<&Arc<dyn Filter>> {
        match self {
            Annotation::Filter(f) => Some(f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_url_prefix(&self) -> Option<&str> {
        match self {
            Annotation::UrlPrefix(p) => Some(p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    UrlPrefix,
    RequestMapping,
    Filter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Receiver {
    /// Takes the controller instance
    #[default]
    Instance,
    /// Type-level function, never routable
    Static,
}

/// Identity of a method inside its declaring class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub class: String,
    pub name: String,
    pub visibility: Visibility,
    pub receiver: Receiver,
}

impl MethodRef {
    /// Only public instance methods are bound to routes.
    #[must_use]
    pub fn is_routable(&self) -> bool {
        self.visibility == Visibility::Public && self.receiver == Receiver::Instance
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.name)
    }
}

/// Metadata of one method
#[derive(Debug, Clone)]
pub struct MethodMeta {
    pub name: String,
    pub visibility: Visibility,
    pub receiver: Receiver,
    pub annotations: Vec<Annotation>,
}

impl MethodMeta {
    /// A public instance method without annotations.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            receiver: Receiver::Instance,
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn static_fn(mut self) -> Self {
        self.receiver = Receiver::Static;
        self
    }

    #[must_use]
    pub fn mapping(mut self, mapping: RequestMapping) -> Self {
        self.annotations.push(Annotation::RequestMapping(mapping));
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.annotations.push(Annotation::Filter(filter));
        self
    }
}

/// Metadata of one controller class
#[derive(Debug, Clone)]
pub struct ControllerMeta {
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub methods: Vec<MethodMeta>,
}

impl ControllerMeta {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.annotations.push(Annotation::UrlPrefix(prefix.into()));
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.annotations.push(Annotation::Filter(filter));
        self
    }

    #[must_use]
    pub fn method(mut self, method: MethodMeta) -> Self {
        self.methods.push(method);
        self
    }
}
