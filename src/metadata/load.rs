use anyhow::Context;
use http::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::error::MetadataError;
use super::store::{MetadataRegistry, MetadataStore};
use super::types::{ControllerMeta, MethodMeta, Patterns, RequestMapping, Visibility};
use crate::filter::{Filter, FilterFactoryRegistry};

/// Serialization format of a controller manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    /// Pick the format from a file extension; anything but `.json` is YAML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => ManifestFormat::Json,
            _ => ManifestFormat::Yaml,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    controllers: Vec<ControllerEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ControllerEntry {
    class: String,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    filters: Vec<FilterEntry>,
    #[serde(default)]
    methods: Vec<MethodEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MethodEntry {
    name: String,
    #[serde(default)]
    visibility: Visibility,
    #[serde(default, rename = "static")]
    is_static: bool,
    #[serde(default)]
    mappings: Vec<MappingEntry>,
    #[serde(default)]
    filters: Vec<FilterEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MappingEntry {
    method: String,
    path: Patterns,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FilterEntry {
    kind: String,
    #[serde(flatten)]
    options: Map<String, Value>,
}

/// Parse a manifest document into a metadata registry.
///
/// Controllers are discovered in document order; a class listed twice is
/// discovered twice and keeps its first definition.
pub fn parse_manifest(
    content: &str,
    format: ManifestFormat,
    filters: &FilterFactoryRegistry,
) -> Result<MetadataRegistry, MetadataError> {
    let manifest: Manifest = match format {
        ManifestFormat::Yaml => serde_yaml::from_str(content).map_err(|e| MetadataError::Parse {
            message: e.to_string(),
        })?,
        ManifestFormat::Json => serde_json::from_str(content).map_err(|e| MetadataError::Parse {
            message: e.to_string(),
        })?,
    };

    let mut registry = MetadataRegistry::new();
    for entry in manifest.controllers {
        let meta = controller_meta(entry, filters)?;
        debug!(class = %meta.name, methods = meta.methods.len(), "Controller metadata parsed");
        registry.register(meta);
    }
    Ok(registry)
}

/// Read and parse a manifest file.
pub fn load_manifest(
    path: &Path,
    filters: &FilterFactoryRegistry,
) -> anyhow::Result<MetadataRegistry> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read controller manifest {}", path.display()))?;
    let registry = parse_manifest(&content, ManifestFormat::from_path(path), filters)
        .with_context(|| format!("Invalid controller manifest {}", path.display()))?;
    info!(
        path = %path.display(),
        controllers = registry.controllers().len(),
        "Controller manifest loaded"
    );
    Ok(registry)
}

fn controller_meta(
    entry: ControllerEntry,
    filters: &FilterFactoryRegistry,
) -> Result<ControllerMeta, MetadataError> {
    let mut meta = ControllerMeta::new(entry.class.as_str());
    if let Some(prefix) = entry.prefix {
        meta = meta.prefix(prefix);
    }
    for filter in build_filters(entry.filters, filters, &entry.class)? {
        meta = meta.filter(filter);
    }
    for method in entry.methods {
        let location = format!("{}::{}", entry.class, method.name);
        meta = meta.method(method_meta(method, filters, &location)?);
    }
    Ok(meta)
}

fn method_meta(
    entry: MethodEntry,
    filters: &FilterFactoryRegistry,
    location: &str,
) -> Result<MethodMeta, MetadataError> {
    let mut meta = MethodMeta::new(entry.name).visibility(entry.visibility);
    if entry.is_static {
        meta = meta.static_fn();
    }
    for mapping in entry.mappings {
        if mapping.path.is_empty() {
            return Err(MetadataError::EmptyPatterns {
                location: location.to_string(),
            });
        }
        let verb = parse_verb(&mapping.method, location)?;
        let mut request_mapping = RequestMapping::new(verb, mapping.path);
        request_mapping.name = mapping.name;
        meta = meta.mapping(request_mapping);
    }
    for filter in build_filters(entry.filters, filters, location)? {
        meta = meta.filter(filter);
    }
    Ok(meta)
}

fn build_filters(
    entries: Vec<FilterEntry>,
    filters: &FilterFactoryRegistry,
    location: &str,
) -> Result<Vec<Arc<dyn Filter>>, MetadataError> {
    entries
        .into_iter()
        .map(|entry| filters.build(&entry.kind, entry.options, location))
        .collect()
}

fn parse_verb(verb: &str, location: &str) -> Result<Method, MetadataError> {
    match verb.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        "PATCH" => Ok(Method::PATCH),
        "HEAD" => Ok(Method::HEAD),
        "OPTIONS" => Ok(Method::OPTIONS),
        "TRACE" => Ok(Method::TRACE),
        "CONNECT" => Ok(Method::CONNECT),
        _ => Err(MetadataError::InvalidVerb {
            location: location.to_string(),
            verb: verb.to_string(),
        }),
    }
}
