use std::fmt;

/// Malformed or unreadable controller metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// A class was referenced that has no metadata record
    UnknownClass { class: String },
    /// A method was referenced that its class does not declare
    UnknownMethod { method: String },
    /// A class carries more than one URL prefix
    ConflictingPrefix { class: String },
    /// An HTTP verb could not be parsed
    InvalidVerb { location: String, verb: String },
    /// A mapping lists no patterns
    EmptyPatterns { location: String },
    /// A filter kind has no registered factory
    UnknownFilter { location: String, kind: String },
    /// A filter's options did not match its shape
    InvalidFilter {
        location: String,
        kind: String,
        message: String,
    },
    /// The manifest document itself could not be parsed
    Parse { message: String },
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataError::UnknownClass { class } => {
                write!(f, "no metadata registered for class '{class}'")
            }
            MetadataError::UnknownMethod { method } => {
                write!(f, "no metadata registered for method '{method}'")
            }
            MetadataError::ConflictingPrefix { class } => {
                write!(f, "class '{class}' declares more than one URL prefix")
            }
            MetadataError::InvalidVerb { location, verb } => {
                write!(f, "{location}: invalid HTTP method '{verb}'")
            }
            MetadataError::EmptyPatterns { location } => {
                write!(f, "{location}: mapping declares no path patterns")
            }
            MetadataError::UnknownFilter { location, kind } => {
                write!(f, "{location}: unknown filter kind '{kind}'")
            }
            MetadataError::InvalidFilter {
                location,
                kind,
                message,
            } => write!(f, "{location}: invalid options for filter '{kind}': {message}"),
            MetadataError::Parse { message } => write!(f, "invalid controller manifest: {message}"),
        }
    }
}

impl std::error::Error for MetadataError {}
