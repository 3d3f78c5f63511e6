use std::fmt;

use crate::container::ResolveError;
use crate::metadata::MetadataError;

/// Fatal configuration error raised while building the route table
///
/// Registration is all-or-nothing: when this is returned, the target table
/// has not been modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A route name was declared on a mapping with several patterns
    AmbiguousRouteName {
        class: String,
        method: String,
        name: String,
    },
    /// Two routes ended up with the same name
    DuplicateRouteName { name: String },
    /// Controller metadata could not be read
    Metadata(MetadataError),
    /// A controller or a filter dependency could not be resolved
    Resolve(ResolveError),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::AmbiguousRouteName {
                class,
                method,
                name,
            } => write!(
                f,
                "Cannot set route name '{name}' when there are multiple routes for method {class}::{method}"
            ),
            RegistrationError::DuplicateRouteName { name } => {
                write!(f, "Route name '{name}' is used by more than one route")
            }
            RegistrationError::Metadata(e) => write!(f, "{e}"),
            RegistrationError::Resolve(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RegistrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistrationError::Metadata(e) => Some(e),
            RegistrationError::Resolve(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MetadataError> for RegistrationError {
    fn from(e: MetadataError) -> Self {
        RegistrationError::Metadata(e)
    }
}

impl From<ResolveError> for RegistrationError {
    fn from(e: ResolveError) -> Self {
        RegistrationError::Resolve(e)
    }
}
