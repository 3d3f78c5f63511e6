//! # Metadata Module
//!
//! Controller and method annotations, recorded at startup instead of being
//! discovered by reflection.
//!
//! A [`ControllerMeta`] names a controller class and carries class-level
//! annotations (URL prefix, filters) plus its [`MethodMeta`] list. Each method
//! records its visibility, whether it is static, and its own annotations
//! (request mappings, filters). [`MetadataRegistry`] stores these records and
//! answers [`MetadataStore`] queries for the registration pass.
//!
//! Records are built in code with the builder methods, or loaded from a
//! YAML/JSON controller manifest with [`load_manifest`]:
//!
//! ```yaml
//! controllers:
//!   - class: UserController
//!     prefix: /users
//!     filters:
//!       - kind: login_only
//!     methods:
//!       - name: show
//!         mappings:
//!           - method: GET
//!             path: /{id}
//!             name: users.show
//! ```

mod error;
mod load;
mod store;
mod types;

pub use error::MetadataError;
pub use load::{load_manifest, parse_manifest, ManifestFormat};
pub use store::{MetadataRegistry, MetadataStore};
pub use types::{
    Annotation, AnnotationKind, ControllerMeta, MethodMeta, MethodRef, Patterns, Receiver,
    RequestMapping, Visibility,
};
