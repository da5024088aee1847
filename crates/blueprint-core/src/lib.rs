//! Blueprint Core - intent to project skeleton
//!
//! Blueprint Core turns the loosely structured output of a language model into
//! a runnable Node/Express/Mongoose project skeleton and a downloadable archive.
//!
//! # Architecture
//!
//! The pipeline runs four stages, each failing fast and atomically:
//!
//! 1. **Intent Normalizer** (`normalizer`): raw provider text to a validated [`Intent`]
//! 2. **Template Resolver** (`resolver`): [`Intent`] to an in-memory [`FileTree`]
//! 3. **Project Materializer** (`materializer`): [`FileTree`] to a project directory
//! 4. **Archiver** (`archiver`): project directory to a `.tar.gz` with a manifest
//!
//! Project and archive names are claimed through an injectable [`Namespace`],
//! so concurrent requests for the same name end up in distinct directories.
//!
//! # Quick Start
//!
//! ```
//! use blueprint_core::{normalize, TemplateResolver};
//!
//! let raw = r#"Sure! Here is the intent:
//! {"projectType": "library-api", "database": "mongodb",
//!  "entities": [{"name": "Book", "fields": [{"name": "title", "type": "string"}]}]}
//! Let me know if you need anything else."#;
//!
//! let intent = normalize(raw).unwrap();
//! assert_eq!(intent.project_type(), "library-api");
//!
//! let tree = TemplateResolver::default().resolve(&intent).unwrap();
//! assert!(tree.contains("src/models/book.model.js"));
//! assert!(tree.contains("package.json"));
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod archiver;
pub mod error;
pub mod intent;
pub mod materializer;
pub mod namespace;
pub mod naming;
pub mod normalizer;
pub mod resolver;
pub mod tree;

// Re-export commonly used types for convenience
pub use archiver::{read_manifest, ArchiveManifest, Archiver, ManifestEntry, PackageArtifact};
pub use error::{
    BlueprintError, ErrorClass, IntegrityError, MalformedIntentError, Result,
    UnsupportedFeatureError,
};
pub use intent::{
    DatabaseEngine, Entity, Feature, Field, FieldType, Intent, Operation, Relation, RelationKind,
    RouteSpec,
};
pub use materializer::{Project, ProjectMaterializer};
pub use namespace::Namespace;
pub use normalizer::{normalize, IntentNormalizer};
pub use resolver::{
    resolve, strip_generated_regions, Capability, ResolveContext, TemplateRegistry,
    TemplateResolver,
};
pub use tree::{FileKind, FileTree, GeneratedFile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
