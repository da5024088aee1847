//! Error types for Blueprint Core
//!
//! Every pipeline stage fails with a [`BlueprintError`]. The wrapped enums
//! mirror the failure taxonomy the outer layers map onto transport errors:
//! malformed intents and unsupported features are the caller's problem,
//! integrity and storage failures are ours.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Blueprint operations
pub type Result<T> = std::result::Result<T, BlueprintError>;

/// Main error type for Blueprint operations
#[derive(Error, Debug)]
pub enum BlueprintError {
    /// The provider output is unparsable or structurally invalid
    #[error("Malformed intent: {0}")]
    MalformedIntent(#[from] MalformedIntentError),

    /// The intent asks for a capability outside the supported set
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(#[from] UnsupportedFeatureError),

    /// Inconsistency between pipeline stages
    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// Filesystem failure while writing a project or archive
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while normalizing or resolving an intent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedIntentError {
    #[error("provider output is not a structured intent: {0}")]
    Unparseable(String),

    #[error("provider output is too large ({0} bytes)")]
    TooLarge(usize),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("intent declares no entities")]
    NoEntities,

    #[error("empty {0} name")]
    EmptyName(&'static str),

    #[error("name `{0}` must start with a letter")]
    InvalidName(String),

    #[error("duplicate entity `{0}`")]
    DuplicateEntity(String),

    #[error("duplicate field `{field}` on entity `{entity}`")]
    DuplicateField { entity: String, field: String },

    #[error("entity `{entity}` relates to unknown entity `{target}`")]
    DanglingRelation { entity: String, target: String },

    #[error("unknown relation kind `{0}`")]
    UnknownRelationKind(String),

    #[error("route surface references unknown entity `{0}`")]
    UnknownRouteEntity(String),

    #[error("duplicate route surface for entity `{0}`")]
    DuplicateRoute(String),

    #[error("entities `{first}` and `{second}` would both mount at `{path}`")]
    DuplicateBasePath {
        path: String,
        first: String,
        second: String,
    },

    #[error("unknown route operation `{0}`")]
    UnknownOperation(String),

    #[error("two generated files share the path `{0}`")]
    DuplicatePath(String),

    #[error("invalid generated path `{0}`")]
    InvalidPath(String),
}

/// Errors for capabilities outside the supported set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedFeatureError {
    #[error("database engine `{0}` is not supported (only `mongodb` is)")]
    Database(String),

    #[error("feature `{0}` is not supported")]
    Feature(String),
}

/// Internal inconsistency between pipeline stages. Always fatal.
#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("materialized file `{}` is unreadable: {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file `{}` exists in the project but was never materialized", path.display())]
    UnexpectedFile { path: PathBuf },

    #[error("project directory `{}` cannot be walked: {reason}", path.display())]
    UnwalkableProject { path: PathBuf, reason: String },

    #[error("archive `{}` has no manifest.json", archive.display())]
    MissingManifest { archive: PathBuf },
}

/// How an error should be surfaced by outer layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself is at fault (4xx)
    Client,
    /// An external dependency failed; the caller may retry
    Retryable,
    /// A bug or environment failure on our side (5xx)
    Internal,
}

impl BlueprintError {
    /// Wrap an io error with the path it concerns
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Classify the error for transport mapping
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedIntent(_) | Self::UnsupportedFeature(_) => ErrorClass::Client,
            Self::Integrity(_) | Self::Storage { .. } | Self::Serialization(_) => {
                ErrorClass::Internal
            }
        }
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedIntent(_) => "malformed_intent",
            Self::UnsupportedFeature(_) => "unsupported_feature",
            Self::Integrity(_) => "integrity",
            Self::Storage { .. } => "storage",
            Self::Serialization(_) => "serialization",
        }
    }
}
