//! In-memory file tree produced by the resolver
//!
//! Files are keyed by relative path in a `BTreeMap`, so iteration order is the
//! path order no matter which template emitted what first. Inserting a path
//! twice is an error, never an overwrite.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

use crate::error::MalformedIntentError;

/// What a generated file is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Source,
    Config,
    Manifest,
}

/// One generated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub relative_path: String,
    pub content: String,
    pub kind: FileKind,
}

impl GeneratedFile {
    pub fn new(
        relative_path: impl Into<String>,
        content: impl Into<String>,
        kind: FileKind,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
            kind,
        }
    }

    pub fn source(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(relative_path, content, FileKind::Source)
    }

    pub fn config(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(relative_path, content, FileKind::Config)
    }

    pub fn manifest(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(relative_path, content, FileKind::Manifest)
    }
}

/// Collision-free mapping from relative path to generated file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTree {
    files: BTreeMap<String, GeneratedFile>,
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. Fails on an invalid path or a path already present.
    pub fn insert(&mut self, file: GeneratedFile) -> Result<(), MalformedIntentError> {
        validate_relative_path(&file.relative_path)?;
        match self.files.entry(file.relative_path.clone()) {
            btree_map::Entry::Occupied(_) => {
                Err(MalformedIntentError::DuplicatePath(file.relative_path))
            }
            btree_map::Entry::Vacant(slot) => {
                slot.insert(file);
                Ok(())
            }
        }
    }

    /// Move every file of `other` into this tree. Stops at the first collision.
    pub fn merge(&mut self, other: FileTree) -> Result<(), MalformedIntentError> {
        for (_, file) in other.files {
            self.insert(file)?;
        }
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths in tree order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Files in tree order
    pub fn files(&self) -> impl Iterator<Item = &GeneratedFile> {
        self.files.values()
    }
}

/// Forward-slash relative path with no empty, `.` or `..` segments.
fn validate_relative_path(path: &str) -> Result<(), MalformedIntentError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        Err(MalformedIntentError::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}
