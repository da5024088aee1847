//! Project Materializer - writes a [`FileTree`] under the projects root
//!
//! A project directory is claimed twice: once in the shared [`Namespace`] and
//! once on disk with an exclusive `create_dir`. Losing either race moves on to
//! the next candidate name, so concurrent requests never share a directory.
//! The namespace entry only covers the gap before `create_dir` returns.
//! A failed write removes everything written so far.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{BlueprintError, Result};
use crate::namespace::Namespace;
use crate::naming;
use crate::tree::FileTree;

/// Candidate names tried before giving up
pub const MAX_NAME_ATTEMPTS: usize = 64;

/// A materialized project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub root_directory: PathBuf,
    /// Relative paths in tree order
    pub files: Vec<String>,
}

/// Writes file trees as project directories
#[derive(Debug, Clone)]
pub struct ProjectMaterializer {
    projects_root: PathBuf,
    namespace: Arc<Namespace>,
}

impl ProjectMaterializer {
    pub fn new(projects_root: impl Into<PathBuf>, namespace: Arc<Namespace>) -> Self {
        Self {
            projects_root: projects_root.into(),
            namespace,
        }
    }

    pub fn projects_root(&self) -> &Path {
        &self.projects_root
    }

    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }

    /// Write `tree` to a fresh directory named after `requested_name`, or
    /// after `project_type` when no usable name was requested.
    pub fn materialize(
        &self,
        tree: &FileTree,
        requested_name: Option<&str>,
        project_type: &str,
    ) -> Result<Project> {
        fs::create_dir_all(&self.projects_root)
            .map_err(|e| BlueprintError::storage(&self.projects_root, e))?;

        let base = base_name(requested_name, project_type);
        let (name, root) = self.claim_directory(&base)?;

        match write_tree(&root, tree) {
            Ok(files) => {
                tracing::info!(project = %name, files = files.len(), "project materialized");
                Ok(Project {
                    name,
                    root_directory: root,
                    files,
                })
            }
            Err(e) => {
                tracing::warn!(project = %name, error = %e, "materialization failed, rolling back");
                self.discard(&name, &root);
                Err(e)
            }
        }
    }

    /// Remove a project directory and release its name
    pub fn discard(&self, name: &str, root: &Path) {
        if let Err(e) = fs::remove_dir_all(root) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::error!(
                    path = %root.display(),
                    error = %e,
                    "failed to remove project directory"
                );
            }
        }
        self.namespace.release(name);
    }

    fn claim_directory(&self, base: &str) -> Result<(String, PathBuf)> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let candidate = candidate_name(base, attempt);
            if !self.namespace.reserve(&candidate) {
                continue;
            }

            // Once the directory exists (ours or not) the disk holds the claim.
            let root = self.projects_root.join(&candidate);
            let created = fs::create_dir(&root);
            self.namespace.release(&candidate);
            match created {
                Ok(()) => {
                    if candidate != base {
                        tracing::debug!(
                            requested = base,
                            assigned = %candidate,
                            "project name disambiguated"
                        );
                    }
                    return Ok((candidate, root));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(BlueprintError::storage(root, e)),
            }
        }

        Err(BlueprintError::storage(
            self.projects_root.join(base),
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free project name after {} attempts", MAX_NAME_ATTEMPTS),
            ),
        ))
    }
}

/// `base`, `base-2`, `base-3`, ...
pub(crate) fn candidate_name(base: &str, attempt: usize) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

fn base_name(requested_name: Option<&str>, project_type: &str) -> String {
    if let Some(name) = requested_name.map(str::trim) {
        if naming::is_filesystem_safe(name) {
            return name.to_string();
        }
        tracing::debug!(requested = name, "requested project name is not filesystem safe");
    }

    let stem = if naming::is_filesystem_safe(project_type) {
        project_type
    } else {
        "project"
    };
    format!("{}-{}", stem, Utc::now().timestamp_millis())
}

fn write_tree(root: &Path, tree: &FileTree) -> Result<Vec<String>> {
    let mut written = Vec::with_capacity(tree.len());
    for file in tree.files() {
        let path = root.join(&file.relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BlueprintError::storage(parent, e))?;
        }
        fs::write(&path, file.content.as_bytes()).map_err(|e| BlueprintError::storage(&path, e))?;
        written.push(file.relative_path.clone());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::GeneratedFile;
    use tempfile::TempDir;

    fn sample_tree() -> FileTree {
        let mut tree = FileTree::new();
        tree.insert(GeneratedFile::manifest("package.json", "{}\n")).unwrap();
        tree.insert(GeneratedFile::source("src/models/book.model.js", "module.exports = {};\n"))
            .unwrap();
        tree
    }

    fn materializer(dir: &TempDir) -> ProjectMaterializer {
        ProjectMaterializer::new(dir.path().join("projects"), Arc::new(Namespace::new()))
    }

    #[test]
    fn test_writes_every_file() {
        let dir = TempDir::new().unwrap();
        let m = materializer(&dir);
        let project = m.materialize(&sample_tree(), Some("book-api"), "api").unwrap();

        assert_eq!(project.name, "book-api");
        assert_eq!(project.files, vec!["package.json", "src/models/book.model.js"]);
        let model = fs::read_to_string(project.root_directory.join("src/models/book.model.js")).unwrap();
        assert_eq!(model, "module.exports = {};\n");
        assert!(m.namespace().is_empty());
    }

    #[test]
    fn test_collisions_are_renamed() {
        let dir = TempDir::new().unwrap();
        let m = materializer(&dir);
        let first = m.materialize(&sample_tree(), Some("book-api"), "api").unwrap();
        let second = m.materialize(&sample_tree(), Some("book-api"), "api").unwrap();
        assert_eq!(first.name, "book-api");
        assert_eq!(second.name, "book-api-2");
        assert_ne!(first.root_directory, second.root_directory);
    }

    #[test]
    fn test_existing_directory_is_skipped() {
        let dir = TempDir::new().unwrap();
        let m = materializer(&dir);
        fs::create_dir_all(m.projects_root().join("book-api")).unwrap();

        let project = m.materialize(&sample_tree(), Some("book-api"), "api").unwrap();
        assert_eq!(project.name, "book-api-2");
        assert!(m.namespace().is_empty());
    }

    #[test]
    fn test_namespace_stays_bounded_across_many_projects() {
        let dir = TempDir::new().unwrap();
        let m = materializer(&dir);
        for _ in 0..20 {
            m.materialize(&sample_tree(), Some("book-api"), "api").unwrap();
        }
        assert!(m.projects_root().join("book-api-20").is_dir());
        assert_eq!(m.namespace().len(), 0);
    }

    #[test]
    fn test_unsafe_name_falls_back_to_project_type() {
        let dir = TempDir::new().unwrap();
        let m = materializer(&dir);
        for requested in [Some("../escape"), Some("has space"), None] {
            let project = m.materialize(&sample_tree(), requested, "book-api").unwrap();
            assert!(project.name.starts_with("book-api-"), "{}", project.name);
            assert!(project.root_directory.starts_with(m.projects_root()));
        }
    }

    #[test]
    fn test_write_failure_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let m = materializer(&dir);

        // `src` is written as a file, so `src/app.js` cannot get its parent.
        let mut tree = FileTree::new();
        tree.insert(GeneratedFile::source("src", "")).unwrap();
        tree.insert(GeneratedFile::source("src/app.js", "")).unwrap();

        let err = m.materialize(&tree, Some("broken"), "api").unwrap_err();
        assert!(matches!(err, BlueprintError::Storage { .. }));
        assert!(!m.projects_root().join("broken").exists());
        assert!(!m.namespace().contains("broken"));
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(candidate_name("api", 1), "api");
        assert_eq!(candidate_name("api", 2), "api-2");
        assert_eq!(candidate_name("api", 10), "api-10");
    }
}
