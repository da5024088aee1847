//! Archiver - packages a materialized project as a `.tar.gz`
//!
//! Before anything is written the project directory is cross-checked against
//! the materializer's report: every reported file must be readable and every
//! file on disk must have been reported. The archive then holds the files
//! under `<project>/` plus a top-level `manifest.json` with a BLAKE3 digest
//! per file. Entries carry a fixed mode and mtime, so the same project always
//! produces the same archive bytes.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::{BlueprintError, IntegrityError, Result};
use crate::materializer::{candidate_name, Project, MAX_NAME_ATTEMPTS};
use crate::namespace::Namespace;

/// Version of the `manifest.json` layout
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// Name of the manifest entry inside every archive
pub const MANIFEST_ENTRY: &str = "manifest.json";

const ARCHIVE_EXTENSION: &str = ".tar.gz";
const ENTRY_MODE: u32 = 0o644;

/// One archived file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the project root
    pub path: String,
    pub size: u64,
    /// BLAKE3 digest, hex encoded
    pub blake3: String,
}

/// Contents of `manifest.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub format_version: u32,
    pub project: String,
    pub files: Vec<ManifestEntry>,
    pub total_size: u64,
}

/// A written archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageArtifact {
    pub archive_name: String,
    pub archive_path: PathBuf,
    pub source_project: String,
    pub manifest: ArchiveManifest,
}

/// Packages projects under the archives root
#[derive(Debug, Clone)]
pub struct Archiver {
    archives_root: PathBuf,
    namespace: Arc<Namespace>,
}

impl Archiver {
    pub fn new(archives_root: impl Into<PathBuf>, namespace: Arc<Namespace>) -> Self {
        Self {
            archives_root: archives_root.into(),
            namespace,
        }
    }

    pub fn archives_root(&self) -> &Path {
        &self.archives_root
    }

    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }

    pub fn archive(&self, project: &Project) -> Result<PackageArtifact> {
        let contents = read_reported(project)?;
        check_for_strays(project)?;

        let manifest = build_manifest(project, &contents);

        fs::create_dir_all(&self.archives_root)
            .map_err(|e| BlueprintError::storage(&self.archives_root, e))?;
        let (archive_name, archive_path, file) = self.claim_archive(&project.name)?;

        if let Err(e) = write_archive(file, project, &contents, &manifest) {
            tracing::warn!(
                archive = %archive_name,
                error = %e,
                "archive write failed, removing partial archive"
            );
            self.discard(&archive_name, &archive_path);
            return Err(e);
        }

        tracing::info!(
            archive = %archive_name,
            project = %project.name,
            files = manifest.files.len(),
            bytes = manifest.total_size,
            "project archived"
        );

        Ok(PackageArtifact {
            archive_name,
            archive_path,
            source_project: project.name.clone(),
            manifest,
        })
    }

    /// Remove an archive and release its name
    pub fn discard(&self, name: &str, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::error!(path = %path.display(), error = %e, "failed to remove archive");
            }
        }
        self.namespace.release(name);
    }

    fn claim_archive(&self, project_name: &str) -> Result<(String, PathBuf, File)> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let name = format!("{}{}", candidate_name(project_name, attempt), ARCHIVE_EXTENSION);
            if !self.namespace.reserve(&name) {
                continue;
            }

            let path = self.archives_root.join(&name);
            let opened = OpenOptions::new().write(true).create_new(true).open(&path);
            self.namespace.release(&name);
            match opened {
                Ok(file) => return Ok((name, path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(BlueprintError::storage(path, e)),
            }
        }

        Err(BlueprintError::storage(
            self.archives_root.join(project_name),
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free archive name after {} attempts", MAX_NAME_ATTEMPTS),
            ),
        ))
    }
}

/// Read every reported file, in report order
fn read_reported(project: &Project) -> Result<Vec<Vec<u8>>> {
    project
        .files
        .iter()
        .map(|relative| {
            let path = project.root_directory.join(relative);
            fs::read(&path).map_err(|source| {
                BlueprintError::from(IntegrityError::UnreadableFile { path, source })
            })
        })
        .collect()
}

/// Fail on any file present on disk that the materializer did not report
fn check_for_strays(project: &Project) -> Result<()> {
    let reported: BTreeSet<&str> = project.files.iter().map(String::as_str).collect();

    for entry in WalkDir::new(&project.root_directory).follow_links(false) {
        let entry = entry.map_err(|e| IntegrityError::UnwalkableProject {
            path: project.root_directory.clone(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_dir() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(&project.root_directory)
            .map(|p| {
                p.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default();
        if !reported.contains(relative.as_str()) {
            return Err(IntegrityError::UnexpectedFile {
                path: entry.path().to_path_buf(),
            }
            .into());
        }
    }
    Ok(())
}

fn build_manifest(project: &Project, contents: &[Vec<u8>]) -> ArchiveManifest {
    let files: Vec<ManifestEntry> = project
        .files
        .iter()
        .zip(contents)
        .map(|(path, bytes)| ManifestEntry {
            path: path.clone(),
            size: bytes.len() as u64,
            blake3: blake3::hash(bytes).to_hex().to_string(),
        })
        .collect();
    let total_size = files.iter().map(|f| f.size).sum();

    ArchiveManifest {
        format_version: MANIFEST_FORMAT_VERSION,
        project: project.name.clone(),
        files,
        total_size,
    }
}

fn write_archive(
    file: File,
    project: &Project,
    contents: &[Vec<u8>],
    manifest: &ArchiveManifest,
) -> Result<()> {
    let io_err = |e: io::Error| BlueprintError::storage(&project.root_directory, e);

    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (relative, bytes) in project.files.iter().zip(contents) {
        let entry_path = format!("{}/{}", project.name, relative);
        append_entry(&mut builder, &entry_path, bytes).map_err(io_err)?;
    }

    let mut manifest_json = serde_json::to_string_pretty(manifest)?;
    manifest_json.push('\n');
    append_entry(&mut builder, MANIFEST_ENTRY, manifest_json.as_bytes()).map_err(io_err)?;

    let encoder = builder.into_inner().map_err(io_err)?;
    let mut file = encoder.finish().map_err(io_err)?;
    file.flush().map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    Ok(())
}

fn append_entry<W: Write>(
    builder: &mut tar::Builder<W>,
    path: &str,
    data: &[u8],
) -> io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(ENTRY_MODE);
    header.set_mtime(0);
    builder.append_data(&mut header, path, data)
}

/// Read `manifest.json` back out of an archive
pub fn read_manifest(archive_path: &Path) -> Result<ArchiveManifest> {
    let io_err = |e: io::Error| BlueprintError::storage(archive_path, e);

    let file = File::open(archive_path).map_err(io_err)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    for entry in archive.entries().map_err(io_err)? {
        let mut entry = entry.map_err(io_err)?;
        if entry.path().map_err(io_err)?.to_string_lossy() == MANIFEST_ENTRY {
            let mut json = String::new();
            entry.read_to_string(&mut json).map_err(io_err)?;
            return Ok(serde_json::from_str(&json)?);
        }
    }

    Err(IntegrityError::MissingManifest {
        archive: archive_path.to_path_buf(),
    }
    .into())
}
