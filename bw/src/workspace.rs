//! Workspace access for the detector loop
//!
//! The detector loop only needs four things from a workspace: enumerate
//! files, read a file's size, read its text, and parse it. [`FsWorkspace`]
//! provides them over a directory tree.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::syntax::{ParseError, ParsedModule, parse_module};

/// Errors reading the workspace
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Filesystem-like provider the detector loop inspects
pub trait Workspace: Send + Sync {
    /// Root directory; external tools run here
    fn root(&self) -> &Path;

    /// Every file in the workspace, sorted
    ///
    /// Unreadable entries below the root are skipped.
    fn list_files(&self) -> Result<Vec<PathBuf>, WorkspaceError>;

    fn file_size(&self, path: &Path) -> Result<u64, WorkspaceError>;

    fn read_text(&self, path: &Path) -> Result<String, WorkspaceError>;

    /// Parse a file's text
    fn parse(&self, text: &str) -> Result<ParsedModule, ParseError> {
        parse_module(text)
    }

    /// Files whose extension is one of `extensions` (without the dot)
    fn source_files(&self, extensions: &[String]) -> Result<Vec<PathBuf>, WorkspaceError> {
        debug!(?extensions, "Workspace::source_files: called");
        Ok(self
            .list_files()?
            .into_iter()
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
            })
            .collect())
    }

    /// Files whose name matches any of the glob patterns
    fn files_named(&self, patterns: &[glob::Pattern]) -> Result<Vec<PathBuf>, WorkspaceError> {
        debug!(count = patterns.len(), "Workspace::files_named: called");
        Ok(self
            .list_files()?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| patterns.iter().any(|p| p.matches(name)))
            })
            .collect())
    }
}

/// A workspace rooted at a directory on disk
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    root: PathBuf,
    ignore_dirs: Vec<String>,
}

impl FsWorkspace {
    /// Create a workspace; directories named in `ignore_dirs` are not descended into
    pub fn new(root: impl Into<PathBuf>, ignore_dirs: Vec<String>) -> Self {
        let root = root.into();
        debug!(?root, ?ignore_dirs, "FsWorkspace::new: called");
        Self { root, ignore_dirs }
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d == name)
    }
}

impl Workspace for FsWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_files(&self) -> Result<Vec<PathBuf>, WorkspaceError> {
        debug!(root = ?self.root, "FsWorkspace::list_files: called");
        let walker = WalkDir::new(&self.root).follow_links(false).into_iter().filter_entry(|entry| {
            !(entry.depth() > 0
                && entry.file_type().is_dir()
                && entry.file_name().to_str().is_some_and(|name| self.is_ignored(name)))
        });

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) if source.depth() == 0 => {
                    return Err(WorkspaceError::Walk {
                        path: self.root.clone(),
                        source,
                    });
                }
                Err(e) => {
                    warn!(path = ?e.path(), error = %e, "Skipping unreadable workspace entry");
                    continue;
                }
            };
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();

        debug!(count = files.len(), "FsWorkspace::list_files: done");
        Ok(files)
    }

    fn file_size(&self, path: &Path) -> Result<u64, WorkspaceError> {
        fs::metadata(path).map(|m| m.len()).map_err(|source| WorkspaceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read_text(&self, path: &Path) -> Result<String, WorkspaceError> {
        fs::read_to_string(path).map_err(|source| WorkspaceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
