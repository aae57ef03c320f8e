//! Finding domain type
//!
//! A Finding is one detected workspace issue. It is built once by a detector
//! and never modified afterwards: fields are private and there are no
//! `&mut self` methods.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Severity;

/// Time-ordered unique identifier for a finding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindingId(String);

impl FindingId {
    /// Generate a fresh id (UUID v7, so ids sort by creation time)
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Short prefix for log lines
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a finding was detected
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File the finding refers to
    pub file: PathBuf,

    /// 1-indexed line, absent for file-level findings
    pub line: Option<u32>,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, line: Option<u32>) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file.display(), line),
            None => write!(f, "{}", self.file.display()),
        }
    }
}

/// One detected issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    id: FindingId,
    category: String,
    description: String,
    severity: Severity,
    location: Option<Location>,
    remedy: Option<String>,
    created_at: DateTime<Utc>,
}

impl Finding {
    /// Create a workspace-wide finding
    pub fn new(category: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        let category = category.into();
        debug!(%category, %severity, "Finding::new: called");
        Self {
            id: FindingId::generate(),
            category,
            description: description.into(),
            severity,
            location: None,
            remedy: None,
            created_at: Utc::now(),
        }
    }

    /// Attach a file (and optional line) while building
    pub fn at(mut self, file: impl Into<PathBuf>, line: Option<u32>) -> Self {
        self.location = Some(Location::new(file, line));
        self
    }

    /// Attach a suggested fix while building
    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remedy = Some(remedy.into());
        self
    }

    pub fn id(&self) -> &FindingId {
        &self.id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// File part of the location, if any
    pub fn file(&self) -> Option<&Path> {
        self.location.as_ref().map(|l| l.file.as_path())
    }

    /// Line part of the location, if any
    pub fn line(&self) -> Option<u32> {
        self.location.as_ref().and_then(|l| l.line)
    }

    pub fn remedy(&self) -> Option<&str> {
        self.remedy.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.description)?;
        if let Some(location) = &self.location {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_finding_is_workspace_wide() {
        let finding = Finding::new("test_failure", "Tests failed", Severity::High);
        assert_eq!(finding.category(), "test_failure");
        assert_eq!(finding.description(), "Tests failed");
        assert_eq!(finding.severity(), Severity::High);
        assert!(finding.location().is_none());
        assert!(finding.remedy().is_none());
    }

    #[test]
    fn test_builder_attaches_location_and_remedy() {
        let finding = Finding::new("todo_comment", "TODO found", Severity::Low)
            .at("src/app.py", Some(3))
            .with_remedy("Address the comment");

        assert_eq!(finding.file(), Some(Path::new("src/app.py")));
        assert_eq!(finding.line(), Some(3));
        assert_eq!(finding.remedy(), Some("Address the comment"));
    }

    #[test]
    fn test_file_level_location_has_no_line() {
        let finding = Finding::new("large_file", "big", Severity::Medium).at("big.py", None);
        assert_eq!(finding.line(), None);
        assert_eq!(finding.location().unwrap().to_string(), "big.py");
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::new("a/b.py", Some(12)).to_string(), "a/b.py:12");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Finding::new("x", "x", Severity::Low);
        let b = Finding::new("x", "x", Severity::Low);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().short().len(), 8);
    }

    #[test]
    fn test_created_at_is_fixed_at_construction() {
        let finding = Finding::new("x", "x", Severity::Low);
        let stamp = finding.created_at();
        let built = finding.with_remedy("later");
        assert_eq!(built.created_at(), stamp);
    }

    #[test]
    fn test_display() {
        let finding = Finding::new("missing_import", "Missing package: foo", Severity::High).at("m.py", Some(1));
        assert_eq!(finding.to_string(), "[high] missing_import: Missing package: foo (m.py:1)");
    }
}
