//! Detector loop configuration
//!
//! Linter and test-runner bindings are plain data: a table from category name
//! to command template, so adding a language is a config change.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stdlib::PYTHON_STDLIB;

/// How a linter's stdout is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticFormat {
    /// `path:line:col: message` (flake8, gcc-style)
    #[default]
    Colon,

    /// `path(line,col): message` (tsc --pretty false)
    Tsc,

    /// ESLint `--format=json`
    EslintJson,
}

/// One linter binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinterSpec {
    /// File extensions (without the dot) this linter covers
    pub extensions: Vec<String>,

    /// Argv template; the category's files are appended
    pub command: Vec<String>,

    #[serde(default)]
    pub format: DiagnosticFormat,
}

/// Test suite binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuiteSpec {
    /// File-name globs that identify test files
    pub patterns: Vec<String>,

    /// Argv run once in the workspace root when test files exist
    pub command: Vec<String>,
}

/// What to do with low-severity findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LowSeverityPolicy {
    /// Report in `check_once` results and logs only
    #[default]
    Discard,

    /// Inject like medium findings (no pause)
    Inject,
}

/// Import resolvability scan settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportScanConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Extensions of files whose imports are checked
    #[serde(default = "default_import_extensions")]
    pub extensions: Vec<String>,

    /// Argv template with a `{module}` placeholder, run in the workspace root
    #[serde(rename = "resolver-command", default = "default_resolver_command")]
    pub resolver_command: Vec<String>,

    /// Top-level modules never handed to the resolver
    #[serde(rename = "stdlib-modules", default = "default_stdlib_modules")]
    pub stdlib_modules: Vec<String>,

    /// Remedy text for missing packages; `{package}` is the top-level name
    #[serde(rename = "remedy-template", default = "default_remedy_template")]
    pub remedy_template: String,
}

fn default_true() -> bool {
    true
}

fn default_import_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_resolver_command() -> Vec<String> {
    debug!("default_resolver_command: called");
    vec!["python3".to_string(), "-c".to_string(), "import {module}".to_string()]
}

fn default_stdlib_modules() -> Vec<String> {
    PYTHON_STDLIB.iter().map(|s| s.to_string()).collect()
}

fn default_remedy_template() -> String {
    "Install missing package: pip install {package}".to_string()
}

impl Default for ImportScanConfig {
    fn default() -> Self {
        debug!("ImportScanConfig::default: called");
        Self {
            enabled: true,
            extensions: default_import_extensions(),
            resolver_command: default_resolver_command(),
            stdlib_modules: default_stdlib_modules(),
            remedy_template: default_remedy_template(),
        }
    }
}

impl ImportScanConfig {
    /// Install hint for a missing top-level package
    pub fn remedy_for(&self, package: &str) -> String {
        self.remedy_template.replace("{package}", package)
    }

    pub fn is_stdlib(&self, top_level: &str) -> bool {
        self.stdlib_modules.iter().any(|m| m == top_level)
    }
}

/// Detector loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Pause between detection passes
    #[serde(rename = "interval-ms", default = "default_interval_ms")]
    pub interval_ms: u64,

    /// How long a high-severity pause is held before resuming
    #[serde(rename = "pause-grace-ms", default = "default_pause_grace_ms")]
    pub pause_grace_ms: u64,

    /// Files larger than this many bytes are reported
    #[serde(rename = "max-file-bytes", default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    #[serde(rename = "low-severity", default)]
    pub low_severity: LowSeverityPolicy,

    /// Directory names never descended into
    #[serde(rename = "ignore-dirs", default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,

    /// Extensions scanned for TODO/FIXME and oversized files
    #[serde(rename = "source-extensions", default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Category name -> linter binding
    #[serde(default = "default_linters")]
    pub linters: BTreeMap<String, LinterSpec>,

    /// Test suite binding; `null` disables test execution
    #[serde(default = "default_tests")]
    pub tests: Option<TestSuiteSpec>,

    #[serde(rename = "import-scan", default)]
    pub import_scan: ImportScanConfig,
}

fn default_interval_ms() -> u64 {
    debug!("default_interval_ms: called");
    5_000
}

fn default_pause_grace_ms() -> u64 {
    debug!("default_pause_grace_ms: called");
    1_000
}

fn default_max_file_bytes() -> u64 {
    debug!("default_max_file_bytes: called");
    10_000
}

fn default_ignore_dirs() -> Vec<String> {
    [".git", "node_modules", "__pycache__", ".venv", "venv", "target"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_source_extensions() -> Vec<String> {
    vec!["py".to_string(), "js".to_string(), "ts".to_string()]
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn default_linters() -> BTreeMap<String, LinterSpec> {
    debug!("default_linters: called");
    let mut linters = BTreeMap::new();
    linters.insert(
        "python".to_string(),
        LinterSpec {
            extensions: argv(&["py"]),
            command: argv(&["python3", "-m", "flake8", "--max-line-length=100"]),
            format: DiagnosticFormat::Colon,
        },
    );
    linters.insert(
        "javascript".to_string(),
        LinterSpec {
            extensions: argv(&["js"]),
            command: argv(&["npx", "eslint", "--format=json"]),
            format: DiagnosticFormat::EslintJson,
        },
    );
    linters.insert(
        "typescript".to_string(),
        LinterSpec {
            extensions: argv(&["ts"]),
            command: argv(&["npx", "tsc", "--noEmit", "--pretty", "false"]),
            format: DiagnosticFormat::Tsc,
        },
    );
    linters
}

fn default_tests() -> Option<TestSuiteSpec> {
    Some(TestSuiteSpec {
        patterns: argv(&["test_*.py", "*_test.py"]),
        command: argv(&["python3", "-m", "pytest", "--tb=short", "-q"]),
    })
}

impl Default for DetectorConfig {
    fn default() -> Self {
        debug!("DetectorConfig::default: called");
        Self {
            interval_ms: default_interval_ms(),
            pause_grace_ms: default_pause_grace_ms(),
            max_file_bytes: default_max_file_bytes(),
            low_severity: LowSeverityPolicy::default(),
            ignore_dirs: default_ignore_dirs(),
            source_extensions: default_source_extensions(),
            linters: default_linters(),
            tests: default_tests(),
            import_scan: ImportScanConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// Config with no external tools: only the in-process scans run
    pub fn scans_only() -> Self {
        debug!("DetectorConfig::scans_only: called");
        Self {
            linters: BTreeMap::new(),
            tests: None,
            ..Default::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn pause_grace(&self) -> Duration {
        Duration::from_millis(self.pause_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DetectorConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.pause_grace(), Duration::from_secs(1));
        assert_eq!(config.max_file_bytes, 10_000);
        assert_eq!(config.low_severity, LowSeverityPolicy::Discard);
        assert_eq!(config.linters.len(), 3);
        assert_eq!(config.linters["python"].format, DiagnosticFormat::Colon);
        assert!(config.tests.is_some());
        assert!(config.ignore_dirs.contains(&".git".to_string()));
    }

    #[test]
    fn test_scans_only() {
        let config = DetectorConfig::scans_only();
        assert!(config.linters.is_empty());
        assert!(config.tests.is_none());
        assert!(config.import_scan.enabled);
    }

    #[test]
    fn test_remedy_template() {
        let scan = ImportScanConfig::default();
        assert_eq!(scan.remedy_for("requests"), "Install missing package: pip install requests");
    }

    #[test]
    fn test_is_stdlib() {
        let scan = ImportScanConfig::default();
        assert!(scan.is_stdlib("os"));
        assert!(!scan.is_stdlib("requests"));
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = r#"
interval-ms: 250
low-severity: inject
tests: null
linters:
  shell:
    extensions: [sh]
    command: [shellcheck, -f, gcc]
import-scan:
  enabled: false
"#;
        let config: DetectorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.interval_ms, 250);
        assert_eq!(config.low_severity, LowSeverityPolicy::Inject);
        assert!(config.tests.is_none());
        assert_eq!(config.linters.len(), 1);
        assert_eq!(config.linters["shell"].format, DiagnosticFormat::Colon);
        assert!(!config.import_scan.enabled);
        assert_eq!(config.import_scan.extensions, vec!["py"]);
        assert_eq!(config.pause_grace_ms, 1_000);
    }
}
