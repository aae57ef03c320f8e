//! Detector loop implementation

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};

use super::command::run_command;
use super::config::{DetectorConfig, LinterSpec, TestSuiteSpec};
use super::diagnostics;
use super::policy::{Reaction, SeverityPolicy};
use super::resolver::{CommandResolver, ImportResolver, Resolution};
use crate::coordinator::Coordinator;
use crate::domain::{Finding, Severity, category};
use crate::workspace::{FsWorkspace, Workspace};

/// Characters of test output kept in a `test_failure` description
const TEST_EXCERPT_CHARS: usize = 200;

static TODO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)todo|fixme").expect("valid regex"));

/// Periodically inspects a workspace and drives the coordinator
pub struct DetectorLoop {
    config: DetectorConfig,
    policy: SeverityPolicy,
    coordinator: Arc<Coordinator>,
    workspace: Arc<dyn Workspace>,
    resolver: Arc<dyn ImportResolver>,
    last_check: Option<DateTime<Utc>>,
}

impl DetectorLoop {
    pub fn new(
        config: DetectorConfig,
        coordinator: Arc<Coordinator>,
        workspace: Arc<dyn Workspace>,
        resolver: Arc<dyn ImportResolver>,
    ) -> Self {
        debug!(root = ?workspace.root(), "DetectorLoop::new: called");
        Self {
            policy: SeverityPolicy::new(config.low_severity),
            config,
            coordinator,
            workspace,
            resolver,
            last_check: None,
        }
    }

    /// Detector loop over a directory, resolving imports with the configured command
    pub fn for_directory(config: DetectorConfig, coordinator: Arc<Coordinator>, root: impl Into<PathBuf>) -> Self {
        let workspace = Arc::new(FsWorkspace::new(root, config.ignore_dirs.clone()));
        let resolver = Arc::new(CommandResolver::new(config.import_scan.resolver_command.clone()));
        Self::new(config, coordinator, workspace, resolver)
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// When the most recent pass completed
    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        self.last_check
    }

    /// Run passes until the coordinator shuts down
    ///
    /// A pass in flight is always finished; only the sleep between passes is
    /// cut short by shutdown.
    pub async fn run(mut self) {
        info!(
            root = ?self.workspace.root(),
            interval_ms = self.config.interval_ms,
            "Detector loop started"
        );

        while !self.coordinator.is_shutdown() {
            let findings = self.check_once().await;
            debug!(count = findings.len(), "DetectorLoop::run: pass complete");

            let coordinator = Arc::clone(&self.coordinator);
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval()) => {}
                _ = coordinator.wait_for_shutdown() => {}
            }
        }

        info!("Detector loop stopped");
    }

    /// One detection pass: run every detector, then apply severity policy
    ///
    /// Returns the findings in detection order.
    pub async fn check_once(&mut self) -> Vec<Finding> {
        debug!("DetectorLoop::check_once: called");
        let mut findings = Vec::new();

        for (name, spec) in &self.config.linters {
            match self.lint(spec).await {
                Ok(found) => findings.extend(found),
                Err(e) => warn!(linter = %name, error = %e, "Linter failed"),
            }
        }

        if let Some(tests) = &self.config.tests {
            match self.run_tests(tests).await {
                Ok(found) => findings.extend(found),
                Err(e) => warn!(error = %e, "Test runner failed"),
            }
        }

        match self.scan_todos() {
            Ok(found) => findings.extend(found),
            Err(e) => warn!(error = %e, "TODO scan failed"),
        }

        match self.scan_large_files() {
            Ok(found) => findings.extend(found),
            Err(e) => warn!(error = %e, "File size scan failed"),
        }

        if self.config.import_scan.enabled {
            match self.scan_imports().await {
                Ok(found) => findings.extend(found),
                Err(e) => warn!(error = %e, "Import scan failed"),
            }
        }

        for finding in &findings {
            self.react(finding).await;
        }

        self.last_check = Some(Utc::now());
        if !findings.is_empty() {
            info!(count = findings.len(), "Detection pass found issues");
        }
        findings
    }

    /// Apply severity policy to one finding
    pub async fn react(&self, finding: &Finding) {
        let reaction = self.policy.reaction(finding.severity());
        debug!(id = %finding.id().short(), ?reaction, "DetectorLoop::react: called");

        match reaction {
            Reaction::Interrupt => {
                if self.coordinator.is_shutdown() {
                    self.coordinator.inject(finding.clone());
                    return;
                }
                warn!(category = %finding.category(), description = %finding.description(), "Critical bug detected");
                self.coordinator
                    .request_pause(format!("Critical bug detected: {}", finding.category()));
                self.coordinator.inject(finding.clone());
                tokio::select! {
                    _ = tokio::time::sleep(self.config.pause_grace()) => {}
                    _ = self.coordinator.wait_for_shutdown() => {}
                }
                self.coordinator.request_resume();
            }
            Reaction::Inform => self.coordinator.inject(finding.clone()),
            Reaction::Discard => {
                debug!(category = %finding.category(), "DetectorLoop::react: low severity discarded");
            }
        }
    }

    fn root(&self) -> &Path {
        self.workspace.root()
    }

    async fn lint(&self, spec: &LinterSpec) -> Result<Vec<Finding>> {
        let files = self.workspace.source_files(&spec.extensions)?;
        if files.is_empty() {
            return Ok(Vec::new());
        }
        debug!(files = files.len(), command = ?spec.command, "DetectorLoop::lint: called");

        let mut argv = spec.command.clone();
        argv.extend(files.iter().map(|f| f.display().to_string()));
        let output = run_command(&argv, self.root()).await?;
        if output.succeeded() {
            return Ok(Vec::new());
        }

        let findings = diagnostics::parse(spec.format, &output.stdout)
            .into_iter()
            .map(|d| {
                let file = if d.file.is_absolute() {
                    d.file
                } else {
                    self.root().join(d.file)
                };
                Finding::new(category::LINTING_ERROR, d.message.clone(), Severity::from_message(&d.message))
                    .at(file, d.line)
                    .with_remedy(format!("Fix linting issue: {}", d.message))
            })
            .collect();
        Ok(findings)
    }

    async fn run_tests(&self, tests: &TestSuiteSpec) -> Result<Vec<Finding>> {
        let patterns = tests
            .patterns
            .iter()
            .map(|p| glob::Pattern::new(p).wrap_err_with(|| format!("Invalid test pattern {}", p)))
            .collect::<Result<Vec<_>>>()?;
        let test_files = self.workspace.files_named(&patterns)?;
        if test_files.is_empty() {
            return Ok(Vec::new());
        }
        debug!(files = test_files.len(), "DetectorLoop::run_tests: running suite");

        let output = run_command(&tests.command, self.root()).await?;
        if output.succeeded() {
            return Ok(Vec::new());
        }

        Ok(vec![
            Finding::new(
                category::TEST_FAILURE,
                format!("Tests failed: {}", output.excerpt(TEST_EXCERPT_CHARS)),
                Severity::High,
            )
            .with_remedy("Review test failures and fix implementation"),
        ])
    }

    fn scan_todos(&self) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for file in self.workspace.source_files(&self.config.source_extensions)? {
            let text = match self.workspace.read_text(&file) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable file");
                    continue;
                }
            };
            for (index, line) in text.lines().enumerate() {
                if TODO_RE.is_match(line) {
                    findings.push(
                        Finding::new(
                            category::TODO_COMMENT,
                            format!("TODO/FIXME found: {}", line.trim()),
                            Severity::Low,
                        )
                        .at(&file, Some(index as u32 + 1))
                        .with_remedy("Address the TODO/FIXME comment"),
                    );
                }
            }
        }
        Ok(findings)
    }

    fn scan_large_files(&self) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for file in self.workspace.source_files(&self.config.source_extensions)? {
            let size = match self.workspace.file_size(&file) {
                Ok(size) => size,
                Err(e) => {
                    warn!(error = %e, "Skipping file without size");
                    continue;
                }
            };
            if size > self.config.max_file_bytes {
                let name = file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                findings.push(
                    Finding::new(
                        category::LARGE_FILE,
                        format!("File is large ({} bytes): {}", size, name),
                        Severity::Medium,
                    )
                    .at(&file, None)
                    .with_remedy("Consider breaking into smaller modules"),
                );
            }
        }
        Ok(findings)
    }

    async fn scan_imports(&self) -> Result<Vec<Finding>> {
        let scan = &self.config.import_scan;
        let mut cache: HashMap<String, Resolution> = HashMap::new();
        let mut findings = Vec::new();

        for file in self.workspace.source_files(&scan.extensions)? {
            let text = match self.workspace.read_text(&file) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable file");
                    continue;
                }
            };
            let parsed = match self.workspace.parse(&text) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!(?file, error = %e, "DetectorLoop::scan_imports: file does not parse, skipping");
                    continue;
                }
            };

            for import in parsed.imports {
                let top = import.top_level();
                if scan.is_stdlib(top) {
                    continue;
                }

                let resolution = match cache.get(&import.module) {
                    Some(known) => known.clone(),
                    None => match self.resolver.resolve(&import.module, self.root()).await {
                        Ok(resolution) => {
                            cache.insert(import.module.clone(), resolution.clone());
                            resolution
                        }
                        Err(e) => {
                            warn!(module = %import.module, error = %e, "Import resolution failed");
                            continue;
                        }
                    },
                };

                match resolution {
                    Resolution::Resolved => {}
                    Resolution::Missing(detail) => {
                        info!(module = %import.module, ?file, line = import.line, "Missing import");
                        findings.push(
                            Finding::new(
                                category::MISSING_IMPORT,
                                format!("Missing package: {} - {}", import.module, detail),
                                Severity::High,
                            )
                            .at(&file, Some(import.line))
                            .with_remedy(scan.remedy_for(top)),
                        );
                    }
                    Resolution::Failed(detail) => {
                        warn!(module = %import.module, ?file, line = import.line, "Import error");
                        findings.push(
                            Finding::new(
                                category::IMPORT_ERROR,
                                format!("Import error for {}: {}", import.module, detail),
                                Severity::Medium,
                            )
                            .at(&file, Some(import.line))
                            .with_remedy(format!(
                                "Check if {} is properly installed and accessible",
                                import.module
                            )),
                        );
                    }
                }
            }
        }
        Ok(findings)
    }
}
