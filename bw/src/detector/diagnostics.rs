//! Linter output parsing
//!
//! Each [`DiagnosticFormat`] maps a linter's stdout to [`Diagnostic`]s.
//! Lines that do not match are skipped.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::config::DiagnosticFormat;

/// One problem reported by a linter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub message: String,
}

static COLON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<file>[^:]+):(?P<line>\d+):(?:(?P<col>\d+):)?\s*(?P<msg>.+)$").expect("valid regex"));

static TSC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<file>.+)\((?P<line>\d+),(?P<col>\d+)\): (?P<msg>.+)$").expect("valid regex"));

/// Parse linter stdout in the given format
pub fn parse(format: DiagnosticFormat, stdout: &str) -> Vec<Diagnostic> {
    debug!(?format, len = stdout.len(), "diagnostics::parse: called");
    let diagnostics = match format {
        DiagnosticFormat::Colon => parse_with(&COLON_RE, stdout),
        DiagnosticFormat::Tsc => parse_with(&TSC_RE, stdout),
        DiagnosticFormat::EslintJson => parse_eslint_json(stdout),
    };
    debug!(count = diagnostics.len(), "diagnostics::parse: done");
    diagnostics
}

fn parse_with(re: &Regex, stdout: &str) -> Vec<Diagnostic> {
    stdout
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line.trim_end())?;
            Some(Diagnostic {
                file: PathBuf::from(caps.name("file")?.as_str().trim()),
                line: caps.name("line").and_then(|m| m.as_str().parse().ok()),
                column: caps.name("col").and_then(|m| m.as_str().parse().ok()),
                message: caps.name("msg")?.as_str().trim().to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintFile {
    file_path: String,
    #[serde(default)]
    messages: Vec<EslintMessage>,
}

#[derive(Debug, Deserialize)]
struct EslintMessage {
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
    message: String,
    #[serde(default)]
    severity: u8,
}

fn parse_eslint_json(stdout: &str) -> Vec<Diagnostic> {
    let files: Vec<EslintFile> = match serde_json::from_str(stdout.trim()) {
        Ok(files) => files,
        Err(e) => {
            debug!(error = %e, "parse_eslint_json: output is not eslint json");
            return Vec::new();
        }
    };

    files
        .into_iter()
        .flat_map(|file| {
            let path = PathBuf::from(file.file_path);
            file.messages.into_iter().map(move |m| {
                let level = if m.severity >= 2 { "error" } else { "warning" };
                Diagnostic {
                    file: path.clone(),
                    line: m.line,
                    column: m.column,
                    message: format!("{}: {}", level, m.message),
                }
            })
        })
        .collect()
}
