//! External tool execution

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use eyre::{Context, eyre};
use tracing::debug;

/// Captured result of one external command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code; -1 when the process was killed by a signal
    pub exit_code: i32,

    pub stdout: String,

    pub stderr: String,

    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// First `max_chars` characters of stderr, or of stdout when stderr is empty
    pub fn excerpt(&self, max_chars: usize) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        source.trim().chars().take(max_chars).collect()
    }
}

/// Run `argv` in `cwd` and capture its output
///
/// No timeout is applied. The child is killed if the returned future is
/// dropped, so shutdown aborts long-running tools.
pub async fn run_command(argv: &[String], cwd: &Path) -> eyre::Result<CommandOutput> {
    debug!(?argv, ?cwd, "run_command: called");
    let (program, args) = argv.split_first().ok_or_else(|| eyre!("Empty command"))?;
    let start = Instant::now();

    let output = tokio::process::Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .wrap_err_with(|| format!("Failed to execute {}", program))?;

    let duration_ms = start.elapsed().as_millis() as u64;
    let exit_code = output.status.code().unwrap_or(-1);
    debug!(%program, exit_code, duration_ms, "run_command: completed");

    Ok(CommandOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms,
    })
}
