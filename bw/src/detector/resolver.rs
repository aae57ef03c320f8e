//! Import resolution
//!
//! The import scan asks an [`ImportResolver`] whether a module can be loaded
//! in the workspace's environment. [`CommandResolver`] answers by running the
//! configured interpreter command.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use super::command::run_command;

/// Outcome of resolving one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved,

    /// The module does not exist; carries the interpreter's message
    Missing(String),

    /// The module exists but failed to load
    Failed(String),
}

#[async_trait]
pub trait ImportResolver: Send + Sync {
    /// Resolve `module` as if imported from a file in `root`
    async fn resolve(&self, module: &str, root: &Path) -> eyre::Result<Resolution>;
}

/// Resolves by running an argv template with `{module}` substituted
#[derive(Debug, Clone)]
pub struct CommandResolver {
    command: Vec<String>,
}

impl CommandResolver {
    pub fn new(command: Vec<String>) -> Self {
        debug!(?command, "CommandResolver::new: called");
        Self { command }
    }

    /// The command line that resolves `module`
    pub fn argv(&self, module: &str) -> Vec<String> {
        self.command.iter().map(|arg| arg.replace("{module}", module)).collect()
    }
}

fn last_line(text: &str) -> String {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl ImportResolver for CommandResolver {
    async fn resolve(&self, module: &str, root: &Path) -> eyre::Result<Resolution> {
        debug!(%module, ?root, "CommandResolver::resolve: called");
        let output = run_command(&self.argv(module), root).await?;

        if output.succeeded() {
            debug!(%module, "CommandResolver::resolve: resolved");
            return Ok(Resolution::Resolved);
        }

        let detail = last_line(&output.stderr);
        if output.stderr.contains("ModuleNotFoundError") || output.stderr.contains("No module named") {
            debug!(%module, "CommandResolver::resolve: missing");
            Ok(Resolution::Missing(detail))
        } else {
            debug!(%module, exit_code = output.exit_code, "CommandResolver::resolve: failed");
            Ok(Resolution::Failed(detail))
        }
    }
}

#[cfg(test)]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Resolver answering from a fixed table; unknown modules resolve
    #[derive(Default)]
    pub struct MockResolver {
        answers: HashMap<String, Resolution>,
        calls: Mutex<Vec<String>>,
    }

    impl MockResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, module: &str, resolution: Resolution) -> Self {
            self.answers.insert(module.to_string(), resolution);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImportResolver for MockResolver {
        async fn resolve(&self, module: &str, _root: &Path) -> eyre::Result<Resolution> {
            self.calls.lock().unwrap().push(module.to_string());
            Ok(self.answers.get(module).cloned().unwrap_or(Resolution::Resolved))
        }
    }
}
