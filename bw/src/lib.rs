//! Bugwatch - pause, inform and resume a working agent from a bug-finding loop
//!
//! Two long-running workers share one workspace: a consumer doing incremental
//! work, and a detector loop inspecting the workspace for defects. They never
//! talk to each other directly; a shared [`Coordinator`] carries pause/resume
//! requests and findings between them, and a [`Supervisor`] runs both and
//! shuts them down together.
//!
//! # Core Concepts
//!
//! - **Checkpoints**: the consumer can only be suspended inside [`Coordinator::checkpoint`]
//! - **Severity Policy**: high findings pause the consumer, medium ones are just delivered
//! - **Data-Driven Tools**: linters and test runners are a command table in config
//! - **Joint Shutdown**: both tasks have stopped by the time a run returns
//!
//! # Modules
//!
//! - [`coordinator`] - Shared pause/resume/shutdown state and findings mailbox
//! - [`detector`] - Periodic workspace inspection and severity policy
//! - [`supervisor`] - Runs consumer and detector loop together
//! - [`consumer`] - Consumer trait and blocking-step adapter
//! - [`workspace`] - Filesystem provider the detector inspects
//! - [`config`] - Configuration types and loading

pub mod config;
pub mod consumer;
pub mod coordinator;
pub mod detector;
pub mod domain;
pub mod logging;
pub mod supervisor;
pub mod syntax;
pub mod workspace;

// Re-export commonly used types
pub use config::{Config, ConsumerConfig};
pub use consumer::{BlockingConsumer, Consumer, StepContext, StepOutcome, WorkStep};
pub use coordinator::{Coordinator, CoordinatorConfig, CoordinatorSnapshot};
pub use detector::{
    CommandResolver, DetectorConfig, DetectorLoop, DiagnosticFormat, ImportResolver, LinterSpec, LowSeverityPolicy,
    Reaction, Resolution, SeverityPolicy, TestSuiteSpec,
};
pub use domain::{Finding, FindingId, Location, Severity, category};
pub use logging::setup_logging;
pub use supervisor::{StatusProbe, Supervisor, SupervisorStatus, enrich_task_description};
pub use workspace::{FsWorkspace, Workspace, WorkspaceError};
