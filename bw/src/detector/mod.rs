//! Detector loop: periodic workspace inspection
//!
//! Each pass runs the configured linters and test suite plus three in-process
//! scans (TODO/FIXME comments, oversized files, unresolvable imports), then
//! applies [`SeverityPolicy`] to every finding against the coordinator.

pub mod command;
mod config;
mod core;
pub mod diagnostics;
mod policy;
pub mod resolver;
pub mod stdlib;

pub use config::{DetectorConfig, DiagnosticFormat, ImportScanConfig, LinterSpec, LowSeverityPolicy, TestSuiteSpec};
pub use core::DetectorLoop;
pub use policy::{Reaction, SeverityPolicy};
pub use resolver::{CommandResolver, ImportResolver, Resolution};
