//! Domain types shared by the detector loop, coordinator and consumer

mod finding;
mod severity;

pub use finding::{Finding, FindingId, Location};
pub use severity::Severity;

/// Category tags produced by the built-in detectors
pub mod category {
    pub const LINTING_ERROR: &str = "linting_error";
    pub const TEST_FAILURE: &str = "test_failure";
    pub const TODO_COMMENT: &str = "todo_comment";
    pub const LARGE_FILE: &str = "large_file";
    pub const MISSING_IMPORT: &str = "missing_import";
    pub const IMPORT_ERROR: &str = "import_error";
}
