//! Coordinator shared by the consumer and the detector loop
//!
//! The Coordinator mediates everything the two workers exchange:
//! - **Pause/resume:** the detector loop parks the consumer at its next checkpoint
//! - **Inject/drain:** findings flow one way, detector to consumer, in FIFO order
//! - **Shutdown:** one-way, releases any parked checkpoint

mod config;
mod core;

pub use config::{CoordinatorConfig, MAX_SUMMARY_ENTRIES};
pub use core::{Coordinator, CoordinatorSnapshot};
