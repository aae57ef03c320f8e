//! Consumer side of the coordinator contract
//!
//! A [`Consumer`] performs the actual work on the workspace. It must call
//! [`Coordinator::checkpoint`] between units of work and stop once that
//! returns `false`. [`BlockingConsumer`] adapts synchronous step logic to that
//! contract, running each step on a blocking thread.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use eyre::{Context, Result};
use tracing::{debug, info};

use crate::config::ConsumerConfig;
use crate::coordinator::Coordinator;
use crate::domain::Finding;

/// Default turn limit for [`BlockingConsumer`]
pub const DEFAULT_MAX_TURNS: u32 = 30;

#[async_trait]
pub trait Consumer: Send + Sync + 'static {
    /// Work on `task` until done, failed, or shut down
    async fn run(&self, task: String, coordinator: Arc<Coordinator>) -> Result<String>;
}

/// Everything a step sees for one unit of work
#[derive(Debug, Clone)]
pub struct StepContext {
    pub task: String,

    /// 1-based turn number
    pub turn: u32,

    /// Findings drained from the coordinator since the previous turn
    pub findings: Vec<Finding>,

    /// Coordinator summary of recent findings
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Done(String),
}

/// One synchronous unit of work
pub trait WorkStep: Send + 'static {
    fn step(&mut self, ctx: &StepContext) -> Result<StepOutcome>;
}

impl<F> WorkStep for F
where
    F: FnMut(&StepContext) -> Result<StepOutcome> + Send + 'static,
{
    fn step(&mut self, ctx: &StepContext) -> Result<StepOutcome> {
        self(ctx)
    }
}

/// Drives a [`WorkStep`] turn by turn, checkpointing before each turn
pub struct BlockingConsumer<S> {
    step: Arc<Mutex<S>>,
    max_turns: u32,
}

impl<S: WorkStep> BlockingConsumer<S> {
    pub fn new(step: S) -> Self {
        debug!("BlockingConsumer::new: called");
        Self {
            step: Arc::new(Mutex::new(step)),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    /// Consumer with the turn limit from `[consumer]` config
    pub fn from_config(config: &ConsumerConfig, step: S) -> Self {
        debug!(max_turns = config.max_turns, "BlockingConsumer::from_config: called");
        Self::new(step).with_max_turns(config.max_turns)
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }
}

#[async_trait]
impl<S: WorkStep> Consumer for BlockingConsumer<S> {
    async fn run(&self, task: String, coordinator: Arc<Coordinator>) -> Result<String> {
        info!(max_turns = self.max_turns, "Consumer started");

        for turn in 1..=self.max_turns {
            if !coordinator.checkpoint().await {
                info!(turn, "Consumer stopping: shutdown requested");
                return Ok(format!("Stopped after {} turns: shutdown requested", turn - 1));
            }

            let ctx = StepContext {
                task: task.clone(),
                turn,
                findings: coordinator.drain_findings(),
                summary: coordinator.summary(),
            };
            debug!(turn, findings = ctx.findings.len(), "BlockingConsumer::run: starting step");

            let step = Arc::clone(&self.step);
            let outcome = tokio::task::spawn_blocking(move || {
                let mut step = step.lock().unwrap_or_else(PoisonError::into_inner);
                step.step(&ctx)
            })
            .await
            .wrap_err("Work step did not complete")?
            .wrap_err_with(|| format!("Work step failed on turn {}", turn))?;

            if let StepOutcome::Done(result) = outcome {
                info!(turn, "Consumer finished");
                return Ok(result);
            }
        }

        info!(max_turns = self.max_turns, "Consumer reached max turns");
        Ok(format!("Reached max turns ({})", self.max_turns))
    }
}
