//! Supervisor: runs the consumer and the detector loop against one coordinator
//!
//! The supervisor owns the run's [`Coordinator`], spawns both workers as
//! independent tasks, waits for the consumer, then shuts the coordinator down
//! and joins the detector loop. Whatever happens to the consumer, both tasks
//! have terminated by the time [`Supervisor::run`] returns.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::{Result, bail, eyre};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::consumer::Consumer;
use crate::coordinator::Coordinator;
use crate::detector::DetectorLoop;
use crate::domain::Finding;

/// Read-only view of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorStatus {
    pub running: bool,
    pub consumer_active: bool,
    pub detector_active: bool,
    pub paused: bool,
    pub pause_reason: Option<String>,
    pub turn_count: u64,
    pub pending_findings: usize,
}

/// Cloneable handle that reports [`SupervisorStatus`] from any task
#[derive(Clone)]
pub struct StatusProbe {
    coordinator: Arc<Coordinator>,
    running: Arc<AtomicBool>,
    consumer_active: Arc<AtomicBool>,
    detector_active: Arc<AtomicBool>,
}

impl StatusProbe {
    fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            coordinator,
            running: Arc::new(AtomicBool::new(false)),
            consumer_active: Arc::new(AtomicBool::new(false)),
            detector_active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn status(&self) -> SupervisorStatus {
        debug!("StatusProbe::status: called");
        let snapshot = self.coordinator.snapshot();
        SupervisorStatus {
            running: self.running.load(Ordering::SeqCst),
            consumer_active: self.consumer_active.load(Ordering::SeqCst),
            detector_active: self.detector_active.load(Ordering::SeqCst),
            paused: snapshot.paused,
            pause_reason: snapshot.pause_reason,
            turn_count: snapshot.turn_count,
            pending_findings: snapshot.pending_findings,
        }
    }
}

/// Marks a task active until dropped, whether it finished or was aborted
struct ActiveGuard(Arc<AtomicBool>);

impl ActiveGuard {
    fn arm(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(Arc::clone(flag))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns one coordinator and the two workers wired to it
pub struct Supervisor<C: Consumer> {
    coordinator: Arc<Coordinator>,
    consumer: Arc<C>,
    detector: Option<DetectorLoop>,
    consumer_task: Option<JoinHandle<Result<String>>>,
    detector_task: Option<JoinHandle<()>>,
    probe: StatusProbe,
}

impl<C: Consumer> Supervisor<C> {
    /// Wire a consumer and a detector loop that shares `coordinator`
    pub fn new(coordinator: Arc<Coordinator>, consumer: C, detector: DetectorLoop) -> Result<Self> {
        debug!("Supervisor::new: called");
        if !Arc::ptr_eq(&coordinator, detector.coordinator()) {
            bail!("Detector loop is wired to a different coordinator");
        }
        Ok(Self {
            probe: StatusProbe::new(Arc::clone(&coordinator)),
            coordinator,
            consumer: Arc::new(consumer),
            detector: Some(detector),
            consumer_task: None,
            detector_task: None,
        })
    }

    /// Build the coordinator and a directory-backed detector loop from config
    pub fn from_config(config: &Config, root: impl Into<PathBuf>, consumer: C) -> Result<Self> {
        let root = root.into();
        debug!(?root, "Supervisor::from_config: called");
        let coordinator = Arc::new(Coordinator::new(config.coordinator.clone()));
        let detector = DetectorLoop::for_directory(config.detector.clone(), Arc::clone(&coordinator), root);
        Self::new(coordinator, consumer, detector)
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn probe(&self) -> StatusProbe {
        self.probe.clone()
    }

    pub fn status(&self) -> SupervisorStatus {
        self.probe.status()
    }

    /// Run the consumer on `task` with the detector loop alongside
    ///
    /// Returns the consumer's result. A consumer failure is returned after
    /// the detector loop has stopped.
    pub async fn run(&mut self, task: &str) -> Result<String> {
        debug!(%task, "Supervisor::run: called");
        if self.coordinator.is_shutdown() {
            bail!("Coordinator is already shut down");
        }
        let detector = self.detector.take().ok_or_else(|| eyre!("Supervisor has already run"))?;

        self.probe.running.store(true, Ordering::SeqCst);
        info!("Supervisor starting consumer and detector loop");

        let pending = self.coordinator.drain_findings();
        let task = if pending.is_empty() {
            task.to_string()
        } else {
            info!(count = pending.len(), "Folding pending findings into the task");
            enrich_task_description(task, &pending)
        };

        let detector_guard = ActiveGuard::arm(&self.probe.detector_active);
        self.detector_task = Some(tokio::spawn(async move {
            let _active = detector_guard;
            detector.run().await;
        }));

        let consumer = Arc::clone(&self.consumer);
        let coordinator = Arc::clone(&self.coordinator);
        let consumer_guard = ActiveGuard::arm(&self.probe.consumer_active);
        self.consumer_task = Some(tokio::spawn(async move {
            let _active = consumer_guard;
            consumer.run(task, coordinator).await
        }));

        let joined = match self.consumer_task.as_mut() {
            Some(handle) => handle.await,
            None => return Err(eyre!("Consumer task missing")),
        };
        self.consumer_task = None;

        let outcome = match joined {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(eyre!("Consumer task was cancelled")),
            Err(e) => Err(eyre!("Consumer task panicked: {}", e)),
        };

        self.coordinator.shutdown();
        let detector_result = join_task("detector", self.detector_task.take()).await;
        self.probe.running.store(false, Ordering::SeqCst);

        match outcome {
            Ok(result) => {
                detector_result?;
                info!("Supervisor run complete");
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "Consumer failed");
                if let Err(shutdown_err) = detector_result {
                    warn!(error = %shutdown_err, "Detector loop did not stop cleanly");
                }
                Err(e)
            }
        }
    }

    /// Shut the coordinator down and cancel any task still running
    pub async fn shutdown(&mut self) -> Result<()> {
        debug!("Supervisor::shutdown: called");
        self.coordinator.shutdown();

        let consumer = cancel_task("consumer", self.consumer_task.take()).await;
        let detector = cancel_task("detector", self.detector_task.take()).await;
        self.probe.running.store(false, Ordering::SeqCst);
        info!("Supervisor shut down");

        consumer.and(detector)
    }
}

impl<C: Consumer> Drop for Supervisor<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.consumer_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.detector_task.take() {
            handle.abort();
        }
    }
}

/// Await a task; cancellation counts as a normal stop
async fn join_task<T>(name: &str, handle: Option<JoinHandle<T>>) -> Result<()> {
    let Some(handle) = handle else {
        return Ok(());
    };
    match handle.await {
        Ok(_) => Ok(()),
        Err(e) if e.is_cancelled() => {
            debug!(%name, "join_task: cancelled");
            Ok(())
        }
        Err(e) => Err(eyre!("{} task panicked: {}", name, e)),
    }
}

/// Abort a task if it is still running, then await it
async fn cancel_task<T>(name: &str, handle: Option<JoinHandle<T>>) -> Result<()> {
    if let Some(handle) = &handle {
        if !handle.is_finished() {
            debug!(%name, "cancel_task: aborting");
            handle.abort();
        }
    }
    join_task(name, handle).await
}

/// Append a findings block to a task description
pub fn enrich_task_description(original: &str, findings: &[Finding]) -> String {
    debug!(count = findings.len(), "enrich_task_description: called");
    if findings.is_empty() {
        return original.to_string();
    }

    let mut enriched = format!("{}\n\n=== DETECTOR FINDINGS ===\n", original);
    enriched.push_str("The detector loop has found the following issues:\n\n");
    for finding in findings {
        let _ = writeln!(
            enriched,
            "{}: {}",
            finding.category().to_uppercase(),
            finding.description()
        );
        if let Some(location) = finding.location() {
            let _ = writeln!(enriched, "   File: {}", location);
        }
        if let Some(remedy) = finding.remedy() {
            let _ = writeln!(enriched, "   Suggested fix: {}", remedy);
        }
        let _ = writeln!(enriched, "   Severity: {}\n", finding.severity());
    }
    enriched.push_str("Please address these issues in your implementation.\n");
    enriched.push_str("==========================================\n");
    enriched
}
