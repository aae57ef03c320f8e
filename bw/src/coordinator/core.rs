//! Coordinator implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::domain::Finding;

use super::config::CoordinatorConfig;

/// Pause/resume/shutdown signals, published through a watch channel so every
/// waiter observes each transition
#[derive(Debug, Clone)]
struct Signals {
    pause_requested: bool,
    may_proceed: bool,
    shutdown_requested: bool,
    pause_reason: Option<String>,
    /// Bumped on every resume so a waiter released by a resume is not
    /// re-parked by a pause that lands before it wakes
    resumes: u64,
}

impl Default for Signals {
    fn default() -> Self {
        Self {
            pause_requested: false,
            may_proceed: true,
            shutdown_requested: false,
            pause_reason: None,
            resumes: 0,
        }
    }
}

/// A finding mirrored into the context log
#[derive(Debug, Clone)]
struct ContextEntry {
    finding: Finding,
    recorded_at: DateTime<Utc>,
}

/// Internal state protected by mutex
#[derive(Default)]
struct Mailbox {
    /// Findings not yet drained by the consumer (FIFO)
    pending: VecDeque<Finding>,

    /// Ring buffer of injected findings kept for summaries
    context_log: VecDeque<ContextEntry>,
}

/// Read-only view of coordinator state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorSnapshot {
    pub paused: bool,
    pub pause_reason: Option<String>,
    pub turn_count: u64,
    pub pending_findings: usize,
    pub context_entries: usize,

    /// When the newest context entry was recorded
    pub last_injected_at: Option<DateTime<Utc>>,
    pub shutdown_requested: bool,
}

/// Shared controller between the consumer and the detector loop
///
/// One instance per run, shared through an `Arc`. The detector loop pauses,
/// informs and resumes the consumer through it; the consumer only ever
/// suspends inside [`Coordinator::checkpoint`].
pub struct Coordinator {
    config: CoordinatorConfig,
    signals: watch::Sender<Signals>,
    mailbox: Mutex<Mailbox>,
    turn_count: AtomicU64,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl Coordinator {
    /// Create a new Coordinator with the given configuration
    pub fn new(config: CoordinatorConfig) -> Self {
        debug!(?config, "Coordinator::new: called");
        let (signals, _) = watch::channel(Signals::default());
        Self {
            config,
            signals,
            mailbox: Mutex::new(Mailbox::default()),
            turn_count: AtomicU64::new(0),
        }
    }

    fn mailbox(&self) -> MutexGuard<'_, Mailbox> {
        self.mailbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the consumer to pause at its next checkpoint
    ///
    /// No-op while already paused; the original reason is kept.
    pub fn request_pause(&self, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(%reason, "Coordinator::request_pause: called");
        let changed = self.signals.send_if_modified(|s| {
            if s.pause_requested {
                return false;
            }
            s.pause_requested = true;
            s.may_proceed = false;
            s.pause_reason = Some(reason.clone());
            true
        });

        if changed {
            info!(%reason, "Requesting consumer pause");
        } else {
            debug!("Coordinator::request_pause: already paused, ignoring");
        }
    }

    /// Let a paused consumer continue; no-op when not paused
    pub fn request_resume(&self) {
        debug!("Coordinator::request_resume: called");
        let changed = self.signals.send_if_modified(|s| {
            if !s.pause_requested {
                return false;
            }
            s.pause_requested = false;
            s.may_proceed = true;
            s.pause_reason = None;
            s.resumes += 1;
            true
        });

        if changed {
            info!("Requesting consumer resume");
        } else {
            debug!("Coordinator::request_resume: not paused, ignoring");
        }
    }

    /// Queue a finding for the consumer and mirror it into the context log
    pub fn inject(&self, finding: Finding) {
        info!(
            id = %finding.id().short(),
            category = %finding.category(),
            severity = %finding.severity(),
            "Injecting finding"
        );
        let capacity = self.config.context_log_capacity;
        let mut mailbox = self.mailbox();

        if capacity > 0 {
            while mailbox.context_log.len() >= capacity {
                debug!("Coordinator::inject: context log full, evicting oldest entry");
                mailbox.context_log.pop_front();
            }
            mailbox.context_log.push_back(ContextEntry {
                finding: finding.clone(),
                recorded_at: Utc::now(),
            });
        }

        mailbox.pending.push_back(finding);
    }

    /// Consumer checkpoint between units of work
    ///
    /// Suspends while a pause is requested, until resumed or shut down.
    /// Returns `false` once shutdown has been requested.
    pub async fn checkpoint(&self) -> bool {
        let turn = self.turn_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(turn, "Coordinator::checkpoint: called");

        let mut rx = self.signals.subscribe();
        let (pause_requested, entered_at) = {
            let s = rx.borrow_and_update();
            (s.pause_requested && !s.shutdown_requested, s.resumes)
        };

        if pause_requested {
            info!(turn, reason = ?self.pause_reason(), "Consumer paused at checkpoint");
            let released = rx
                .wait_for(|s| s.may_proceed || s.shutdown_requested || s.resumes != entered_at)
                .await
                .is_ok();
            if !released {
                debug!("Coordinator::checkpoint: signal channel closed");
                return false;
            }
            info!(turn, "Consumer resumed at checkpoint");
        }

        let keep_running = !self.is_shutdown();
        debug!(turn, keep_running, "Coordinator::checkpoint: returning");
        keep_running
    }

    /// Remove and return every pending finding, oldest first
    pub fn drain_findings(&self) -> Vec<Finding> {
        let drained: Vec<Finding> = self.mailbox().pending.drain(..).collect();
        debug!(count = drained.len(), "Coordinator::drain_findings: called");
        drained
    }

    /// Rollup of the most recent context entries, most recent last
    pub fn summary(&self) -> String {
        debug!("Coordinator::summary: called");
        let mailbox = self.mailbox();
        if mailbox.context_log.is_empty() {
            return "No additional context.".to_string();
        }

        let take = self.config.effective_summary_entries();
        let skip = mailbox.context_log.len().saturating_sub(take);

        let mut summary = String::from("Additional context from the detector loop:\n");
        for entry in mailbox.context_log.iter().skip(skip) {
            let finding = &entry.finding;
            summary.push_str(&format!(
                "- {}: {} - {}\n",
                finding.severity().as_str().to_uppercase(),
                finding.category(),
                finding.description()
            ));
            if let Some(remedy) = finding.remedy() {
                summary.push_str(&format!("  Suggested fix: {}\n", remedy));
            }
        }
        summary
    }

    /// One-way shutdown; releases any consumer parked in a checkpoint
    pub fn shutdown(&self) {
        debug!("Coordinator::shutdown: called");
        let first = self.signals.send_if_modified(|s| {
            let first = !s.shutdown_requested;
            s.shutdown_requested = true;
            s.may_proceed = true;
            first
        });
        if first {
            info!("Coordinator shutting down");
        }
    }

    /// Resolves once shutdown has been requested
    pub async fn wait_for_shutdown(&self) {
        debug!("Coordinator::wait_for_shutdown: called");
        let mut rx = self.signals.subscribe();
        // The sender lives as long as `self`, so this only errors if we are being torn down
        let _ = rx.wait_for(|s| s.shutdown_requested).await;
    }

    pub fn is_paused(&self) -> bool {
        self.signals.borrow().pause_requested
    }

    pub fn pause_reason(&self) -> Option<String> {
        self.signals.borrow().pause_reason.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.signals.borrow().shutdown_requested
    }

    pub fn turn_count(&self) -> u64 {
        self.turn_count.load(Ordering::SeqCst)
    }

    /// Mailbox depth
    pub fn pending_findings(&self) -> usize {
        self.mailbox().pending.len()
    }

    pub fn context_len(&self) -> usize {
        self.mailbox().context_log.len()
    }

    /// Everything observable at once
    pub fn snapshot(&self) -> CoordinatorSnapshot {
        debug!("Coordinator::snapshot: called");
        let (paused, pause_reason, shutdown_requested) = {
            let s = self.signals.borrow();
            (s.pause_requested, s.pause_reason.clone(), s.shutdown_requested)
        };
        let (pending_findings, context_entries, last_injected_at) = {
            let mailbox = self.mailbox();
            (
                mailbox.pending.len(),
                mailbox.context_log.len(),
                mailbox.context_log.back().map(|e| e.recorded_at),
            )
        };

        CoordinatorSnapshot {
            paused,
            pause_reason,
            turn_count: self.turn_count(),
            pending_findings,
            context_entries,
            last_injected_at,
            shutdown_requested,
        }
    }
}
