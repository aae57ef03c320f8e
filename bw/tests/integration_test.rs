//! Integration tests for bugwatch
//!
//! These tests drive the public API end to end: a real directory workspace,
//! the detector loop, and a supervisor running both workers.

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bugwatch::{
    BlockingConsumer, Config, Consumer, ConsumerConfig, Coordinator, DetectorConfig, DetectorLoop, Finding, Severity, StepContext,
    StepOutcome, Supervisor, category,
};
use eyre::{Result, eyre};
use tempfile::TempDir;

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

/// Detector config that needs no Python or Node tooling
fn hermetic_config() -> DetectorConfig {
    let mut config = DetectorConfig {
        interval_ms: 10,
        pause_grace_ms: 20,
        ..DetectorConfig::scans_only()
    };
    config.import_scan.resolver_command =
        sh("echo \"ModuleNotFoundError: No module named '{module}'\" >&2; exit 1");
    config
}

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    for (name, content) in files {
        fs::write(temp.path().join(name), content).expect("Failed to write fixture");
    }
    temp
}

// =============================================================================
// Coordinator Tests
// =============================================================================

#[tokio::test]
async fn test_mailbox_preserves_injection_order() {
    let coordinator = Coordinator::default();
    coordinator.inject(Finding::new(category::TODO_COMMENT, "low one", Severity::Low));
    coordinator.inject(Finding::new(category::MISSING_IMPORT, "high one", Severity::High));
    coordinator.inject(Finding::new(category::LARGE_FILE, "medium one", Severity::Medium));

    let drained = coordinator.drain_findings();
    let severities: Vec<Severity> = drained.iter().map(|f| f.severity()).collect();
    assert_eq!(severities, vec![Severity::Low, Severity::High, Severity::Medium]);
    assert!(coordinator.drain_findings().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_only_high_severity_pauses() {
    let temp = workspace(&[]);
    let coordinator = Arc::new(Coordinator::default());
    let detector = Arc::new(DetectorLoop::for_directory(
        DetectorConfig {
            pause_grace_ms: 1_000,
            ..hermetic_config()
        },
        Arc::clone(&coordinator),
        temp.path(),
    ));

    for (severity, expect_pause) in [(Severity::Low, false), (Severity::High, true), (Severity::Medium, false)] {
        let finding = Finding::new("synthetic", format!("{} finding", severity), severity);
        let reacting = {
            let detector = Arc::clone(&detector);
            tokio::spawn(async move { detector.react(&finding).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(coordinator.is_paused(), expect_pause, "severity {}", severity);
        reacting.await.unwrap();
        assert!(!coordinator.is_paused());
    }

    // Low is discarded by default; high and medium were delivered in order
    let drained = coordinator.drain_findings();
    let severities: Vec<Severity> = drained.iter().map(|f| f.severity()).collect();
    assert_eq!(severities, vec![Severity::High, Severity::Medium]);
}

#[tokio::test(start_paused = true)]
async fn test_high_finding_parks_consumer_for_grace_period() {
    let temp = workspace(&[]);
    let coordinator = Arc::new(Coordinator::default());
    let detector = Arc::new(DetectorLoop::for_directory(
        DetectorConfig {
            pause_grace_ms: 1_000,
            ..hermetic_config()
        },
        Arc::clone(&coordinator),
        temp.path(),
    ));

    // Checkpoints every 10ms; returns once a finding arrives
    let consumer = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            while coordinator.checkpoint().await {
                let findings = coordinator.drain_findings();
                if !findings.is_empty() {
                    return Some((started.elapsed(), findings));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            None
        })
    };
    tokio::task::yield_now().await;

    let finding = Finding::new(category::MISSING_IMPORT, "No module named 'gone'", Severity::High);
    let reacting = {
        let detector = Arc::clone(&detector);
        tokio::spawn(async move { detector.react(&finding).await })
    };
    tokio::task::yield_now().await;
    assert!(coordinator.is_paused());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!consumer.is_finished());
    assert_eq!(coordinator.turn_count(), 2);

    let (elapsed, findings) = consumer.await.unwrap().expect("consumer saw the finding");
    assert!(elapsed >= Duration::from_millis(1_000));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].category(), category::MISSING_IMPORT);
    assert_eq!(coordinator.turn_count(), 2);

    reacting.await.unwrap();
    assert!(!coordinator.is_paused());
}

#[tokio::test]
async fn test_checkpoint_blocks_until_resume() {
    let coordinator = Arc::new(Coordinator::default());
    coordinator.request_pause("first");
    coordinator.request_pause("second");
    assert_eq!(coordinator.pause_reason().as_deref(), Some("first"));

    let waiter = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.checkpoint().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    coordinator.request_resume();
    let keep_running = tokio::time::timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap();
    assert!(keep_running);
}

#[tokio::test]
async fn test_shutdown_releases_paused_checkpoint() {
    let coordinator = Arc::new(Coordinator::default());
    coordinator.request_pause("never resumed");

    let waiter = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.checkpoint().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    coordinator.shutdown();

    let keep_running = tokio::time::timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap();
    assert!(!keep_running);
    assert!(!coordinator.checkpoint().await);
}

// =============================================================================
// Detector Loop Tests
// =============================================================================

#[tokio::test]
async fn test_todo_comment_on_line_three() {
    let temp = workspace(&[("app.py", "def main():\n    pass\n# TODO fix me\n")]);
    let coordinator = Arc::new(Coordinator::default());
    let mut detector = DetectorLoop::for_directory(hermetic_config(), coordinator, temp.path());

    let findings = detector.check_once().await;
    let todo = findings
        .iter()
        .find(|f| f.category() == category::TODO_COMMENT)
        .expect("todo finding");

    assert_eq!(todo.severity(), Severity::Low);
    let location = todo.location().expect("location");
    assert_eq!(location.file, temp.path().join("app.py"));
    assert_eq!(location.line, Some(3));
}

#[tokio::test]
async fn test_missing_import_names_package() {
    let temp = workspace(&[("app.py", "import nonexistent_module_xyz\n")]);
    let coordinator = Arc::new(Coordinator::default());
    let mut detector = DetectorLoop::for_directory(hermetic_config(), Arc::clone(&coordinator), temp.path());

    let findings = detector.check_once().await;
    let missing = findings
        .iter()
        .find(|f| f.category() == category::MISSING_IMPORT)
        .expect("missing import finding");

    assert_eq!(missing.severity(), Severity::High);
    assert!(missing.remedy().expect("remedy").contains("nonexistent_module_xyz"));
    assert_eq!(coordinator.pending_findings(), 1);
    assert!(!coordinator.is_paused());
}

#[tokio::test]
async fn test_missing_import_behind_try_and_relative_import() {
    let temp = workspace(&[(
        "app.py",
        "from .import sibling\ntry: import nonexistent_module_xyz\nexcept ImportError: pass\n",
    )]);
    let coordinator = Arc::new(Coordinator::default());
    let mut detector = DetectorLoop::for_directory(hermetic_config(), coordinator, temp.path());

    let findings = detector.check_once().await;
    let missing: Vec<&Finding> = findings
        .iter()
        .filter(|f| f.category() == category::MISSING_IMPORT)
        .collect();

    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].location().expect("location").line, Some(2));
}

#[tokio::test]
async fn test_broken_tools_do_not_abort_pass() {
    let temp = workspace(&[("app.py", "# FIXME\n"), ("test_app.py", "")]);
    let mut config = hermetic_config();
    config.tests = Some(bugwatch::TestSuiteSpec {
        patterns: vec!["test_*.py".to_string()],
        command: vec!["no-such-test-runner-xyz".to_string()],
    });
    config.import_scan.resolver_command = vec!["no-such-interpreter-xyz".to_string()];
    let coordinator = Arc::new(Coordinator::default());
    let mut detector = DetectorLoop::for_directory(config, coordinator, temp.path());

    let findings = detector.check_once().await;
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].category(), category::TODO_COMMENT);
}

// =============================================================================
// Supervisor Tests
// =============================================================================

struct Exploding;

#[async_trait]
impl Consumer for Exploding {
    async fn run(&self, _task: String, coordinator: Arc<Coordinator>) -> Result<String> {
        coordinator.checkpoint().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        Err(eyre!("consumer exploded"))
    }
}

#[tokio::test]
async fn test_failing_consumer_leaves_no_dangling_detector() {
    let temp = workspace(&[("app.py", "import nonexistent_module_xyz\n")]);
    let coordinator = Arc::new(Coordinator::default());
    let detector = DetectorLoop::for_directory(hermetic_config(), Arc::clone(&coordinator), temp.path());
    let mut supervisor = Supervisor::new(Arc::clone(&coordinator), Exploding, detector).unwrap();

    let err = supervisor.run("task").await.unwrap_err();
    assert!(err.to_string().contains("consumer exploded"));

    let status = supervisor.status();
    assert!(!status.running);
    assert!(!status.consumer_active);
    assert!(!status.detector_active);
    assert!(coordinator.is_shutdown());
}

#[tokio::test]
async fn test_consumer_receives_detector_findings() {
    let temp = workspace(&[("app.py", "import nonexistent_module_xyz\n")]);
    let config = Config {
        detector: hermetic_config(),
        consumer: ConsumerConfig { max_turns: 500 },
        ..Config::default()
    };

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let consumer = BlockingConsumer::from_config(&config.consumer, move |ctx: &StepContext| -> Result<StepOutcome> {
        let mut seen = recorder.lock().unwrap();
        seen.extend(ctx.findings.iter().map(|f| f.category().to_string()));
        if seen.iter().any(|c| c == category::MISSING_IMPORT) {
            return Ok(StepOutcome::Done(format!("fixed after {} turns", ctx.turn)));
        }
        std::thread::sleep(Duration::from_millis(10));
        Ok(StepOutcome::Continue)
    });

    let mut supervisor = Supervisor::from_config(&config, temp.path(), consumer).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(30), supervisor.run("Make app.py importable"))
        .await
        .expect("run timed out")
        .unwrap();

    assert!(result.starts_with("fixed after"));
    assert!(seen.lock().unwrap().contains(&category::MISSING_IMPORT.to_string()));
    assert!(!supervisor.status().detector_active);
}

#[tokio::test]
async fn test_supervisor_shutdown_cancels_consumer() {
    let temp = workspace(&[]);
    let coordinator = Arc::new(Coordinator::default());
    let detector = DetectorLoop::for_directory(hermetic_config(), Arc::clone(&coordinator), temp.path());
    let consumer = BlockingConsumer::new(|_: &StepContext| -> Result<StepOutcome> {
        std::thread::sleep(Duration::from_millis(5));
        Ok(StepOutcome::Continue)
    })
    .with_max_turns(u32::MAX);
    let mut supervisor = Supervisor::new(Arc::clone(&coordinator), consumer, detector).unwrap();
    let probe = supervisor.probe();

    let _ = tokio::time::timeout(Duration::from_millis(100), supervisor.run("forever")).await;
    assert!(probe.status().consumer_active);
    assert!(probe.status().turn_count > 0);

    supervisor.shutdown().await.unwrap();
    let status = probe.status();
    assert!(!status.consumer_active);
    assert!(!status.detector_active);
}
