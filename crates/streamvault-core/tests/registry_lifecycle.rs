//! Integration tests for the capture registry with a fake launcher.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use streamvault_core::fakes::{FakeAcknowledger, FakeLauncher, FakeProber, FakeTransfer};
use streamvault_core::{
    CaptureConfig, CaptureRegistry, PipelineConfig, RegistryError, ReplayPipeline, SourceIdentity,
    TerminationReason, ValidationConfig, ValidationGate,
};

struct Harness {
    registry: Arc<CaptureRegistry>,
    launcher: Arc<FakeLauncher>,
    acknowledge: Arc<FakeAcknowledger>,
}

/// Registry wired to fakes; validation bounds are relaxed so the tiny files
/// the tests write still pass the gate.
fn harness(dir: &Path) -> Harness {
    let launcher = Arc::new(FakeLauncher::new());
    let acknowledge = Arc::new(FakeAcknowledger::with_status(200));

    let validation = ValidationConfig {
        min_file_bytes: 1,
        ..ValidationConfig::default()
    };
    let gate = ValidationGate::new(Arc::new(FakeProber::with_duration(120.0)), validation);
    let pipeline = Arc::new(ReplayPipeline::new(
        gate,
        Arc::new(FakeTransfer::succeeding()),
        acknowledge.clone(),
        PipelineConfig {
            max_attempts: 3,
            quarantine_dir: dir.join("quarantine"),
        },
        425,
    ));

    let registry = CaptureRegistry::new(
        launcher.clone(),
        pipeline,
        CaptureConfig {
            recordings_dir: dir.to_path_buf(),
            input_url_template: "rtmp://ingest/live/{source}".to_string(),
        },
    );

    Harness {
        registry,
        launcher,
        acknowledge,
    }
}

async fn wait_for_active_count(registry: &CaptureRegistry, expected: usize) {
    for _ in 0..200 {
        if registry.active_count().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "registry never reached {} active sessions (currently {})",
        expected,
        registry.active_count().await
    );
}

#[tokio::test]
async fn concurrent_start_same_key_spawns_exactly_one_capture() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path());
    let source = SourceIdentity::new("chan");

    let (a, b) = tokio::join!(
        h.registry.start(&source, "odysee"),
        h.registry.start(&source, "odysee"),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one start must win");
    let already = [a, b]
        .into_iter()
        .filter(|r| matches!(r, Err(RegistryError::AlreadyRecording(_))))
        .count();
    assert_eq!(already, 1, "the loser must see AlreadyRecording");

    assert_eq!(h.launcher.launch_count(), 1);
    assert_eq!(h.registry.active_count().await, 1);
}

#[tokio::test]
async fn session_keys_are_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path());

    h.registry
        .start(&SourceIdentity::new("Chan"), "live")
        .await
        .expect("first start");

    let err = h
        .registry
        .start(&SourceIdentity::new("CHAN"), "LIVE")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRecording(_)));
    assert_eq!(h.launcher.launch_count(), 1);
}

#[tokio::test]
async fn stop_without_session_is_not_recording() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path());

    let err = h
        .registry
        .stop(&SourceIdentity::new("chan"), "odysee")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotRecording(_)));
}

#[tokio::test]
async fn stop_kills_capture_and_skips_processing() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path());
    let source = SourceIdentity::new("chan");

    h.registry.start(&source, "odysee").await.expect("start");
    h.registry.stop(&source, "odysee").await.expect("stop");

    // The stop-induced kill flows through the termination callback.
    wait_for_active_count(&h.registry, 0).await;

    // A killed capture is never handed to the pipeline.
    assert_eq!(h.acknowledge.request_count(), 0);
}

#[tokio::test]
async fn abnormal_termination_deregisters_without_processing() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path());
    let source = SourceIdentity::new("chan");

    h.registry.start(&source, "odysee").await.expect("start");
    assert!(h.launcher.end_capture("chan", TerminationReason::Abnormal));

    wait_for_active_count(&h.registry, 0).await;
    assert_eq!(h.acknowledge.request_count(), 0);
}

#[tokio::test]
async fn normal_termination_dispatches_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path());
    let source = SourceIdentity::new("chan");

    let output = h.registry.start(&source, "odysee").await.expect("start");

    // Simulate the external process having produced a capture file.
    std::fs::write(&output, b"finished capture").unwrap();
    assert!(h.launcher.end_capture("chan", TerminationReason::Normal));

    wait_for_active_count(&h.registry, 0).await;

    // The pipeline runs fire-and-forget; wait for the success path to
    // acknowledge, delete the file, and drain the in-flight gauge.
    for _ in 0..200 {
        if h.acknowledge.request_count() == 1
            && !output.exists()
            && h.registry.pipeline_in_flight() == 0
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("completed capture was never processed");
}

#[tokio::test]
async fn same_source_sessions_terminate_independently() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path());
    let source = SourceIdentity::new("chan");

    h.registry.start(&source, "odysee").await.expect("start odysee");
    h.registry.start(&source, "bitwave").await.expect("start bitwave");
    assert_eq!(h.registry.active_count().await, 2);

    // Ending one capture must leave the other session live.
    assert!(h.launcher.end_capture("chan", TerminationReason::Abnormal));
    wait_for_active_count(&h.registry, 1).await;

    assert!(h.launcher.end_capture("chan", TerminationReason::Abnormal));
    wait_for_active_count(&h.registry, 0).await;
}

#[tokio::test]
async fn key_is_reusable_after_termination() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path());
    let source = SourceIdentity::new("chan");

    h.registry.start(&source, "odysee").await.expect("start");
    assert!(h.launcher.end_capture("chan", TerminationReason::Abnormal));
    wait_for_active_count(&h.registry, 0).await;

    h.registry
        .start(&source, "odysee")
        .await
        .expect("restart after termination");
    assert_eq!(h.launcher.launch_count(), 2);
}

#[tokio::test]
async fn output_paths_are_timestamped_per_capture() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path());

    let output = h
        .registry
        .start(&SourceIdentity::new("chan"), "odysee")
        .await
        .expect("start");

    let name = output.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("chan_odysee_"));
    assert!(name.ends_with(".flv"));
    assert_eq!(h.launcher.launched_outputs(), vec![output]);
}
