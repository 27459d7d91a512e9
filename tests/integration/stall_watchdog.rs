//! Stall watchdog behavior through the coordinator

use crate::integration::test_utils::{
    harness, job, recording_callback, test_config, ScriptedFrameSource,
};
use mosaic::config::MosaicConfig;
use mosaic::progress::Phase;
use mosaic::{GenerationCoordinator, JobError};
use std::time::Duration;

fn stall_config(timeout_secs: f64) -> MosaicConfig {
    let mut config = test_config(2);
    config.coordinator.stall_timeout_secs = timeout_secs;
    config.coordinator.watchdog_interval_ms = 20;
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hung_fetch_is_reported_as_stalled() {
    let h = harness(ScriptedFrameSource::new().hanging_at(3));
    let coordinator = GenerationCoordinator::new(h.services.clone(), stall_config(0.3)).unwrap();
    let (callback, events) = recording_callback();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        coordinator.submit(job("hung", 12), Some(callback)),
    )
    .await
    .expect("stalled job was never stopped")
    .unwrap();

    assert!(!result.success);
    assert!(!result.cancelled);
    match result.error {
        Some(JobError::Stalled { timeout }) => {
            assert_eq!(timeout, coordinator.config().coordinator.stall_timeout());
        }
        other => panic!("expected a stall, got {:?}", other),
    }
    assert!(result.elapsed >= Duration::from_millis(250));
    assert_eq!(h.sink.save_count(), 0);

    let stats = coordinator.stats();
    assert_eq!(stats.stalled, 1);
    assert_eq!(stats.failed, 1);
    assert!(coordinator.active_jobs().is_empty());

    let events = events.lock().clone();
    assert_eq!(events.last().map(|e| e.phase), Some(Phase::Failed));
    assert!(events.iter().any(|e| e.phase == Phase::Extracting));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_steady_progress_never_stalls() {
    // Each frame lands well inside the timeout, the whole job takes longer than it.
    let h = harness(ScriptedFrameSource::new().with_fetch_delay(Duration::from_millis(40)));
    let coordinator = GenerationCoordinator::new(h.services.clone(), stall_config(0.3)).unwrap();

    let result = coordinator.submit(job("steady", 16), None).await.unwrap();

    assert!(result.success, "{:?}", result.error);
    assert!(result.elapsed > Duration::from_millis(300));
    assert_eq!(coordinator.stats().stalled, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stall_does_not_affect_sibling_jobs() {
    let h = harness(ScriptedFrameSource::new().hanging_for("stuck"));
    let coordinator = GenerationCoordinator::new(h.services.clone(), stall_config(0.3)).unwrap();

    let jobs = vec![job("before", 8), job("stuck", 8), job("after", 8)];
    let stuck_id = jobs[1].id;
    let results = tokio::time::timeout(
        Duration::from_secs(5),
        coordinator.submit_batch(jobs, None),
    )
    .await
    .expect("batch never finished");

    assert_eq!(results.len(), 3);
    for result in &results {
        if result.job_id == stuck_id {
            assert!(matches!(result.error, Some(JobError::Stalled { .. })));
        } else {
            assert!(result.success, "{:?}", result.error);
        }
    }
    assert_eq!(h.sink.save_count(), 2);

    let stats = coordinator.stats();
    assert_eq!(stats.stalled, 1);
    assert_eq!(stats.completed, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stall_does_not_affect_other_coordinators() {
    let hung = harness(ScriptedFrameSource::new().hanging_at(0));
    let coordinator = GenerationCoordinator::new(hung.services.clone(), stall_config(0.3)).unwrap();
    let healthy = harness(ScriptedFrameSource::new());
    let sibling = GenerationCoordinator::new(healthy.services.clone(), stall_config(0.3)).unwrap();

    let (stalled, completed) = tokio::join!(
        coordinator.submit(job("stuck", 8), None),
        sibling.submit(job("fine", 8), None),
    );

    assert!(matches!(
        stalled.unwrap().error,
        Some(JobError::Stalled { .. })
    ));
    assert!(completed.unwrap().success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stalled_job_frees_its_admission_slot() {
    let h = harness(ScriptedFrameSource::new().hanging_at(1));
    let mut config = stall_config(0.2);
    config.coordinator.concurrency_limit = 1;
    let coordinator = GenerationCoordinator::new(h.services.clone(), config).unwrap();

    let results = tokio::time::timeout(
        Duration::from_secs(5),
        coordinator.submit_batch(vec![job("one", 4), job("two", 4)], None),
    )
    .await
    .expect("second job never admitted");

    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| matches!(r.error, Some(JobError::Stalled { .. }))));
    assert_eq!(coordinator.stats().stalled, 2);
}
