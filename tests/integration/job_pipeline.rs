//! End-to-end job pipeline: retries, placeholders, cancellation, failures, progress

use crate::integration::test_utils::{
    harness, harness_with, job, recording_callback, test_config, wait_until, RecordingCompositor,
    RecordingSink, ScriptedFrameSource,
};
use mosaic::error::SourceError;
use mosaic::job::JobState;
use mosaic::progress::{Phase, ProgressCallback, ProgressEvent};
use mosaic::services::{FilePersistenceSink, Services};
use mosaic::{GenerationCoordinator, JobError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

#[tokio::test]
async fn test_clean_run_places_every_slot_once() {
    let h = harness(ScriptedFrameSource::new());
    let coordinator = GenerationCoordinator::new(h.services.clone(), test_config(1)).unwrap();

    let result = coordinator.submit(job("clean", 12), None).await.unwrap();

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.state(), JobState::Completed);
    assert!((12..=16).contains(&result.placed_count));
    assert_eq!(result.placeholder_count, 0);

    let mut indices: Vec<usize> = h.compositor.placements().iter().map(|p| p.index).collect();
    indices.sort_unstable();
    assert_eq!(indices, (0..result.placed_count).collect::<Vec<_>>());
    assert!(h.compositor.flushes() >= 1);

    let saved = h.sink.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].file_stem, "clean");
    assert_eq!(saved[0].format, "png");
    assert_eq!(
        result.artifact.unwrap().path(),
        std::path::Path::new("memory/clean.png")
    );
}

#[tokio::test]
async fn test_frames_recovered_on_retry_need_no_placeholders() {
    let source = ScriptedFrameSource::new().failing(7, 1).failing(23, 1);
    let h = harness(source);
    let coordinator = GenerationCoordinator::new(h.services.clone(), test_config(1)).unwrap();

    let result = coordinator.submit(job("retry", 30), None).await.unwrap();

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.placeholder_count, 0);
    assert!(h.compositor.placeholder_indices().is_empty());
    assert_eq!(h.source.attempts(7), 2);
    assert_eq!(h.source.attempts(23), 2);
    assert_eq!(h.source.attempts(0), 1);
}

#[tokio::test]
async fn test_frame_failing_twice_becomes_placeholder() {
    let source = ScriptedFrameSource::new().failing(7, 2);
    let h = harness(source);
    let coordinator = GenerationCoordinator::new(h.services.clone(), test_config(1)).unwrap();

    let result = coordinator.submit(job("placeholder", 12), None).await.unwrap();

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.placeholder_count, 1);
    assert_eq!(h.compositor.placeholder_indices(), vec![7]);
    assert_eq!(h.source.attempts(7), 2);

    // The placeholder keeps slot 7's layout-assigned rectangle.
    let placements = h.compositor.placements();
    let slot = placements.iter().find(|p| p.index == 7).unwrap();
    assert!(slot.size.width > 0 && slot.size.height > 0);
}

#[tokio::test]
async fn test_every_frame_failing_exhausts_the_job() {
    let h = harness(ScriptedFrameSource::new().failing_everything());
    let coordinator = GenerationCoordinator::new(h.services.clone(), test_config(1)).unwrap();

    let result = coordinator.submit(job("dead", 8), None).await.unwrap();

    assert!(!result.success);
    assert!(!result.cancelled);
    assert!(matches!(
        result.error,
        Some(JobError::FrameFetchExhausted { attempted }) if attempted >= 8
    ));
    assert_eq!(h.sink.save_count(), 0);
    assert!(h.compositor.placements().is_empty());
    assert_eq!(coordinator.stats().failed, 1);
}

#[tokio::test]
async fn test_probe_failure_is_reported_in_result() {
    let source = ScriptedFrameSource::new()
        .with_probe_error(SourceError::Unavailable("no such file".to_string()));
    let h = harness(source);
    let coordinator = GenerationCoordinator::new(h.services.clone(), test_config(1)).unwrap();

    let result = coordinator.submit(job("missing", 8), None).await.unwrap();

    assert!(!result.success);
    assert_eq!(
        result.error,
        Some(JobError::Source(SourceError::Unavailable(
            "no such file".to_string()
        )))
    );
    assert_eq!(h.source.total_attempts(), 0);
}

#[tokio::test]
async fn test_item_count_derived_from_duration() {
    let h = harness(ScriptedFrameSource::new());
    let coordinator = GenerationCoordinator::new(h.services.clone(), test_config(1)).unwrap();
    let mut derived = job("derived", 1);
    derived.config.item_count = None;

    let result = coordinator.submit(derived, None).await.unwrap();

    // 600 s at 1920 px: round(9.6 + 10 ln 600) = 74
    assert!(result.success, "{:?}", result.error);
    assert!(result.placed_count >= 74);
}

#[tokio::test]
async fn test_progress_is_phase_monotonic() {
    let h = harness(ScriptedFrameSource::new().failing(2, 1));
    let coordinator = GenerationCoordinator::new(h.services.clone(), test_config(1)).unwrap();
    let (callback, events) = recording_callback();

    let result = coordinator.submit(job("progress", 16), Some(callback)).await.unwrap();
    assert!(result.success);

    let events = events.lock().clone();
    assert_eq!(events.first().map(|e| e.phase), Some(Phase::Queued));
    assert_eq!(events.last().map(|e| e.phase), Some(Phase::Completed));
    assert!(events.iter().all(|e| e.job_id == result.job_id));

    for pair in events.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            b.phase > a.phase || (b.phase == a.phase && b.fraction > a.fraction),
            "{:?} followed by {:?}",
            a,
            b
        );
    }

    let phases: Vec<Phase> = {
        let mut phases: Vec<Phase> = events.iter().map(|e| e.phase).collect();
        phases.dedup();
        phases
    };
    assert_eq!(
        phases,
        vec![
            Phase::Queued,
            Phase::Analyzing,
            Phase::ComputingLayout,
            Phase::Extracting,
            Phase::Compositing,
            Phase::Saving,
            Phase::Completed,
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_during_extraction_skips_save() {
    let h = harness(ScriptedFrameSource::new().with_fetch_delay(Duration::from_millis(20)));
    let coordinator = GenerationCoordinator::new(h.services.clone(), test_config(1)).unwrap();

    let handle: Arc<OnceLock<GenerationCoordinator>> = Arc::new(OnceLock::new());
    let cancel_from = Arc::clone(&handle);
    let (record, events) = recording_callback();
    let callback: ProgressCallback = Arc::new(move |event: &ProgressEvent| {
        record(event);
        if event.phase == Phase::Extracting && event.fraction > 0.0 {
            if let Some(coordinator) = cancel_from.get() {
                coordinator.cancel(event.job_id);
            }
        }
    });
    let _ = handle.set(coordinator.clone());

    let result = coordinator.submit(job("cancelled", 24), Some(callback)).await.unwrap();

    assert!(result.cancelled);
    assert!(!result.success);
    assert_eq!(result.state(), JobState::Cancelled);
    assert_eq!(h.sink.save_count(), 0);
    assert!(coordinator.active_jobs().is_empty());
    assert_eq!(coordinator.stats().cancelled, 1);

    let events = events.lock().clone();
    assert_eq!(events.last().map(|e| e.phase), Some(Phase::Cancelled));
    assert_eq!(
        events.iter().filter(|e| e.phase.is_terminal()).count(),
        1,
        "exactly one terminal event"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_refused_once_saving_starts() {
    let h = harness_with(
        ScriptedFrameSource::new(),
        RecordingCompositor::default(),
        RecordingSink::with_save_delay(Duration::from_millis(200)),
    );
    let coordinator = GenerationCoordinator::new(h.services.clone(), test_config(1)).unwrap();

    let handle: Arc<OnceLock<GenerationCoordinator>> = Arc::new(OnceLock::new());
    let cancel_from = Arc::clone(&handle);
    let refused = Arc::new(AtomicBool::new(false));
    let refused_in_cb = Arc::clone(&refused);
    let callback: ProgressCallback = Arc::new(move |event: &ProgressEvent| {
        if event.phase == Phase::Saving && event.fraction == 0.0 {
            if let Some(coordinator) = cancel_from.get() {
                refused_in_cb.store(!coordinator.cancel(event.job_id), Ordering::SeqCst);
            }
        }
    });
    let _ = handle.set(coordinator.clone());

    let result = coordinator.submit(job("committed", 8), Some(callback)).await.unwrap();

    assert!(refused.load(Ordering::SeqCst));
    assert!(result.success, "{:?}", result.error);
    assert!(!result.cancelled);
    assert_eq!(h.sink.save_count(), 1);
    assert_eq!(coordinator.stats().cancelled, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_during_slow_save_leaves_job_completed() {
    let h = harness_with(
        ScriptedFrameSource::new(),
        RecordingCompositor::default(),
        RecordingSink::with_save_delay(Duration::from_millis(200)),
    );
    let coordinator = GenerationCoordinator::new(h.services.clone(), test_config(1)).unwrap();
    let target = job("slow_save", 8);
    let target_id = target.id;

    let run = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.submit(target, None).await })
    };
    assert!(wait_until(Duration::from_secs(2), || h.sink.save_count() > 0).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!coordinator.cancel(target_id));
    assert_eq!(coordinator.cancel_all(), 0);

    let result = run.await.unwrap().unwrap();
    assert!(result.success, "{:?}", result.error);
    assert_eq!(h.sink.save_count(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn test_slow_flush_lets_other_tasks_run() {
    let h = harness_with(
        ScriptedFrameSource::new(),
        RecordingCompositor::with_flush_delay(Duration::from_millis(30)),
        RecordingSink::default(),
    );
    let coordinator = GenerationCoordinator::new(h.services.clone(), test_config(1)).unwrap();

    let ticks = Arc::new(AtomicUsize::new(0));
    let ticker = {
        let ticks = Arc::clone(&ticks);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(5)).await;
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    let result = coordinator.submit(job("flush", 12), None).await.unwrap();
    ticker.abort();

    assert!(result.success, "{:?}", result.error);
    assert!(h.compositor.flushes() >= 1);
    assert!(result.elapsed >= Duration::from_millis(30) * h.compositor.flushes() as u32);
    assert!(ticks.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn test_artifact_written_through_file_sink() {
    let temp = tempfile::tempdir().unwrap();
    let h = harness(ScriptedFrameSource::new());
    let services = Services::new(
        h.services.frame_source.clone(),
        h.services.compositor.clone(),
        Arc::new(FilePersistenceSink::new(temp.path().join("out"))),
        h.services.resources.clone(),
    );
    let coordinator = GenerationCoordinator::new(services, test_config(1)).unwrap();

    let result = coordinator.submit(job("holiday", 9), None).await.unwrap();

    assert!(result.success, "{:?}", result.error);
    let location = result.artifact.unwrap();
    assert!(location.path().starts_with(temp.path().join("out")));
    let name = location.path().file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("holiday_grid_search_"), "{}", name);
    assert!(name.ends_with(".png"));
    assert!(location.path().exists());
}

#[tokio::test]
async fn test_each_slot_is_fetched_once() {
    let h = harness(ScriptedFrameSource::new());
    let coordinator = GenerationCoordinator::new(h.services.clone(), test_config(1)).unwrap();
    let result = coordinator.submit(job("once", 20), None).await.unwrap();
    assert!(result.success);
    assert_eq!(h.source.total_attempts(), result.placed_count);
}
