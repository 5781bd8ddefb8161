mod common;

use std::time::Duration;
use tokio::io::AsyncReadExt;

use common::{
    manager, manager_with, wait_for_processing, wait_for_terminal, FakeImages, FakeNarration,
    FAKE_VIDEO,
};
use text_to_video::{Domain, JobError, JobLimits, JobStatus, Resolution, Tone, VideoConfig};

fn scenario_config() -> VideoConfig {
    VideoConfig {
        tone: Tone::Formal,
        domain: Domain::Education,
        duration_seconds: 10,
        resolution: Resolution::new(64, 36),
        ..VideoConfig::default()
    }
}

const SCENARIO_TEXT: &str = "Cats are great. Dogs are loyal. Birds can fly.";

#[tokio::test]
async fn test_end_to_end_generation() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager(tmp.path());

    let job_id = manager
        .submit(SCENARIO_TEXT.to_string(), scenario_config())
        .await
        .unwrap();
    assert_eq!(manager.get_status(&job_id).await.unwrap().status, JobStatus::Queued);

    let job = wait_for_terminal(&manager, &job_id).await;
    assert_eq!(job.status, JobStatus::Completed, "error: {:?}", job.error);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());
    assert!(job.warnings.is_empty());

    let metrics = job.metrics.clone().unwrap();
    assert_eq!(metrics.frame_rate, 24.0);
    // 6s narration, one scene per sentence
    assert!((metrics.generation_cost - (6.0 * 0.05 + 3.0 * 0.02)).abs() < 1e-9);

    let jobs = manager.list_jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].job_id, job_id);

    let mut download = manager.download_artifact(&job_id).await.unwrap();
    let mut bytes = Vec::new();
    download.file.read_to_end(&mut bytes).await.unwrap();
    assert_eq!(bytes, FAKE_VIDEO);
    assert_eq!(download.size, FAKE_VIDEO.len() as u64);

    // Only the final video survives the run
    let video_path = job.video_path.clone().unwrap();
    assert!(video_path.exists());
    assert!(!tmp.path().join("work").join(&job_id).exists());

    manager.delete_job(&job_id).await.unwrap();
    assert!(matches!(manager.get_status(&job_id).await, Err(JobError::NotFound(_))));
    assert!(!video_path.exists());
    assert!(manager.list_jobs().await.is_empty());
}

#[tokio::test]
async fn test_invalid_submissions_create_no_job() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager(tmp.path());

    let err = manager.submit(String::new(), scenario_config()).await.unwrap_err();
    assert!(matches!(err, JobError::InvalidConfig(_)));

    let err = manager.submit("   \n".to_string(), scenario_config()).await.unwrap_err();
    assert!(matches!(err, JobError::InvalidConfig(_)));

    let zero_duration = VideoConfig { duration_seconds: 0, ..scenario_config() };
    let err = manager.submit(SCENARIO_TEXT.to_string(), zero_duration).await.unwrap_err();
    assert!(matches!(err, JobError::InvalidConfig(_)));

    let flat = VideoConfig { resolution: Resolution::new(1920, 0), ..scenario_config() };
    let err = manager.submit(SCENARIO_TEXT.to_string(), flat).await.unwrap_err();
    assert!(matches!(err, JobError::InvalidConfig(_)));

    assert!(manager.list_jobs().await.is_empty());
    assert_eq!(manager.stats().await.total, 0);
}

#[tokio::test]
async fn test_narration_failure_marks_job_failed() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager_with(
        tmp.path(),
        FakeNarration::failing(),
        FakeImages::ok(),
        JobLimits::default(),
    );

    let job_id = manager.submit(SCENARIO_TEXT.to_string(), scenario_config()).await.unwrap();
    let job = wait_for_terminal(&manager, &job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.clone().unwrap();
    assert!(error.contains("narrating"), "{}", error);
    assert!(error.contains("speech service is down"), "{}", error);
    assert!(job.metrics.is_none());
    assert!(!tmp.path().join("work").join(&job_id).exists());

    // Terminal snapshots never change
    let again = manager.get_status(&job_id).await.unwrap();
    assert_eq!(again, job);

    let err = manager.download_artifact(&job_id).await.unwrap_err();
    assert!(matches!(err, JobError::NotReady { .. }));
}

#[tokio::test]
async fn test_scene_failure_falls_back_and_completes() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager_with(
        tmp.path(),
        FakeNarration::ok(),
        FakeImages::failing_on(vec![1]),
        JobLimits::default(),
    );

    let job_id = manager.submit(SCENARIO_TEXT.to_string(), scenario_config()).await.unwrap();
    let job = wait_for_terminal(&manager, &job_id).await;

    assert_eq!(job.status, JobStatus::Completed, "error: {:?}", job.error);
    assert_eq!(job.warnings.len(), 1);
    assert!(job.warnings[0].contains("scene 2"));
    assert!(job.warnings[0].contains("image model out of memory"));

    // Two of three scenes generated at the default 0.85
    let fidelity = job.metrics.unwrap().scene_fidelity_score;
    assert!((fidelity - 0.85 * 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_cancel_processing_job_discards_result() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager_with(
        tmp.path(),
        FakeNarration::slow(Duration::from_millis(200)),
        FakeImages::ok(),
        JobLimits::default(),
    );

    let job_id = manager.submit(SCENARIO_TEXT.to_string(), scenario_config()).await.unwrap();
    let running = wait_for_processing(&manager, &job_id).await;
    assert_eq!(running.status, JobStatus::Processing);

    manager.cancel(&job_id).await.unwrap();
    assert_eq!(manager.get_status(&job_id).await.unwrap().status, JobStatus::Cancelled);

    // Let the in-flight stage finish; the run must stop at the next boundary
    tokio::time::sleep(Duration::from_millis(400)).await;
    let job = manager.get_status(&job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert!(job.video_path.is_none());
    assert!(!tmp.path().join("outputs").join(format!("{}.mp4", job_id)).exists());
    assert!(!tmp.path().join("work").join(&job_id).exists());

    let err = manager.cancel(&job_id).await.unwrap_err();
    assert!(matches!(err, JobError::NotCancellable { .. }));
}

#[tokio::test]
async fn test_delete_processing_job_discards_result() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager_with(
        tmp.path(),
        FakeNarration::slow(Duration::from_millis(200)),
        FakeImages::ok(),
        JobLimits::default(),
    );

    let job_id = manager.submit(SCENARIO_TEXT.to_string(), scenario_config()).await.unwrap();
    let running = wait_for_processing(&manager, &job_id).await;
    assert_eq!(running.status, JobStatus::Processing);

    manager.delete_job(&job_id).await.unwrap();
    assert!(matches!(manager.get_status(&job_id).await, Err(JobError::NotFound(_))));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(matches!(manager.get_status(&job_id).await, Err(JobError::NotFound(_))));
    assert!(manager.list_jobs().await.is_empty());
    assert!(!tmp.path().join("outputs").join(format!("{}.mp4", job_id)).exists());
    assert!(!tmp.path().join("work").join(&job_id).exists());
}

#[tokio::test]
async fn test_queue_rejects_past_capacity() {
    let tmp = tempfile::tempdir().unwrap();
    let limits = JobLimits { max_concurrent: 1, max_pending: 2 };
    let manager = manager_with(
        tmp.path(),
        FakeNarration::slow(Duration::from_millis(150)),
        FakeImages::ok(),
        limits,
    );

    let first = manager.submit(SCENARIO_TEXT.to_string(), scenario_config()).await.unwrap();
    let second = manager.submit(SCENARIO_TEXT.to_string(), scenario_config()).await.unwrap();
    let err = manager.submit(SCENARIO_TEXT.to_string(), scenario_config()).await.unwrap_err();
    assert!(matches!(err, JobError::QueueFull { capacity: 2 }));

    // One worker slot: the second job waits its turn
    wait_for_processing(&manager, &first).await;
    assert_eq!(manager.get_status(&second).await.unwrap().status, JobStatus::Queued);

    assert_eq!(wait_for_terminal(&manager, &first).await.status, JobStatus::Completed);
    assert_eq!(wait_for_terminal(&manager, &second).await.status, JobStatus::Completed);

    // Capacity frees up once jobs finish
    manager.submit(SCENARIO_TEXT.to_string(), scenario_config()).await.unwrap();
}

#[tokio::test]
async fn test_list_is_newest_first_and_stats_count() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager(tmp.path());

    let older = manager.submit("First job.".to_string(), scenario_config()).await.unwrap();
    let newer = manager.submit("Second job.".to_string(), scenario_config()).await.unwrap();

    let listed: Vec<String> = manager.list_jobs().await.into_iter().map(|s| s.job_id).collect();
    assert_eq!(listed, vec![newer.clone(), older.clone()]);

    wait_for_terminal(&manager, &older).await;
    wait_for_terminal(&manager, &newer).await;

    let stats = manager.stats().await;
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.queued + stats.processing + stats.failed + stats.cancelled, 0);
}

#[tokio::test]
async fn test_evict_terminal_jobs_removes_records_and_files() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager(tmp.path());

    let job_id = manager.submit(SCENARIO_TEXT.to_string(), scenario_config()).await.unwrap();
    let job = wait_for_terminal(&manager, &job_id).await;
    let video = job.video_path.unwrap();

    assert_eq!(manager.evict_terminal_jobs(chrono::Duration::hours(1)).await, 0);
    // An age reaching past the calendar keeps everything
    assert_eq!(manager.evict_terminal_jobs(chrono::Duration::days(100_000_000)).await, 0);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(manager.evict_terminal_jobs(chrono::Duration::zero()).await, 1);
    assert!(matches!(manager.get_status(&job_id).await, Err(JobError::NotFound(_))));
    assert!(!video.exists());
}

#[tokio::test]
async fn test_unknown_job_queries() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager(tmp.path());

    assert!(matches!(manager.get_status("nope").await, Err(JobError::NotFound(_))));
    assert!(matches!(manager.delete_job("nope").await, Err(JobError::NotFound(_))));
    assert!(matches!(manager.download_artifact("nope").await, Err(JobError::NotFound(_))));
    assert!(matches!(manager.cancel("nope").await, Err(JobError::NotFound(_))));
}

#[tokio::test]
async fn test_missing_video_file_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager(tmp.path());

    let job_id = manager.submit(SCENARIO_TEXT.to_string(), scenario_config()).await.unwrap();
    let job = wait_for_terminal(&manager, &job_id).await;
    std::fs::remove_file(job.video_path.unwrap()).unwrap();

    let err = manager.download_artifact(&job_id).await.unwrap_err();
    assert!(matches!(err, JobError::ArtifactMissing(_)));
}
