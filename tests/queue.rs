//! End-to-end tests for the file queue against a scripted engine.
//!
//! The engine blocks each call on a channel until the test releases it, which
//! makes the serialization, cancellation, and stale-update windows
//! deterministic without sleeping for fixed amounts of time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use farscribe::engine::{EngineError, EngineRequest, ProgressFn, TranscriptionEngine};
use farscribe::media::MediaRef;
use farscribe::queue::{FileQueueManager, JobId, QueueConfig};
use farscribe::segments::Segment;

type EngineResult = Result<Vec<Segment>, EngineError>;

/// Engine whose calls block until the test sends a scripted result.
struct GatedEngine {
    gate: Mutex<mpsc::Receiver<EngineResult>>,
    calls: AtomicUsize,
}

impl GatedEngine {
    fn new() -> (Arc<Self>, mpsc::Sender<EngineResult>) {
        let (tx, rx) = mpsc::channel();
        let engine = Arc::new(Self {
            gate: Mutex::new(rx),
            calls: AtomicUsize::new(0),
        });
        (engine, tx)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TranscriptionEngine for GatedEngine {
    fn transcribe(&self, _request: &EngineRequest, progress: &ProgressFn) -> EngineResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        progress(10);
        let gate = self.gate.lock().expect("engine gate lock");
        gate.recv()
            .unwrap_or_else(|_| Err(EngineError::Model("engine gate closed".to_owned())))
    }
}

fn segments() -> Vec<Segment> {
    vec![
        Segment::new(0.0, 5.5, "سلام دنیا").expect("valid segment"),
        Segment::new(5.5, 7.0, "hello").expect("valid segment"),
    ]
}

fn config() -> QueueConfig {
    QueueConfig {
        engine_timeout: Duration::from_secs(30),
        language: Some("fa".to_owned()),
    }
}

/// Poll until `check` passes. Bounded so a broken queue fails the test
/// instead of hanging it.
async fn wait_for(what: &str, check: impl Fn() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for: {what}");
}

fn is_processing(queue: &FileQueueManager, id: JobId) -> bool {
    queue.job(id).is_some_and(|job| job.state.is_processing())
}

#[tokio::test]
async fn engine_dispatch_is_serialized_fifo() {
    let (engine, release) = GatedEngine::new();
    let queue = FileQueueManager::new(engine.clone(), config());

    let a = queue.add_job("a.mp3", MediaRef::path("a.mp3")).unwrap();
    let b = queue.add_job("b.mp3", MediaRef::path("b.mp3")).unwrap();

    queue.transcribe(a).unwrap();
    queue.transcribe(b).unwrap();

    wait_for("a to reach processing", || is_processing(&queue, a)).await;
    // The job flips to processing before the run task enters the engine, so
    // the call count gets its own gate.
    wait_for("the engine to be entered for a", || engine.calls() == 1).await;

    // b queued behind a: still pending, never dispatched, invariant holds.
    assert!(matches!(
        queue.job(b).unwrap().state,
        farscribe::queue::JobState::Pending
    ));
    assert_eq!(queue.processing_count(), 1);
    assert_eq!(engine.calls(), 1);

    // Releasing a completes it and dispatches b immediately.
    release.send(Ok(segments())).unwrap();
    wait_for("a to complete", || {
        queue.job(a).unwrap().transcript().is_some()
    })
    .await;
    wait_for("b to reach processing", || is_processing(&queue, b)).await;
    assert_eq!(queue.processing_count(), 1);

    release.send(Ok(segments())).unwrap();
    wait_for("b to complete", || {
        queue.job(b).unwrap().transcript().is_some()
    })
    .await;

    assert_eq!(queue.job(a).unwrap().progress(), 100);
    assert_eq!(engine.calls(), 2);
}

#[tokio::test]
async fn engine_failure_marks_only_that_job() {
    let (engine, release) = GatedEngine::new();
    let queue = FileQueueManager::new(engine, config());

    let a = queue.add_job("a.mp3", MediaRef::path("a.mp3")).unwrap();
    let b = queue.add_job("b.mp3", MediaRef::path("b.mp3")).unwrap();

    queue.transcribe(a).unwrap();
    queue.transcribe(b).unwrap();
    wait_for("a to reach processing", || is_processing(&queue, a)).await;

    release
        .send(Err(EngineError::Model("model exploded".to_owned())))
        .unwrap();

    wait_for("a to fail", || {
        queue.job(a).unwrap().error_detail().is_some()
    })
    .await;
    assert!(
        queue
            .job(a)
            .unwrap()
            .error_detail()
            .unwrap()
            .contains("model exploded")
    );

    // The failure released the slot; b proceeds untouched.
    wait_for("b to reach processing", || is_processing(&queue, b)).await;
    release.send(Ok(segments())).unwrap();
    wait_for("b to complete", || {
        queue.job(b).unwrap().transcript().is_some()
    })
    .await;
}

#[tokio::test]
async fn cancelling_the_active_job_frees_the_slot_immediately() {
    let (engine, release) = GatedEngine::new();
    let queue = FileQueueManager::new(engine, config());

    let a = queue.add_job("a.mp3", MediaRef::path("a.mp3")).unwrap();
    let b = queue.add_job("b.mp3", MediaRef::path("b.mp3")).unwrap();

    queue.transcribe(a).unwrap();
    queue.transcribe(b).unwrap();
    wait_for("a to reach processing", || is_processing(&queue, a)).await;

    queue.cancel(a);

    wait_for("a to be cancelled", || {
        queue.job(a).unwrap().error_detail().is_some()
    })
    .await;
    assert!(
        queue
            .job(a)
            .unwrap()
            .error_detail()
            .unwrap()
            .contains("cancelled")
    );

    // The next queued job dispatches without waiting for the orphaned call.
    wait_for("b to reach processing", || is_processing(&queue, b)).await;

    // The orphaned engine call for a eventually returns; its result must be
    // discarded, not attached to anything.
    release.send(Ok(segments())).unwrap();
    release.send(Ok(segments())).unwrap();
    wait_for("b to complete", || {
        queue.job(b).unwrap().transcript().is_some()
    })
    .await;
    assert!(queue.job(a).unwrap().error_detail().is_some());
}

#[tokio::test]
async fn engine_timeout_fails_the_job() {
    let (engine, _release) = GatedEngine::new();
    let queue = FileQueueManager::new(
        engine,
        QueueConfig {
            engine_timeout: Duration::from_millis(50),
            language: None,
        },
    );

    let a = queue.add_job("a.mp3", MediaRef::path("a.mp3")).unwrap();
    queue.transcribe(a).unwrap();

    wait_for("a to time out", || {
        queue.job(a).unwrap().error_detail().is_some()
    })
    .await;
    assert!(
        queue
            .job(a)
            .unwrap()
            .error_detail()
            .unwrap()
            .contains("timed out")
    );
}

#[tokio::test]
async fn unsupported_media_fails_before_reaching_the_engine() {
    let (engine, _release) = GatedEngine::new();
    let queue = FileQueueManager::new(engine.clone(), config());

    let a = queue.add_job("slides.pdf", MediaRef::path("slides.pdf")).unwrap();
    queue.transcribe(a).unwrap();

    wait_for("a to fail preflight", || {
        queue.job(a).unwrap().error_detail().is_some()
    })
    .await;
    assert!(
        queue
            .job(a)
            .unwrap()
            .error_detail()
            .unwrap()
            .contains("unsupported media container")
    );
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn invalid_engine_segments_fail_the_job() {
    let (engine, release) = GatedEngine::new();
    let queue = FileQueueManager::new(engine, config());

    let a = queue.add_job("a.mp3", MediaRef::path("a.mp3")).unwrap();
    queue.transcribe(a).unwrap();
    wait_for("a to reach processing", || is_processing(&queue, a)).await;

    // Overlapping segments violate the transcript invariant.
    let overlapping = vec![
        Segment::new(0.0, 2.0, "a").unwrap(),
        Segment::new(1.0, 3.0, "b").unwrap(),
    ];
    release.send(Ok(overlapping)).unwrap();

    wait_for("a to fail validation", || {
        queue.job(a).unwrap().error_detail().is_some()
    })
    .await;
    assert!(
        queue
            .job(a)
            .unwrap()
            .error_detail()
            .unwrap()
            .contains("invalid transcript")
    );
}

#[tokio::test]
async fn transcribe_is_a_no_op_for_completed_jobs() {
    let (engine, release) = GatedEngine::new();
    let queue = FileQueueManager::new(engine.clone(), config());

    let a = queue.add_job("a.mp3", MediaRef::path("a.mp3")).unwrap();
    queue.transcribe(a).unwrap();
    wait_for("a to reach processing", || is_processing(&queue, a)).await;
    release.send(Ok(segments())).unwrap();
    wait_for("a to complete", || {
        queue.job(a).unwrap().transcript().is_some()
    })
    .await;

    queue.transcribe(a).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(engine.calls(), 1, "completed job must not re-dispatch");
}

#[tokio::test]
async fn retranscribe_runs_a_fresh_cycle() {
    let (engine, release) = GatedEngine::new();
    let queue = FileQueueManager::new(engine.clone(), config());

    let a = queue.add_job("a.mp3", MediaRef::path("a.mp3")).unwrap();
    queue.transcribe(a).unwrap();
    wait_for("a to reach processing", || is_processing(&queue, a)).await;
    release.send(Ok(segments())).unwrap();
    wait_for("a to complete", || {
        queue.job(a).unwrap().transcript().is_some()
    })
    .await;

    queue.retranscribe(a).unwrap();
    wait_for("a to re-enter processing", || is_processing(&queue, a)).await;
    wait_for("fresh progress from the engine", || {
        queue.job(a).unwrap().progress() == 10
    })
    .await;

    release.send(Ok(segments())).unwrap();
    wait_for("a to complete again", || {
        queue.job(a).unwrap().transcript().is_some()
    })
    .await;
    assert_eq!(engine.calls(), 2);
}

#[tokio::test]
async fn removing_the_active_job_dispatches_the_next_one() {
    let (engine, release) = GatedEngine::new();
    let queue = FileQueueManager::new(engine, config());

    let a = queue.add_job("a.mp3", MediaRef::path("a.mp3")).unwrap();
    let b = queue.add_job("b.mp3", MediaRef::path("b.mp3")).unwrap();

    queue.transcribe(a).unwrap();
    queue.transcribe(b).unwrap();
    wait_for("a to reach processing", || is_processing(&queue, a)).await;

    queue.remove_job(a);
    assert!(queue.job(a).is_none());
    assert_eq!(queue.selected().unwrap().id, b);

    wait_for("b to reach processing", || is_processing(&queue, b)).await;
    release.send(Ok(segments())).unwrap();
    release.send(Ok(segments())).unwrap();
    wait_for("b to complete", || {
        queue.job(b).unwrap().transcript().is_some()
    })
    .await;
}

#[tokio::test]
async fn stale_progress_updates_are_discarded_after_cancellation() {
    let (engine, release) = GatedEngine::new();
    let queue = FileQueueManager::new(engine, config());

    let a = queue.add_job("a.mp3", MediaRef::path("a.mp3")).unwrap();
    queue.transcribe(a).unwrap();
    wait_for("a to reach processing", || is_processing(&queue, a)).await;
    wait_for("initial progress from the engine", || {
        queue.job(a).unwrap().progress() == 10
    })
    .await;

    queue.progress_update(a, 250);
    assert_eq!(queue.job(a).unwrap().progress(), 100, "clamped to 100");

    queue.cancel(a);
    wait_for("a to be cancelled", || {
        queue.job(a).unwrap().error_detail().is_some()
    })
    .await;

    // Late updates racing the cancellation must not resurrect the job.
    queue.progress_update(a, 70);
    assert!(queue.job(a).unwrap().error_detail().is_some());
    assert_eq!(queue.job(a).unwrap().progress(), 0);

    release.send(Ok(segments())).unwrap();
}

#[tokio::test]
async fn completed_transcript_exports_end_to_end() {
    let (engine, release) = GatedEngine::new();
    let queue = FileQueueManager::new(engine, config());

    let a = queue.add_job("a.mp3", MediaRef::path("a.mp3")).unwrap();
    queue.transcribe(a).unwrap();
    wait_for("a to reach processing", || is_processing(&queue, a)).await;
    release.send(Ok(segments())).unwrap();
    wait_for("a to complete", || {
        queue.job(a).unwrap().transcript().is_some()
    })
    .await;

    let snapshot = queue.job(a).unwrap();
    let transcript = snapshot.transcript().unwrap();
    let exported = farscribe::export::export(transcript, farscribe::ExportFormat::Srt);
    assert!(
        exported
            .content
            .starts_with("1\n00:00:00,000 --> 00:00:05,500\nسلام دنیا\n\n")
    );

    let hits = farscribe::search::search(transcript.segments(), "سلام");
    assert_eq!(hits.len(), 1);
}
