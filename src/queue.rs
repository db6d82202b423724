//! The file queue: job lifecycle, engine dispatch, and selection.
//!
//! One [`FileQueueManager`] instance owns every job for the lifetime of a
//! session and is the only writer of job state. The transcription engine is
//! assumed to serve a single shared model instance, so dispatch is serialized:
//! at most one job is `Processing` at any instant, and later `transcribe`
//! requests queue FIFO behind the active run.
//!
//! The engine call itself is blocking, so it runs on a blocking worker thread
//! and is raced against a cancellation token and a configured timeout. A
//! per-dispatch generation counter makes stale completions and stale progress
//! updates harmless: once a run is cancelled or times out, anything the
//! orphaned engine call still reports is discarded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::{EngineError, EngineRequest, TranscriptionEngine};
use crate::error::{Error, Result};
use crate::media::MediaRef;
use crate::segments::Transcript;

/// Session-unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of one job.
///
/// The payloads enforce the state contract by construction: a transcript
/// exists only on `Completed`, an error detail only on `Failed`, progress
/// only on `Processing`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing { progress: u8 },
    Completed { transcript: Transcript },
    #[serde(rename = "error")]
    Failed { detail: String },
}

impl JobState {
    pub fn is_processing(&self) -> bool {
        matches!(self, JobState::Processing { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. })
    }
}

/// Read-only view of a job, handed to callers. Mutation happens only through
/// the manager.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub name: String,
    #[serde(flatten)]
    pub state: JobState,
}

impl JobSnapshot {
    /// Progress in percent. Completed jobs report 100; pending and failed
    /// jobs report 0.
    pub fn progress(&self) -> u8 {
        match &self.state {
            JobState::Processing { progress } => *progress,
            JobState::Completed { .. } => 100,
            JobState::Pending | JobState::Failed { .. } => 0,
        }
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        match &self.state {
            JobState::Completed { transcript } => Some(transcript),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { detail } => Some(detail),
            _ => None,
        }
    }
}

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Bound on a single engine call; expiry is treated as an engine failure.
    pub engine_timeout: Duration,
    /// Language hint forwarded to the engine. `None` asks it to auto-detect.
    pub language: Option<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            engine_timeout: Duration::from_secs(15 * 60),
            language: Some("fa".to_owned()),
        }
    }
}

struct Job {
    id: JobId,
    name: String,
    media: MediaRef,
    state: JobState,
}

struct ActiveRun {
    id: JobId,
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct QueueState {
    jobs: Vec<Job>,
    waiting: VecDeque<JobId>,
    active: Option<ActiveRun>,
    selected: Option<JobId>,
    next_generation: u64,
}

impl QueueState {
    fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    fn job_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|job| job.id == id)
    }
}

/// Owns the set of submitted jobs and drives each through its lifecycle.
///
/// Cheap to clone; clones share the same queue. Requires a Tokio runtime to
/// exist when constructed (engine calls are spawned onto it).
#[derive(Clone)]
pub struct FileQueueManager {
    inner: Arc<Inner>,
}

struct Inner {
    engine: Arc<dyn TranscriptionEngine>,
    config: QueueConfig,
    runtime: Handle,
    state: Mutex<QueueState>,
}

impl FileQueueManager {
    /// Create a manager bound to the current Tokio runtime.
    pub fn new(engine: Arc<dyn TranscriptionEngine>, config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                config,
                runtime: Handle::current(),
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Create a job in `Pending`. Does not start any work.
    ///
    /// The first job added becomes the selection if nothing is selected yet.
    pub fn add_job(&self, name: impl Into<String>, media: MediaRef) -> Result<JobId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::validation("job name must be non-empty"));
        }

        let id = JobId::new();
        let mut state = self.lock();
        state.jobs.push(Job {
            id,
            name: name.clone(),
            media,
            state: JobState::Pending,
        });
        if state.selected.is_none() {
            state.selected = Some(id);
        }
        info!(%id, %name, "job added");
        Ok(id)
    }

    /// Delete a job regardless of state. Removing an unknown id is a no-op,
    /// which tolerates UI races between removal and completion.
    ///
    /// Removing the active job cancels its run and frees the engine slot for
    /// the next queued job. If the removed job was selected, selection falls
    /// back to the first remaining job.
    pub fn remove_job(&self, id: JobId) {
        let mut state = self.lock();
        if state.job(id).is_none() {
            return;
        }

        if state.active.as_ref().is_some_and(|run| run.id == id) {
            let run = state.active.take().expect("active run checked above");
            run.cancel.cancel();
            warn!(%id, "active job removed; run cancelled");
        }

        state.waiting.retain(|waiting| *waiting != id);
        state.jobs.retain(|job| job.id != id);
        if state.selected == Some(id) {
            state.selected = state.jobs.first().map(|job| job.id);
        }
        info!(%id, "job removed");

        self.dispatch_next(&mut state);
    }

    /// Remove every job unconditionally and cancel the active run.
    pub fn clear_all(&self) {
        let mut state = self.lock();
        if let Some(run) = state.active.take() {
            run.cancel.cancel();
        }
        state.jobs.clear();
        state.waiting.clear();
        state.selected = None;
        info!("queue cleared");
    }

    /// Request transcription of a job.
    ///
    /// No-op (not an error) when the job is already processing, completed,
    /// or queued. Otherwise the job is dispatched immediately if the engine
    /// slot is free, or queued FIFO behind the active run.
    pub fn transcribe(&self, id: JobId) -> Result<()> {
        let mut state = self.lock();
        let job = state
            .job(id)
            .ok_or_else(|| Error::validation(format!("unknown job {id}")))?;

        if matches!(
            job.state,
            JobState::Processing { .. } | JobState::Completed { .. }
        ) || state.waiting.contains(&id)
        {
            return Ok(());
        }

        // Retrying a failed job starts a fresh cycle.
        let job = state.job_mut(id).expect("job existence checked above");
        job.state = JobState::Pending;

        state.waiting.push_back(id);
        self.dispatch_next(&mut state);
        Ok(())
    }

    /// Explicitly re-run a completed or failed job, discarding its previous
    /// transcript or error. No-op while the job is processing or queued.
    pub fn retranscribe(&self, id: JobId) -> Result<()> {
        {
            let mut state = self.lock();
            let job = state
                .job(id)
                .ok_or_else(|| Error::validation(format!("unknown job {id}")))?;
            if job.state.is_processing() || state.waiting.contains(&id) {
                return Ok(());
            }
            let job = state.job_mut(id).expect("job existence checked above");
            job.state = JobState::Pending;
        }
        self.transcribe(id)
    }

    /// Cancel a run. For the active job this transitions it to `error` with a
    /// distinct "cancelled" detail and frees the engine slot; a queued job is
    /// simply dropped from the wait list and stays pending.
    pub fn cancel(&self, id: JobId) {
        let mut state = self.lock();
        if state.active.as_ref().is_some_and(|run| run.id == id) {
            // The run's own task observes the token and performs the state
            // transition, so completion and cancellation share one path.
            let run = state.active.as_ref().expect("active run checked above");
            run.cancel.cancel();
            return;
        }
        state.waiting.retain(|waiting| *waiting != id);
    }

    /// Record best-effort progress for the processing job.
    ///
    /// Clamped to 0..=100; ignored whenever the job is not the active
    /// processing job, which guards against stale updates racing a
    /// cancellation or completion.
    pub fn progress_update(&self, id: JobId, percent: i64) {
        let mut state = self.lock();
        if !state.active.as_ref().is_some_and(|run| run.id == id) {
            return;
        }
        if let Some(job) = state.job_mut(id) {
            if let JobState::Processing { progress } = &mut job.state {
                *progress = percent.clamp(0, 100) as u8;
            }
        }
    }

    /// Select a job. Returns false (and leaves the selection alone) for an
    /// unknown id.
    pub fn select(&self, id: JobId) -> bool {
        let mut state = self.lock();
        if state.job(id).is_none() {
            return false;
        }
        state.selected = Some(id);
        true
    }

    /// Snapshot of the selected job, if any.
    pub fn selected(&self) -> Option<JobSnapshot> {
        let state = self.lock();
        state.selected.and_then(|id| state.job(id)).map(snapshot)
    }

    /// Snapshot of one job.
    pub fn job(&self, id: JobId) -> Option<JobSnapshot> {
        self.lock().job(id).map(snapshot)
    }

    /// Snapshots of every job, in insertion order.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        self.lock().jobs.iter().map(snapshot).collect()
    }

    /// Number of jobs currently processing. The queue serializes dispatch, so
    /// this is always 0 or 1.
    pub fn processing_count(&self) -> usize {
        self.lock()
            .jobs
            .iter()
            .filter(|job| job.state.is_processing())
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(|poisoned| {
            // A panic while holding the lock is a bug, but poisoned job state
            // is still consistent enough to read and to fail jobs against.
            poisoned.into_inner()
        })
    }

    /// Dispatch the next waiting job if the engine slot is free.
    ///
    /// Called with the state lock held; spawning the run task does not block.
    fn dispatch_next(&self, state: &mut QueueState) {
        if state.active.is_some() {
            return;
        }

        while let Some(id) = state.waiting.pop_front() {
            // Jobs can be removed while waiting; skip anything that no longer
            // exists or has moved on.
            let Some(job) = state.job_mut(id) else {
                continue;
            };
            if !matches!(job.state, JobState::Pending) {
                continue;
            }

            job.state = JobState::Processing { progress: 0 };
            let request = EngineRequest {
                media: job.media.clone(),
                language: self.inner.config.language.clone(),
            };

            let generation = state.next_generation;
            state.next_generation += 1;
            let cancel = CancellationToken::new();
            state.active = Some(ActiveRun {
                id,
                generation,
                cancel: cancel.clone(),
            });

            info!(%id, generation, "job dispatched to engine");
            let inner = self.inner.clone();
            self.inner
                .runtime
                .spawn(async move { inner.run(id, generation, request, cancel).await });
            return;
        }
    }
}

impl Inner {
    /// Execute one engine run and apply its outcome.
    async fn run(
        self: Arc<Self>,
        id: JobId,
        generation: u64,
        request: EngineRequest,
        cancel: CancellationToken,
    ) {
        let outcome = self.clone().call_engine(id, generation, request, cancel).await;
        self.finish_run(id, generation, outcome);
    }

    async fn call_engine(
        self: Arc<Self>,
        id: JobId,
        generation: u64,
        request: EngineRequest,
        cancel: CancellationToken,
    ) -> std::result::Result<Transcript, String> {
        // Refuse containers the pipeline cannot decode before burning the
        // engine slot on them.
        request.media.preflight().map_err(|err| err.to_string())?;

        let engine = self.engine.clone();
        let progress_inner = self.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let progress = move |percent: u8| {
                progress_inner.progress_from_engine(id, generation, percent);
            };
            engine.transcribe(&request, &progress)
        });

        let engine_result = tokio::select! {
            _ = cancel.cancelled() => return Err(EngineError::Cancelled.to_string()),
            joined = tokio::time::timeout(self.config.engine_timeout, handle) => match joined {
                Err(_elapsed) => return Err(EngineError::Timeout.to_string()),
                Ok(Err(_join_error)) => {
                    return Err(EngineError::Model("engine call panicked".to_owned()).to_string());
                }
                Ok(Ok(result)) => result,
            },
        };

        match engine_result {
            // Engines are untrusted: re-validate ordering and overlap before
            // attaching the transcript.
            Ok(segments) => Transcript::new(segments)
                .map_err(|err| format!("engine returned an invalid transcript: {err}")),
            Err(err) => Err(err.to_string()),
        }
    }

    /// Apply a run outcome, ignoring anything stale, then dispatch the next
    /// queued job. The engine slot is always released here, so a failing or
    /// cancelled run can never hold it permanently.
    fn finish_run(
        self: Arc<Self>,
        id: JobId,
        generation: u64,
        outcome: std::result::Result<Transcript, String>,
    ) {
        let manager = FileQueueManager { inner: self };
        let mut state = manager.lock();

        let current = state
            .active
            .as_ref()
            .is_some_and(|run| run.id == id && run.generation == generation);
        if !current {
            // A newer run owns the slot, or this run was superseded by a
            // removal. Nothing to apply.
            return;
        }
        state.active = None;

        if let Some(job) = state.job_mut(id) {
            match outcome {
                Ok(transcript) => {
                    info!(%id, segments = transcript.len(), "job completed");
                    job.state = JobState::Completed { transcript };
                }
                Err(detail) => {
                    warn!(%id, %detail, "job failed");
                    job.state = JobState::Failed { detail };
                }
            }
        }

        manager.dispatch_next(&mut state);
    }

    /// Progress reported by the engine itself; generation-checked so reports
    /// from an orphaned (cancelled or timed-out) call are discarded.
    fn progress_from_engine(&self, id: JobId, generation: u64, percent: u8) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let current = state
            .active
            .as_ref()
            .is_some_and(|run| run.id == id && run.generation == generation);
        if !current {
            return;
        }
        if let Some(job) = state.job_mut(id) {
            if let JobState::Processing { progress } = &mut job.state {
                *progress = percent.min(100);
            }
        }
    }
}

fn snapshot(job: &Job) -> JobSnapshot {
    JobSnapshot {
        id: job.id,
        name: job.name.clone(),
        state: job.state.clone(),
    }
}
