//! Sessions: one per connected client.
//!
//! A [`Session`] owns the utterance buffer and the pipeline state. The
//! transport appends fragments on its receive path; a trigger snapshots the
//! buffer and queues the utterance on the session's worker, which runs queued
//! utterances one at a time and reports each on the outbound channel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::buffer::{AudioFrameBuffer, Utterance};
use crate::event::ServerEvent;
use crate::pipeline::SessionPipeline;
use crate::state::PipelineState;

/// Session identifier.
pub type SessionId = Uuid;

struct SessionInner {
    buffer: AudioFrameBuffer,
    state: PipelineState,
    next_utterance: u64,
    /// Triggered utterances not yet finished.
    pending: usize,
}

/// Buffer and state of one client session.
pub struct Session {
    id: SessionId,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn new(max_utterance_bytes: Option<usize>) -> Self {
        Self {
            id: Uuid::new_v4(),
            inner: Mutex::new(SessionInner {
                buffer: AudioFrameBuffer::new(max_utterance_bytes),
                state: PipelineState::Idle,
                next_utterance: 1,
                pending: 0,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> PipelineState {
        self.inner.lock().state
    }

    /// Bytes buffered for the next utterance.
    pub fn buffered(&self) -> usize {
        self.inner.lock().buffer.len()
    }

    /// Appends a fragment to the current utterance.
    ///
    /// While an earlier utterance is processing, the fragment starts the next
    /// one. Returns false if the fragment was dropped by the byte cap.
    pub fn append(&self, fragment: &[u8]) -> bool {
        let mut inner = self.inner.lock();
        let accepted = inner.buffer.append(fragment);
        if inner.state == PipelineState::Idle {
            inner.state = PipelineState::Buffering;
        }
        accepted
    }

    /// Ends the current utterance: takes the buffer and assigns an id.
    pub fn trigger(&self) -> (u64, Utterance) {
        let mut inner = self.inner.lock();
        let id = inner.next_utterance;
        inner.next_utterance += 1;
        inner.pending += 1;
        inner.state = PipelineState::Processing;
        (id, inner.buffer.drain())
    }

    /// Marks one triggered utterance as finished.
    pub fn complete(&self) {
        let mut inner = self.inner.lock();
        inner.pending = inner.pending.saturating_sub(1);
        if inner.pending == 0 {
            inner.state = if inner.buffer.is_empty() {
                PipelineState::Idle
            } else {
                PipelineState::Buffering
            };
        }
    }
}

/// Live sessions keyed by id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and registers a session.
    pub fn create(&self, max_utterance_bytes: Option<usize>) -> Arc<Session> {
        let session = Arc::new(Session::new(max_utterance_bytes));
        self.sessions.write().insert(session.id(), session.clone());
        session
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Sessions with a triggered utterance still queued or running.
    pub fn processing(&self) -> usize {
        self.sessions.read().values().filter(|s| s.state().is_busy()).count()
    }
}

/// Per-session settings.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Byte cap per utterance; `None` disables it.
    pub max_utterance_bytes: Option<usize>,
    /// Triggered utterances that may wait behind the running one.
    pub queue_depth: usize,
    /// Send `status` events as stages start.
    pub notify_progress: bool,
    /// Capacity of the outbound event channel.
    pub outbound_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_utterance_bytes: Some(32 * 1024 * 1024),
            queue_depth: 8,
            notify_progress: true,
            outbound_capacity: 64,
        }
    }
}

/// The session worker has stopped.
#[derive(Debug, thiserror::Error)]
#[error("session closed")]
pub struct SessionClosed;

struct Job {
    utterance_id: u64,
    utterance: Utterance,
}

/// Transport-side handle of a running session.
///
/// Dropping the handle unregisters the session and cancels its worker;
/// an in-flight result is discarded.
pub struct SessionHandle {
    session: Arc<Session>,
    registry: SessionRegistry,
    jobs: mpsc::Sender<Job>,
    events: mpsc::Sender<ServerEvent>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.session.id()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Buffers an inbound fragment.
    pub fn append(&self, fragment: &[u8]) {
        if !self.session.append(fragment) {
            debug!(session = %self.id(), bytes = fragment.len(), "session: utterance over size cap, fragment dropped");
        }
    }

    /// Ends the current utterance and queues it. Returns its id.
    pub async fn end_of_utterance(&self) -> Result<u64, SessionClosed> {
        let (utterance_id, utterance) = self.session.trigger();
        debug!(
            session = %self.id(),
            utterance = utterance_id,
            bytes = utterance.len(),
            fragments = utterance.fragments,
            "session: utterance triggered"
        );
        if self.jobs.send(Job { utterance_id, utterance }).await.is_err() {
            self.session.complete();
            return Err(SessionClosed);
        }
        Ok(utterance_id)
    }

    /// Sends an out-of-band event such as a protocol error.
    pub fn notify(&self, event: ServerEvent) {
        if self.events.try_send(event).is_err() {
            debug!(session = %self.id(), "session: outbound channel full, notice dropped");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.registry.remove(&self.session.id());
    }
}

/// Registers a session and starts its worker.
///
/// Returns the handle and the outbound event stream, which starts with a
/// `session` event.
pub fn spawn_session(
    registry: &SessionRegistry,
    pipeline: SessionPipeline,
    options: SessionOptions,
) -> (SessionHandle, mpsc::Receiver<ServerEvent>) {
    let session = registry.create(options.max_utterance_bytes);
    let (jobs_tx, jobs_rx) = mpsc::channel(options.queue_depth.max(1));
    let (events_tx, events_rx) = mpsc::channel(options.outbound_capacity.max(2));
    let cancel = CancellationToken::new();

    let _ = events_tx.try_send(ServerEvent::Session {
        session_id: session.id().to_string(),
    });

    let span = info_span!("session", id = %session.id());
    tokio::spawn(
        run_worker(
            session.clone(),
            pipeline,
            jobs_rx,
            events_tx.clone(),
            cancel.clone(),
            options.notify_progress,
        )
        .instrument(span),
    );

    let handle = SessionHandle {
        session,
        registry: registry.clone(),
        jobs: jobs_tx,
        events: events_tx,
        cancel,
    };
    (handle, events_rx)
}

async fn run_worker(
    session: Arc<Session>,
    pipeline: SessionPipeline,
    mut jobs: mpsc::Receiver<Job>,
    events: mpsc::Sender<ServerEvent>,
    cancel: CancellationToken,
    notify_progress: bool,
) {
    loop {
        let job = tokio::select! {
            _ = cancel.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        let utterance_id = job.utterance_id;

        let progress_tx = events.clone();
        let progress = move |stage| {
            if notify_progress {
                let _ = progress_tx.try_send(ServerEvent::status(utterance_id, stage));
            }
        };

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(utterance = utterance_id, "session: disconnected, discarding in-flight utterance");
                session.complete();
                break;
            }
            result = pipeline.run(job.utterance, progress) => result,
        };
        session.complete();

        let event = match result {
            Ok(translated) => ServerEvent::translated(utterance_id, translated),
            Err(e) => {
                warn!(utterance = utterance_id, stage = %e.stage(), kind = e.kind(), error = %e, "session: utterance failed");
                ServerEvent::failed(utterance_id, &e)
            }
        };
        if events.send(event).await.is_err() {
            debug!(utterance = utterance_id, "session: client gone, result discarded");
            break;
        }
    }
    debug!("session: worker stopped");
}
