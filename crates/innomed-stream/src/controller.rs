use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt as _;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::ChannelOpener;
use crate::errors::{ClientError, SessionFailure};
use crate::event::{Event, decode};
use crate::model::ResultModel;
use crate::reducer::reduce;
use crate::session::{Generation, SessionRequest, SessionState};

/// Notification published to the observer.
///
/// Exactly one `ModelChanged` is published per accepted non-terminal event,
/// and at most one terminal update (`Completed` or `Failed`) per session.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionUpdate {
    /// The session was started and its channel is being opened.
    Started {
        generation: Generation,
        session_id: uuid::Uuid,
    },
    /// The model after applying one more event.
    ModelChanged {
        generation: Generation,
        model: ResultModel,
    },
    /// Terminal success with the authoritative final model.
    Completed {
        generation: Generation,
        model: ResultModel,
    },
    /// Terminal failure. The last published model stays as it was.
    Failed {
        generation: Generation,
        failure: SessionFailure,
    },
}

impl SessionUpdate {
    pub fn generation(&self) -> Generation {
        match self {
            Self::Started { generation, .. }
            | Self::ModelChanged { generation, .. }
            | Self::Completed { generation, .. }
            | Self::Failed { generation, .. } => *generation,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Owns the live session: allocates generations, drives decode and reduce,
/// and tears down superseded channels.
///
/// Starting a new session aborts the previous one. Nothing from an older
/// generation reaches the observer once the new session has started.
pub struct StreamController {
    opener: Arc<dyn ChannelOpener>,
    current: Arc<AtomicU64>,
    updates: mpsc::Sender<SessionUpdate>,
    state: Arc<watch::Sender<(Generation, SessionState)>>,
    active: Mutex<Option<JoinHandle<()>>>,
}

impl StreamController {
    /// Creates a controller and the single observer that receives its
    /// updates.
    pub fn new(
        opener: Arc<dyn ChannelOpener>,
        buffer_capacity: usize,
    ) -> Result<(Self, SessionObserver), ClientError> {
        if buffer_capacity == 0 {
            return Err(ClientError::Validation(
                "stream buffer capacity must be greater than 0".into(),
            ));
        }
        let (tx, rx) = mpsc::channel(buffer_capacity);
        let (state, _) = watch::channel((Generation::default(), SessionState::Idle));
        let current = Arc::new(AtomicU64::new(0));
        let controller = Self {
            opener,
            current: current.clone(),
            updates: tx,
            state: Arc::new(state),
            active: Mutex::new(None),
        };
        let observer = SessionObserver {
            rx,
            current,
            latest: None,
        };
        Ok((controller, observer))
    }

    /// Starts a new session, superseding any session still in flight.
    ///
    /// Must be called from within a tokio runtime. Safe to call from several
    /// threads at once: the highest generation handed out is always the one
    /// left running.
    pub fn start(&self, request: SessionRequest) -> Generation {
        // Generation allocation, abort and spawn happen under one guard so
        // their order matches.
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = Generation(self.current.fetch_add(1, Ordering::SeqCst) + 1);
        let session_id = uuid::Uuid::new_v4();

        if let Some(previous) = active.take()
            && !previous.is_finished()
        {
            warn!(generation = %generation, "superseding in-flight session");
            previous.abort();
        }

        self.state.send_replace((generation, SessionState::Connecting));
        info!(
            generation = %generation,
            session_id = %session_id,
            subject = %request.subject,
            "starting session"
        );

        let driver = Driver {
            generation,
            session_id,
            current: self.current.clone(),
            updates: self.updates.clone(),
            state: self.state.clone(),
        };
        *active = Some(tokio::spawn(driver.run(self.opener.clone(), request)));
        generation
    }

    /// Returns the generation of the most recently started session.
    pub fn current_generation(&self) -> Generation {
        Generation(self.current.load(Ordering::SeqCst))
    }

    /// Returns the state of the live session.
    pub fn state(&self) -> SessionState {
        self.state.borrow().1
    }

    /// Subscribes to `(generation, state)` transitions of the live session.
    pub fn watch_state(&self) -> watch::Receiver<(Generation, SessionState)> {
        self.state.subscribe()
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        let active = self.active.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = active.take() {
            handle.abort();
        }
    }
}

struct Driver {
    generation: Generation,
    session_id: uuid::Uuid,
    current: Arc<AtomicU64>,
    updates: mpsc::Sender<SessionUpdate>,
    state: Arc<watch::Sender<(Generation, SessionState)>>,
}

impl Driver {
    async fn run(self, opener: Arc<dyn ChannelOpener>, request: SessionRequest) {
        let generation = self.generation;
        if !self
            .publish(SessionUpdate::Started {
                generation,
                session_id: self.session_id,
            })
            .await
        {
            return;
        }

        let mut frames = match opener.open(&request).await {
            Ok(frames) => frames,
            Err(err) => {
                warn!(generation = %generation, session_id = %self.session_id, error = %err, "failed to open channel");
                self.fail(SessionFailure::open_failed(&err)).await;
                return;
            }
        };

        let mut model = ResultModel::new();
        let mut streaming = false;
        let mut seq = 0_u64;
        loop {
            let raw = match frames.next().await {
                Some(Ok(raw)) => raw,
                Some(Err(err)) => {
                    warn!(generation = %generation, session_id = %self.session_id, error = %err, "channel fault");
                    self.fail(SessionFailure::ChannelClosedUnexpectedly).await;
                    return;
                }
                None => {
                    warn!(generation = %generation, session_id = %self.session_id, "channel ended without a terminal frame");
                    self.fail(SessionFailure::ChannelClosedUnexpectedly).await;
                    return;
                }
            };

            let event = match decode(&raw) {
                Ok(event) => event,
                Err(err) => {
                    warn!(generation = %generation, session_id = %self.session_id, error = %err, "skipping malformed frame");
                    continue;
                }
            };
            if !self.is_current() {
                debug!(generation = %generation, "session superseded; closing channel");
                return;
            }
            debug!(generation = %generation, seq, kind = event.kind(), "frame accepted");
            seq = seq.saturating_add(1);

            if let Event::Error(message) = event {
                self.fail(SessionFailure::StreamError { message }).await;
                return;
            }
            if !streaming {
                streaming = true;
                self.set_state(SessionState::Streaming);
            }

            let terminal = event.is_terminal();
            model = reduce(model, &event);
            if terminal {
                self.set_state(SessionState::Completed);
                info!(generation = %generation, session_id = %self.session_id, frames = seq, "session completed");
                self.publish(SessionUpdate::Completed { generation, model })
                    .await;
                return;
            }
            if !self
                .publish(SessionUpdate::ModelChanged {
                    generation,
                    model: model.clone(),
                })
                .await
            {
                return;
            }
        }
    }

    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation.0
    }

    fn set_state(&self, next: SessionState) {
        let generation = self.generation;
        self.state.send_if_modified(|(live, state)| {
            if *live != generation || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }

    async fn fail(&self, failure: SessionFailure) {
        self.set_state(SessionState::Failed);
        info!(generation = %self.generation, session_id = %self.session_id, failure = %failure, "session failed");
        self.publish(SessionUpdate::Failed {
            generation: self.generation,
            failure,
        })
        .await;
    }

    /// Returns false when the update was not delivered and the driver
    /// should stop.
    async fn publish(&self, update: SessionUpdate) -> bool {
        if !self.is_current() {
            debug!(generation = %self.generation, "dropping update from superseded session");
            return false;
        }
        self.updates.send(update).await.is_ok()
    }
}

/// Receiving side of a `StreamController`.
///
/// Filters out updates whose generation is no longer current and keeps the
/// last published model of the live session.
pub struct SessionObserver {
    rx: mpsc::Receiver<SessionUpdate>,
    current: Arc<AtomicU64>,
    latest: Option<(Generation, ResultModel)>,
}

impl SessionObserver {
    /// Waits for the next update belonging to the live session.
    ///
    /// Returns `None` once the controller and all of its sessions are gone.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        loop {
            let update = self.rx.recv().await?;
            let generation = update.generation();
            if generation.0 != self.current.load(Ordering::SeqCst) {
                debug!(generation = %generation, "discarding stale update");
                continue;
            }
            match &update {
                SessionUpdate::Started { .. } => {
                    self.latest = Some((generation, ResultModel::new()));
                }
                SessionUpdate::ModelChanged { model, .. } | SessionUpdate::Completed { model, .. } => {
                    self.latest = Some((generation, model.clone()));
                }
                SessionUpdate::Failed { .. } => {}
            }
            return Some(update);
        }
    }

    /// Drains the live session until it ends.
    ///
    /// Returns the final model on success. On failure the last published
    /// model is still available through [`Self::latest_model`].
    pub async fn wait_for_terminal(&mut self) -> Result<ResultModel, ClientError> {
        while let Some(update) = self.next_update().await {
            match update {
                SessionUpdate::Completed { model, .. } => return Ok(model),
                SessionUpdate::Failed { failure, .. } => return Err(failure.into()),
                SessionUpdate::Started { .. } | SessionUpdate::ModelChanged { .. } => {}
            }
        }
        Err(SessionFailure::ChannelClosedUnexpectedly.into())
    }

    /// Last model published by the live session, if any.
    pub fn latest_model(&self) -> Option<&ResultModel> {
        let current = self.current.load(Ordering::SeqCst);
        self.latest
            .as_ref()
            .filter(|(generation, _)| generation.0 == current)
            .map(|(_, model)| model)
    }
}
