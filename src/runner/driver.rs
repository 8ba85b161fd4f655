//! The session driver: one task that owns the model session.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::action::ActionExecutor;
use crate::directive::{self, ChunkFilter};
use crate::error::SkillError;
use crate::session::{ConnectRequest, ModelSession, SessionConnector};
use crate::types::{
    ChunkCallback, HistoryEntry, SessionEvent, SessionMessage, TurnResult, TurnStatus,
};
use crate::util::text::{extract_json_payload, needs_more_input};

use super::queue::InputQueue;
use super::state::DriverState;

pub(crate) type TurnReply = oneshot::Sender<Result<TurnResult, SkillError>>;

/// The caller turn currently waiting on the driver.
pub(crate) struct PendingTurn {
    pub reply: TurnReply,
    pub on_chunk: Option<ChunkCallback>,
}

/// State shared between the coordinator and its driver task.
pub(crate) struct Shared {
    pub session_id: String,
    pub queue: InputQueue,
    pub cancel: CancellationToken,
    history: Mutex<Vec<HistoryEntry>>,
    pending: Mutex<Option<PendingTurn>>,
    failure: Mutex<Option<String>>,
    state_tx: watch::Sender<DriverState>,
}

impl Shared {
    pub fn new(session_id: String) -> Self {
        let (state_tx, _) = watch::channel(DriverState::Idle);
        Self {
            session_id,
            queue: InputQueue::new(),
            cancel: CancellationToken::new(),
            history: Mutex::new(Vec::new()),
            pending: Mutex::new(None),
            failure: Mutex::new(None),
            state_tx,
        }
    }

    pub fn state(&self) -> DriverState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DriverState> {
        self.state_tx.subscribe()
    }

    /// Move to `next`. Terminal states only ever give way to `Closed`.
    pub fn set_state(&self, next: DriverState) {
        self.state_tx.send_if_modified(|current| {
            if *current == next || (current.is_terminal() && next != DriverState::Closed) {
                return false;
            }
            *current = next;
            true
        });
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        lock(&self.history).clone()
    }

    pub fn push_history(&self, entry: HistoryEntry) {
        lock(&self.history).push(entry);
    }

    /// Drop the most recent entry.
    pub fn pop_history(&self) {
        lock(&self.history).pop();
    }

    /// Register the caller's turn, or fail if one is already outstanding.
    pub fn begin_turn(&self, turn: PendingTurn) -> Result<(), SkillError> {
        let mut pending = lock(&self.pending);
        if pending.is_some() {
            return Err(SkillError::protocol("a turn is already pending"));
        }
        *pending = Some(turn);
        Ok(())
    }

    pub fn take_pending(&self) -> Option<PendingTurn> {
        lock(&self.pending).take()
    }

    pub fn chunk_callback(&self) -> Option<ChunkCallback> {
        lock(&self.pending)
            .as_ref()
            .and_then(|turn| turn.on_chunk.clone())
    }

    /// Settle the pending turn, if any. A caller that stopped waiting is ignored.
    pub fn resolve(&self, result: Result<TurnResult, SkillError>) {
        if let Some(turn) = self.take_pending() {
            let _ = turn.reply.send(result);
        }
    }

    /// Reason the session failed, if it did.
    pub fn failure(&self) -> Option<String> {
        lock(&self.failure).clone()
    }

    /// Record a terminal transport failure and reject the pending turn with it.
    pub fn fail(&self, err: SkillError) {
        warn!(session_id = %self.session_id, error = %err, "session failed");
        let reason = match &err {
            SkillError::Transport(message) => message.clone(),
            other => other.to_string(),
        };
        *lock(&self.failure) = Some(reason);
        self.queue.close();
        self.set_state(DriverState::Failed);
        self.resolve(Err(err));
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Fails the session if the driver task ends without returning, e.g. when
/// an action executor or chunk callback panics.
struct StopGuard {
    shared: Arc<Shared>,
    armed: bool,
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        if self.armed {
            self.shared
                .fail(SkillError::transport("session driver stopped unexpectedly"));
        }
    }
}

/// Consumes the input queue, talks to the session, and runs actions.
pub(crate) struct SessionDriver {
    pub shared: Arc<Shared>,
    pub connector: Arc<dyn SessionConnector>,
    pub executor: Arc<dyn ActionExecutor>,
    pub model: Option<String>,
    pub max_round_trips: usize,
}

impl SessionDriver {
    pub fn spawn(self) -> JoinHandle<()> {
        let guard = StopGuard {
            shared: Arc::clone(&self.shared),
            armed: true,
        };
        tokio::spawn(async move {
            let mut guard = guard;
            self.run().await;
            guard.armed = false;
        })
    }

    async fn run(self) {
        let request = ConnectRequest {
            session_id: self.shared.session_id.clone(),
            model: self.model.clone(),
        };
        let connected = tokio::select! {
            _ = self.shared.cancel.cancelled() => return,
            connected = self.connector.connect(request) => connected,
        };
        let mut session = match connected {
            Ok(session) => session,
            Err(e) => {
                self.shared.fail(e);
                return;
            }
        };
        debug!(session_id = %self.shared.session_id, "session driver started");

        let outcome = self.consume(session.as_mut()).await;
        if let Err(e) = session.close().await {
            warn!(session_id = %self.shared.session_id, error = %e, "failed to close session");
        }

        match outcome {
            Ok(()) => {
                self.shared.set_state(DriverState::Closed);
                self.shared.resolve(Err(SkillError::Closed));
                debug!(session_id = %self.shared.session_id, "session driver stopped");
            }
            Err(e) => self.shared.fail(e),
        }
    }

    /// Main loop. Returns `Ok` on shutdown and `Err` on transport failure.
    async fn consume(&self, session: &mut dyn ModelSession) -> Result<(), SkillError> {
        let mut round_trips = 0usize;

        loop {
            self.shared.set_state(DriverState::Idle);
            let input = tokio::select! {
                _ = self.shared.cancel.cancelled() => return Ok(()),
                input = self.shared.queue.take() => match input {
                    Some(input) => input,
                    None => return Ok(()),
                },
            };

            self.shared.set_state(DriverState::Streaming);
            let message = SessionMessage {
                session_id: self.shared.session_id.clone(),
                content: input,
            };
            tokio::select! {
                _ = self.shared.cancel.cancelled() => return Ok(()),
                sent = session.send(message) => sent?,
            }

            let Some(text) = self.read_reply(session).await? else {
                return Ok(());
            };

            let Some(request) = directive::detect(&text) else {
                self.complete_turn(text);
                round_trips = 0;
                continue;
            };

            let extra = directive::count(&text).saturating_sub(1);
            if extra > 0 {
                warn!(
                    session_id = %self.shared.session_id,
                    dropped = extra,
                    "reply holds several directives; running only the first"
                );
            }
            self.shared.push_history(HistoryEntry::assistant(text));

            round_trips += 1;
            if round_trips > self.max_round_trips {
                warn!(
                    session_id = %self.shared.session_id,
                    limit = self.max_round_trips,
                    "action round-trip limit reached"
                );
                self.shared.resolve(Err(SkillError::protocol(format!(
                    "exceeded {} action round-trips in one turn",
                    self.max_round_trips
                ))));
                round_trips = 0;
                continue;
            }

            self.shared.set_state(DriverState::AwaitingAction);
            debug!(session_id = %self.shared.session_id, round_trip = round_trips, directive = %request, "running action");
            // Actions run to completion (or their own timeout) even when ending.
            let outcome = self.executor.run(&request).await;
            if self.shared.cancel.is_cancelled() {
                return Ok(());
            }
            if !self.shared.queue.enqueue(directive::format_result(&outcome)) {
                return Ok(());
            }
        }
    }

    /// Read one model turn. `None` means the driver was cancelled mid-reply.
    async fn read_reply(&self, session: &mut dyn ModelSession) -> Result<Option<String>, SkillError> {
        let on_chunk = self.shared.chunk_callback();
        let emit = |visible: Option<&str>| {
            if let (Some(callback), Some(text)) = (&on_chunk, visible) {
                callback(text);
            }
        };
        let mut buffer = String::new();
        let mut filter = ChunkFilter::new();

        loop {
            let event = tokio::select! {
                _ = self.shared.cancel.cancelled() => return Ok(None),
                event = session.next_event() => event,
            };
            match event {
                None => return Err(SkillError::transport("session stream ended unexpectedly")),
                Some(Err(e)) => return Err(e),
                Some(Ok(SessionEvent::System { subtype })) => {
                    debug!(subtype = %subtype, "ignoring system event");
                }
                Some(Ok(SessionEvent::TextDelta { text })) => {
                    buffer.push_str(&text);
                    emit(filter.advance(&buffer));
                }
                Some(Ok(SessionEvent::AssistantMessage { text })) => {
                    if buffer.is_empty() {
                        buffer = text;
                        emit(filter.advance(&buffer));
                    }
                }
                Some(Ok(SessionEvent::TurnComplete)) => {
                    emit(filter.flush(&buffer));
                    debug!(
                        session_id = %self.shared.session_id,
                        text_len = buffer.len(),
                        suppressed = filter.is_suppressed(),
                        "model turn complete"
                    );
                    return Ok(Some(buffer));
                }
                Some(Ok(SessionEvent::Error { message })) => {
                    return Err(SkillError::transport(message));
                }
            }
        }
    }

    fn complete_turn(&self, text: String) {
        self.shared.set_state(DriverState::TurnComplete);
        if !text.is_empty() {
            self.shared.push_history(HistoryEntry::assistant(text.clone()));
        }
        let result = TurnResult {
            status: TurnStatus::Success,
            parsed_payload: extract_json_payload(&text),
            need_more_input: needs_more_input(&text),
            session_id: self.shared.session_id.clone(),
            history: self.shared.history(),
            finished_at: Utc::now(),
            content: text,
        };
        self.shared.resolve(Ok(result));
    }
}
