//! Caller-facing turn API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::action::{ActionExecutor, ScriptExecutor};
use crate::config::{RunnerConfig, DEFAULT_MAX_ACTION_ROUND_TRIPS};
use crate::error::SkillError;
use crate::prompt;
use crate::session::{OpenAiConnector, SessionConnector};
use crate::skills::SkillReference;
use crate::types::{ExecuteOptions, HistoryEntry, TurnResult};

use super::driver::{lock, PendingTurn, SessionDriver, Shared};
use super::state::DriverState;

/// Produces the identifier a runner stamps on its session.
pub type SessionIdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Runs a conversation with one skill over one model session.
///
/// Turns are strictly sequential: while a turn is pending, `execute` and
/// `continue_turn` fail instead of queueing. Any number of action
/// round-trips may happen inside one turn; the caller only sees the final
/// reply.
///
/// # Example
///
/// ```ignore
/// let runner = SkillRunner::from_config(skill, &RunnerConfig::load()?)?;
/// let first = runner.execute("list skills", ExecuteOptions::new()).await?;
/// let next = runner.continue_turn("the second one", ExecuteOptions::new()).await?;
/// runner.end().await;
/// ```
pub struct SkillRunner {
    skill: SkillReference,
    connector: Arc<dyn SessionConnector>,
    executor: Arc<dyn ActionExecutor>,
    max_action_round_trips: usize,
    shared: Arc<Shared>,
    driver: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl SkillRunner {
    pub fn new(
        skill: SkillReference,
        connector: Arc<dyn SessionConnector>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        Self::with_session_ids(
            skill,
            connector,
            executor,
            Arc::new(|| uuid::Uuid::new_v4().to_string()),
        )
    }

    /// Like [`new`](Self::new), but the session id comes from `generator`.
    pub fn with_session_ids(
        skill: SkillReference,
        connector: Arc<dyn SessionConnector>,
        executor: Arc<dyn ActionExecutor>,
        generator: SessionIdGenerator,
    ) -> Self {
        Self {
            skill,
            connector,
            executor,
            max_action_round_trips: DEFAULT_MAX_ACTION_ROUND_TRIPS,
            shared: Arc::new(Shared::new(generator())),
            driver: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Runner talking to the configured OpenAI-compatible service and running
    /// the skill's script.
    pub fn from_config(skill: SkillReference, config: &RunnerConfig) -> Result<Self, SkillError> {
        let connector = OpenAiConnector::from_config(config)?;
        let executor = ScriptExecutor::from_settings(skill.dir.clone(), &config.action);
        Ok(Self::new(skill, Arc::new(connector), Arc::new(executor))
            .with_max_action_round_trips(config.max_action_round_trips))
    }

    pub fn with_max_action_round_trips(mut self, max: usize) -> Self {
        self.max_action_round_trips = max;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    pub fn skill(&self) -> &SkillReference {
        &self.skill
    }

    pub fn state(&self) -> DriverState {
        self.shared.state()
    }

    /// Subscribe to driver state changes.
    pub fn watch_state(&self) -> watch::Receiver<DriverState> {
        self.shared.subscribe()
    }

    /// Snapshot of the conversation so far.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.shared.history()
    }

    /// Start a turn, opening the session on first use.
    ///
    /// `options.model` only takes effect on the call that opens the session.
    ///
    /// # Errors
    ///
    /// - [`SkillError::Protocol`] if a turn is already pending.
    /// - [`SkillError::Closed`] after [`end`](Self::end).
    /// - [`SkillError::Transport`] once the session has failed.
    pub async fn execute(
        &self,
        input: impl Into<String>,
        options: ExecuteOptions,
    ) -> Result<TurnResult, SkillError> {
        self.submit(input.into(), options, true).await
    }

    /// Send a follow-up turn on the already open session.
    ///
    /// # Errors
    ///
    /// As [`execute`](Self::execute), plus [`SkillError::Protocol`] when no
    /// session has been opened yet.
    pub async fn continue_turn(
        &self,
        input: impl Into<String>,
        options: ExecuteOptions,
    ) -> Result<TurnResult, SkillError> {
        self.submit(input.into(), options, false).await
    }

    /// Close the session. A pending turn is rejected with [`SkillError::Closed`].
    ///
    /// Waits for an in-flight action to finish. Idempotent.
    pub async fn end(&self) {
        if self.shared.cancel.is_cancelled() {
            return;
        }
        debug!(session_id = %self.shared.session_id, "ending session");
        self.shared.cancel.cancel();
        self.shared.queue.close();
        self.shared.resolve(Err(SkillError::Closed));

        let handle = lock(&self.driver).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(session_id = %self.shared.session_id, error = %e, "session driver task failed");
            }
        }
        self.shared.set_state(DriverState::Closed);
    }

    async fn submit(
        &self,
        input: String,
        options: ExecuteOptions,
        may_start: bool,
    ) -> Result<TurnResult, SkillError> {
        if let Some(err) = self.unusable() {
            return Err(err);
        }
        if !may_start && !self.started.load(Ordering::Acquire) {
            return Err(SkillError::protocol(
                "no session is open; call execute first",
            ));
        }

        let (reply, result) = oneshot::channel();
        self.shared.begin_turn(PendingTurn {
            reply,
            on_chunk: options.on_chunk,
        })?;
        self.shared.push_history(HistoryEntry::user(input.clone()));

        if may_start {
            self.ensure_driver(options.model);
        }

        debug!(session_id = %self.shared.session_id, input_len = input.len(), "submitting turn");
        if !self
            .shared
            .queue
            .enqueue(prompt::wrap_user_input(&self.skill, &input))
        {
            self.shared.take_pending();
            self.shared.pop_history();
            return Err(self.unusable().unwrap_or(SkillError::Closed));
        }

        result.await.unwrap_or(Err(SkillError::Closed))
    }

    fn ensure_driver(&self, model: Option<String>) {
        let mut slot = lock(&self.driver);
        if self.started.load(Ordering::Acquire) {
            return;
        }
        let driver = SessionDriver {
            shared: Arc::clone(&self.shared),
            connector: Arc::clone(&self.connector),
            executor: Arc::clone(&self.executor),
            model,
            max_round_trips: self.max_action_round_trips,
        };
        *slot = Some(driver.spawn());
        self.started.store(true, Ordering::Release);
    }

    fn unusable(&self) -> Option<SkillError> {
        if self.shared.cancel.is_cancelled() {
            return Some(SkillError::Closed);
        }
        self.shared.failure().map(SkillError::Transport)
    }
}

impl Drop for SkillRunner {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
        self.shared.queue.close();
    }
}
