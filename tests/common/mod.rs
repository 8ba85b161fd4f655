//! Shared test helpers: a scripted model session and a stub action executor.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use skill_runner::action::ActionExecutor;
use skill_runner::error::SkillError;
use skill_runner::session::{ConnectRequest, ModelSession, SessionConnector};
use skill_runner::skills::SkillReference;
use skill_runner::types::{ActionOutcome, ChunkCallback, SessionEvent, SessionMessage};

/// One scripted step of a model reply.
pub enum Step {
    Event(SessionEvent),
    /// Fail the event read with a transport error.
    Fail(String),
    /// Block until the notify fires.
    Wait(Arc<Notify>),
    /// Never produce another event.
    Hang,
}

/// The events played back for one `send`.
pub struct Reply(pub Vec<Step>);

impl Reply {
    /// Stream `text` in five-character deltas, then complete the turn.
    pub fn text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let deltas: Vec<String> = chars.chunks(5).map(|c| c.iter().collect()).collect();
        Self::chunks(&deltas.iter().map(String::as_str).collect::<Vec<_>>())
    }

    /// Stream the given deltas verbatim, then complete the turn.
    pub fn chunks(deltas: &[&str]) -> Self {
        let mut steps: Vec<Step> = deltas
            .iter()
            .map(|d| Step::Event(SessionEvent::text_delta(*d)))
            .collect();
        steps.push(Step::Event(SessionEvent::assistant_message(deltas.concat())));
        steps.push(Step::Event(SessionEvent::TurnComplete));
        Self(steps)
    }

    /// A reply that waits for `gate` before streaming `text`.
    pub fn gated(gate: Arc<Notify>, text: &str) -> Self {
        let mut reply = Self::text(text);
        reply.0.insert(0, Step::Wait(gate));
        reply
    }

    pub fn hang() -> Self {
        Self(vec![Step::Hang])
    }

    pub fn fail(message: &str) -> Self {
        Self(vec![Step::Fail(message.to_string())])
    }
}

/// What the scripted session observed.
#[derive(Clone, Default)]
pub struct SessionProbe {
    pub sent: Arc<Mutex<Vec<SessionMessage>>>,
    pub connects: Arc<Mutex<Vec<ConnectRequest>>>,
    pub closed: Arc<AtomicBool>,
}

impl SessionProbe {
    pub fn sent(&self) -> Vec<SessionMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn connects(&self) -> Vec<ConnectRequest> {
        self.connects.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct ScriptedSession {
    replies: VecDeque<Reply>,
    current: VecDeque<Step>,
    probe: SessionProbe,
}

#[async_trait]
impl ModelSession for ScriptedSession {
    async fn send(&mut self, message: SessionMessage) -> Result<(), SkillError> {
        self.probe.sent.lock().unwrap().push(message);
        let reply = self
            .replies
            .pop_front()
            .unwrap_or_else(|| Reply::fail("no scripted reply left"));
        self.current = reply.0.into();
        Ok(())
    }

    async fn next_event(&mut self) -> Option<Result<SessionEvent, SkillError>> {
        loop {
            match self.current.pop_front()? {
                Step::Event(event) => return Some(Ok(event)),
                Step::Fail(message) => return Some(Err(SkillError::transport(message))),
                Step::Wait(gate) => gate.notified().await,
                Step::Hang => std::future::pending::<()>().await,
            }
        }
    }

    async fn close(&mut self) -> Result<(), SkillError> {
        self.probe.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one scripted session.
pub struct ScriptedConnector {
    session: Mutex<Option<ScriptedSession>>,
    probe: SessionProbe,
}

#[async_trait]
impl SessionConnector for ScriptedConnector {
    async fn connect(&self, request: ConnectRequest) -> Result<Box<dyn ModelSession>, SkillError> {
        self.probe.connects.lock().unwrap().push(request);
        match self.session.lock().unwrap().take() {
            Some(session) => Ok(Box::new(session)),
            None => Err(SkillError::transport("session already opened")),
        }
    }
}

pub fn scripted(replies: Vec<Reply>) -> (Arc<ScriptedConnector>, SessionProbe) {
    let probe = SessionProbe::default();
    let session = ScriptedSession {
        replies: replies.into(),
        current: VecDeque::new(),
        probe: probe.clone(),
    };
    let connector = ScriptedConnector {
        session: Mutex::new(Some(session)),
        probe: probe.clone(),
    };
    (Arc::new(connector), probe)
}

/// Action executor returning canned outcomes in order.
#[derive(Default)]
pub struct StubExecutor {
    outcomes: Mutex<VecDeque<ActionOutcome>>,
    calls: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl StubExecutor {
    pub fn new(outcomes: Vec<ActionOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionExecutor for StubExecutor {
    async fn run(&self, directive: &str) -> ActionOutcome {
        self.calls.lock().unwrap().push(directive.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ActionOutcome::success("{}"))
    }
}

pub fn skill() -> SkillReference {
    SkillReference::new("lister", "/tmp/skills/lister", "# Lister\nLists the installed skills.")
}

/// A chunk callback that appends into a shared string.
pub fn chunk_collector() -> (ChunkCallback, Arc<Mutex<String>>) {
    let seen = Arc::new(Mutex::new(String::new()));
    let sink = Arc::clone(&seen);
    let callback: ChunkCallback = Arc::new(move |text: &str| {
        sink.lock().unwrap().push_str(text);
    });
    (callback, seen)
}

pub fn directive(payload: &str) -> String {
    format!("[EXECUTE_SCRIPT]\nuser_input: {payload}\n[/EXECUTE_SCRIPT]")
}
