//! OpenAI-compatible Chat Completions session.
//!
//! The service is stateless, so the session keeps the transcript client-side
//! and replays it with every request. Replies are streamed over SSE.

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream};
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::config::{ConnectionDescriptor, RunnerConfig};
use crate::error::SkillError;
use crate::types::{HistoryEntry, SessionEvent, SessionMessage, SessionSettings};
use crate::util::retry::RetryPolicy;

use super::http::{bearer_headers, parse_sse_line, shared_client, status_to_error, SseLine};
use super::{ConnectRequest, ModelSession, SessionConnector};

type EventStream = BoxStream<'static, Result<SessionEvent, SkillError>>;

pub struct OpenAiSession {
    descriptor: ConnectionDescriptor,
    session_id: String,
    settings: SessionSettings,
    retry: RetryPolicy,
    transcript: Vec<HistoryEntry>,
    stream: Option<EventStream>,
    closed: bool,
}

impl OpenAiSession {
    pub fn new(descriptor: ConnectionDescriptor, session_id: impl Into<String>) -> Self {
        Self {
            descriptor,
            session_id: session_id.into(),
            settings: SessionSettings::default(),
            retry: RetryPolicy::default(),
            transcript: Vec::new(),
            stream: None,
            closed: false,
        }
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.descriptor.model
    }

    /// Messages exchanged so far, as replayed to the service.
    pub fn transcript(&self) -> &[HistoryEntry] {
        &self.transcript
    }

    fn build_request_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.descriptor.model,
            "messages": self.transcript,
            "stream": true,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(max) = self.settings.max_tokens {
                obj.insert("max_tokens".into(), max.into());
            }
            if let Some(temp) = self.settings.temperature {
                obj.insert("temperature".into(), temp.into());
            }
            if let Some(top_p) = self.settings.top_p {
                obj.insert("top_p".into(), top_p.into());
            }
            if let Some(ref user) = self.settings.user {
                obj.insert("user".into(), user.clone().into());
            }
        }

        body
    }
}

#[async_trait]
impl ModelSession for OpenAiSession {
    async fn send(&mut self, message: SessionMessage) -> Result<(), SkillError> {
        if self.closed {
            return Err(SkillError::Closed);
        }
        if self.stream.is_some() {
            return Err(SkillError::protocol(
                "previous reply has not been fully read",
            ));
        }

        self.transcript.push(HistoryEntry::user(message.content));
        let body = self.build_request_body();
        let url = format!(
            "{}/chat/completions",
            self.descriptor.base_url.trim_end_matches('/')
        );

        debug!(
            model = %self.descriptor.model,
            session_id = %self.session_id,
            messages = self.transcript.len(),
            "sending session message"
        );

        let (url, body, api_key) = (&url, &body, &self.descriptor.api_key);
        let response = self
            .retry
            .execute(|| async move {
                let resp = shared_client()
                    .post(url)
                    .headers(bearer_headers(api_key))
                    .json(body)
                    .send()
                    .await?;
                let status = resp.status();
                if !status.is_success() {
                    let text = resp.text().await.unwrap_or_default();
                    return Err(status_to_error(status.as_u16(), &text));
                }
                Ok(resp)
            })
            .await;

        match response {
            Ok(resp) => {
                self.stream = Some(Box::pin(sse_events(resp.bytes_stream())));
                Ok(())
            }
            Err(e) => {
                // The message never reached the model; keep the transcript honest.
                self.transcript.pop();
                Err(e)
            }
        }
    }

    async fn next_event(&mut self) -> Option<Result<SessionEvent, SkillError>> {
        let stream = self.stream.as_mut()?;
        match stream.next().await {
            Some(Ok(event)) => {
                match &event {
                    SessionEvent::AssistantMessage { text } => {
                        self.transcript.push(HistoryEntry::assistant(text.clone()));
                    }
                    SessionEvent::TurnComplete | SessionEvent::Error { .. } => {
                        self.stream = None;
                    }
                    _ => {}
                }
                Some(Ok(event))
            }
            Some(Err(e)) => {
                self.stream = None;
                Some(Err(e))
            }
            None => {
                self.stream = None;
                None
            }
        }
    }

    async fn close(&mut self) -> Result<(), SkillError> {
        self.closed = true;
        self.stream = None;
        Ok(())
    }
}

/// Turn an SSE byte stream into session events.
///
/// Emits a delta per non-empty content fragment, then the assembled message
/// and `TurnComplete` once the server sends `[DONE]` or hangs up.
fn sse_events<S, B>(byte_stream: S) -> impl Stream<Item = Result<SessionEvent, SkillError>>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    async_stream::stream! {
        // Buffer raw bytes so a multi-byte character split across chunks
        // is decoded whole.
        let mut buffer: Vec<u8> = Vec::new();
        let mut full_text = String::new();
        futures::pin_mut!(byte_stream);

        'read: while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(SkillError::Network(e));
                    return;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=line_end).collect();
                let line = String::from_utf8_lossy(&line);

                match parse_sse_line(&line) {
                    SseLine::Done => break 'read,
                    SseLine::Other => continue,
                    SseLine::Data(data) => match serde_json::from_str::<ChatStreamChunk>(data) {
                        Ok(chunk) => {
                            if let Some(err) = chunk.error {
                                yield Ok(SessionEvent::error(err.message));
                                return;
                            }
                            for choice in chunk.choices {
                                if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                                    full_text.push_str(&text);
                                    yield Ok(SessionEvent::text_delta(text));
                                }
                            }
                        }
                        Err(e) => debug!(error = %e, "skipping unparseable stream chunk"),
                    },
                }
            }
        }

        yield Ok(SessionEvent::assistant_message(full_text));
        yield Ok(SessionEvent::TurnComplete);
    }
}

#[derive(Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
    error: Option<ChatStreamError>,
}

#[derive(Deserialize)]
struct ChatStreamChoice {
    #[serde(default)]
    delta: ChatStreamDelta,
}

#[derive(Deserialize, Default)]
struct ChatStreamDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatStreamError {
    message: String,
}

/// Opens [`OpenAiSession`]s against one service.
#[derive(Debug, Clone)]
pub struct OpenAiConnector {
    descriptor: ConnectionDescriptor,
    settings: SessionSettings,
    retry: RetryPolicy,
}

impl OpenAiConnector {
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        Self {
            descriptor,
            settings: SessionSettings::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Connector for the configured service. Fails without an API key.
    pub fn from_config(config: &RunnerConfig) -> Result<Self, SkillError> {
        Ok(Self::new(config.connection()?).with_settings(config.session.clone()))
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl SessionConnector for OpenAiConnector {
    async fn connect(&self, request: ConnectRequest) -> Result<Box<dyn ModelSession>, SkillError> {
        let mut descriptor = self.descriptor.clone();
        if let Some(model) = request.model {
            descriptor.model = model;
        }
        debug!(model = %descriptor.model, session_id = %request.session_id, "opening session");
        Ok(Box::new(
            OpenAiSession::new(descriptor, request.session_id)
                .with_settings(self.settings.clone())
                .with_retry_policy(self.retry.clone()),
        ))
    }
}
