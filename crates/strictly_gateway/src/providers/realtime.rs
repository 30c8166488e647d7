//! Persistent websocket session with streamed text responses.
//!
//! One socket is kept open per provider and reused across calls. Each call
//! configures the session, appends the user turn, triggers a response and
//! collects text deltas until the response is done. Any failure drops the
//! socket so the next call reconnects.

use super::GenerationProvider;
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::ProviderError;
use crate::prompt::Prompt;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Session settings sent with `session.update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSettings {
    /// Output modalities.
    pub modalities: Vec<String>,
    /// System instructions.
    pub instructions: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on output tokens.
    pub max_response_output_tokens: u32,
}

/// Content part of a conversation item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentPart {
    /// Part type, always `input_text` here.
    #[serde(rename = "type")]
    pub kind: String,
    /// Text of the part.
    pub text: String,
}

/// Conversation item appended with `conversation.item.create`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationItem {
    /// Item type, always `message` here.
    #[serde(rename = "type")]
    pub kind: String,
    /// Author role.
    pub role: String,
    /// Content parts.
    pub content: Vec<ContentPart>,
}

/// Response options sent with `response.create`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSettings {
    /// Output modalities.
    pub modalities: Vec<String>,
}

/// Control messages sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Configure the session.
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Settings.
        session: SessionSettings,
    },
    /// Append input.
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to append.
        item: ConversationItem,
    },
    /// Trigger a response.
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Response options.
        response: ResponseSettings,
    },
}

impl ClientEvent {
    /// The three messages that make up one turn.
    pub fn turn(prompt: &Prompt, temperature: f32, max_tokens: u32) -> [ClientEvent; 3] {
        let text = vec!["text".to_string()];
        [
            ClientEvent::SessionUpdate {
                session: SessionSettings {
                    modalities: text.clone(),
                    instructions: prompt.system().clone(),
                    temperature,
                    max_response_output_tokens: max_tokens,
                },
            },
            ClientEvent::ConversationItemCreate {
                item: ConversationItem {
                    kind: "message".to_string(),
                    role: "user".to_string(),
                    content: vec![ContentPart {
                        kind: "input_text".to_string(),
                        text: prompt.user().clone(),
                    }],
                },
            },
            ClientEvent::ResponseCreate {
                response: ResponseSettings { modalities: text },
            },
        ]
    }
}

/// Error body carried by a server `error` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerErrorBody {
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Machine-readable code.
    #[serde(default)]
    pub code: Option<String>,
}

/// Messages received from the server. Everything not listed is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Chunk of response text.
    #[serde(rename = "response.text.delta")]
    TextDelta {
        /// Text chunk.
        delta: String,
    },
    /// Chunk of the transcript of an audio response.
    #[serde(rename = "response.audio_transcript.delta")]
    TranscriptDelta {
        /// Text chunk.
        delta: String,
    },
    /// The response is complete.
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Raw response object.
        #[serde(default)]
        response: Option<serde_json::Value>,
    },
    /// The server rejected something.
    #[serde(rename = "error")]
    Error {
        /// Details.
        error: ServerErrorBody,
    },
    /// Session bookkeeping and anything else.
    #[serde(other)]
    Other,
}

/// Accumulates deltas into a finished reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealtimeTranscript {
    text: String,
}

impl RealtimeTranscript {
    /// Empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Text collected so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Feeds one raw server message. Returns the full reply once the
    /// response is done.
    pub fn push_raw(&mut self, raw: &str) -> Result<Option<String>, ProviderError> {
        let event: ServerEvent = serde_json::from_str(raw)
            .map_err(|e| ProviderError::Malformed(format!("bad server event: {e}")))?;
        self.push(event)
    }

    /// Feeds one server event. Returns the full reply once the response is
    /// done.
    pub fn push(&mut self, event: ServerEvent) -> Result<Option<String>, ProviderError> {
        match event {
            ServerEvent::TextDelta { delta } | ServerEvent::TranscriptDelta { delta } => {
                self.text.push_str(&delta);
                Ok(None)
            }
            ServerEvent::ResponseDone { .. } => {
                let text = std::mem::take(&mut self.text);
                if text.trim().is_empty() {
                    Err(ProviderError::Malformed("empty realtime response".to_string()))
                } else {
                    Ok(Some(text))
                }
            }
            ServerEvent::Error { error } => match error.code.as_deref() {
                Some("invalid_api_key") => Err(ProviderError::Http {
                    status: 401,
                    body: error.message,
                }),
                _ => Err(ProviderError::Network(format!("session error: {}", error.message))),
            },
            ServerEvent::Other => Ok(None),
        }
    }
}

/// Realtime provider holding one reusable socket.
pub struct RealtimeProvider {
    name: String,
    url: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    socket: Mutex<Option<Socket>>,
}

impl std::fmt::Debug for RealtimeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeProvider")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RealtimeProvider {
    /// Creates the provider. The socket opens on first use.
    #[instrument(skip(config), fields(name = %config.name(), model = %config.model()))]
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let endpoint = config
            .resolved_endpoint()
            .ok_or_else(|| ProviderError::Configuration("no realtime endpoint".to_string()))?;
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        Ok(Self {
            name: config.name().clone(),
            url: format!("{endpoint}{separator}model={}", config.model()),
            api_key: config.resolve_api_key()?,
            temperature: *config.temperature(),
            max_tokens: *config.max_tokens(),
            timeout: config.timeout(),
            socket: Mutex::new(None),
        })
    }

    async fn connect(&self) -> Result<Socket, ProviderError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ProviderError::Configuration(format!("bad realtime URL: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| ProviderError::Configuration(format!("bad API key: {e}")))?;
        let headers = request.headers_mut();
        headers.insert("Authorization", bearer);
        headers.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        info!(url = %self.url, "Opening realtime session");
        let (socket, _response) = connect_async(request).await.map_err(|e| {
            warn!(error = %e, "Realtime connect failed");
            ProviderError::Network(format!("connect failed: {e}"))
        })?;
        Ok(socket)
    }

    async fn exchange(socket: &mut Socket, turn: [ClientEvent; 3]) -> Result<String, ProviderError> {
        for event in turn {
            let json = serde_json::to_string(&event)
                .map_err(|e| ProviderError::Malformed(format!("encode failed: {e}")))?;
            socket
                .send(Message::Text(json.into()))
                .await
                .map_err(|e| ProviderError::Network(format!("send failed: {e}")))?;
        }

        let mut transcript = RealtimeTranscript::new();
        while let Some(message) = socket.next().await {
            let message = message.map_err(|e| ProviderError::Network(format!("receive failed: {e}")))?;
            match message {
                Message::Text(text) => {
                    if let Some(reply) = transcript.push_raw(&text)? {
                        return Ok(reply);
                    }
                }
                Message::Close(_) => {
                    return Err(ProviderError::Network("session closed by server".to_string()));
                }
                _ => {}
            }
        }
        Err(ProviderError::Network("session ended mid-response".to_string()))
    }
}

#[async_trait]
impl GenerationProvider for RealtimeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Realtime
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(skip(self, prompt), fields(provider = %self.name))]
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let mut guard = self.socket.lock().await;
        let mut socket = match guard.take() {
            Some(socket) => socket,
            None => self.connect().await?,
        };

        let turn = ClientEvent::turn(prompt, self.temperature, self.max_tokens);
        match Self::exchange(&mut socket, turn).await {
            Ok(reply) => {
                debug!(content_length = reply.len(), "Realtime response complete");
                *guard = Some(socket);
                Ok(reply)
            }
            Err(e) => {
                warn!(error = %e, "Dropping realtime session");
                Err(e)
            }
        }
    }
}
