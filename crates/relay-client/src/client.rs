//! HTTP log-in and the chat stream loop

use chrono::Local;
use futures_util::{SinkExt, StreamExt};
use relay_gateway::protocol::{ClientFrame, CloseCode, ServerFrame};
use relay_gateway::service::{LogInRequest, LogInResponse};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, instrument, warn};

use crate::render::render_message;

/// Client-side failures
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with an error body
    #[error("Relay rejected the request ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    code: String,
    message: String,
}

/// How the relay ended a chat stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatEnd {
    /// Close code, absent if the connection dropped without a close frame
    pub code: Option<u16>,
    pub reason: String,
}

impl ChatEnd {
    /// The close code, if it is one the relay defines
    pub fn close_code(&self) -> Option<CloseCode> {
        self.code.and_then(CloseCode::from_u16)
    }
}

impl fmt::Display for ChatEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.close_code(), self.code) {
            (Some(code), _) => write!(f, "{code}")?,
            (None, Some(raw)) => write!(f, "closed with code {raw}")?,
            (None, None) => write!(f, "connection closed")?,
        }
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

/// Relay endpoint plus a reusable HTTP client
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
    ws_url: String,
}

impl RelayClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{host}:{port}"),
            ws_url: format!("ws://{host}:{port}"),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Log in, registering `username` if it is unknown, and return the token
    #[instrument(skip(self, password))]
    pub async fn log_in(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/login", self.base_url))
            .json(&LogInRequest::new(username, password))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: LogInResponse = response.json().await?;
            debug!("Logged in");
            return Ok(body.token);
        }

        let (code, message) = match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => (envelope.error.code, envelope.error.message),
            Err(_) => ("UNKNOWN".to_string(), status.to_string()),
        };
        Err(ClientError::Rejected {
            status: status.as_u16(),
            code,
            message,
        })
    }

    /// Open the chat stream and pump it until the relay closes it
    ///
    /// Every line of `input` is sent as a normal message. At the end of
    /// `input` the client closes its side and waits for the relay's close.
    /// Relayed messages are written to `output`, one per line, with local
    /// times.
    pub async fn chat<R, W>(&self, token: &str, input: R, mut output: W) -> Result<ChatEnd, ClientError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let url = format!("{}/api/chat?token={token}", self.ws_url);
        let (socket, _) = tokio_tungstenite::connect_async(url).await?;
        let (mut sink, mut stream) = socket.split();

        let mut lines = input.lines();
        let mut input_open = true;

        loop {
            tokio::select! {
                line = lines.next_line(), if input_open => match line? {
                    Some(text) => {
                        let frame = ClientFrame::normal(text).to_json()?;
                        sink.send(Message::Text(frame)).await?;
                    }
                    None => {
                        input_open = false;
                        debug!("Input finished, closing chat stream");
                        sink.send(Message::Close(None)).await?;
                    }
                },
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => match ServerFrame::from_json(&text) {
                        Ok(frame) => {
                            let line = render_message(&frame.message, &Local);
                            output.write_all(line.as_bytes()).await?;
                            output.write_all(b"\n").await?;
                            output.flush().await?;
                        }
                        Err(e) => warn!(error = %e, "Ignoring undecodable frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        return Ok(frame.map_or_else(ChatEnd::default, |frame| ChatEnd {
                            code: Some(u16::from(frame.code)),
                            reason: frame.reason.into_owned(),
                        }));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(tungstenite::Error::ConnectionClosed)) | None => {
                        return Ok(ChatEnd::default());
                    }
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }
    }
}
