//! Test helpers for integration tests

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use relay_common::{
    AppConfig, AppSettings, Environment, JwtConfig, LogFormat, RelayConfig, ServerConfig,
};
use relay_gateway::{create_app, ClientFrame, RelayState, ServerFrame};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::CloseFrame, tungstenite::Message, MaybeTlsStream,
    WebSocketStream,
};

/// How long a test waits for the server to reach an expected state
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub type ChatSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Log-in body
#[derive(Debug, Serialize)]
pub struct LoginBody<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Successful log-in response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Health response
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
    pub attached: usize,
}

/// Error response body
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub state: RelayState,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with default relay settings
    pub async fn start() -> Result<Self> {
        Self::start_with_relay(RelayConfig::default()).await
    }

    /// Start a test server with custom relay settings
    pub async fn start_with_relay(relay: RelayConfig) -> Result<Self> {
        let state = RelayState::in_memory(test_config(relay));
        let app = create_app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            state,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// POST /api/login
    pub async fn login(&self, username: &str, password: &str) -> Result<Response> {
        Ok(self
            .client
            .post(format!("{}/api/login", self.base_url()))
            .json(&LoginBody { username, password })
            .send()
            .await?)
    }

    /// Log in and return the token, failing on any non-200 answer
    pub async fn login_token(&self, username: &str, password: &str) -> Result<String> {
        let response = self.login(username, password).await?;
        let body: TokenResponse = assert_json(response, StatusCode::OK).await?;
        Ok(body.token)
    }

    /// POST /api/logout
    pub async fn logout(&self, token: Option<&str>) -> Result<Response> {
        let mut request = self.client.post(format!("{}/api/logout", self.base_url()));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    /// GET /health
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url()))
            .send()
            .await?;
        assert_json(response, StatusCode::OK).await
    }

    /// Poll /health until `check` holds
    pub async fn wait_for_health(&self, check: impl Fn(&HealthResponse) -> bool) -> Result<HealthResponse> {
        let poll = async {
            loop {
                let health = self.health().await?;
                if check(&health) {
                    return Ok::<_, anyhow::Error>(health);
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        };
        tokio::time::timeout(WAIT_TIMEOUT, poll)
            .await
            .context("timed out waiting for server state")?
    }

    /// Open a chat stream, passing the token as a query parameter
    pub async fn connect(&self, token: &str) -> Result<ChatSocket> {
        let url = format!("ws://{}/api/chat?token={token}", self.addr);
        let (socket, _) = connect_async(url).await?;
        Ok(socket)
    }

    /// Open a chat stream without any token
    pub async fn connect_anonymous(&self) -> tokio_tungstenite::tungstenite::Result<ChatSocket> {
        let url = format!("ws://{}/api/chat", self.addr);
        connect_async(url).await.map(|(socket, _)| socket)
    }
}

/// Test configuration with in-memory storage
pub fn test_config(relay: RelayConfig) -> AppConfig {
    AppConfig {
        app: AppSettings {
            name: "relay-integration".to_string(),
            env: Environment::Development,
            log_format: LogFormat::Pretty,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: None,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            token_expiry: 3600,
        },
        relay,
    }
}

/// Send one plain text chat message
pub async fn send_text(socket: &mut ChatSocket, text: &str) -> Result<()> {
    let json = ClientFrame::normal(text).to_json()?;
    socket.send(Message::Text(json)).await?;
    Ok(())
}

/// Send a raw text frame
pub async fn send_raw(socket: &mut ChatSocket, raw: &str) -> Result<()> {
    socket.send(Message::Text(raw.to_string())).await?;
    Ok(())
}

/// What the server sent next on a chat stream
#[derive(Debug)]
pub enum Received {
    Frame(ServerFrame),
    Closed(Option<CloseFrame<'static>>),
}

/// Wait for the next chat frame or close, skipping control frames
pub async fn next_event(socket: &mut ChatSocket) -> Result<Received> {
    let read = async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Received::Frame(ServerFrame::from_json(&text)?));
                }
                Some(Ok(Message::Close(frame))) => return Ok(Received::Closed(frame)),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(anyhow::Error::from(e)),
                None => return Ok(Received::Closed(None)),
            }
        }
    };
    tokio::time::timeout(WAIT_TIMEOUT, read)
        .await
        .context("timed out waiting for a chat frame")?
}

/// Wait for the next chat frame, failing on close
pub async fn next_frame(socket: &mut ChatSocket) -> Result<ServerFrame> {
    match next_event(socket).await? {
        Received::Frame(frame) => Ok(frame),
        Received::Closed(frame) => anyhow::bail!("stream closed: {frame:?}"),
    }
}

/// Wait for the stream to close and return the close code and reason
pub async fn expect_close(socket: &mut ChatSocket) -> Result<(u16, String)> {
    match next_event(socket).await? {
        Received::Closed(Some(frame)) => Ok((u16::from(frame.code), frame.reason.into_owned())),
        Received::Closed(None) => anyhow::bail!("stream closed without a close frame"),
        Received::Frame(frame) => anyhow::bail!("expected close, got {frame:?}"),
    }
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected_status: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(())
}

/// Assert an error response and return its code
pub async fn assert_error(response: Response, expected_status: StatusCode) -> Result<String> {
    let body: ErrorResponse = assert_json(response, expected_status).await?;
    Ok(body.error.code)
}
