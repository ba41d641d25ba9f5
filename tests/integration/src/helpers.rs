//! Test helpers for integration tests
//!
//! Provides utilities for spawning a test gateway and talking to it over
//! HTTP and WebSocket.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use futures_util::{SinkExt, StreamExt};
use presence_common::{AppConfig, AppSettings, Environment, ServerConfig, TypingConfig};
use presence_gateway::server::{create_app, create_gateway_state, GatewayState};
use reqwest::Client;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// Timeout for any single expected message
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration with short expiry windows so tests run quickly
pub fn test_config() -> AppConfig {
    AppConfig {
        app: AppSettings {
            name: "presence-test".to_string(),
            env: Environment::Development,
        },
        gateway: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        typing: TypingConfig {
            idle_timeout_ms: 300,
            sweep_interval_ms: 100,
            event_buffer: 64,
        },
    }
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub state: GatewayState,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test gateway on an ephemeral port
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()).await
    }

    /// Start a test gateway with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let state = create_gateway_state(config);
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

    /// Fetch the health endpoint as JSON
    pub async fn health(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url()))
            .send()
            .await?;
        Ok(response.json().await?)
    }

    /// Open a WebSocket connection to the gateway
    pub async fn connect(&self) -> Result<WsClient> {
        WsClient::connect(self.addr).await
    }
}

/// A WebSocket client speaking the gateway's JSON protocol
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Connect to a gateway at the given address
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let url = format!("ws://{addr}/gateway");
        let (stream, _) = connect_async(url.as_str()).await?;
        Ok(Self { stream })
    }

    /// Send a JSON message
    pub async fn send_json(&mut self, value: &serde_json::Value) -> Result<()> {
        self.stream.send(Message::Text(value.to_string())).await?;
        Ok(())
    }

    /// Send a raw text frame
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Receive the next JSON message, skipping control frames
    pub async fn recv_json(&mut self) -> Result<serde_json::Value> {
        loop {
            let msg = timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .map_err(|_| anyhow!("timed out waiting for message"))?
                .ok_or_else(|| anyhow!("connection closed"))??;

            match msg {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Ping(_) | Message::Pong(_) => {}
                other => bail!("unexpected frame: {other:?}"),
            }
        }
    }

    /// Assert that no message arrives within the given window
    pub async fn expect_silence(&mut self, window: Duration) -> Result<()> {
        match timeout(window, self.stream.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(Message::Text(text)))) => bail!("unexpected message: {text}"),
            Ok(Some(Ok(_))) => Ok(()),
            Ok(Some(Err(e))) => bail!("websocket error: {e}"),
            Ok(None) => bail!("connection closed"),
        }
    }

    /// Close the connection
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Poll until `check` returns true or the deadline passes
pub async fn wait_until<F>(deadline: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
