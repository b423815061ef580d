//! MCP Transport Layer
//!
//! [`McpConnection::connect`] is the single entry point: it reads the tagged
//! transport of a [`McpServerConfig`] and opens either a spawned stdio
//! process, a streamable HTTP session or a legacy SSE session.

use super::config::{
    api_key_header, expand_env_value, process_env, HttpProtocol, McpServerConfig, McpTransport,
};
use super::protocol::{McpError, McpRequest, McpResponse, McpResult};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use std::collections::HashMap;
use std::pin::pin;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long a request may wait for its response
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SESSION_HEADER: &str = "mcp-session-id";

/// Requests awaiting a response, keyed by JSON-RPC id
#[derive(Clone, Default)]
struct PendingRequests {
    inner: Arc<Mutex<HashMap<u64, oneshot::Sender<McpResponse>>>>,
}

impl PendingRequests {
    fn register(&self, id: u64) -> oneshot::Receiver<McpResponse> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
        rx
    }

    fn forget(&self, id: u64) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    /// Hand a response to its waiter; server-initiated messages are dropped
    fn resolve(&self, server: &str, raw: &str) {
        let response = match serde_json::from_str::<McpResponse>(raw) {
            Ok(response) => response,
            Err(e) => {
                warn!(server = %server, error = %e, "Failed to parse MCP message");
                return;
            }
        };
        let Some(id) = response.id else {
            debug!(server = %server, "Ignoring server notification");
            return;
        };
        let sender = self
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        if let Some(sender) = sender {
            let _ = sender.send(response);
        }
    }

    /// Drop every waiter so pending requests fail fast
    fn close(&self) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    async fn wait(&self, id: u64, rx: oneshot::Receiver<McpResponse>) -> McpResult<McpResponse> {
        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(McpError::Transport("Response channel closed".to_string())),
            Err(_) => {
                self.forget(id);
                Err(McpError::Timeout)
            }
        }
    }
}

struct StdioChannel {
    child: tokio::sync::Mutex<Child>,
    stdin: tokio::sync::Mutex<ChildStdin>,
    pending: PendingRequests,
    reader: JoinHandle<()>,
}

struct LegacySse {
    post_url: String,
    pending: PendingRequests,
    reader: JoinHandle<()>,
}

struct HttpChannel {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    session_id: Mutex<Option<String>>,
    legacy: Option<LegacySse>,
}

enum Channel {
    Stdio(StdioChannel),
    Http(HttpChannel),
}

/// Active MCP server connection
pub struct McpConnection {
    /// Server name
    pub name: String,
    request_id: AtomicU64,
    channel: Channel,
}

impl McpConnection {
    /// Open a connection using the transport named in `config`
    pub async fn connect(config: &McpServerConfig) -> McpResult<Self> {
        info!(server = %config.name, transport = config.transport.kind(), "Connecting to MCP server");

        let channel = match &config.transport {
            McpTransport::Stdio { command, args, env } => {
                Channel::Stdio(spawn_stdio(&config.name, command, args, env)?)
            }
            McpTransport::Http {
                url,
                protocol,
                api_key_env,
                api_key_header: header_name,
            } => {
                let headers = build_headers(api_key_header(
                    api_key_env.as_deref(),
                    header_name.as_deref(),
                    process_env,
                ))?;
                let client = reqwest::Client::builder()
                    .connect_timeout(REQUEST_TIMEOUT)
                    .build()
                    .map_err(|e| McpError::Transport(e.to_string()))?;

                let legacy = match protocol {
                    HttpProtocol::StreamableHttp => None,
                    HttpProtocol::Sse => {
                        Some(open_legacy_sse(&config.name, &client, url, &headers).await?)
                    }
                };

                Channel::Http(HttpChannel {
                    client,
                    url: url.clone(),
                    headers,
                    session_id: Mutex::new(None),
                    legacy,
                })
            }
        };

        Ok(Self {
            name: config.name.clone(),
            request_id: AtomicU64::new(1),
            channel,
        })
    }

    /// Get next request ID
    pub fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a request and wait for its response
    pub async fn send(&self, request: McpRequest) -> McpResult<McpResponse> {
        let id = request
            .id
            .ok_or_else(|| McpError::Protocol("request without id".to_string()))?;

        match &self.channel {
            Channel::Stdio(stdio) => {
                let rx = stdio.pending.register(id);
                if let Err(e) = self.write_line(stdio, &request).await {
                    stdio.pending.forget(id);
                    return Err(e);
                }
                stdio.pending.wait(id, rx).await
            }
            Channel::Http(http) => match &http.legacy {
                Some(legacy) => {
                    let rx = legacy.pending.register(id);
                    if let Err(e) = http.post(&legacy.post_url, &request).await {
                        legacy.pending.forget(id);
                        return Err(e);
                    }
                    legacy.pending.wait(id, rx).await
                }
                None => {
                    let response = tokio::time::timeout(REQUEST_TIMEOUT, http.exchange(&request))
                        .await
                        .map_err(|_| McpError::Timeout)??;
                    response.ok_or_else(|| {
                        McpError::Protocol(format!("no response for request {}", id))
                    })
                }
            },
        }
    }

    /// Issue `method` with a fresh id; the JSON-RPC error object becomes
    /// [`McpError::Server`]
    pub async fn call(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> McpResult<Option<serde_json::Value>> {
        let mut request = McpRequest::new(method, self.next_id());
        request.params = params;
        self.send(request).await?.into_result()
    }

    /// Send a notification without waiting
    pub async fn notify(&self, notification: McpRequest) -> McpResult<()> {
        match &self.channel {
            Channel::Stdio(stdio) => self.write_line(stdio, &notification).await,
            Channel::Http(http) => {
                let url = http
                    .legacy
                    .as_ref()
                    .map_or(http.url.as_str(), |l| l.post_url.as_str());
                http.post(url, &notification).await.map(|_| ())
            }
        }
    }

    async fn write_line(&self, stdio: &StdioChannel, request: &McpRequest) -> McpResult<()> {
        let mut json = serde_json::to_string(request)
            .map_err(|e| McpError::Protocol(format!("Failed to serialize request: {}", e)))?;
        json.push('\n');

        debug!(server = %self.name, method = %request.method, "Sending to MCP server");

        let mut stdin = stdio.stdin.lock().await;
        stdin
            .write_all(json.as_bytes())
            .await
            .map_err(|e| McpError::Transport(format!("Failed to write to stdin: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| McpError::Transport(format!("Failed to flush stdin: {}", e)))
    }

    /// Close the connection, terminating a spawned server
    pub async fn close(&self) {
        match &self.channel {
            Channel::Stdio(stdio) => {
                stdio.pending.close();
                if let Err(e) = stdio.child.lock().await.kill().await {
                    debug!(server = %self.name, error = %e, "MCP server already exited");
                }
                stdio.reader.abort();
            }
            Channel::Http(http) => {
                if let Some(legacy) = &http.legacy {
                    legacy.pending.close();
                    legacy.reader.abort();
                }
            }
        }
        info!(server = %self.name, "MCP connection closed");
    }
}

impl Drop for McpConnection {
    fn drop(&mut self) {
        match &self.channel {
            // the child itself is reaped by kill_on_drop
            Channel::Stdio(stdio) => stdio.reader.abort(),
            Channel::Http(http) => {
                if let Some(legacy) = &http.legacy {
                    legacy.reader.abort();
                }
            }
        }
    }
}

impl HttpChannel {
    fn request(&self, url: &str, body: &McpRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);

        let session = self
            .session_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(session) = session {
            builder = builder.header(SESSION_HEADER, session);
        }
        builder
    }

    async fn post(&self, url: &str, body: &McpRequest) -> McpResult<reqwest::Response> {
        let response = self
            .request(url, body)
            .send()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.to_string());
        }

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(McpError::Transport(format!("HTTP {}: {}", status, text)));
        }
        Ok(response)
    }

    /// One streamable-http round trip; the reply is JSON or an event stream
    async fn exchange(&self, request: &McpRequest) -> McpResult<Option<McpResponse>> {
        let response = self.post(&self.url, request).await?;

        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if !is_stream {
            let text = response
                .text()
                .await
                .map_err(|e| McpError::Transport(e.to_string()))?;
            if text.trim().is_empty() {
                return Ok(None);
            }
            return serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| McpError::Protocol(format!("Invalid JSON-RPC response: {}", e)));
        }

        let mut events = pin!(response.bytes_stream().eventsource());
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| McpError::Transport(e.to_string()))?;
            if let Some(found) = matching_response(&event.data, request.id) {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

fn matching_response(data: &str, id: Option<u64>) -> Option<McpResponse> {
    serde_json::from_str::<McpResponse>(data)
        .ok()
        .filter(|r| r.id.is_some() && r.id == id)
}

fn build_headers(api_key: Option<(String, String)>) -> McpResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some((name, value)) = api_key {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| McpError::Transport(format!("Invalid header name '{}': {}", name, e)))?;
        let mut value = HeaderValue::from_str(&value)
            .map_err(|e| McpError::Transport(format!("Invalid API key header value: {}", e)))?;
        value.set_sensitive(true);
        headers.insert(name, value);
    }
    Ok(headers)
}

fn spawn_stdio(
    server: &str,
    command: &str,
    args: &[String],
    env: &HashMap<String, String>,
) -> McpResult<StdioChannel> {
    info!(server = %server, command = %command, args = ?args, "Starting MCP server process");

    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    for (key, value) in env {
        cmd.env(key, expand_env_value(value, process_env));
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| McpError::Transport(format!("Failed to spawn MCP server: {}", e)))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| McpError::Transport("Failed to get stdin handle".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| McpError::Transport("Failed to get stdout handle".to_string()))?;

    let pending = PendingRequests::default();
    let reader_pending = pending.clone();
    let server_name = server.to_string();

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => reader_pending.resolve(&server_name, &line),
                Ok(None) => break,
                Err(e) => {
                    error!(server = %server_name, error = %e, "Read error");
                    break;
                }
            }
        }
        reader_pending.close();
        info!(server = %server_name, "MCP server reader task exited");
    });

    Ok(StdioChannel {
        child: tokio::sync::Mutex::new(child),
        stdin: tokio::sync::Mutex::new(stdin),
        pending,
        reader,
    })
}

async fn open_legacy_sse(
    server: &str,
    client: &reqwest::Client,
    url: &str,
    headers: &HeaderMap,
) -> McpResult<LegacySse> {
    let base = reqwest::Url::parse(url)
        .map_err(|e| McpError::Transport(format!("Invalid server URL '{}': {}", url, e)))?;

    let response = client
        .get(base.clone())
        .headers(headers.clone())
        .header(ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| McpError::Transport(e.to_string()))?;
    if !response.status().is_success() {
        return Err(McpError::Transport(format!(
            "HTTP {} opening event stream",
            response.status()
        )));
    }

    let pending = PendingRequests::default();
    let reader_pending = pending.clone();
    let server_name = server.to_string();
    let (endpoint_tx, endpoint_rx) = oneshot::channel::<String>();

    let reader = tokio::spawn(async move {
        let mut endpoint_tx = Some(endpoint_tx);
        let mut events = pin!(response.bytes_stream().eventsource());
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    error!(server = %server_name, error = %e, "Event stream error");
                    break;
                }
            };
            match event.event.as_str() {
                "endpoint" => {
                    if let Some(tx) = endpoint_tx.take() {
                        let _ = tx.send(event.data);
                    }
                }
                _ => reader_pending.resolve(&server_name, &event.data),
            }
        }
        reader_pending.close();
        info!(server = %server_name, "MCP event stream closed");
    });

    let endpoint = match tokio::time::timeout(REQUEST_TIMEOUT, endpoint_rx).await {
        Ok(Ok(endpoint)) => endpoint,
        Ok(Err(_)) => {
            reader.abort();
            return Err(McpError::Protocol(
                "event stream closed before announcing an endpoint".to_string(),
            ));
        }
        Err(_) => {
            reader.abort();
            return Err(McpError::Timeout);
        }
    };

    let post_url = base
        .join(endpoint.trim())
        .map_err(|e| McpError::Protocol(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
    debug!(server = %server, endpoint = %post_url, "Legacy SSE endpoint announced");

    Ok(LegacySse {
        post_url: post_url.to_string(),
        pending,
        reader,
    })
}
