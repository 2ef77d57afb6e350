//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use appconfig_sync::config::SyncConfig;

/// What the mock backend saw for one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the parsed request head and returns `(status, body)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request_head(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Backend that answers every request with the next scripted response, then
/// repeats the last one. Returns the address and a request log.
pub async fn start_scripted_backend(
    script: Vec<(u16, String)>,
) -> (SocketAddr, Arc<Mutex<Vec<RecordedRequest>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&log);
    let script = Arc::new(script);

    let addr = start_programmable_backend(move |request| {
        let seen = Arc::clone(&seen);
        let script = Arc::clone(&script);
        async move {
            let index = {
                let mut seen = seen.lock().unwrap();
                seen.push(request);
                seen.len() - 1
            };
            script
                .get(index)
                .or_else(|| script.last())
                .cloned()
                .unwrap_or((500, String::new()))
        }
    })
    .await;

    (addr, log)
}

async fn read_request_head(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let authorization = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
        .map(|(_, value)| value.trim().to_string());

    Some(RecordedRequest {
        method,
        path,
        authorization,
    })
}

#[derive(Debug, Clone)]
enum WsCommand {
    Send(Message),
    Drop,
}

/// Mock notification server.
pub struct MockWsServer {
    pub addr: SocketAddr,
    commands: broadcast::Sender<WsCommand>,
    connections: Arc<AtomicU32>,
    active: Arc<AtomicU32>,
    authorizations: Arc<Mutex<Vec<Option<String>>>>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        Self::start_on("127.0.0.1:0".parse().unwrap()).await
    }

    /// Starts listening on a fixed address, e.g. one a client is already
    /// failing to reach.
    pub async fn start_on(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (commands, _) = broadcast::channel(64);
        let connections = Arc::new(AtomicU32::new(0));
        let active = Arc::new(AtomicU32::new(0));
        let authorizations = Arc::new(Mutex::new(Vec::new()));

        let server = Self {
            addr,
            commands: commands.clone(),
            connections: Arc::clone(&connections),
            active: Arc::clone(&active),
            authorizations: Arc::clone(&authorizations),
        };

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let mut rx = commands.subscribe();
                let connections = Arc::clone(&connections);
                let active = Arc::clone(&active);
                let authorizations = Arc::clone(&authorizations);

                tokio::spawn(async move {
                    let seen = Arc::clone(&authorizations);
                    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                        let auth = req
                            .headers()
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        seen.lock().unwrap().push(auth);
                        Ok(resp)
                    };
                    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(socket, callback).await else {
                        return;
                    };
                    connections.fetch_add(1, Ordering::SeqCst);
                    active.fetch_add(1, Ordering::SeqCst);

                    loop {
                        tokio::select! {
                            command = rx.recv() => match command {
                                Ok(WsCommand::Send(message)) => {
                                    if ws.send(message).await.is_err() {
                                        break;
                                    }
                                }
                                Ok(WsCommand::Drop) | Err(_) => {
                                    let _ = ws.close(None).await;
                                    break;
                                }
                            },
                            incoming = ws.next() => match incoming {
                                Some(Ok(_)) => {}
                                _ => break,
                            },
                        }
                    }
                    active.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        server
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Total successful handshakes so far.
    pub fn connections(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> u32 {
        self.active.load(Ordering::SeqCst)
    }

    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.authorizations.lock().unwrap().clone()
    }

    pub fn send_text(&self, text: &str) {
        let _ = self.commands.send(WsCommand::Send(Message::text(text)));
    }

    /// Closes every open connection.
    pub fn drop_connections(&self) {
        let _ = self.commands.send(WsCommand::Drop);
    }
}

/// An address on which nothing is listening yet.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Sync settings tuned for fast tests.
pub fn fast_sync_config() -> SyncConfig {
    SyncConfig {
        bootstrap_timeout_secs: 5,
        request_timeout_secs: 2,
        fetch_max_attempts: 1,
        fetch_base_delay_ms: 10,
        fetch_max_delay_ms: 50,
        reconnect_base_delay_ms: 20,
        reconnect_max_delay_ms: 100,
        connect_timeout_secs: 2,
        idle_timeout_ms: 30_000,
        shutdown_grace_ms: 1_000,
    }
}

/// Snapshot document with one boolean feature `f1` targeting segment `s1`
/// (`tier == "gold"`) and one string property `banner`.
pub fn f1_document(enabled: bool, banner: &str) -> String {
    serde_json::json!({
        "features": [{
            "feature_id": "f1",
            "name": "Feature one",
            "type": "BOOLEAN",
            "enabled": enabled,
            "enabled_value": true,
            "disabled_value": false,
            "segment_rules": [{
                "order": 1,
                "segments": ["s1"],
                "rollout_percentage": 100,
                "value": false
            }]
        }],
        "properties": [{
            "property_id": "banner",
            "name": "Banner",
            "type": "STRING",
            "value": banner
        }],
        "segments": [{
            "segment_id": "s1",
            "name": "Gold tier",
            "rules": [{
                "attribute_name": "tier",
                "operator": "equals",
                "values": ["gold"]
            }]
        }]
    })
    .to_string()
}
