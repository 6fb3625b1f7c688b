//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use media_relay::config::RelayConfig;
use media_relay::http::{AppState, HttpServer};
use media_relay::Shutdown;

/// Request head as a mock backend received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub head: String,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or("")
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl MockResponse {
    pub fn ok(content_type: &'static str, body: &str) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.to_string(),
        }
    }
}

/// A raw HTTP/1.1 backend on an ephemeral port.
///
/// Every connection serves one response and closes. When the handler returns
/// `None` the connection is dropped without a reply.
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

#[allow(dead_code)]
impl MockBackend {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Option<MockResponse> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let respond = Arc::new(respond);

        let recorded = requests.clone();
        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((mut socket, _)) => {
                        let respond = respond.clone();
                        let recorded = recorded.clone();
                        tokio::spawn(async move {
                            let mut buf = Vec::new();
                            let mut chunk = [0u8; 4096];
                            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                                match socket.read(&mut chunk).await {
                                    Ok(0) | Err(_) => return,
                                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                                }
                            }

                            let request = RecordedRequest {
                                head: String::from_utf8_lossy(&buf).into_owned(),
                            };
                            recorded.lock().unwrap().push(request.clone());

                            let Some(response) = respond(&request) else {
                                return;
                            };
                            let reason = StatusCode::from_u16(response.status)
                                .ok()
                                .and_then(|s| s.canonical_reason())
                                .unwrap_or("OK");
                            let raw = format!(
                                "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                response.status,
                                reason,
                                response.content_type,
                                response.body.len(),
                                response.body
                            );
                            let _ = socket.write_all(raw.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Close the listening socket; later connections are refused.
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

/// A backend that accepts connections, reads the request and never answers.
pub struct SilentBackend {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl SilentBackend {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));

        let counter = connections.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    drop(socket);
                });
            }
        });

        Self { addr, connections }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Send a bare HTTP/1.1 GET and return the status line and body.
///
/// Used where the reason phrase matters; reqwest does not expose it.
#[allow(dead_code)]
pub async fn raw_get(addr: SocketAddr, path: &str) -> (String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8_lossy(&raw).into_owned();
    let (head, body) = text.split_once("\r\n\r\n").unwrap_or((text.as_str(), ""));
    let status_line = head.lines().next().unwrap_or("").to_string();
    (status_line, body.to_string())
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Configuration suited to loopback tests.
pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.upstream.system_proxy = false;
    config.observability.metrics_enabled = false;
    config.timeouts.request_secs = 5;
    config
}

pub struct RelayHandle {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: Shutdown,
    #[allow(dead_code)]
    pub updates: mpsc::UnboundedSender<RelayConfig>,
}

#[allow(dead_code)]
impl RelayHandle {
    /// Address of the query-parameter entry point for `target`.
    pub fn relay_url(&self, target: &str) -> String {
        format!("http://{}{}", self.addr, relay_path(target))
    }
}

/// Path and query of the query-parameter entry point for `target`.
pub fn relay_path(target: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("/relay?url={}", encoded)
}

/// Start the relay on an ephemeral port.
pub async fn spawn_relay(config: RelayConfig) -> RelayHandle {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let state = server.state();
    let shutdown = Shutdown::new();
    let (updates, update_rx) = mpsc::unbounded_channel();

    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, update_rx, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    RelayHandle {
        addr,
        state,
        shutdown,
        updates,
    }
}

/// A player-side client that never goes through a system proxy.
pub fn player() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
