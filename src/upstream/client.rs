//! Upstream HTTP client.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use reqwest::redirect::Policy;
use thiserror::Error;
use url::Url;

use crate::config::schema::{TimeoutConfig, UpstreamConfig};

/// Every way a fetch can fail. Network, TLS and CORS-style rejections at the
/// transport level are not told apart.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no response from upstream within {0:?}")]
    Timeout(Duration),
}

/// A request as it will be sent to the CDN.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Build the shared client from configuration.
pub fn build_client(
    upstream: &UpstreamConfig,
    timeouts: &TimeoutConfig,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .redirect(Policy::limited(upstream.max_redirects))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs));

    if !upstream.system_proxy {
        builder = builder.no_proxy();
    }

    builder.build()
}

/// Send a request, waiting at most `timeout` for the response head.
pub async fn send(
    client: &reqwest::Client,
    request: &OutboundRequest,
    timeout: Duration,
) -> Result<reqwest::Response, UpstreamError> {
    let pending = client
        .request(request.method.clone(), request.url.clone())
        .headers(request.headers.clone())
        .body(request.body.clone())
        .send();

    match tokio::time::timeout(timeout, pending).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(UpstreamError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client() -> reqwest::Client {
        let upstream = UpstreamConfig {
            system_proxy: false,
            ..UpstreamConfig::default()
        };
        build_client(&upstream, &TimeoutConfig::default()).unwrap()
    }

    fn get(url: &str) -> OutboundRequest {
        OutboundRequest {
            method: Method::GET,
            url: Url::parse(url).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        // bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = send(&client(), &get(&format!("http://{}/a.ts", addr)), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
    }

    #[tokio::test]
    async fn silent_upstream_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
            let _ = socket.shutdown().await;
        });

        let err = send(&client(), &get(&format!("http://{}/a.ts", addr)), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout(_)));
    }

    #[tokio::test]
    async fn redirects_are_followed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for _ in 0..2 {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 2048];
                let n = socket.read(&mut buf).await.unwrap();
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let response = if request.starts_with("GET /old.mp4") {
                    "HTTP/1.1 302 Found\r\nLocation: /new.mp4\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_string()
                } else {
                    "HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\nnew".to_string()
                };
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        let response = send(&client(), &get(&format!("http://{}/old.mp4", addr)), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "new");
    }
}
