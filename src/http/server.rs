//! HTTP server setup and the relay handler.
//!
//! # Responsibilities
//! - Create Axum Router with the relay handler as fallback for every path
//! - Wire up middleware (request ID, tracing, body limit, timeout, CORS)
//! - Compile configuration into an immutable [`RelayState`]
//! - Swap state atomically on config reload
//! - Classify, rewrite and forward requests
//! - Serve the admin API when enabled

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header::REFERER, Request, StatusCode},
    response::Response,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::cache::{CachePolicy, CachedResponse, ResponseCache};
use crate::config::schema::TimeoutConfig;
use crate::config::RelayConfig;
use crate::headers::{merge, omit_credentials, response_headers, strip_hop_by_hop};
use crate::headers::{HeaderSelector, SelectorError};
use crate::http::request::{request_id, MakeRelayRequestId};
use crate::http::response::{bad_gateway_response, buffered_response, error_response, relay_response};
use crate::intercept::{resolve_target, MediaClassifier};
use crate::net::BoundedListener;
use crate::observability::{metrics, RelayStats};
use crate::resilience::fallback;
use crate::upstream::{self, build_client, OutboundRequest};

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid header configuration: {0}")]
    Selector(#[from] SelectorError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a request needs, compiled from one configuration.
pub struct RelayState {
    pub config: RelayConfig,
    pub selector: HeaderSelector,
    pub classifier: MediaClassifier,
    pub cache_policy: CachePolicy,
    pub cache: Option<Arc<ResponseCache>>,
    pub client: reqwest::Client,
}

impl RelayState {
    /// Compile a configuration. The live cache is carried over from
    /// `previous` while the cache name stays the same.
    pub fn build(config: RelayConfig, previous: Option<&RelayState>) -> Result<Self, ServerError> {
        let selector = HeaderSelector::from_config(&config.rewrite)?;
        let classifier = MediaClassifier::from_config(&config.intercept);
        let cache_policy = CachePolicy::from_config(&config.cache);
        let client = build_client(&config.upstream, &config.timeouts)?;

        let live = previous.and_then(|p| p.cache.clone());
        let cache = if !config.cache.enabled {
            if let Some(old) = live {
                tracing::info!(cache = %old.name(), entries = old.len(), "Cache disabled, dropping entries");
            }
            None
        } else {
            match live {
                Some(old) if old.name() == config.cache.name => Some(old),
                Some(old) => {
                    tracing::info!(old = %old.name(), new = %config.cache.name, "Deleting old cache");
                    Some(Arc::new(ResponseCache::new(config.cache.name.clone())))
                }
                None => {
                    tracing::info!(cache = %config.cache.name, "Response cache activated");
                    Some(Arc::new(ResponseCache::new(config.cache.name.clone())))
                }
            }
        };

        Ok(Self {
            config,
            selector,
            classifier,
            cache_policy,
            cache,
            client,
        })
    }

    /// How long to wait for an upstream response head.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeouts.request_secs)
    }
}

/// Outer bound on a whole request.
///
/// Must outlast a failed attempt plus the header-less retry (or buffering a
/// cacheable body), so upstream timeouts always reach the failure policy.
pub fn handler_deadline(timeouts: &TimeoutConfig) -> Duration {
    Duration::from_secs(timeouts.request_secs.saturating_mul(3))
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<RelayState>>,
    pub stats: Arc<RelayStats>,
}

impl AppState {
    pub fn new(relay: RelayState) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(relay)),
            stats: Arc::new(RelayStats::new()),
        }
    }

    /// Replace the live configuration. Requests in flight keep the snapshot
    /// they started with.
    pub fn reload(&self, config: RelayConfig) -> Result<(), ServerError> {
        let current = self.inner.load_full();
        let next = RelayState::build(config, Some(&current))?;
        self.inner.store(Arc::new(next));
        tracing::info!("Configuration reloaded");
        Ok(())
    }
}

/// HTTP server for the media relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        let router_config = config.clone();
        let state = AppState::new(RelayState::build(config, None)?);
        let router = Self::build_router(&router_config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layer settings are read once; changing them requires a restart.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let router = Router::new()
            .fallback(relay_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                handler_deadline(&config.timeouts),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRelayRequestId));

        if config.listener.cors_enabled {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Shared state, e.g. for triggering reloads or reading stats.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, applying config updates as
    /// they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let max_connections = self.state.inner.load().config.listener.max_connections;
        tracing::info!(address = %addr, max_connections, "HTTP server starting");

        let reload_state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if let Err(e) = reload_state.reload(config) {
                    tracing::error!(error = %e, "Rejected configuration update, keeping current state");
                }
            }
        });

        let admin = self.state.inner.load().config.admin.clone();
        if admin.enabled {
            let admin_listener = TcpListener::bind(&admin.bind_address).await?;
            let admin_router = setup_admin_router(self.state.clone());
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %admin.bind_address, "Admin API listening");
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin API stopped");
                }
            });
        }

        axum::serve(BoundedListener::new(listener, max_connections), self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Relay handler.
/// Resolves the target, then rewrites and forwards media requests or passes
/// everything else through.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let relay = state.inner.load_full();
    state.stats.record_request();

    let request_id = request_id(request.headers());
    let method = request.method().clone();
    let method_str = method.to_string();

    let url = match resolve_target(request.uri()) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(request_id = %request_id, uri = %request.uri(), error = %e, "No relay target");
            state.stats.record_rejected();
            metrics::record_request(&method_str, 400, "rejected", start);
            return error_response(StatusCode::BAD_REQUEST, None, &e.to_string(), None);
        }
    };

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, relay.config.security.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            state.stats.record_rejected();
            metrics::record_request(&method_str, 413, "rejected", start);
            return error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                None,
                "Request body unreadable or too large",
                Some(url.as_str()),
            );
        }
    };

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    let original = OutboundRequest {
        method,
        url,
        headers,
        body,
    };

    if relay.classifier.is_media(original.url.as_str()) {
        relay_media(&state, &relay, original, &request_id, start).await
    } else {
        pass_through(&state, &relay, original, &request_id, start).await
    }
}

/// Forward a non-media request with its headers untouched.
async fn pass_through(
    state: &AppState,
    relay: &RelayState,
    original: OutboundRequest,
    request_id: &str,
    start: Instant,
) -> Response {
    state.stats.record_passthrough();
    tracing::debug!(request_id = %request_id, url = %original.url, "Passing through");

    match upstream::send(&relay.client, &original, relay.request_timeout()).await {
        Ok(response) => {
            metrics::record_request(original.method.as_str(), response.status().as_u16(), "passthrough", start);
            relay_response(response)
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, url = %original.url, error = %e, "Passthrough fetch failed");
            state.stats.record_upstream_failure();
            metrics::record_request(original.method.as_str(), 502, "passthrough", start);
            bad_gateway_response(original.url.as_str())
        }
    }
}

/// Rewrite headers on a media request and fetch it.
async fn relay_media(
    state: &AppState,
    relay: &RelayState,
    original: OutboundRequest,
    request_id: &str,
    start: Instant,
) -> Response {
    state.stats.record_intercepted();

    let bundle = relay.selector.select(original.url.as_str());
    let mut headers = merge(&original.headers, bundle, relay.config.rewrite.merge_mode);
    omit_credentials(&mut headers);

    tracing::info!(
        request_id = %request_id,
        method = %original.method,
        url = %original.url,
        group = %bundle.group(),
        referer = ?headers.get(REFERER),
        "Intercepting media request"
    );

    let rewritten = OutboundRequest {
        headers,
        ..original.clone()
    };

    let response = match upstream::send(&relay.client, &rewritten, relay.request_timeout()).await {
        Ok(response) => response,
        Err(e) => return fallback::recover(state, relay, &original, e, request_id, start).await,
    };

    let status = response.status();
    tracing::info!(request_id = %request_id, status = %status, "Fetch success");
    metrics::record_request(original.method.as_str(), status.as_u16(), "media", start);

    let cache = match &relay.cache {
        Some(cache)
            if relay.cache_policy.is_cacheable(
                &original.method,
                original.url.as_str(),
                status,
                response.content_length(),
            ) =>
        {
            cache
        }
        _ => return relay_response(response),
    };

    let headers = response_headers(response.headers());
    match response.bytes().await {
        Ok(body) => {
            cache.store(
                &original.method,
                original.url.as_str(),
                CachedResponse::new(status, headers.clone(), body.clone()),
            );
            state.stats.record_cache_store();
            tracing::debug!(request_id = %request_id, url = %original.url, bytes = body.len(), "Mirrored into cache");
            buffered_response(status, headers, body)
        }
        Err(e) => fallback::recover(state, relay, &original, e.into(), request_id, start).await,
    }
}
