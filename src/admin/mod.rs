//! Admin API: status, counters and cache management behind a Bearer token.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/stats", get(get_stats))
        .route("/admin/cache", get(get_cache).delete(clear_cache))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::http::server::RelayState;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    fn state(cache_enabled: bool) -> AppState {
        let mut config = RelayConfig::default();
        config.admin.api_key = "secret".into();
        config.cache.enabled = cache_enabled;
        AppState::new(RelayState::build(config, None).unwrap())
    }

    fn request(method: Method, path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn requires_bearer_token() {
        let app = setup_admin_router(state(false));
        let response = app.clone().oneshot(request(Method::GET, "/admin/status", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.clone().oneshot(request(Method::GET, "/admin/status", Some("wrong"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(request(Method::GET, "/admin/status", Some("secret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["status"], "operational");
    }

    #[tokio::test]
    async fn cache_can_be_inspected_and_cleared() {
        let state = state(true);
        {
            let inner = state.inner.load();
            let cache = inner.cache.as_ref().unwrap();
            cache.store(
                &Method::GET,
                "https://a.com/clip.mp4",
                crate::cache::CachedResponse::new(
                    StatusCode::OK,
                    Default::default(),
                    axum::body::Bytes::from_static(b"12345"),
                ),
            );
        }
        let app = setup_admin_router(state);

        let status = json(app.clone().oneshot(request(Method::GET, "/admin/cache", Some("secret"))).await.unwrap()).await;
        assert_eq!(status["enabled"], true);
        assert_eq!(status["name"], "media-relay-v1");
        assert_eq!(status["entries"], 1);
        assert_eq!(status["bytes"], 5);

        let cleared = json(app.clone().oneshot(request(Method::DELETE, "/admin/cache", Some("secret"))).await.unwrap()).await;
        assert_eq!(cleared["cleared"], 1);

        let status = json(app.oneshot(request(Method::GET, "/admin/cache", Some("secret"))).await.unwrap()).await;
        assert_eq!(status["entries"], 0);
    }

    #[tokio::test]
    async fn stats_are_served() {
        let state = state(false);
        state.stats.record_request();
        state.stats.record_intercepted();
        let app = setup_admin_router(state);

        let stats = json(app.oneshot(request(Method::GET, "/admin/stats", Some("secret"))).await.unwrap()).await;
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["intercepted"], 1);
        assert_eq!(stats["passthrough"], 0);
    }
}
