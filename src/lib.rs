use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use http::{header, HeaderValue, Method};
use tower_cookies::CookieManagerLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub mod config;
pub mod error;
pub mod state;
pub mod util;
pub mod views;

pub mod crypto {
    pub mod aes;
}

pub mod models {
    pub mod brick;
    pub mod session;
    pub mod user;
}

pub mod services {
    pub mod bricks;
    pub mod bundle;
    pub mod markdown;
    pub mod registry;
    pub mod session;
}

pub mod handlers {
    pub mod auth;
    pub mod bricks;
    pub mod pages;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
}

use state::AppState;

/// Forms are small; anything bigger is not ours.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Builds the application router.
pub fn app(state: AppState) -> anyhow::Result<Router> {
    let mut credential_routes = Router::new()
        .route(
            "/login",
            get(handlers::auth::login_page).post(handlers::auth::login),
        )
        .route(
            "/signup",
            get(handlers::auth::signup_page).post(handlers::auth::signup),
        )
        .route(
            "/password-reset",
            get(handlers::auth::password_reset_page).post(handlers::auth::password_reset),
        );

    let rate_limit = &state.config.rate_limit;
    if rate_limit.enabled {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(rate_limit.per_second)
                .burst_size(rate_limit.burst_size)
                .use_headers()
                .finish()
                .context("Invalid rate limit configuration")?,
        );
        credential_routes = credential_routes.layer(tower_governor::GovernorLayer::new(governor_conf));
        tracing::info!(
            "✅ Rate limiting credential forms ({}/s, burst {})",
            rate_limit.per_second,
            rate_limit.burst_size
        );
    }
    let credential_routes = credential_routes.with_state(state.clone());

    let page_routes = Router::new()
        .route("/", get(handlers::pages::index))
        .route("/search", get(handlers::pages::search))
        .route("/policy", get(handlers::pages::policy))
        .route(
            "/verify",
            get(handlers::auth::verify_page).post(handlers::auth::verify),
        )
        .route("/bricks/{name}", get(handlers::bricks::brick_latest))
        .route("/bricks/{name}/{version}", get(handlers::bricks::brick_version))
        .route(
            "/bricks/{name}/publishers",
            post(handlers::bricks::publishers),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::load_session,
        ))
        .with_state(state.clone());

    let plain_routes = Router::new()
        .route("/logout", post(handlers::auth::logout))
        .route("/health", get(handlers::pages::health))
        .with_state(state.clone());

    let origin: HeaderValue = state
        .config
        .site_url
        .parse()
        .context("SITE_URL is not a valid origin")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::COOKIE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400));

    let app = Router::new()
        .merge(credential_routes)
        .merge(page_routes)
        .merge(plain_routes)
        .fallback_service(ServeDir::new(&state.config.public_dir))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(cors);

    Ok(app)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use zeroize::Zeroizing;

    use super::*;
    use crate::config::{Config, RateLimitConfig};

    fn test_app() -> Router {
        let config = Config {
            hosted_url: "http://127.0.0.1:9".to_string(),
            session_secrets: vec![Zeroizing::new("test-secret".to_string())],
            is_production: false,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            site_url: "https://brickhub.dev".to_string(),
            policy_url: "http://127.0.0.1:9/policy.md".to_string(),
            policy_fallback_url: "https://example.com/policy".to_string(),
            public_dir: "public".to_string(),
            request_timeout: Duration::from_millis(200),
            rate_limit: RateLimitConfig {
                enabled: false,
                ..Default::default()
            },
        };
        app(AppState::new(config).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn malformed_versions_redirect_home() {
        let response = test_app()
            .oneshot(
                Request::get("/bricks/greeting/not-a-version")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn logout_clears_the_session() {
        let response = test_app()
            .oneshot(Request::post("/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("RJ_session="));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn unreachable_registry_still_renders_search() {
        let response = test_app()
            .oneshot(Request::get("/search?q=greeting").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let page: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(page["meta"]["title"], "greeting - brick search");
        assert_eq!(page["data"]["total"], 0);
        assert!(page["data"]["error"].is_string());
    }
}
