use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    models::session::Session,
    services::session::decode_user,
    state::AppState,
};

/// Loads the session for the request and exposes it as an extension.
///
/// Expired access tokens are refreshed here, so the refreshed cookie is
/// written back with whatever response the handler produces.
pub async fn load_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let credentials = state.sessions.get_tokens(&cookies, &state.registry).await;

    let user = credentials
        .as_ref()
        .and_then(|c| match decode_user(&c.access_token) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!("❌ Unreadable access token in session: {}", e);
                None
            }
        });

    match &user {
        Some(user) => tracing::debug!("✅ Session for user: {}", user.id),
        None => tracing::debug!("Anonymous request"),
    }

    request.extensions_mut().insert(Session { credentials, user });

    next.run(request).await
}
