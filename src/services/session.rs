use std::sync::Arc;

use axum::response::Redirect;
use jsonwebtoken::{DecodingKey, Validation};
use tower_cookies::cookie::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use zeroize::Zeroizing;

use crate::{
    crypto::aes::{self, SecureKey},
    error::{AppError, Result},
    models::session::{Credentials, SessionData},
    models::user::{Claims, User},
    services::registry::RegistryClient,
};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "RJ_session";
/// Lifetime of the session cookie.
pub const SESSION_MAX_AGE_DAYS: i64 = 30;

/// Reads the claims of an access token without verifying its signature.
///
/// Tokens are issued by the registry and only read here, never trusted for
/// authorization on this side.
pub fn decode_claims(token: &str) -> Result<Claims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AppError::Session(format!("Invalid access token: {}", e)))
}

/// Decodes the user out of an access token.
pub fn decode_user(token: &str) -> Result<User> {
    decode_claims(token).map(User::from)
}

/// The access token's `exp` claim in epoch milliseconds.
pub fn token_expiry(token: &str) -> Option<i64> {
    decode_claims(token)
        .ok()
        .and_then(|claims| claims.exp)
        .map(|exp| exp.saturating_mul(1000))
}

/// Reads and writes the encrypted session cookie.
#[derive(Clone)]
pub struct SessionManager {
    keys: Arc<Vec<SecureKey>>,
    secure: bool,
}

impl SessionManager {
    /// Creates a manager sealing with the first secret and opening with any.
    pub fn new(secrets: &[Zeroizing<String>], secure: bool) -> Result<Self> {
        if secrets.is_empty() {
            return Err(AppError::Internal("At least one session secret is required".to_string()));
        }

        let keys = secrets.iter().map(|s| SecureKey::derive(s)).collect();
        Ok(Self {
            keys: Arc::new(keys),
            secure,
        })
    }

    /// Seals credentials into a cookie value.
    pub fn encode(&self, credentials: &Credentials) -> Result<String> {
        let data = SessionData {
            credentials: Some(sonic_rs::to_string(credentials)?),
        };
        let payload = sonic_rs::to_vec(&data)?;
        aes::seal(&self.keys[0], &payload)
    }

    /// Opens a cookie value. Anything unreadable is an empty session.
    pub fn decode(&self, value: &str) -> Option<Credentials> {
        let payload = match aes::open(&self.keys, value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!("Ignoring unreadable session cookie: {}", e);
                return None;
            }
        };

        let data: SessionData = sonic_rs::from_slice(&payload).ok()?;
        sonic_rs::from_str(&data.credentials?).ok()
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, value);
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookie.set_max_age(Duration::days(SESSION_MAX_AGE_DAYS));
        cookie
    }

    /// The credentials stored in the request's session, as-is.
    pub fn credentials(&self, cookies: &Cookies) -> Option<Credentials> {
        cookies
            .get(SESSION_COOKIE)
            .and_then(|cookie| self.decode(cookie.value()))
    }

    /// Writes credentials into the response's session cookie.
    pub fn commit(&self, cookies: &Cookies, credentials: &Credentials) -> Result<()> {
        cookies.add(self.cookie(self.encode(credentials)?));
        Ok(())
    }

    /// Stores the credentials and redirects.
    pub fn create_user_session(
        &self,
        cookies: &Cookies,
        credentials: &Credentials,
        redirect_to: &str,
    ) -> Result<Redirect> {
        self.commit(cookies, credentials)?;
        Ok(Redirect::to(redirect_to))
    }

    /// Credentials for talking to the registry on the user's behalf.
    ///
    /// An expired access token is refreshed once and the new pair written
    /// back. When the refresh fails the request is anonymous.
    pub async fn get_tokens(
        &self,
        cookies: &Cookies,
        registry: &RegistryClient,
    ) -> Option<Credentials> {
        let credentials = self.credentials(cookies)?;
        if !credentials.is_expired() {
            return Some(credentials);
        }

        tracing::debug!("Access token expired, refreshing");
        let refreshed = match registry.refresh(&credentials.refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                return None;
            }
        };

        if let Err(e) = self.commit(cookies, &refreshed) {
            tracing::error!("Failed to write refreshed session: {}", e);
            return None;
        }

        tracing::info!("Session refreshed");
        Some(refreshed)
    }

    /// The user in the session, without refreshing.
    pub fn get_user(&self, cookies: &Cookies) -> Option<User> {
        let credentials = self.credentials(cookies)?;
        decode_user(&credentials.access_token).ok()
    }

    /// Clears the session and redirects home.
    pub fn destroy_session(&self, cookies: &Cookies) -> Redirect {
        let mut cookie = self.cookie(String::new());
        cookie.set_max_age(Duration::ZERO);
        cookies.add(cookie);
        Redirect::to("/")
    }
}
