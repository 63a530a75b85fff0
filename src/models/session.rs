use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::User;

/// How close to expiry an access token may get before it is refreshed.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// The token pair issued by the registry.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry in epoch milliseconds, taken from its `exp` claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires", &self.expires)
            .finish()
    }
}

impl Credentials {
    /// Builds credentials from a token pair, reading the expiry out of the
    /// access token. A token without a readable `exp` has no expiry and is
    /// therefore always considered expired.
    pub fn new(access_token: String, refresh_token: String) -> Self {
        let expires = crate::services::session::token_expiry(&access_token);
        Self {
            access_token,
            refresh_token,
            expires,
        }
    }

    /// Whether the access token is expired or about to be.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires {
            None => true,
            Some(expires) => {
                expires <= (now + Duration::seconds(REFRESH_MARGIN_SECS)).timestamp_millis()
            }
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// The payload sealed inside the session cookie.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Serialized [`Credentials`].
    #[serde(rename = "__credentials__", default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// What the session middleware learned about the current request.
#[derive(Debug, Default, Clone)]
pub struct Session {
    /// Fresh credentials, refreshed on read when needed.
    pub credentials: Option<Credentials>,
    /// The user decoded from the access token.
    pub user: Option<User>,
}

impl Session {
    pub fn access_token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.access_token.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(expires: Option<i64>) -> Credentials {
        Credentials {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires,
        }
    }

    #[test]
    fn missing_expiry_counts_as_expired() {
        assert!(credentials(None).is_expired());
    }

    #[test]
    fn expiry_within_a_minute_counts_as_expired() {
        let now = Utc::now();
        let soon = (now + Duration::seconds(30)).timestamp_millis();
        let later = (now + Duration::minutes(10)).timestamp_millis();
        let past = (now - Duration::minutes(1)).timestamp_millis();

        assert!(credentials(Some(soon)).is_expired_at(now));
        assert!(credentials(Some(past)).is_expired_at(now));
        assert!(!credentials(Some(later)).is_expired_at(now));
    }

    #[test]
    fn debug_output_hides_tokens() {
        let debug = format!("{:?}", credentials(Some(1)));
        assert!(!debug.contains("\"a\""));
        assert!(debug.contains("redacted"));
    }
}
