use serde::{Deserialize, Serialize};

/// The signed-in user, as described by the access token's claims.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's registry id.
    pub id: String,
    /// The user's email address.
    pub email: String,
    /// Whether the email address has been verified.
    pub email_verified: bool,
}

/// The access token claims the frontend cares about.
#[derive(Debug, Default, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<ClaimFlag>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl From<Claims> for User {
    fn from(claims: Claims) -> Self {
        let email_verified = claims
            .email_verified
            .as_ref()
            .map(ClaimFlag::is_truthy)
            .unwrap_or(false);

        User {
            id: claims.user_id.unwrap_or_default(),
            email: claims.email.unwrap_or_default(),
            email_verified,
        }
    }
}

/// A claim that is meant to be a flag but may arrive as any JSON value.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ClaimFlag {
    Bool(bool),
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl ClaimFlag {
    /// JavaScript-style truthiness of the claim.
    pub fn is_truthy(&self) -> bool {
        match self {
            ClaimFlag::Bool(b) => *b,
            ClaimFlag::Number(n) => *n != 0.0 && !n.is_nan(),
            ClaimFlag::Text(s) => !s.is_empty(),
            ClaimFlag::Other(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_from(json: &str) -> User {
        let claims: Claims = sonic_rs::from_str(json).unwrap();
        claims.into()
    }

    #[test]
    fn claims_map_to_user() {
        let user = user_from(r#"{"user_id":"u1","email":"dash@example.com","email_verified":true}"#);
        assert_eq!(
            user,
            User {
                id: "u1".to_string(),
                email: "dash@example.com".to_string(),
                email_verified: true,
            }
        );
    }

    #[test]
    fn email_verified_is_coerced() {
        assert!(!user_from(r#"{"email_verified":false}"#).email_verified);
        assert!(!user_from(r#"{"email_verified":0}"#).email_verified);
        assert!(!user_from(r#"{"email_verified":""}"#).email_verified);
        assert!(!user_from(r#"{"email_verified":null}"#).email_verified);
        assert!(!user_from(r#"{}"#).email_verified);
        assert!(user_from(r#"{"email_verified":1}"#).email_verified);
        assert!(user_from(r#"{"email_verified":"yes"}"#).email_verified);
    }
}
