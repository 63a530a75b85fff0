use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// Where the published policy document lives.
pub const DEFAULT_POLICY_URL: &str =
    "https://raw.githubusercontent.com/brick-hub/brickhub.dev/refs/heads/main/docs/policy.md";
/// Where visitors are sent when the policy document can't be fetched.
pub const DEFAULT_POLICY_FALLBACK_URL: &str =
    "https://github.com/brick-hub/brickhub.dev/blob/main/docs/policy.md";

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the registry API (`HOSTED_URL`).
    pub hosted_url: String,
    /// Session secrets. The first one seals new cookies, all of them open.
    pub session_secrets: Vec<Zeroizing<String>>,
    /// Whether we run in production (enables `Secure` cookies).
    pub is_production: bool,
    /// The address the server binds to.
    pub bind_addr: SocketAddr,
    /// Public origin used for canonical links.
    pub site_url: String,
    /// The policy document and its fallback page.
    pub policy_url: String,
    pub policy_fallback_url: String,
    /// Directory served for unmatched paths.
    pub public_dir: String,
    /// Timeout applied to every registry request.
    pub request_timeout: Duration,
    /// Rate limiting of the credential forms.
    pub rate_limit: RateLimitConfig,
}

/// Rate limiting of the login, signup and password reset forms.
#[derive(Clone, Debug, PartialEq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub per_second: u64,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 2,
            burst_size: 10,
        }
    }
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// `HOSTED_URL` and `SESSION_SECRET` are required, everything else has a default.
    pub fn from_env() -> Result<Self> {
        let hosted_url = env::var("HOSTED_URL").context("HOSTED_URL must be set")?;
        let session_secret = Zeroizing::new(
            env::var("SESSION_SECRET").context("SESSION_SECRET must be set")?,
        );

        let is_production = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            == "production";

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .context("Invalid BIND_ADDR")?;

        let request_timeout_secs: u64 = env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("Invalid REQUEST_TIMEOUT_SECS")?;

        let mut rate_limit = RateLimitConfig::default();
        if let Ok(v) = env::var("RATE_LIMIT_ENABLED") {
            rate_limit.enabled = v.parse().context("Invalid RATE_LIMIT_ENABLED")?;
        }
        if let Ok(v) = env::var("RATE_LIMIT_PER_SECOND") {
            rate_limit.per_second = v.parse().context("Invalid RATE_LIMIT_PER_SECOND")?;
        }
        if let Ok(v) = env::var("RATE_LIMIT_BURST") {
            rate_limit.burst_size = v.parse().context("Invalid RATE_LIMIT_BURST")?;
        }

        Ok(Self {
            hosted_url: normalize_base_url(&hosted_url),
            session_secrets: parse_secrets(&session_secret)?,
            is_production,
            bind_addr,
            site_url: normalize_base_url(
                &env::var("SITE_URL").unwrap_or_else(|_| "https://brickhub.dev".to_string()),
            ),
            policy_url: env::var("POLICY_URL").unwrap_or_else(|_| DEFAULT_POLICY_URL.to_string()),
            policy_fallback_url: env::var("POLICY_FALLBACK_URL")
                .unwrap_or_else(|_| DEFAULT_POLICY_FALLBACK_URL.to_string()),
            public_dir: env::var("PUBLIC_DIR").unwrap_or_else(|_| "public".to_string()),
            request_timeout: Duration::from_secs(request_timeout_secs),
            rate_limit,
        })
    }
}

/// Splits a comma separated `SESSION_SECRET` into individual secrets.
fn parse_secrets(raw: &str) -> Result<Vec<Zeroizing<String>>> {
    let secrets: Vec<Zeroizing<String>> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Zeroizing::new(s.to_string()))
        .collect();

    if secrets.is_empty() {
        anyhow::bail!("SESSION_SECRET must contain at least one non-empty secret");
    }

    Ok(secrets)
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_split_and_trimmed() {
        let secrets = parse_secrets("current , previous,").unwrap();
        let secrets: Vec<&str> = secrets.iter().map(|s| s.as_str()).collect();
        assert_eq!(secrets, vec!["current", "previous"]);
    }

    #[test]
    fn blank_secret_is_rejected() {
        assert!(parse_secrets(" , ").is_err());
    }

    #[test]
    fn trailing_slash_is_dropped() {
        assert_eq!(normalize_base_url("https://registry.test/ "), "https://registry.test");
    }
}
