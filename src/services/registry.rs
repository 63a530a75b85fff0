use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result, ServerError},
    models::brick::{BrickBundle, BrickMetadata, BrickSearchResults},
    models::session::Credentials,
    services::bundle,
};

/// How search results are ordered by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSort {
    Downloads,
    Created,
}

impl SearchSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSort::Downloads => "downloads",
            SearchSort::Created => "created",
        }
    }
}

/// The body of a successful token grant or signup.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

impl From<TokenResponse> for Credentials {
    fn from(body: TokenResponse) -> Self {
        Credentials::new(body.access_token, body.refresh_token)
    }
}

/// Client for the BrickHub registry API.
#[derive(Clone)]
pub struct RegistryClient {
    http: Client,
    base_url: String,
}

impl RegistryClient {
    /// Creates a client for the registry at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("brickhub-web/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds `{base}/api/v1/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<url::Url> {
        let mut url = url::Url::parse(&format!("{}/api/v1", self.base_url))
            .map_err(|e| AppError::Internal(format!("Invalid registry URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Registry URL cannot be a base".to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn post_json<T: Serialize>(&self, url: url::Url, body: &T) -> Result<RequestBuilder> {
        Ok(self
            .http
            .post(url)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(sonic_rs::to_string(body)?))
    }

    /// Sends a request and fails with the registry's error body unless the
    /// response carries `expected`.
    async fn send(request: RequestBuilder, expected: StatusCode) -> Result<Response> {
        let response = request.send().await?;
        if response.status() == expected {
            return Ok(response);
        }

        let status = response.status();
        let body = response.bytes().await.unwrap_or_default();
        let error = ServerError::from_body(&body);
        tracing::warn!("Registry answered {}: {}", status, error);
        Err(AppError::Server(error))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.bytes().await?;
        Ok(sonic_rs::from_slice(&body)?)
    }

    async fn token_grant<T: Serialize>(&self, body: &T) -> Result<Credentials> {
        let request = self.post_json(self.endpoint(&["oauth", "token"])?, body)?;
        let response = Self::send(request, StatusCode::OK).await?;
        Ok(Self::json::<TokenResponse>(response).await?.into())
    }

    /// Exchanges a username and password for credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<Credentials> {
        self.token_grant(&sonic_rs::json!({
            "grant_type": "password",
            "username": username,
            "password": password,
        }))
        .await
    }

    /// Exchanges a refresh token for a new credential pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credentials> {
        self.token_grant(&sonic_rs::json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
        }))
        .await
    }

    /// Creates an account and returns its first credentials.
    pub async fn signup(&self, email: &str, password: &str) -> Result<Credentials> {
        let request = self.post_json(
            self.endpoint(&["users"])?,
            &sonic_rs::json!({
                "email": email,
                "password": password,
            }),
        )?;
        let response = Self::send(request, StatusCode::CREATED).await?;
        Ok(Self::json::<TokenResponse>(response).await?.into())
    }

    /// Asks the registry to (re)send the verification email.
    pub async fn send_verification_email(&self, access_token: &str) -> Result<()> {
        let request = self
            .http
            .post(self.endpoint(&["users", "verify"])?)
            .bearer_auth(access_token);
        Self::send(request, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    /// Asks the registry to send a password reset email.
    pub async fn send_password_reset_email(&self, email: &str) -> Result<()> {
        let request = self.post_json(
            self.endpoint(&["users", "reset-password"])?,
            &sonic_rs::json!({ "email": email }),
        )?;
        Self::send(request, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    /// Searches bricks.
    pub async fn search(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
        sort: SearchSort,
    ) -> Result<BrickSearchResults> {
        let request = self.http.get(self.endpoint(&["search"])?).query(&[
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("sort", sort.as_str().to_string()),
        ]);
        let response = Self::send(request, StatusCode::OK).await?;
        Self::json(response).await
    }

    /// Fetches the metadata of a brick version (`latest` is accepted).
    ///
    /// With an access token the registry also lists the brick's publishers.
    pub async fn get_brick_metadata(
        &self,
        name: &str,
        version: &str,
        token: Option<&str>,
    ) -> Result<BrickMetadata> {
        let mut request = self
            .http
            .get(self.endpoint(&["bricks", name, "versions", version])?);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = Self::send(request, StatusCode::OK).await?;
        Self::json(response).await
    }

    /// Downloads and decodes a brick version's bundle.
    pub async fn get_brick_bundle(&self, name: &str, version: &str) -> Result<BrickBundle> {
        let file = format!("{}.bundle", version);
        let request = self
            .http
            .get(self.endpoint(&["bricks", name, "versions", &file])?);
        let response = Self::send(request, StatusCode::OK).await?;
        let body = response.bytes().await?;
        bundle::decode(&body)
    }

    /// Invites a publisher to a brick.
    pub async fn add_publisher(&self, token: &str, brick: &str, publisher: &str) -> Result<()> {
        let request = self
            .post_json(
                self.endpoint(&["bricks", brick, "publishers"])?,
                &sonic_rs::json!({ "email": publisher }),
            )?
            .bearer_auth(token);
        Self::send(request, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    /// Removes a publisher from a brick.
    pub async fn remove_publisher(&self, token: &str, brick: &str, publisher: &str) -> Result<()> {
        let request = self
            .http
            .delete(self.endpoint(&["bricks", brick, "publishers", publisher])?)
            .bearer_auth(token);
        Self::send(request, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    /// Fetches a plain text document from anywhere. `None` unless it answers 200.
    pub async fn fetch_document(&self, url: &str) -> Result<Option<String>> {
        let response = self.http.get(url).send().await?;
        if response.status() != StatusCode::OK {
            tracing::warn!("Fetching {} answered {}", url, response.status());
            return Ok(None);
        }
        Ok(Some(response.text().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RegistryClient {
        RegistryClient::new("https://registry.test", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn endpoint_segments_are_encoded() {
        let url = client()
            .endpoint(&["bricks", "my brick", "publishers", "a/b@example.com"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://registry.test/api/v1/bricks/my%20brick/publishers/a%2Fb@example.com"
        );
    }

    #[test]
    fn bundle_endpoint_keeps_the_version() {
        let url = client()
            .endpoint(&["bricks", "greeting", "versions", "1.0.0+1.bundle"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://registry.test/api/v1/bricks/greeting/versions/1.0.0+1.bundle"
        );
    }

    #[test]
    fn sort_names_match_the_registry() {
        assert_eq!(SearchSort::Downloads.as_str(), "downloads");
        assert_eq!(SearchSort::Created.as_str(), "created");
    }
}
