//! Bearer token acquisition.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::AuthError;

/// Default token endpoint.
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com/identity/token";

const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Source of bearer tokens for the fetch and channel handshakes.
///
/// Called once per fetch attempt and once per channel connect; implementations
/// decide whether to cache.
#[async_trait]
pub trait Authenticator: Send + Sync + fmt::Debug {
    async fn token(&self) -> Result<String, AuthError>;
}

/// Exchanges an API key for an access token.
pub struct IamAuthenticator {
    client: reqwest::Client,
    token_url: Url,
    apikey: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl IamAuthenticator {
    pub fn new(client: reqwest::Client, token_url: Url, apikey: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            token_url,
            apikey: apikey.into(),
            timeout,
        }
    }

    async fn request_token(&self) -> Result<String, AuthError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", APIKEY_GRANT_TYPE)
            .append_pair("apikey", &self.apikey)
            .finish();

        let response = self
            .client
            .post(self.token_url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(reqwest::header::ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(AuthError::Request)?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected {
                status: response.status().as_u16(),
            });
        }

        let parsed: TokenResponse = response.json().await.map_err(AuthError::Request)?;
        parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)
    }
}

#[async_trait]
impl Authenticator for IamAuthenticator {
    async fn token(&self) -> Result<String, AuthError> {
        match tokio::time::timeout(self.timeout, self.request_token()).await {
            Ok(result) => {
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "Token request failed");
                }
                result
            }
            Err(_) => Err(AuthError::Timeout(self.timeout)),
        }
    }
}

impl fmt::Debug for IamAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamAuthenticator")
            .field("token_url", &self.token_url.as_str())
            .field("apikey", &"<redacted>")
            .finish()
    }
}

/// Hands out one fixed token.
pub struct StaticTokenAuthenticator {
    token: String,
}

impl StaticTokenAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }
}

impl fmt::Debug for StaticTokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenAuthenticator").finish_non_exhaustive()
    }
}
