//! Authenticated full-snapshot retrieval.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::FetchError;
use crate::lifecycle::Shutdown;
use crate::model::{Snapshot, SnapshotDocument};
use crate::remote::{Authenticator, ContextKey, Endpoints};
use crate::resilience::retries::{retry, RetryPolicy};

/// Longest server error body kept in [`FetchError::Status`].
const MAX_ERROR_BODY: usize = 256;

/// Fetches one complete snapshot per call.
#[derive(Debug, Clone)]
pub struct RemoteConfigFetcher {
    client: reqwest::Client,
    endpoints: Endpoints,
    authenticator: Arc<dyn Authenticator>,
    key: ContextKey,
    policy: RetryPolicy,
    request_timeout: Duration,
}

impl RemoteConfigFetcher {
    pub fn new(
        client: reqwest::Client,
        endpoints: Endpoints,
        authenticator: Arc<dyn Authenticator>,
        key: ContextKey,
        policy: RetryPolicy,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoints,
            authenticator,
            key,
            policy,
            request_timeout,
        }
    }

    /// Fetches and validates the snapshot, retrying transient failures.
    ///
    /// Returns [`FetchError::Cancelled`] as soon as `shutdown` fires, including
    /// mid-request and mid-backoff.
    pub async fn fetch(&self, shutdown: &Shutdown) -> Result<Snapshot, FetchError> {
        let fetch_id = Uuid::new_v4();
        tracing::debug!(%fetch_id, collection = %self.key.collection_id, "Fetching snapshot");

        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(FetchError::Cancelled),
            result = retry(&self.policy, FetchError::is_retryable, |attempt| self.fetch_once(fetch_id, attempt)) => result,
        };

        match &result {
            Ok(snapshot) => tracing::info!(
                %fetch_id,
                features = snapshot.features().len(),
                properties = snapshot.properties().len(),
                segments = snapshot.segments().len(),
                "Snapshot fetched"
            ),
            Err(FetchError::Cancelled) => tracing::debug!(%fetch_id, "Fetch cancelled"),
            Err(e) => tracing::warn!(%fetch_id, error = %e, "Snapshot fetch failed"),
        }
        result
    }

    async fn fetch_once(&self, fetch_id: Uuid, attempt: u32) -> Result<Snapshot, FetchError> {
        match tokio::time::timeout(self.request_timeout, self.request(fetch_id, attempt)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.request_timeout)),
        }
    }

    async fn request(&self, fetch_id: Uuid, attempt: u32) -> Result<Snapshot, FetchError> {
        let token = self.authenticator.token().await?;
        let url = self.endpoints.config_url(&self.key);
        tracing::trace!(%fetch_id, attempt, url = %url, "Snapshot request");

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            truncate(&mut message, MAX_ERROR_BODY);
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(FetchError::Transport)?;
        let document: SnapshotDocument = serde_json::from_slice(&body).map_err(FetchError::Decode)?;
        Ok(Snapshot::from_document(document)?)
    }
}

fn truncate(message: &mut String, max: usize) {
    if message.len() <= max {
        return;
    }
    let mut end = max;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message.truncate(end);
}
