//! Service URL construction.

use url::Url;

/// Instance plus the collection/environment pair being synchronized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextKey {
    pub guid: String,
    pub collection_id: String,
    pub environment_id: String,
}

impl ContextKey {
    pub fn new(guid: impl Into<String>, collection_id: impl Into<String>, environment_id: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            collection_id: collection_id.into(),
            environment_id: environment_id.into(),
        }
    }
}

/// Base URLs for the REST API and the notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_base: Url,
    websocket_base: Url,
}

impl Endpoints {
    /// Region-derived production endpoints.
    pub fn for_region(region: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            api_base: Url::parse(&format!("https://{region}.apprapp.cloud.ibm.com"))?,
            websocket_base: Url::parse(&format!("wss://{region}.apprapp.cloud.ibm.com"))?,
        })
    }

    /// Explicit bases, e.g. a private endpoint or a local test server.
    pub fn custom(api_base: Url, websocket_base: Url) -> Self {
        Self {
            api_base,
            websocket_base,
        }
    }

    /// Region endpoints with optional per-base overrides.
    pub fn resolve(
        region: &str,
        api_override: Option<&str>,
        websocket_override: Option<&str>,
    ) -> Result<Self, url::ParseError> {
        let mut endpoints = Self::for_region(region)?;
        if let Some(api) = api_override {
            endpoints.api_base = Url::parse(api)?;
        }
        if let Some(ws) = websocket_override {
            endpoints.websocket_base = Url::parse(ws)?;
        }
        Ok(endpoints)
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn websocket_base(&self) -> &Url {
        &self.websocket_base
    }

    /// Full-snapshot endpoint for one collection/environment.
    pub fn config_url(&self, key: &ContextKey) -> Url {
        let mut url = join(
            &self.api_base,
            &["apprapp", "feature", "v1", "instances", key.guid.as_str(), "config"],
        );
        url.query_pairs_mut()
            .append_pair("collection_id", &key.collection_id)
            .append_pair("environment_id", &key.environment_id);
        url
    }

    /// Notification channel endpoint.
    pub fn websocket_url(&self, key: &ContextKey) -> Url {
        let mut url = join(&self.websocket_base, &["apprapp", "wsfeature"]);
        url.query_pairs_mut()
            .append_pair("instance_id", &key.guid)
            .append_pair("collection_id", &key.collection_id)
            .append_pair("environment_id", &key.environment_id);
        url
    }
}

fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
