//! Public client handle.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use notify::RecommendedWatcher;
use tokio::task::JoinHandle;
use url::Url;

use crate::cache::ConfigCache;
use crate::config::{ClientConfig, SyncConfig};
use crate::error::ValidationError;
use crate::evaluation::{evaluate_feature, evaluate_property, EntityAttributes};
use crate::events::SubscriptionId;
use crate::lifecycle::Shutdown;
use crate::live::LiveUpdateChannel;
use crate::model::{ConfigValue, Feature, Property};
use crate::remote::{
    Authenticator, ContextKey, Endpoints, IamAuthenticator, RemoteConfigFetcher, DEFAULT_IAM_URL,
};
use crate::resilience::backoff::Backoff;
use crate::resilience::retries::RetryPolicy;
use crate::storage::{LocalSnapshotStore, SnapshotWatcher};
use crate::sync::state::SyncState;
use crate::sync::worker::{run_file_watch, LiveWorker, Shared};

/// Per-context options for [`SyncOrchestrator::set_context`].
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Local snapshot mirror; required when `live_update` is false.
    pub config_file: Option<PathBuf>,
    pub live_update: bool,
    /// Reload `config_file` on change. Only honored with `live_update = false`.
    pub watch_config_file: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            config_file: None,
            live_update: true,
            watch_config_file: false,
        }
    }
}

#[derive(Debug, Clone)]
struct Identity {
    guid: String,
    endpoints: Endpoints,
    authenticator: Arc<dyn Authenticator>,
}

struct ActiveContext {
    shutdown: Shutdown,
    task: Option<JoinHandle<()>>,
    _watcher: Option<RecommendedWatcher>,
}

/// Handle owning the cache, the subscribers and the background sync task for
/// one collection/environment.
///
/// Reads never touch the network. Dropping the handle cancels the background
/// task; call [`SyncOrchestrator::shutdown`] to wait for it.
pub struct SyncOrchestrator {
    config: SyncConfig,
    shared: Arc<Shared>,
    client: reqwest::Client,
    endpoints_override: Option<Endpoints>,
    authenticator_override: Option<Arc<dyn Authenticator>>,
    iam_url: Option<Url>,
    identity: Mutex<Option<Identity>>,
    active: tokio::sync::Mutex<Option<ActiveContext>>,
    /// Shutdown of a context still bootstrapping, reachable without `active`.
    pending: Mutex<Option<Shutdown>>,
    root: Shutdown,
}

impl SyncOrchestrator {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::default()),
            client: reqwest::Client::new(),
            endpoints_override: None,
            authenticator_override: None,
            iam_url: None,
            identity: Mutex::new(None),
            active: tokio::sync::Mutex::new(None),
            pending: Mutex::new(None),
            root: Shutdown::new(),
        }
    }

    /// Builds a handle from a loaded file config. Identity and context still
    /// have to be supplied through `init` and `set_context`.
    pub fn from_client_config(config: &ClientConfig) -> Result<Self, ValidationError> {
        let mut orchestrator = Self::with_config(config.sync.clone());

        let service = &config.service;
        if service.api_base_url.is_some() || service.websocket_base_url.is_some() {
            let endpoints = Endpoints::resolve(
                &service.region,
                service.api_base_url.as_deref(),
                service.websocket_base_url.as_deref(),
            )
            .map_err(|e| ValidationError::InvalidArgument {
                name: "endpoint",
                reason: e.to_string(),
            })?;
            orchestrator = orchestrator.with_endpoints(endpoints);
        }
        if let Some(iam) = &service.iam_url {
            let url = Url::parse(iam).map_err(|e| ValidationError::InvalidArgument {
                name: "iam_url",
                reason: e.to_string(),
            })?;
            orchestrator = orchestrator.with_iam_url(url);
        }
        Ok(orchestrator)
    }

    /// Replaces the region-derived endpoints.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints_override = Some(endpoints);
        self
    }

    /// Replaces the API-key token exchange.
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator_override = Some(authenticator);
        self
    }

    /// Replaces the token endpoint used for the API-key exchange.
    pub fn with_iam_url(mut self, url: Url) -> Self {
        self.iam_url = Some(url);
        self
    }

    /// Records the service identity.
    ///
    /// Rejects empty arguments without changing anything.
    pub fn init(&self, region: &str, guid: &str, apikey: &str) -> Result<(), ValidationError> {
        let result = self.build_identity(region, guid, apikey);
        let identity = match result {
            Ok(identity) => identity,
            Err(e) => {
                tracing::error!(error = %e, "init rejected");
                return Err(e);
            }
        };

        *lock(&self.identity) = Some(identity);
        if self.shared.state.get() == SyncState::Uninitialized {
            self.shared.state.set(SyncState::Ready);
        }
        tracing::info!(region, guid, "Client initialized");
        Ok(())
    }

    fn build_identity(&self, region: &str, guid: &str, apikey: &str) -> Result<Identity, ValidationError> {
        require("region", region)?;
        require("guid", guid)?;
        require("apikey", apikey)?;

        let endpoints = match &self.endpoints_override {
            Some(endpoints) => endpoints.clone(),
            None => Endpoints::for_region(region).map_err(|e| ValidationError::InvalidArgument {
                name: "region",
                reason: e.to_string(),
            })?,
        };

        let authenticator = match &self.authenticator_override {
            Some(authenticator) => Arc::clone(authenticator),
            None => {
                let token_url = match &self.iam_url {
                    Some(url) => url.clone(),
                    None => Url::parse(DEFAULT_IAM_URL).map_err(|e| ValidationError::InvalidArgument {
                        name: "iam_url",
                        reason: e.to_string(),
                    })?,
                };
                Arc::new(IamAuthenticator::new(
                    self.client.clone(),
                    token_url,
                    apikey,
                    self.config.request_timeout(),
                )) as Arc<dyn Authenticator>
            }
        };

        Ok(Identity {
            guid: guid.to_string(),
            endpoints,
            authenticator,
        })
    }

    /// Selects the collection/environment and starts synchronizing it.
    ///
    /// With live updates this performs one bootstrap fetch bounded by the
    /// configured timeout, falling back to `config_file`, before returning.
    /// Any previous context is stopped first.
    pub async fn set_context(
        &self,
        collection_id: &str,
        environment_id: &str,
        options: ContextOptions,
    ) -> Result<(), ValidationError> {
        if let Err(e) = validate_context(self.identity().is_some(), collection_id, environment_id, &options) {
            tracing::error!(error = %e, "set_context rejected");
            return Err(e);
        }
        let identity = self.identity().ok_or(ValidationError::NotInitialized)?;

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            tracing::info!("Stopping previous context");
            self.stop(previous).await;
            self.shared.cache.reset();
        }

        self.shared.state.set(SyncState::Bootstrapping);
        let key = ContextKey::new(&identity.guid, collection_id, environment_id);
        let store = options.config_file.as_ref().map(LocalSnapshotStore::new);
        let shutdown = self.root.child();
        *lock(&self.pending) = Some(shutdown.clone());

        tracing::info!(
            collection = collection_id,
            environment = environment_id,
            live_update = options.live_update,
            "Setting context"
        );

        let context = if options.live_update {
            self.start_live(&identity, key, store, shutdown).await
        } else {
            self.start_offline(store, options.watch_config_file, shutdown)
        };
        *active = Some(context);
        lock(&self.pending).take();
        Ok(())
    }

    fn start_offline(
        &self,
        store: Option<LocalSnapshotStore>,
        watch: bool,
        shutdown: Shutdown,
    ) -> ActiveContext {
        let mut context = ActiveContext {
            shutdown: shutdown.clone(),
            task: None,
            _watcher: None,
        };
        let Some(store) = store else {
            self.shared.state.set(SyncState::Error);
            return context;
        };

        match store.load() {
            Ok(snapshot) => {
                self.shared.apply(snapshot, None);
                self.shared.state.set(SyncState::OfflineFile);
            }
            Err(e) => {
                tracing::error!(error = %e, "No usable snapshot file, reads will miss");
                self.shared.state.set(SyncState::Error);
            }
        }

        if watch {
            let (watcher, updates) = SnapshotWatcher::new(store);
            match watcher.run() {
                Ok(guard) => {
                    context._watcher = Some(guard);
                    context.task = Some(tokio::spawn(run_file_watch(
                        Arc::clone(&self.shared),
                        updates,
                        shutdown,
                    )));
                }
                Err(e) => tracing::error!(error = %e, "Failed to watch snapshot file"),
            }
        }
        context
    }

    async fn start_live(
        &self,
        identity: &Identity,
        key: ContextKey,
        store: Option<LocalSnapshotStore>,
        shutdown: Shutdown,
    ) -> ActiveContext {
        let config = &self.config;
        let fetcher = RemoteConfigFetcher::new(
            self.client.clone(),
            identity.endpoints.clone(),
            Arc::clone(&identity.authenticator),
            key.clone(),
            RetryPolicy::new(
                config.fetch_max_attempts,
                Backoff::new(config.fetch_base_delay_ms, config.fetch_max_delay_ms),
            ),
            config.request_timeout(),
        );
        let channel = LiveUpdateChannel::new(
            identity.endpoints.clone(),
            Arc::clone(&identity.authenticator),
            key,
            config.connect_timeout(),
            config.idle_timeout(),
        );

        let resync = !self.bootstrap(&fetcher, store.as_ref(), &shutdown).await;

        let worker = LiveWorker {
            shared: Arc::clone(&self.shared),
            fetcher,
            channel,
            store,
            reconnect: Backoff::new(config.reconnect_base_delay_ms, config.reconnect_max_delay_ms),
            shutdown: shutdown.clone(),
        };

        ActiveContext {
            shutdown,
            task: Some(tokio::spawn(worker.run(resync))),
            _watcher: None,
        }
    }

    /// Acquires the first snapshot. Returns true if it came from the remote.
    async fn bootstrap(
        &self,
        fetcher: &RemoteConfigFetcher,
        store: Option<&LocalSnapshotStore>,
        shutdown: &Shutdown,
    ) -> bool {
        let timeout = self.config.bootstrap_timeout();
        match tokio::time::timeout(timeout, fetcher.fetch(shutdown)).await {
            Ok(Ok(snapshot)) => {
                self.shared.apply(snapshot, store);
                crate::observability::metrics::record_refresh("success");
                self.shared.state.advance(SyncState::Reconnecting);
                return true;
            }
            Ok(Err(e)) => {
                crate::observability::metrics::record_refresh("failure");
                tracing::warn!(error = %e, "Bootstrap fetch failed");
            }
            Err(_) => {
                crate::observability::metrics::record_refresh("failure");
                tracing::warn!(timeout_secs = timeout.as_secs(), "Bootstrap fetch timed out");
            }
        }

        if shutdown.is_triggered() {
            return false;
        }

        match store.map(|s| s.load()) {
            Some(Ok(snapshot)) => {
                tracing::info!("Serving snapshot file until the remote is reachable");
                self.shared.apply(snapshot, None);
                self.shared.state.advance(SyncState::Reconnecting);
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "No remote snapshot and no usable file, reads will miss");
                self.shared.state.advance(SyncState::Error);
            }
            None => {
                tracing::error!("No remote snapshot and no config file, reads will miss");
                self.shared.state.advance(SyncState::Error);
            }
        }
        false
    }

    pub fn get_feature(&self, feature_id: &str) -> Option<Arc<Feature>> {
        self.shared.cache.get_feature(feature_id)
    }

    pub fn get_features(&self) -> HashMap<String, Arc<Feature>> {
        self.shared.cache.get_features()
    }

    pub fn get_property(&self, property_id: &str) -> Option<Arc<Property>> {
        self.shared.cache.get_property(property_id)
    }

    pub fn get_properties(&self) -> HashMap<String, Arc<Property>> {
        self.shared.cache.get_properties()
    }

    /// Evaluates a feature for an entity. `Ok(None)` if the feature is unknown.
    ///
    /// An empty entity id is rejected whether or not the feature exists.
    pub fn feature_value(
        &self,
        feature_id: &str,
        entity_id: &str,
        attributes: &EntityAttributes,
    ) -> Result<Option<ConfigValue>, ValidationError> {
        require_entity(entity_id)?;
        match self.get_feature(feature_id) {
            Some(feature) => evaluate_feature(&feature, entity_id, attributes).map(Some),
            None => Ok(None),
        }
    }

    /// Evaluates a property for an entity. `Ok(None)` if the property is unknown.
    pub fn property_value(
        &self,
        property_id: &str,
        entity_id: &str,
        attributes: &EntityAttributes,
    ) -> Result<Option<ConfigValue>, ValidationError> {
        require_entity(entity_id)?;
        match self.get_property(property_id) {
            Some(property) => evaluate_property(&property, entity_id, attributes).map(Some),
            None => Ok(None),
        }
    }

    /// Registers a callback fired after every snapshot publish.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.notifier.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.notifier.unsubscribe(id)
    }

    pub fn state(&self) -> SyncState {
        self.shared.state.get()
    }

    /// Direct access to the cache, e.g. for several reads from one snapshot.
    pub fn cache(&self) -> &ConfigCache {
        &self.shared.cache
    }

    /// Cancels all network work and waits for the background task.
    ///
    /// A bootstrap in progress is cancelled before waiting for `set_context`
    /// to release the context.
    pub async fn shutdown(&self) {
        if let Some(pending) = lock(&self.pending).take() {
            pending.trigger();
        }
        let mut active = self.active.lock().await;
        if let Some(context) = active.take() {
            self.stop(context).await;
        }
        self.shared.state.set(SyncState::Stopped);
        tracing::info!("Client shut down");
    }

    async fn stop(&self, mut context: ActiveContext) {
        context.shutdown.trigger();
        let Some(mut task) = context.task.take() else {
            return;
        };

        let grace = self.config.shutdown_grace();
        if tokio::time::timeout(grace, &mut task).await.is_err() {
            tracing::warn!(grace_ms = grace.as_millis() as u64, "Sync task did not stop in time, aborting");
            task.abort();
        }
    }

    fn identity(&self) -> Option<Identity> {
        lock(&self.identity).clone()
    }
}

impl Default for SyncOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SyncOrchestrator {
    fn drop(&mut self) {
        self.root.trigger();
    }
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("state", &self.state())
            .field("snapshot_version", &self.shared.cache.version())
            .finish_non_exhaustive()
    }
}

fn require(name: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyArgument(name));
    }
    Ok(())
}

fn require_entity(entity_id: &str) -> Result<(), ValidationError> {
    if entity_id.is_empty() {
        return Err(ValidationError::EmptyEntityId);
    }
    Ok(())
}

fn validate_context(
    initialized: bool,
    collection_id: &str,
    environment_id: &str,
    options: &ContextOptions,
) -> Result<(), ValidationError> {
    if !initialized {
        return Err(ValidationError::NotInitialized);
    }
    require("collection_id", collection_id)?;
    require("environment_id", environment_id)?;

    let has_file = options
        .config_file
        .as_ref()
        .is_some_and(|p| !p.as_os_str().is_empty());
    if !options.live_update && !has_file {
        return Err(ValidationError::MissingConfigFile);
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
