//! Query executor.

use crate::phase::{PhaseTracker, QueryPhase};
use crate::TallyConfig;
use serde_json::Value;
use std::sync::Arc;
use tally_cache::{CacheBackend, CacheKey, FileCache, ResponseCache};
use tally_core::{CanonicalRequest, ClientSettings, QueryRequest};
use tally_error::{ConfigError, TallyResult};
use tally_interface::{Authorizer, ReportingApi};
use tally_provider::{HttpAuthorizer, HttpReportingApi};
use tally_rate_limit::{AdmissionController, Reservation, RetryPolicy};
use tally_session::{CredentialManager, FileSessionStore, SessionStore};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Executes reporting queries under a shared concurrency limit.
///
/// A client owns one admission pool, one response cache and one session
/// manager. Every query issued through it (and every authorization handshake
/// those queries trigger) competes for the same `concurrency_limit` slots,
/// granted in submission order. A query's place in that order is fixed when it
/// is submitted, before any cache or session I/O. Separately constructed clients are fully
/// independent.
///
/// Clones share all state, so a clone is a handle to the same executor.
#[derive(Clone)]
pub struct Client {
    settings: ClientSettings,
    api: Arc<dyn ReportingApi>,
    credentials: Arc<CredentialManager>,
    cache: ResponseCache,
    admission: AdmissionController,
    retry: RetryPolicy,
}

impl Client {
    /// Create a client with file-backed cache and session storage under
    /// `settings.cache_dir`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the settings are invalid.
    pub fn new(
        settings: ClientSettings,
        api: Arc<dyn ReportingApi>,
        authorizer: Arc<dyn Authorizer>,
    ) -> TallyResult<Self> {
        Self::builder(settings).api(api).authorizer(authorizer).build()
    }

    /// Create a client talking to the endpoints in `config` over HTTP.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the client settings are invalid.
    pub fn from_config(config: &TallyConfig) -> TallyResult<Self> {
        let endpoint = config.endpoint();
        Self::new(
            config.client().clone(),
            Arc::new(HttpReportingApi::new(endpoint.api_base_url())),
            Arc::new(HttpAuthorizer::new(endpoint.token_url()).with_scope(endpoint.scope())),
        )
    }

    /// Start building a client with custom provider or storage components.
    pub fn builder(settings: ClientSettings) -> ClientBuilder {
        ClientBuilder::new(settings)
    }

    /// Settings this client was built with.
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Admission pool shared by every query of this client.
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Response cache consulted before network calls.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Run one query to completion.
    ///
    /// Validation happens first and rejects the request without any network
    /// or cache activity. A fresh cached response is returned without
    /// authorizing. Otherwise the query authorizes, waits for an admission
    /// slot, calls the provider and retries rate-limit rejections. Each retry
    /// gives up its slot during the delay and queues again for a new one.
    ///
    /// # Errors
    ///
    /// - Validation error naming the first missing field
    /// - Provider error from the handshake
    /// - Provider error from the final attempt
    pub async fn query(&self, request: &QueryRequest) -> TallyResult<Value> {
        let reservation = self.admission.reserve();
        self.run_query(request, reservation).await
    }

    /// Run a query in the background and hand its outcome to `handler`.
    ///
    /// The query's place in the admission order is taken before this returns,
    /// so queries submitted one after another are admitted in that order.
    /// The handler is invoked exactly once, with either the payload or the
    /// error. Requires a Tokio runtime.
    pub fn submit<F>(&self, request: QueryRequest, handler: F) -> JoinHandle<()>
    where
        F: FnOnce(TallyResult<Value>) + Send + 'static,
    {
        let client = self.clone();
        let reservation = self.admission.reserve();
        tokio::spawn(async move {
            let result = client.run_query(&request, reservation).await;
            handler(result);
        })
    }

    #[instrument(
        skip(self, request, reservation),
        fields(resource_id = %request.resource_id, ticket = reservation.ticket())
    )]
    async fn run_query(
        &self,
        request: &QueryRequest,
        reservation: Reservation,
    ) -> TallyResult<Value> {
        let phase = PhaseTracker::new();
        let result = self.execute(request, reservation, &phase).await;
        match &result {
            Ok(_) if phase.current() == QueryPhase::CacheHit => {}
            Ok(_) => phase.advance(QueryPhase::Done),
            Err(e) => {
                warn!(error = %e, phase = %phase.current(), "Query failed");
                phase.advance(QueryPhase::Failed);
            }
        }
        result
    }

    async fn execute(
        &self,
        request: &QueryRequest,
        reservation: Reservation,
        phase: &PhaseTracker,
    ) -> TallyResult<Value> {
        let canonical = CanonicalRequest::from_request(request)?;

        let key = if self.cache.is_enabled() {
            phase.advance(QueryPhase::CacheLookup);
            let key = CacheKey::derive(&canonical)?;
            if let Some(payload) = self.cache.lookup(&key).await {
                phase.advance(QueryPhase::CacheHit);
                info!(%key, "Served from cache");
                return Ok(payload);
            }
            Some(key)
        } else {
            None
        };

        phase.advance(QueryPhase::Authorizing);
        let session = self.credentials.authorize(&request.credentials).await?;

        // Only the first attempt uses the reservation; retries rejoin the back.
        let mut reservation = Some(reservation);
        let payload = self
            .retry
            .execute(|attempt| {
                let canonical = &canonical;
                let session = &session;
                let reservation = reservation.take();
                async move {
                    phase.advance(QueryPhase::Admitting);
                    let call = || {
                        phase.advance(QueryPhase::InFlight);
                        debug!(attempt, provider = self.api.provider_name(), "Calling provider");
                        self.api.fetch(canonical, session)
                    };
                    let result = match reservation {
                        Some(reservation) => reservation.run(call).await,
                        None => self.admission.run(call).await,
                    };
                    if let Err(e) = &result {
                        if self.retry.will_retry(attempt, e) {
                            phase.advance(QueryPhase::RetryScheduled);
                        }
                    }
                    result
                }
            })
            .await?;

        if let Some(key) = &key {
            self.cache.store(key, &payload).await;
        }
        Ok(payload)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("settings", &self.settings)
            .field("provider", &self.api.provider_name())
            .field("cache", &self.cache)
            .field("admission", &self.admission)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Builder for [`Client`] with pluggable provider and storage.
///
/// The provider API and authorizer are required. Cache and session storage
/// default to files under `settings.cache_dir`.
pub struct ClientBuilder {
    settings: ClientSettings,
    api: Option<Arc<dyn ReportingApi>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    cache_backend: Option<Arc<dyn CacheBackend>>,
    session_store: Option<Arc<dyn SessionStore>>,
}

impl ClientBuilder {
    fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            api: None,
            authorizer: None,
            cache_backend: None,
            session_store: None,
        }
    }

    /// Provider that answers queries.
    pub fn api(mut self, api: Arc<dyn ReportingApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Provider that exchanges credentials for sessions.
    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Storage for cached responses.
    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    /// Storage for session credentials.
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the settings are invalid or a
    /// required component is missing.
    pub fn build(self) -> TallyResult<Client> {
        self.settings.validate()?;
        let api = self
            .api
            .ok_or_else(|| ConfigError::new("Client requires a reporting API"))?;
        let authorizer = self
            .authorizer
            .ok_or_else(|| ConfigError::new("Client requires an authorizer"))?;

        let cache_dir = self.settings.cache_dir().clone();
        let cache_backend = self
            .cache_backend
            .unwrap_or_else(|| Arc::new(FileCache::new(cache_dir.clone())));
        let session_store = self
            .session_store
            .unwrap_or_else(|| Arc::new(FileSessionStore::new(cache_dir)));

        let admission = AdmissionController::new(*self.settings.concurrency_limit());
        let retry = RetryPolicy::new(self.settings.retry_delay(), *self.settings.max_retries());
        let cache = ResponseCache::new(cache_backend, self.settings.cache_ttl());
        let credentials = Arc::new(CredentialManager::new(
            session_store,
            authorizer,
            admission.clone(),
        ));

        debug!(
            concurrency_limit = admission.limit(),
            cache_enabled = cache.is_enabled(),
            max_retries = retry.max_retries(),
            "Built client"
        );

        Ok(Client {
            settings: self.settings,
            api,
            credentials,
            cache,
            admission,
            retry,
        })
    }
}
