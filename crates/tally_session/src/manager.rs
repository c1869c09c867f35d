//! Obtaining and reusing session credentials.

use crate::SessionStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tally_core::{Credentials, SessionCredential};
use tally_error::ProviderError;
use tally_interface::Authorizer;
use tally_rate_limit::AdmissionController;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Obtains, persists and reuses session credentials.
///
/// Lookup order for a valid session: the copy remembered from an earlier call
/// in this process, then the persisted copy, then a full handshake. Any
/// session is revalidated against the clock before it is reused. The
/// handshake is admitted through the same [`AdmissionController`] as data
/// queries, so it counts against the shared concurrency limit.
///
/// Handshakes are not coalesced. Queries for the same identity that find no
/// valid session at the same moment each perform their own handshake, each
/// taking a slot; the last session to arrive is the one remembered and
/// persisted.
///
/// Storage failures never fail authorization: an unreadable session is
/// treated as absent, and a session that cannot be persisted is still
/// returned.
pub struct CredentialManager {
    store: Arc<dyn SessionStore>,
    authorizer: Arc<dyn Authorizer>,
    admission: AdmissionController,
    remembered: RwLock<HashMap<String, SessionCredential>>,
}

impl CredentialManager {
    /// Create a manager persisting to `store` and authorizing with `authorizer`.
    pub fn new(
        store: Arc<dyn SessionStore>,
        authorizer: Arc<dyn Authorizer>,
        admission: AdmissionController,
    ) -> Self {
        Self {
            store,
            authorizer,
            admission,
            remembered: RwLock::new(HashMap::new()),
        }
    }

    /// Return a session valid right now for `credentials`.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if a handshake was needed and failed.
    #[instrument(skip(self, credentials), fields(identity = credentials.identity()))]
    pub async fn authorize(&self, credentials: &Credentials) -> Result<SessionCredential, ProviderError> {
        let identity = credentials.identity();

        if let Some(session) = self.remembered.read().await.get(identity) {
            if session.is_valid_at(Utc::now()) {
                debug!("Reusing remembered session");
                return Ok(session.clone());
            }
        }

        match self.store.load(identity).await {
            Ok(Some(session)) if session.is_valid_at(Utc::now()) => {
                debug!(backend = self.store.backend_name(), "Reusing persisted session");
                self.remember(identity, &session).await;
                return Ok(session);
            }
            Ok(Some(_)) => debug!("Persisted session expired"),
            Ok(None) => debug!("No persisted session"),
            Err(e) => warn!(error = %e, "Unreadable persisted session, treating as absent"),
        }

        let session = self
            .admission
            .run(|| self.authorizer.authorize(credentials))
            .await?;
        info!(expiry = %session.expiry_date(), "Authorized new session");

        if let Err(e) = self.store.save(identity, &session).await {
            warn!(error = %e, "Failed to persist session");
        }
        self.remember(identity, &session).await;

        Ok(session)
    }

    async fn remember(&self, identity: &str, session: &SessionCredential) {
        self.remembered
            .write()
            .await
            .insert(identity.to_string(), session.clone());
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("store", &self.store.backend_name())
            .field("admission", &self.admission)
            .finish()
    }
}
