//! Mock authorizer for credential manager tests.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tally_core::{Credentials, SessionCredential};
use tally_interface::{Authorizer, ProviderError, ProviderErrorKind};
use tally_rate_limit::AdmissionController;

/// Authorizer that mints sessions locally and counts handshakes.
pub struct MockAuthorizer {
    calls: AtomicUsize,
    valid_for: Duration,
    fail: bool,
    observe: Option<AdmissionController>,
    observed_in_flight: Mutex<Vec<usize>>,
    latency: std::time::Duration,
}

impl MockAuthorizer {
    pub fn new_success(valid_for: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            valid_for,
            fail: false,
            observe: None,
            observed_in_flight: Mutex::new(Vec::new()),
            latency: std::time::Duration::ZERO,
        }
    }

    pub fn new_error() -> Self {
        Self {
            fail: true,
            ..Self::new_success(Duration::hours(1))
        }
    }

    pub fn observing(mut self, admission: AdmissionController) -> Self {
        self.observe = Some(admission);
        self
    }

    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn observed_in_flight(&self) -> Vec<usize> {
        self.observed_in_flight.lock().unwrap().clone()
    }
}

#[async_trait]
impl Authorizer for MockAuthorizer {
    async fn authorize(&self, credentials: &Credentials) -> Result<SessionCredential, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(admission) = &self.observe {
            self.observed_in_flight
                .lock()
                .unwrap()
                .push(admission.in_flight());
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail {
            return Err(ProviderError::new(ProviderErrorKind::Authorization(
                "invalid_grant".to_string(),
            )));
        }
        Ok(SessionCredential::new(
            format!("{}-token-{}", credentials.identity(), n),
            Some("refresh".to_string()),
            Utc::now() + self.valid_for,
        ))
    }
}

pub fn account() -> Credentials {
    Credentials::ServiceAccount {
        email: "reporter@example.com".to_string(),
        key: "key".to_string(),
    }
}
