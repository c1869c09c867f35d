//! Mock provider and authorizer for executor tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tally::{
    AdmissionController, Authorizer, CanonicalRequest, Credentials, ProviderError,
    ProviderErrorKind, QueryRequest, ReportingApi, SessionCredential,
};
use tokio::time::Instant;

type Responder = Box<dyn Fn(&CanonicalRequest, usize) -> Result<Value, ProviderErrorKind> + Send + Sync>;

/// One observed provider call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub resource_id: String,
    pub attempt: usize,
    pub started: Duration,
    pub access_token: String,
}

/// Reporting API that answers from a closure after a fixed latency.
///
/// The closure receives the request and the 1-based call number for that
/// resource id, so tests can script failures per query.
pub struct MockReportingApi {
    latency: Duration,
    responder: Responder,
    origin: Instant,
    calls: Mutex<Vec<CallRecord>>,
    per_resource: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockReportingApi {
    pub fn new<F>(latency: Duration, responder: F) -> Self
    where
        F: Fn(&CanonicalRequest, usize) -> Result<Value, ProviderErrorKind> + Send + Sync + 'static,
    {
        Self {
            latency,
            responder: Box::new(responder),
            origin: Instant::now(),
            calls: Mutex::new(Vec::new()),
            per_resource: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Echo the resource id back in a small report.
    pub fn new_success(latency: Duration) -> Self {
        Self::new(latency, |request, _| {
            Ok(json!({ "id": request.resource_id(), "rows": [["20240101", "42"]] }))
        })
    }

    /// Reject every call as rate limited.
    pub fn new_rate_limited(latency: Duration) -> Self {
        Self::new(latency, |_, _| Err(rate_limited()))
    }

    /// Rate limit the first `times` calls of every query, then succeed.
    pub fn new_rate_limited_times(latency: Duration, times: usize) -> Self {
        Self::new(latency, move |request, call| {
            if call <= times {
                Err(rate_limited())
            } else {
                Ok(json!({ "id": request.resource_id(), "attempt": call }))
            }
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, resource_id: &str) -> Vec<CallRecord> {
        self.calls()
            .into_iter()
            .filter(|c| c.resource_id == resource_id)
            .collect()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportingApi for MockReportingApi {
    async fn fetch(
        &self,
        request: &CanonicalRequest,
        session: &SessionCredential,
    ) -> Result<Value, ProviderError> {
        let attempt = {
            let mut counts = self.per_resource.lock().unwrap();
            let count = counts.entry(request.resource_id().clone()).or_insert(0);
            *count += 1;
            *count
        };
        self.calls.lock().unwrap().push(CallRecord {
            resource_id: request.resource_id().clone(),
            attempt,
            started: self.origin.elapsed(),
            access_token: session.access_token().clone(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.responder)(request, attempt).map_err(ProviderError::new)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub fn rate_limited() -> ProviderErrorKind {
    ProviderErrorKind::RateLimited {
        status_code: 403,
        message: "User Rate Limit Exceeded".to_string(),
    }
}

/// Authorizer that mints hour-long sessions and counts handshakes.
pub struct MockAuthorizer {
    calls: AtomicUsize,
    fail: bool,
    observe: Mutex<Option<AdmissionController>>,
    observed_in_flight: Mutex<Vec<usize>>,
}

impl MockAuthorizer {
    pub fn new_success() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
            observe: Mutex::new(None),
            observed_in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn new_error() -> Self {
        Self {
            fail: true,
            ..Self::new_success()
        }
    }

    /// Record the pool's in-flight count during each handshake.
    pub fn observe(&self, admission: AdmissionController) {
        *self.observe.lock().unwrap() = Some(admission);
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
        if let Some(admission) = self.observe.lock().unwrap().as_ref() {
            self.observed_in_flight
                .lock()
                .unwrap()
                .push(admission.in_flight());
        }
        if self.fail {
            return Err(ProviderError::new(ProviderErrorKind::Authorization(
                "invalid_grant".to_string(),
            )));
        }
        Ok(SessionCredential::new(
            format!("{}-token-{}", credentials.identity(), n),
            Some("refresh".to_string()),
            chrono::Utc::now() + chrono::Duration::hours(1),
        ))
    }
}

pub fn account(email: &str) -> Credentials {
    Credentials::ServiceAccount {
        email: email.to_string(),
        key: "key".to_string(),
    }
}

/// Complete request for `resource_id` with fixed dates and metrics.
pub fn request(resource_id: &str) -> QueryRequest {
    request_as(resource_id, "reporter@example.com")
}

pub fn request_as(resource_id: &str, email: &str) -> QueryRequest {
    QueryRequest::builder()
        .credentials(account(email))
        .resource_id(resource_id)
        .start_date("2024-01-01")
        .end_date("2024-01-31")
        .metrics("ga:sessions")
        .build()
        .unwrap()
}
