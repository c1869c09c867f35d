//! Lifecycle of a single query.

use std::sync::Mutex;
use tracing::debug;

/// Where a query is in its lifecycle.
///
/// ```text
/// Validating ─> CacheLookup ─> CacheHit
///     │              │
///     └──────────────┴─> Authorizing ─> Admitting ─> InFlight ─> Done
///                                          ^            │
///                                          │            ├─> RetryScheduled
///                                          └────────────┼───────┘
///                                                       └─> Failed
/// ```
///
/// Validation and authorization failures also end in `Failed`. The cache
/// phases are skipped when caching is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum QueryPhase {
    /// Checking required fields and building the canonical form.
    Validating,
    /// Looking for a fresh cached response.
    CacheLookup,
    /// Answered from cache without any network call.
    CacheHit,
    /// Obtaining a session credential.
    Authorizing,
    /// Waiting for an admission slot.
    Admitting,
    /// Provider call outstanding.
    InFlight,
    /// Rate limited; waiting out the retry delay without holding a slot.
    RetryScheduled,
    /// Completed successfully.
    Done,
    /// Completed with an error.
    Failed,
}

impl QueryPhase {
    /// Whether the query has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CacheHit | Self::Done | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_transition_to(&self, next: QueryPhase) -> bool {
        use QueryPhase::*;
        matches!(
            (self, next),
            (Validating, CacheLookup)
                | (Validating, Authorizing)
                | (Validating, Failed)
                | (CacheLookup, CacheHit)
                | (CacheLookup, Authorizing)
                | (CacheLookup, Failed)
                | (Authorizing, Admitting)
                | (Authorizing, Failed)
                | (Admitting, InFlight)
                | (InFlight, Done)
                | (InFlight, RetryScheduled)
                | (InFlight, Failed)
                | (RetryScheduled, Admitting)
        )
    }
}

/// Tracks the phase of one query and logs each step.
#[derive(Debug)]
pub(crate) struct PhaseTracker {
    current: Mutex<QueryPhase>,
}

impl PhaseTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: Mutex::new(QueryPhase::Validating),
        }
    }

    pub(crate) fn current(&self) -> QueryPhase {
        match self.current.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub(crate) fn advance(&self, next: QueryPhase) {
        let mut guard = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let from = *guard;
        debug_assert!(
            from.can_transition_to(next),
            "illegal query phase transition {from} -> {next}"
        );
        debug!(%from, to = %next, "Query phase");
        *guard = next;
    }
}
