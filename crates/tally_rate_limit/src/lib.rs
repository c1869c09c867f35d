//! Admission control and retry policy.
//!
//! [`AdmissionController`] bounds the number of outstanding network calls and
//! releases waiting work strictly in arrival order. A [`Reservation`] fixes a
//! caller's place in that order before it does any other work. [`RetryPolicy`] resubmits
//! rate-limited attempts after a constant delay, re-entering admission for
//! every attempt so a request waiting out its backoff holds no slot.
//!
//! ```rust,ignore
//! let admission = AdmissionController::new(10);
//! let retry = RetryPolicy::new(Duration::from_secs(1), 3);
//!
//! let value = retry
//!     .execute(|_attempt| {
//!         let admission = admission.clone();
//!         async move { admission.run(|| api.fetch(&request, &session)).await }
//!     })
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod admission;
mod retry;

pub use admission::{AdmissionController, AdmissionGuard, Reservation};
pub use retry::RetryPolicy;
