//! Bounded, FIFO admission of outbound calls.
//!
//! Built on a Tokio [`Semaphore`], which is fair: permits released by a
//! finished call are handed to the longest-waiting acquirer, so queued work
//! leaves the queue in the order it joined and a new arrival can never
//! overtake it.
//!
//! Work that does asynchronous preparation before it needs a slot takes a
//! [`Reservation`] first. Reservations join the semaphore queue in the order
//! they were taken, however long each one's preparation runs.

use std::collections::BTreeSet;
use std::future::{Future, poll_fn};
use std::pin::pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::Poll;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument, warn};

/// Bounds how many network calls may be outstanding at once.
///
/// Cloning is cheap and clones share the same slots, so one controller can be
/// handed to every task of a client. Independent clients each own their own
/// controller.
///
/// # Example
///
/// ```
/// use tally_rate_limit::AdmissionController;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let admission = AdmissionController::new(1);
///
/// let guard = admission.admit().await;
/// assert_eq!(admission.in_flight(), 1);
/// assert!(admission.try_admit().is_none());
///
/// drop(guard);
/// assert_eq!(admission.in_flight(), 0);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AdmissionController {
    limit: usize,
    slots: Arc<Semaphore>,
    queued: Arc<AtomicUsize>,
    turnstile: Arc<Turnstile>,
}

impl AdmissionController {
    /// Create a controller allowing `limit` concurrent calls.
    ///
    /// A limit of zero could never admit anything and is raised to one.
    pub fn new(limit: usize) -> Self {
        let limit = if limit == 0 {
            warn!("Concurrency limit of 0 would deadlock, using 1");
            1
        } else {
            limit
        };
        debug!(limit, "Creating admission controller");
        Self {
            limit,
            slots: Arc::new(Semaphore::new(limit)),
            queued: Arc::new(AtomicUsize::new(0)),
            turnstile: Arc::new(Turnstile::default()),
        }
    }

    /// Configured concurrency limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of admitted calls that have not yet completed.
    pub fn in_flight(&self) -> usize {
        self.limit - self.slots.available_permits()
    }

    /// Number of callers waiting for a slot.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Wait for a slot.
    ///
    /// Returns immediately when a slot is free and nobody is queued ahead;
    /// otherwise joins the back of the queue. The slot is released when the
    /// returned guard is dropped.
    #[instrument(skip(self), fields(limit = self.limit))]
    pub async fn admit(&self) -> AdmissionGuard {
        let ticket = QueueTicket::enter(&self.queued);
        debug!(queued = self.queued(), in_flight = self.in_flight(), "Awaiting admission");

        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .expect("admission semaphore is never closed");
        drop(ticket);

        debug!(in_flight = self.in_flight(), "Admitted");
        AdmissionGuard { _permit: permit }
    }

    /// Fix this caller's place in line without waiting.
    ///
    /// The reservation joins the slot queue behind every reservation taken
    /// before it, once those have joined or been dropped. Unreserved
    /// [`admit`](Self::admit) calls join the slot queue directly.
    pub fn reserve(&self) -> Reservation {
        let ticket = self.turnstile.issue();
        debug!(ticket, "Reserved admission");
        Reservation {
            admission: self.clone(),
            ticket,
            released: false,
        }
    }

    /// Take a slot only if one is free right now.
    pub fn try_admit(&self) -> Option<AdmissionGuard> {
        let permit = self.slots.clone().try_acquire_owned().ok()?;
        Some(AdmissionGuard { _permit: permit })
    }

    /// Run `operation` inside a slot, releasing it as soon as the operation
    /// completes, whether it succeeded or failed.
    pub async fn run<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.admit().await;
        operation().await
    }
}

/// A place in line for one admission, taken with
/// [`AdmissionController::reserve`].
///
/// Dropping an unused reservation gives up the place so later reservations
/// are not held back.
#[derive(Debug)]
pub struct Reservation {
    admission: AdmissionController,
    ticket: u64,
    released: bool,
}

impl Reservation {
    /// Position of this reservation, in the order reservations were taken.
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Wait for every earlier reservation to join the slot queue, join it,
    /// then wait for a slot.
    #[instrument(skip(self), fields(ticket = self.ticket))]
    pub async fn admit(mut self) -> AdmissionGuard {
        let queued = self.admission.queued.clone();
        let waiting = QueueTicket::enter(&queued);

        self.admission.turnstile.wait_for(self.ticket).await;

        // Poll once to enqueue on the semaphore before letting the next
        // reservation through.
        let mut acquire = pin!(self.admission.slots.clone().acquire_owned());
        let first = poll_fn(|cx| Poll::Ready(acquire.as_mut().poll(cx))).await;
        self.release();

        let permit = match first {
            Poll::Ready(permit) => permit,
            Poll::Pending => acquire.await,
        }
        .expect("admission semaphore is never closed");
        drop(waiting);

        debug!(in_flight = self.admission.in_flight(), "Admitted");
        AdmissionGuard { _permit: permit }
    }

    /// Run `operation` inside a slot obtained through this reservation.
    pub async fn run<F, Fut, T>(self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.admit().await;
        operation().await
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.admission.turnstile.pass(self.ticket);
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.release();
    }
}

/// Lets reservations onto the semaphore queue one at a time, in ticket order.
#[derive(Debug, Default)]
struct Turnstile {
    next_ticket: AtomicU64,
    state: Mutex<TurnState>,
    turn_changed: Notify,
}

#[derive(Debug, Default)]
struct TurnState {
    /// Ticket allowed onto the semaphore queue next
    serving: u64,
    /// Tickets released before their turn came
    released_early: BTreeSet<u64>,
}

impl Turnstile {
    fn issue(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, TurnState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn wait_for(&self, ticket: u64) {
        loop {
            let mut notified = pin!(self.turn_changed.notified());
            notified.as_mut().enable();
            let serving = self.state().serving;
            if serving == ticket {
                return;
            }
            notified.await;
        }
    }

    /// Mark `ticket` as done with the turnstile, whether or not its turn had
    /// come yet.
    fn pass(&self, ticket: u64) {
        {
            let mut state = self.state();
            if state.serving == ticket {
                state.serving += 1;
                loop {
                    let next = state.serving;
                    if !state.released_early.remove(&next) {
                        break;
                    }
                    state.serving += 1;
                }
            } else {
                state.released_early.insert(ticket);
            }
        }
        self.turn_changed.notify_waiters();
    }
}

/// RAII guard for an admitted call.
///
/// Dropping the guard frees the slot and wakes the next queued caller.
#[derive(Debug)]
pub struct AdmissionGuard {
    _permit: OwnedSemaphorePermit,
}

/// Keeps the queued count honest even if a waiting caller is dropped.
struct QueueTicket<'a> {
    queued: &'a AtomicUsize,
}

impl<'a> QueueTicket<'a> {
    fn enter(queued: &'a AtomicUsize) -> Self {
        queued.fetch_add(1, Ordering::SeqCst);
        Self { queued }
    }
}

impl Drop for QueueTicket<'_> {
    fn drop(&mut self) {
        self.queued.fetch_sub(1, Ordering::SeqCst);
    }
}
