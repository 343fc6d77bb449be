//! Single-slot lookup queue with a minimum dispatch interval.
//!
//! The scheduler never sleeps and never touches the network; callers pass
//! `now` in and get back what to do. That keeps the rate-limit policy
//! testable with a [`ManualClock`].

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Tokio's clock. Honors `tokio::time::pause()` in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// What the caller should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Send this lookup now. The slot is occupied until [`LookupScheduler::finish`].
    Ready(String),
    /// Something is queued but the interval has not elapsed.
    Wait(Instant),
    /// A lookup is already in flight.
    Busy,
    /// Nothing queued.
    Idle,
}

/// FIFO of names awaiting lookup, with at most one in flight.
///
/// A name becomes dispatchable `delay` after the later of: the last time the
/// queue was touched while idle, or the completion of the previous lookup.
#[derive(Debug)]
pub struct LookupScheduler {
    pending: VecDeque<String>,
    in_flight: Option<String>,
    not_before: Option<Instant>,
    delay: Duration,
    dispatched: u64,
}

impl LookupScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: None,
            not_before: None,
            delay,
            dispatched: 0,
        }
    }

    /// Queue `name`. Returns `false` if it is already queued or in flight.
    pub fn enqueue(&mut self, name: &str, now: Instant) -> bool {
        if self.in_flight.as_deref() == Some(name) || self.pending.iter().any(|n| n == name) {
            return false;
        }
        self.pending.push_back(name.to_string());
        if self.in_flight.is_none() {
            self.not_before = Some(now + self.delay);
        }
        true
    }

    /// Take the next name if the slot is free and the interval has elapsed.
    pub fn poll(&mut self, now: Instant) -> Dispatch {
        if self.in_flight.is_some() {
            return Dispatch::Busy;
        }
        if self.pending.is_empty() {
            return Dispatch::Idle;
        }
        let due = self.not_before.unwrap_or(now);
        if now < due {
            return Dispatch::Wait(due);
        }
        match self.pending.pop_front() {
            Some(name) => {
                self.in_flight = Some(name.clone());
                self.not_before = None;
                self.dispatched += 1;
                Dispatch::Ready(name)
            }
            None => Dispatch::Idle,
        }
    }

    /// Release the slot after a lookup for `name` completes (either way).
    pub fn finish(&mut self, name: &str, now: Instant) {
        if self.in_flight.as_deref() != Some(name) {
            tracing::debug!(name = %name, "finish for a lookup that is not in flight");
            return;
        }
        self.in_flight = None;
        self.not_before = Some(now + self.delay);
    }

    /// Put an in-flight lookup whose result was discarded back at the head of
    /// the queue, so the next worker retries it.
    pub fn requeue(&mut self, name: &str, now: Instant) {
        if self.in_flight.as_deref() != Some(name) {
            return;
        }
        self.in_flight = None;
        self.pending.push_front(name.to_string());
        self.not_before = Some(now + self.delay);
    }

    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.in_flight.as_deref() == Some(name) || self.pending.iter().any(|n| n == name)
    }

    /// No lookup queued or in flight.
    pub fn is_drained(&self) -> bool {
        self.in_flight.is_none() && self.pending.is_empty()
    }

    /// Total lookups handed out so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1000);

    #[test]
    fn first_dispatch_waits_for_delay() {
        let clock = ManualClock::new(Instant::now());
        let mut s = LookupScheduler::new(DELAY);
        assert_eq!(s.poll(clock.now()), Dispatch::Idle);

        assert!(s.enqueue("Somewhere", clock.now()));
        assert!(matches!(s.poll(clock.now()), Dispatch::Wait(_)));

        clock.advance(Duration::from_millis(999));
        assert!(matches!(s.poll(clock.now()), Dispatch::Wait(_)));

        clock.advance(Duration::from_millis(1));
        assert_eq!(s.poll(clock.now()), Dispatch::Ready("Somewhere".into()));
        assert_eq!(s.poll(clock.now()), Dispatch::Busy);
    }

    #[test]
    fn one_in_flight_and_spaced_dispatches() {
        let clock = ManualClock::new(Instant::now());
        let mut s = LookupScheduler::new(DELAY);
        s.enqueue("A", clock.now());
        s.enqueue("B", clock.now());

        clock.advance(DELAY);
        assert_eq!(s.poll(clock.now()), Dispatch::Ready("A".into()));
        // B cannot go while A is in flight, however long A takes.
        clock.advance(Duration::from_secs(5));
        assert_eq!(s.poll(clock.now()), Dispatch::Busy);

        s.finish("A", clock.now());
        assert!(matches!(s.poll(clock.now()), Dispatch::Wait(_)));
        clock.advance(DELAY);
        assert_eq!(s.poll(clock.now()), Dispatch::Ready("B".into()));
        s.finish("B", clock.now());
        assert!(s.is_drained());
        assert_eq!(s.dispatched(), 2);
    }

    #[test]
    fn duplicates_are_not_queued() {
        let now = Instant::now();
        let mut s = LookupScheduler::new(DELAY);
        assert!(s.enqueue("A", now));
        assert!(!s.enqueue("A", now));
        assert_eq!(s.pending_len(), 1);

        assert_eq!(s.poll(now + DELAY), Dispatch::Ready("A".into()));
        assert!(!s.enqueue("A", now + DELAY));
        assert!(s.is_pending("A"));
    }

    #[test]
    fn finish_for_unknown_name_is_ignored() {
        let now = Instant::now();
        let mut s = LookupScheduler::new(DELAY);
        s.enqueue("A", now);
        assert_eq!(s.poll(now + DELAY), Dispatch::Ready("A".into()));
        s.finish("B", now + DELAY);
        assert_eq!(s.in_flight(), Some("A"));
    }

    #[test]
    fn requeue_releases_the_slot_and_keeps_the_name_first() {
        let clock = ManualClock::new(Instant::now());
        let mut s = LookupScheduler::new(DELAY);
        s.enqueue("A", clock.now());
        s.enqueue("B", clock.now());
        clock.advance(DELAY);
        assert_eq!(s.poll(clock.now()), Dispatch::Ready("A".into()));

        s.requeue("A", clock.now());
        assert!(s.in_flight().is_none());
        assert!(s.is_pending("A"));
        assert!(matches!(s.poll(clock.now()), Dispatch::Wait(_)));
        clock.advance(DELAY);
        assert_eq!(s.poll(clock.now()), Dispatch::Ready("A".into()));
    }
}
