//! Per-actor mailbox: pending invocations plus a scheduling flag.
//!
//! The mailbox serializes an actor's handler executions without dedicating
//! a thread per actor. It pairs a FIFO of pending invocations with a
//! two-state scheduling flag:
//!
//! ```text
//!            try_schedule(): Idle && non-empty
//!          ┌────────────────────────────────────┐
//!          │                                    ▼
//!       ┌──────┐                          ┌───────────┐
//!       │ Idle │                          │ Scheduled │
//!       └──────┘                          └───────────┘
//!          ▲                                    │
//!          └────────────────────────────────────┘
//!                        leave()
//! ```
//!
//! `try_schedule` is an atomic check-and-set: it succeeds only when the
//! flag is `Idle` and the queue is non-empty, so at most one drain job is
//! ever in flight per mailbox. The drain worker pops and dispatches until
//! it observes the queue empty, calls `leave()`, then re-checks
//! `try_schedule()`: if a message arrived in the race window between the
//! last pop and the flip to idle, the same worker wins the flag back and
//! keeps draining. That re-check closes the lost-wakeup race without ever
//! holding a lock across a handler invocation.
//!
//! The flag has its own mutex, independent per actor, so one actor's
//! traffic never blocks another's. Lock order is flag, then queue; nothing
//! acquires them in the opposite order.

use crate::config::MailboxPolicy;
use crate::dispatch::Envelope;
use crate::queue::Queue;
use parking_lot::Mutex;

/// Scheduling state of a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    /// No drain job is in flight.
    Idle,
    /// Exactly one drain job is queued or running.
    Scheduled,
}

/// FIFO of pending invocations for one actor, plus the scheduling flag.
pub struct Mailbox {
    queue: Queue<Envelope>,
    state: Mutex<ScheduleState>,
}

impl Mailbox {
    pub(crate) fn new(policy: MailboxPolicy) -> Self {
        let queue = match policy {
            MailboxPolicy::Unbounded => Queue::unbounded(),
            MailboxPolicy::Bounded(capacity) => Queue::bounded(capacity),
        };
        Self {
            queue,
            state: Mutex::new(ScheduleState::Idle),
        }
    }

    /// Append a pending invocation. Never blocks; returns false when a
    /// bounded mailbox is full and the message was rejected.
    pub(crate) fn push(&self, envelope: Envelope) -> bool {
        self.queue.try_push(envelope).is_ok()
    }

    /// Pop the next pending invocation, if any. Never blocks.
    pub(crate) fn try_pop(&self) -> Option<Envelope> {
        self.queue.try_pop()
    }

    /// Atomic check-and-set: claim the right to submit one drain job.
    /// Succeeds only when idle with work pending.
    pub(crate) fn try_schedule(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ScheduleState::Idle && !self.queue.is_empty() {
            *state = ScheduleState::Scheduled;
            true
        } else {
            false
        }
    }

    /// Release the scheduling flag. Called by the drain worker after it
    /// observes the queue empty.
    pub(crate) fn leave(&self) {
        *self.state.lock() = ScheduleState::Idle;
    }

    /// Drop all queued (not-yet-started) invocations.
    pub(crate) fn clear(&self) {
        self.queue.clear();
    }

    pub fn state(&self) -> ScheduleState {
        *self.state.lock()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("len", &self.len())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;

    fn envelope(n: u32) -> Envelope {
        Envelope::new(Address::none(), n)
    }

    #[test]
    fn schedule_requires_pending_work() {
        let mailbox = Mailbox::new(MailboxPolicy::Unbounded);
        assert!(!mailbox.try_schedule(), "empty mailbox must not schedule");

        assert!(mailbox.push(envelope(1)));
        assert!(mailbox.try_schedule());
        assert_eq!(mailbox.state(), ScheduleState::Scheduled);
    }

    #[test]
    fn no_duplicate_drain_jobs() {
        let mailbox = Mailbox::new(MailboxPolicy::Unbounded);
        mailbox.push(envelope(1));
        assert!(mailbox.try_schedule());
        // Further sends while scheduled must not claim a second job.
        mailbox.push(envelope(2));
        assert!(!mailbox.try_schedule());
    }

    #[test]
    fn leave_then_reschedule_closes_race_window() {
        let mailbox = Mailbox::new(MailboxPolicy::Unbounded);
        mailbox.push(envelope(1));
        assert!(mailbox.try_schedule());

        // Drain worker empties the queue...
        assert!(mailbox.try_pop().is_some());
        assert!(mailbox.try_pop().is_none());

        // ...a message lands in the race window before the flip...
        mailbox.push(envelope(2));

        // ...and the worker's leave + re-check picks it up.
        mailbox.leave();
        assert!(mailbox.try_schedule(), "raced message must win a new drain");
    }

    #[test]
    fn leave_without_new_work_goes_idle() {
        let mailbox = Mailbox::new(MailboxPolicy::Unbounded);
        mailbox.push(envelope(1));
        assert!(mailbox.try_schedule());
        assert!(mailbox.try_pop().is_some());
        mailbox.leave();
        assert!(!mailbox.try_schedule());
        assert_eq!(mailbox.state(), ScheduleState::Idle);
    }

    #[test]
    fn bounded_mailbox_rejects_overflow() {
        let mailbox = Mailbox::new(MailboxPolicy::Bounded(2));
        assert!(mailbox.push(envelope(1)));
        assert!(mailbox.push(envelope(2)));
        assert!(!mailbox.push(envelope(3)), "third push must be rejected");
        assert_eq!(mailbox.len(), 2);
    }

    #[test]
    fn clear_drops_pending_invocations() {
        let mailbox = Mailbox::new(MailboxPolicy::Unbounded);
        mailbox.push(envelope(1));
        mailbox.push(envelope(2));
        mailbox.clear();
        assert!(mailbox.is_empty());
        assert!(mailbox.try_pop().is_none());
        assert!(!mailbox.try_schedule());
    }
}
