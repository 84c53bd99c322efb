//! Interrupt to task hand-off
//!
//! Interrupt handlers never touch the session. They go through an
//! [`EventLink`], which checks a mirror of the session state and enqueues an
//! [`Event`]; [`Session::task`](crate::session::Session::task) drains the queue
//! and runs the state machine.

use core::fmt;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use heapless::mpmc::MpMcQueue;

use crate::error::{Error, Result};
use crate::fmt::{debug, error};
use crate::hal::{IrqFlags, TimerId};
use crate::session::State;

/// Capacity of the default event queue
pub const EVENT_QUEUE_SIZE: usize = 16;

/// Event carried from interrupt context to the task loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Radio interrupt with its flags
    RadioIrq(IrqFlags),
    /// Receive window timer expiry
    TimerExpired(TimerId),
}

/// Event queue error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// The queue could not be created
    Create,
    /// The queue is full
    Full,
    /// The queue is empty
    Empty,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Create => f.write_str("queue creation failed"),
            QueueError::Full => f.write_str("queue full"),
            QueueError::Empty => f.write_str("queue empty"),
        }
    }
}

/// Bounded FIFO of events.
///
/// Every method takes `&self`: producers run in interrupt context and share
/// the queue with the consumer. `send` must never block.
pub trait EventQueue {
    /// Prepare the queue for use, discarding anything left in it
    fn create(&self) -> core::result::Result<(), QueueError>;

    /// Append an event, failing with [`QueueError::Full`] when there is no room
    fn send(&self, event: Event) -> core::result::Result<(), QueueError>;

    /// Take the oldest event
    fn receive(&self) -> core::result::Result<Event, QueueError>;

    /// Whether no event is pending
    fn is_empty(&self) -> bool;
}

/// Lock-free multi-producer queue of `N` events, `N` a power of two.
///
/// Assumes producers only preempt the consumer, as interrupts do on a single
/// core. When `send` and `receive` run in parallel (multi-core, or threads on a
/// host), `receive` may return [`QueueError::Empty`] while `is_empty` is false,
/// because the count is raised before the event is stored.
pub struct IrqQueue<const N: usize> {
    queue: MpMcQueue<Event, N>,
    pending: AtomicUsize,
}

impl<const N: usize> IrqQueue<N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            queue: MpMcQueue::new(),
            pending: AtomicUsize::new(0),
        }
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl<const N: usize> Default for IrqQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventQueue for IrqQueue<N> {
    fn create(&self) -> core::result::Result<(), QueueError> {
        while self.queue.dequeue().is_some() {}
        self.pending.store(0, Ordering::Release);
        Ok(())
    }

    fn send(&self, event: Event) -> core::result::Result<(), QueueError> {
        // Count first so the consumer never sees an event it cannot account for
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.queue.enqueue(event).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            QueueError::Full
        })
    }

    fn receive(&self) -> core::result::Result<Event, QueueError> {
        let event = self.queue.dequeue().ok_or(QueueError::Empty)?;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        Ok(event)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared link between interrupt producers and the session.
///
/// Holds the event queue and the authoritative session state, so producers
/// can validate and enqueue with `&self` from any context.
pub struct EventLink<Q = IrqQueue<EVENT_QUEUE_SIZE>> {
    queue: Q,
    state: AtomicU8,
}

impl<const N: usize> EventLink<IrqQueue<N>> {
    /// Link over a fresh lock-free queue, usable in a `static`
    pub const fn with_irq_queue() -> Self {
        Self::new(IrqQueue::new())
    }
}

impl<Q> EventLink<Q> {
    /// Link over `queue`, in state `INIT`
    pub const fn new(queue: Q) -> Self {
        Self {
            queue,
            state: AtomicU8::new(State::Init as u8),
        }
    }

    /// Current session state
    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: State) {
        let previous = self.state.swap(state as u8, Ordering::AcqRel);
        if previous != state as u8 {
            debug!("state {:?} -> {:?}", State::from_u8(previous), state);
        }
    }

    pub(crate) fn queue(&self) -> &Q {
        &self.queue
    }
}

impl<Q: EventQueue> EventLink<Q> {
    fn post(&self, event: Event) -> Result<()> {
        match self.state() {
            State::Init | State::Fault => {
                error!("event {:?} rejected, stack not initialized", event);
                return Err(Error::NotInitialized);
            }
            _ => {}
        }
        self.queue.send(event).map_err(|err| {
            error!("event {:?} dropped: {:?}", event, err);
            Error::Queue(err)
        })
    }

    /// Report a radio interrupt. Safe to call from interrupt context.
    pub fn radio_irq(&self, flags: IrqFlags) -> Result<()> {
        self.post(Event::RadioIrq(flags))
    }

    /// Report a timer expiry. Safe to call from interrupt context.
    pub fn timer_expired(&self, id: TimerId) -> Result<()> {
        self.post(Event::TimerExpired(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_fifo() {
        let queue: IrqQueue<4> = IrqQueue::new();
        assert!(queue.is_empty());
        queue.send(Event::TimerExpired(TimerId::Rx1)).unwrap();
        queue.send(Event::RadioIrq(IrqFlags::TX_DONE)).unwrap();
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.receive(), Ok(Event::TimerExpired(TimerId::Rx1)));
        assert_eq!(queue.receive(), Ok(Event::RadioIrq(IrqFlags::TX_DONE)));
        assert_eq!(queue.receive(), Err(QueueError::Empty));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_full() {
        let queue: IrqQueue<2> = IrqQueue::new();
        queue.send(Event::TimerExpired(TimerId::Rx1)).unwrap();
        queue.send(Event::TimerExpired(TimerId::Rx2)).unwrap();
        assert_eq!(
            queue.send(Event::RadioIrq(IrqFlags::RX_DONE)),
            Err(QueueError::Full)
        );
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_queue_count_follows_contents() {
        let queue: IrqQueue<4> = IrqQueue::new();
        for _ in 0..4 {
            queue.send(Event::TimerExpired(TimerId::Rx1)).unwrap();
        }
        assert_eq!(queue.send(Event::TimerExpired(TimerId::Rx2)), Err(QueueError::Full));
        queue.receive().unwrap();
        queue.send(Event::RadioIrq(IrqFlags::RX_DONE)).unwrap();

        let mut drained = 0;
        while !queue.is_empty() {
            queue.receive().unwrap();
            drained += 1;
        }
        assert_eq!(drained, 4);
        assert_eq!(queue.receive(), Err(QueueError::Empty));
    }

    #[test]
    fn test_queue_create_discards() {
        let queue: IrqQueue<4> = IrqQueue::new();
        queue.send(Event::TimerExpired(TimerId::Rx1)).unwrap();
        queue.create().unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.receive(), Err(QueueError::Empty));
    }

    #[test]
    fn test_link_rejects_until_initialized() {
        let link: EventLink<IrqQueue<4>> = EventLink::with_irq_queue();
        assert_eq!(link.state(), State::Init);
        assert_eq!(link.radio_irq(IrqFlags::TX_DONE), Err(Error::NotInitialized));

        link.set_state(State::Tx);
        link.radio_irq(IrqFlags::TX_DONE).unwrap();
        link.timer_expired(TimerId::Rx1).unwrap();
        assert_eq!(link.queue().len(), 2);

        link.set_state(State::Fault);
        assert_eq!(link.timer_expired(TimerId::Rx2), Err(Error::NotInitialized));
        assert_eq!(link.queue().len(), 2);
    }
}
