//! Timer → main loop event queue.
//!
//! Events are produced by:
//! - esp_timer callbacks (one-second daytime tick, telemetry tick)
//! - the console reader thread (a complete line is waiting)
//!
//! and consumed by the main loop, one at a time in FIFO order.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ esp_timer    │────▶│  Event Queue │────▶│  Main Loop   │
//! │ console rx   │────▶│  (lock-free) │     │  (consumer)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Producers run on different tasks, so a slot is claimed with a CAS on
//! the head index before it is written.  A separate ready flag per slot
//! keeps the consumer from reading a claimed-but-unwritten entry.

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.  Power of two.
const EVENT_QUEUE_CAP: usize = 16;

const EMPTY: u8 = 0xff;

/// Main-loop events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// One-second tick: light schedule and heartbeat.
    DaytimeTick = 0,
    /// Telemetry report due.
    TelemetryTick = 1,
    /// A console line is waiting.
    CommandReceived = 2,
}

impl Event {
    fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::DaytimeTick),
            1 => Some(Self::TelemetryTick),
            2 => Some(Self::CommandReceived),
            _ => None,
        }
    }
}

/// Multi-producer, single-consumer ring of event codes.
pub struct EventQueue {
    head: AtomicU8,
    tail: AtomicU8,
    slots: [AtomicU8; EVENT_QUEUE_CAP],
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            head: AtomicU8::new(0),
            tail: AtomicU8::new(0),
            slots: [const { AtomicU8::new(EMPTY) }; EVENT_QUEUE_CAP],
        }
    }

    /// Push an event.  Lock-free; returns `false` if the queue is full
    /// (event dropped).
    pub fn push(&self, event: Event) -> bool {
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let next = (head as usize + 1) % EVENT_QUEUE_CAP;
            if next == tail as usize {
                return false;
            }
            match self.head.compare_exchange_weak(
                head,
                next as u8,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(h) => head = h,
            }
        }
        self.slots[head as usize].store(event as u8, Ordering::Release);
        true
    }

    /// Pop the next event, `None` if empty or the next slot is still
    /// being written.
    pub fn pop(&self) -> Option<Event> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        let raw = self.slots[tail as usize].swap(EMPTY, Ordering::Acquire);
        if raw == EMPTY {
            return None;
        }
        self.tail
            .store(((tail as usize + 1) % EVENT_QUEUE_CAP) as u8, Ordering::Release);
        Event::from_u8(raw)
    }

    /// Drain all pending events into a callback, in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Relaxed) == self.head.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire) as usize;
        let tail = self.tail.load(Ordering::Relaxed) as usize;
        (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
    }
}

static EVENTS: EventQueue = EventQueue::new();

/// Push onto the global queue.  Safe from timer callbacks.
pub fn push_event(event: Event) -> bool {
    EVENTS.push(event)
}

pub fn drain_events(handler: impl FnMut(Event)) {
    EVENTS.drain(handler);
}

pub fn queue_is_empty() -> bool {
    EVENTS.is_empty()
}
