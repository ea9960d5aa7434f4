use std::cmp::Ordering;
use std::collections::BinaryHeap;

use trunksim_core::{Counter, EventPriority, VirtualTime};

use crate::messages::Event;

/// One entry in the event heap. Ordering is reversed from the natural
/// `(time, priority, seq)` tuple order so a `BinaryHeap` (a max-heap) always
/// surfaces the soonest, most urgent, earliest-inserted event first.
#[derive(Debug)]
struct ScheduledEvent {
    time: VirtualTime,
    priority: EventPriority,
    seq: u64,
    event: Event,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.time, other.priority, other.seq).cmp(&(self.time, self.priority, self.seq))
    }
}

/// Error returned when an event cannot be scheduled. Non-fatal: the caller
/// logs it and the call is ignored, per spec.md §4.1's failure clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    NegativeDelay,
}

/// Monotonic virtual-time, priority-ordered dispatch queue. `ZoneController`
/// owns exactly one of these; nothing outside the controller mutates it.
#[derive(Debug)]
pub struct Clock {
    now: VirtualTime,
    heap: BinaryHeap<ScheduledEvent>,
    seq: Counter,
}

impl Clock {
    pub fn new() -> Self {
        Clock {
            now: VirtualTime::ZERO,
            heap: BinaryHeap::new(),
            seq: Counter::new(),
        }
    }

    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Inserts `event` at `now + delay_ms`, tagged with `priority` and the
    /// next sequence number. Rejects a negative delay instead of panicking;
    /// the event is simply never scheduled.
    pub fn schedule(
        &mut self,
        delay_ms: i64,
        priority: EventPriority,
        event: Event,
    ) -> Result<VirtualTime, ScheduleError> {
        let exec_time = self
            .now
            .checked_add_millis(delay_ms)
            .ok_or(ScheduleError::NegativeDelay)?;
        self.heap.push(ScheduledEvent {
            time: exec_time,
            priority,
            seq: self.seq.next(),
            event,
        });
        Ok(exec_time)
    }

    /// Equivalent to `schedule(0, priority, event)`.
    pub fn publish(&mut self, priority: EventPriority, event: Event) -> VirtualTime {
        self.schedule(0, priority, event)
            .expect("zero delay is never negative")
    }

    /// Advances `now` by `delta_ms`, then pops the next due event if one
    /// exists. The caller (`ZoneController::tick`) loops on this, dispatching
    /// each event before asking for the next one, so handler-scheduled
    /// zero-delay events are re-read within the same tick pass.
    pub fn advance(&mut self, delta_ms: i64) {
        self.now += delta_ms;
    }

    pub fn pop_due(&mut self) -> Option<Event> {
        if self.heap.peek().map(|e| e.time <= self.now).unwrap_or(false) {
            self.heap.pop().map(|e| e.event)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::new()
    }
}
