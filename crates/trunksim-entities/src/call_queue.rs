use std::cmp::Ordering;
use std::collections::BinaryHeap;

use trunksim_core::{CallId, EventPriority, VirtualTime};

/// One blocked `GroupVoiceServiceRequest`, keyed by `(priority, enqueue_time)`
/// (spec.md §4.7 "Servicing blocked calls"). Reversed `Ord` so the
/// `BinaryHeap` surfaces the highest-priority, earliest-enqueued call first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueuedCall {
    priority: EventPriority,
    enqueued_at: VirtualTime,
    call_id: CallId,
}

impl PartialOrd for QueuedCall {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedCall {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.priority, other.enqueued_at).cmp(&(self.priority, self.enqueued_at))
    }
}

/// The `call_busy_queue`: pending group-voice requests that failed
/// allocation, serviced on channel release (spec.md §2, §4.7).
#[derive(Debug, Default)]
pub struct CallQueue {
    heap: BinaryHeap<QueuedCall>,
}

impl CallQueue {
    pub fn new() -> Self {
        CallQueue { heap: BinaryHeap::new() }
    }

    pub fn push(&mut self, call_id: CallId, priority: EventPriority, enqueued_at: VirtualTime) {
        self.heap.push(QueuedCall { priority, enqueued_at, call_id });
    }

    pub fn pop(&mut self) -> Option<CallId> {
        self.heap.pop().map(|q| q.call_id)
    }

    pub fn peek(&self) -> Option<CallId> {
        self.heap.peek().map(|q| q.call_id)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
