//! Priority-ordered wait queues.

use std::collections::VecDeque;

use crate::thread::{ThreadId, ThreadPriority};

/// Threads suspended on one object, most urgent first, FIFO among equals.
#[derive(Debug, Default, Clone)]
pub struct WaitQueue {
    entries: VecDeque<(ThreadId, ThreadPriority)>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `id` behind every waiter of equal or higher urgency.
    pub fn enqueue(&mut self, id: ThreadId, priority: ThreadPriority) {
        let pos = self
            .entries
            .iter()
            .position(|&(_, p)| p > priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, (id, priority));
    }

    pub fn remove(&mut self, id: ThreadId) -> bool {
        match self.entries.iter().position(|&(t, _)| t == id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn head(&self) -> Option<ThreadId> {
        self.entries.front().map(|&(id, _)| id)
    }

    pub fn pop_head(&mut self) -> Option<ThreadId> {
        self.entries.pop_front().map(|(id, _)| id)
    }

    /// Snapshot of the waiters in service order.
    pub fn snapshot(&self) -> Vec<ThreadId> {
        self.entries.iter().map(|&(id, _)| id).collect()
    }

    pub fn priorities(&self) -> Vec<ThreadPriority> {
        self.entries.iter().map(|&(_, p)| p).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(id: u32) -> ThreadId {
        ThreadId(id)
    }

    #[test]
    fn orders_by_priority_then_arrival() {
        let mut q = WaitQueue::new();
        q.enqueue(t(1), ThreadPriority(10));
        q.enqueue(t(2), ThreadPriority(5));
        q.enqueue(t(3), ThreadPriority(10));
        q.enqueue(t(4), ThreadPriority(5));
        assert_eq!(q.snapshot(), vec![t(2), t(4), t(1), t(3)]);
        assert_eq!(q.head(), Some(t(2)));
    }

    #[test]
    fn remove_and_pop() {
        let mut q = WaitQueue::new();
        q.enqueue(t(1), ThreadPriority(1));
        q.enqueue(t(2), ThreadPriority(2));
        assert!(q.remove(t(1)));
        assert!(!q.remove(t(1)));
        assert_eq!(q.pop_head(), Some(t(2)));
        assert!(q.is_empty());
        assert_eq!(q.pop_head(), None);
    }
}
