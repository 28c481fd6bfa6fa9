//! Lock-free work queue shared by the download workers

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cancel::CancellationToken;

/// Lock-free queue handing out items in submission order.
///
/// Workers call [`claim()`](WorkQueue::claim) to atomically take the next
/// item. Once the cancellation token is raised no further items are handed
/// out; items never claimed are simply never started.
pub struct WorkQueue<S> {
    items: Vec<S>,
    cursor: AtomicUsize,
}

impl<S> WorkQueue<S> {
    pub fn new(items: Vec<S>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Take the next item unless cancellation was requested (lock-free)
    pub fn claim(&self, cancel: &CancellationToken) -> Option<&S> {
        if cancel.is_cancelled() {
            return None;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(i)
    }

    /// Total items in queue
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Number of items handed out so far
    pub fn dispatched(&self) -> usize {
        self.cursor.load(Ordering::Relaxed).min(self.items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_in_order() {
        let q = WorkQueue::new(vec![1, 2, 3]);
        let cancel = CancellationToken::new();
        assert_eq!(q.total(), 3);
        assert_eq!(q.claim(&cancel), Some(&1));
        assert_eq!(q.claim(&cancel), Some(&2));
        assert_eq!(q.claim(&cancel), Some(&3));
        assert_eq!(q.claim(&cancel), None);
        assert_eq!(q.dispatched(), 3);
    }

    #[test]
    fn cancellation_stops_handing_out() {
        let q = WorkQueue::new(vec![1, 2, 3]);
        let cancel = CancellationToken::new();
        assert_eq!(q.claim(&cancel), Some(&1));
        cancel.cancel();
        assert_eq!(q.claim(&cancel), None);
        assert_eq!(q.dispatched(), 1);
    }

    #[test]
    fn empty_queue() {
        let q: WorkQueue<i32> = WorkQueue::new(vec![]);
        assert_eq!(q.total(), 0);
        assert_eq!(q.claim(&CancellationToken::new()), None);
        assert_eq!(q.dispatched(), 0);
    }
}
