//! # Undo History
//!
//! A capped stack of element-collection snapshots.
//! Used by the course session to restore the state before a mutation.

use std::collections::VecDeque;

use crate::CourseElement;

/// Bounded snapshot stack. Pushing past capacity drops the oldest snapshot.
///
/// Snapshots are whole element collections. Courses hold tens of elements
/// and the depth is small, so copying is simpler than storing diffs.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    capacity: usize,
    snapshots: VecDeque<Vec<CourseElement>>,
}

impl UndoHistory {
    /// Create an empty history holding at most `capacity` snapshots.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            snapshots: VecDeque::with_capacity(capacity),
        }
    }

    /// Record a snapshot, evicting the oldest if at capacity.
    pub fn push(&mut self, snapshot: Vec<CourseElement>) {
        if self.capacity == 0 {
            return;
        }
        while self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    /// Take the most recent snapshot.
    pub fn pop(&mut self) -> Option<Vec<CourseElement>> {
        self.snapshots.pop_back()
    }

    /// Peek at the most recent snapshot without removing it.
    pub fn peek(&self) -> Option<&Vec<CourseElement>> {
        self.snapshots.back()
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Get the number of snapshots held.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if there is nothing to undo.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElementType;

    fn snapshot(n: usize) -> Vec<CourseElement> {
        (0..n)
            .map(|i| CourseElement::new(format!("b{}", i), ElementType::Buoy, 0.0, 0.0, i as u32))
            .collect()
    }

    #[test]
    fn test_push_pop_lifo() {
        let mut history = UndoHistory::new(5);
        history.push(snapshot(1));
        history.push(snapshot(2));
        assert_eq!(history.len(), 2);
        assert_eq!(history.pop().unwrap().len(), 2);
        assert_eq!(history.pop().unwrap().len(), 1);
        assert!(history.pop().is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn test_eviction_drops_oldest() {
        let mut history = UndoHistory::new(3);
        for n in 1..=5 {
            history.push(snapshot(n));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.peek().unwrap().len(), 5);
        history.pop();
        history.pop();
        // Snapshots 1 and 2 were evicted
        assert_eq!(history.pop().unwrap().len(), 3);
        assert!(history.pop().is_none());
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut history = UndoHistory::new(0);
        history.push(snapshot(1));
        assert!(history.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut history = UndoHistory::new(50);
        history.push(snapshot(1));
        history.clear();
        assert_eq!(history.len(), 0);
        assert_eq!(history.capacity(), 50);
    }
}
