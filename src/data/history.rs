//! Bounded rolling history for trend calculations.

use std::collections::VecDeque;

/// Default number of samples kept per family.
pub const DEFAULT_HISTORY_SIZE: usize = 30;

/// Fixed-capacity FIFO window of the most recent samples of one family.
///
/// Samples are kept in arrival order; once full, each push evicts the
/// oldest element.
#[derive(Debug, Clone)]
pub struct HistoryWindow<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T> Default for HistoryWindow<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl<T> HistoryWindow<T> {
    /// Create an empty window. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest if the window is full.
    pub fn push(&mut self, sample: T) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// The newest sample.
    pub fn latest(&self) -> Option<&T> {
        self.samples.back()
    }

    /// The sample immediately preceding the newest one.
    pub fn previous(&self) -> Option<&T> {
        let len = self.samples.len();
        if len < 2 {
            return None;
        }
        self.samples.get(len - 2)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Oldest-to-newest iteration.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.samples.iter()
    }
}

impl<T: Clone> HistoryWindow<T> {
    /// Copy of the contents, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_window_is_empty() {
        let h: HistoryWindow<u32> = HistoryWindow::default();
        assert!(h.is_empty());
        assert_eq!(h.capacity(), DEFAULT_HISTORY_SIZE);
        assert!(h.latest().is_none());
        assert!(h.previous().is_none());
    }

    #[test]
    fn test_length_is_min_of_pushes_and_capacity() {
        for n in [0usize, 1, 2, 29, 30, 31, 75] {
            let mut h = HistoryWindow::new(30);
            for i in 0..n {
                h.push(i);
            }
            assert_eq!(h.len(), n.min(30));

            let expected: Vec<usize> = (n.saturating_sub(30)..n).collect();
            assert_eq!(h.to_vec(), expected);
        }
    }

    #[test]
    fn test_previous_is_second_to_newest() {
        let mut h = HistoryWindow::new(30);
        h.push('a');
        assert_eq!(h.previous(), None);

        h.push('b');
        assert_eq!(h.previous(), Some(&'a'));
        assert_eq!(h.latest(), Some(&'b'));

        h.push('c');
        assert_eq!(h.previous(), Some(&'b'));
        assert_eq!(h.latest(), Some(&'c'));
    }

    #[test]
    fn test_previous_tracks_newest_after_eviction() {
        let mut h = HistoryWindow::new(2);
        h.push(1);
        h.push(2);
        h.push(3);
        assert_eq!(h.to_vec(), vec![2, 3]);
        assert_eq!(h.previous(), Some(&2));
    }

    #[test]
    fn test_clear_empties_window() {
        let mut h = HistoryWindow::new(3);
        h.push(1);
        h.push(2);
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.capacity(), 3);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut h = HistoryWindow::new(0);
        h.push(1);
        h.push(2);
        assert_eq!(h.to_vec(), vec![2]);
    }
}
